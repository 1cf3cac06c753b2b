//! Directory walking for route and component discovery.

use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Every file under `root` whose extension is in `extensions`.
///
/// Entries are visited in file-name order so discovery order is stable
/// across platforms. Runs on the blocking pool.
pub async fn walk_files(root: &Path, extensions: &[String]) -> io::Result<Vec<PathBuf>> {
    let root = root.to_path_buf();
    let extensions = extensions.to_vec();
    tokio::task::spawn_blocking(move || walk_files_blocking(&root, &extensions))
        .await
        .map_err(io::Error::other)?
}

fn walk_files_blocking(root: &Path, extensions: &[String]) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(true).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        if has_extension(entry.path(), extensions) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// True when the path's extension is one of `extensions`.
pub fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .is_some_and(|ext| extensions.iter().any(|e| e == ext))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[tokio::test]
    async fn test_walk_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("b")).unwrap();
        fs::write(dir.path().join("b/index.html"), "").unwrap();
        fs::write(dir.path().join("a.html"), "").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();

        let exts = vec!["html".to_string()];
        let files = walk_files(dir.path(), &exts).await.unwrap();
        let relative: Vec<_> = files
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(relative, vec![PathBuf::from("a.html"), PathBuf::from("b/index.html")]);
    }
}
