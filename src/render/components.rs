//! Component template discovery.

use std::io;
use std::path::Path;

use crate::manifest::walk::walk_files;
use crate::render::TemplateRenderer;

/// Register every component template under `dir` with `renderer`.
///
/// Components are named after their file stem. A missing directory is
/// only a warning; duplicate names keep the first file found.
pub async fn load_components(
    renderer: &mut dyn TemplateRenderer,
    dir: &Path,
    extensions: &[String],
) -> io::Result<usize> {
    if !tokio::fs::try_exists(dir).await.unwrap_or(false) {
        tracing::warn!(path = %dir.display(), "Missing components directory");
        return Ok(0);
    }

    let mut loaded = 0;
    for path in walk_files(dir, extensions).await? {
        let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        if renderer.has_template(name) {
            tracing::warn!(component = %name, path = %path.display(), "Duplicate component");
            continue;
        }
        let html = tokio::fs::read_to_string(&path).await?;
        renderer.set_template(name, html);
        loaded += 1;
    }

    tracing::debug!(count = loaded, "Components loaded");
    Ok(loaded)
}
