//! Trailing-slash redirect routes.

use async_trait::async_trait;
use axum::http::Method;
use std::sync::Arc;

use crate::http::response;
use crate::manifest::redirects::{toggle_trailing_slash, RedirectPair};
use crate::routing::{Exchange, Handle, HandleError, Pattern, PatternError, RouterBuilder};

/// Answers with a 308 to the same URL with its trailing slash toggled.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrailingSlashRedirect;

#[async_trait]
impl Handle for TrailingSlashRedirect {
    async fn handle(&self, exchange: &mut Exchange) -> Result<(), HandleError> {
        if exchange.flags.ignore {
            return Ok(());
        }
        let mut url = exchange.url();
        let path = toggle_trailing_slash(url.path());
        url.set_path(&path);
        exchange.response = Some(response::permanent_redirect(url.as_str()));
        Ok(())
    }
}

/// Register a GET redirect route at each pair's alternate pattern.
pub fn register_redirects(router: &mut RouterBuilder, pairs: &[RedirectPair]) -> Result<(), PatternError> {
    let handler: Arc<dyn Handle> = Arc::new(TrailingSlashRedirect);
    for pair in pairs {
        router.route(Method::GET, Pattern::parse(&pair.alternate)?, Arc::clone(&handler));
    }
    Ok(())
}
