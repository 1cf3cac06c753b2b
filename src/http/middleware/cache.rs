//! Long-lived caching for fingerprinted assets.

use async_trait::async_trait;
use axum::http::{header, HeaderValue, StatusCode};

use crate::routing::{Exchange, Handle, HandleError};

/// Path pattern of immutable assets.
pub const IMMUTABLE_PATTERN: &str = "/_/immutable/*";

const IMMUTABLE: &str = "public, max-age=31536000, immutable";

/// Marks successful responses under [`IMMUTABLE_PATTERN`] as cacheable
/// forever.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImmutableCache;

#[async_trait]
impl Handle for ImmutableCache {
    async fn handle(&self, exchange: &mut Exchange) -> Result<(), HandleError> {
        if exchange.flags.ignore {
            return Ok(());
        }
        if let Some(response) = exchange.response.as_mut() {
            if response.status() == StatusCode::OK {
                response
                    .headers_mut()
                    .insert(header::CACHE_CONTROL, HeaderValue::from_static(IMMUTABLE));
            }
        }
        Ok(())
    }
}
