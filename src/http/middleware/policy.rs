//! Security headers for every outgoing response.

use async_trait::async_trait;

use crate::routing::{Exchange, Handle, HandleError};
use crate::security::csp::apply_policy;

/// Sets `content-security-policy`, `x-content-type-options` and
/// `referrer-policy`. A failure leaves the response as it was.
#[derive(Debug, Clone, Copy, Default)]
pub struct PolicyHeaders;

#[async_trait]
impl Handle for PolicyHeaders {
    async fn handle(&self, exchange: &mut Exchange) -> Result<(), HandleError> {
        if exchange.flags.ignore {
            return Ok(());
        }
        let Some(response) = exchange.response.as_mut() else {
            return Ok(());
        };
        if let Err(error) = apply_policy(response.headers_mut()) {
            tracing::warn!(error = %error, "Policy headers not applied");
        }
        Ok(())
    }
}
