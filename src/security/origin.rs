//! Forwarded-origin resolution and origin allow-listing.
//!
//! Only the nearest proxy is trusted: when `x-forwarded-host` or
//! `x-forwarded-proto` carry a chain, the last entry of the last header
//! line wins.

use axum::http::HeaderMap;
use url::Url;

pub const X_FORWARDED_HOST: &str = "x-forwarded-host";
pub const X_FORWARDED_PROTO: &str = "x-forwarded-proto";

/// `url` with host and scheme replaced from the forwarding headers.
///
/// A forwarded host without a port clears the port. Values that do not
/// parse are ignored.
pub fn forwarded_url(url: &Url, headers: &HeaderMap) -> Url {
    let mut url = url.clone();

    if let Some(host) = last_entry(headers, X_FORWARDED_HOST) {
        if let Ok(parsed) = Url::parse(&format!("http://{}/", host)) {
            if let Some(name) = parsed.host_str() {
                // Unlike a bare host assignment, a portless forwarded host
                // drops the listener's port rather than keeping it.
                let mut candidate = url.clone();
                if candidate.set_host(Some(name)).is_ok() && candidate.set_port(parsed.port()).is_ok() {
                    url = candidate;
                }
            }
        }
    }

    if let Some(proto) = last_entry(headers, X_FORWARDED_PROTO) {
        let scheme = proto.trim_end_matches(':').to_ascii_lowercase();
        if scheme == "http" || scheme == "https" {
            // Switching between special schemes cannot fail.
            let _ = url.set_scheme(&scheme);
        }
    }

    url
}

/// True when `url` has the allowed origin's hostname and scheme.
pub fn origin_allowed(allowed: &Url, url: &Url) -> bool {
    allowed.host_str() == url.host_str() && allowed.scheme() == url.scheme()
}

fn last_entry<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(name)
        .iter()
        .next_back()?
        .to_str()
        .ok()?
        .rsplit(',')
        .map(str::trim)
        .find(|entry| !entry.is_empty())
}
