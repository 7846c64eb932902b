//! Control endpoint derivation.
//!
//! The endpoint mirrors the hosting page's location: same host, port and
//! path, with `wss` when the page was served over `https` and `ws`
//! otherwise. Query and fragment are dropped.

use url::Url;

use crate::error::{Error, Result};

/// Derives the control endpoint from the hosting page URL.
///
/// # Errors
///
/// Returns [`Error::Config`] if the page URL has no host.
pub fn control_endpoint(page: &Url) -> Result<Url> {
    let scheme = if page.scheme() == "https" { "wss" } else { "ws" };

    let host = page
        .host_str()
        .ok_or_else(|| Error::config(format!("hosting page has no host: {page}")))?;

    let authority = match page.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    };

    Ok(Url::parse(&format!("{scheme}://{authority}{}", page.path()))?)
}

/// Returns `true` if the endpoint needs TLS.
#[inline]
#[must_use]
pub fn is_secure(endpoint: &Url) -> bool {
    endpoint.scheme() == "wss"
}
