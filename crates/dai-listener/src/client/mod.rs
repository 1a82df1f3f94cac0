//! REST clients for the DAI and XRAY APIs.
//!
//! The watcher and discovery loop only see the [`DaiApi`] and [`XrayApi`]
//! traits, so tests can swap the HTTP clients for in-memory fakes.

mod dai;
mod session;
mod xray;

#[cfg(test)]
pub(crate) mod fake;

pub use dai::{DaiApi, DaiClient};
pub use xray::{XrayApi, XrayClient};

/// Normalize a base URL: default to `http://` and drop trailing slashes.
pub fn normalize_base_url(url: &str) -> String {
    let url = url.trim();
    let url = if url.contains("//") {
        url.to_string()
    } else {
        format!("http://{}", url)
    };
    url.trim_end_matches('/').to_string()
}
