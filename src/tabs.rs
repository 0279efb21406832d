//! Collaborators that know about open tabs and their page content.

use async_trait::async_trait;
use url::Url;

use crate::core::{Tab, TabId};
use crate::errors::SummaryError;

/// Summary used for pages that are never inspected.
pub const CANNOT_ANALYZE_MESSAGE: &str = "Cannot analyze system pages or special URLs.";

const UNSUPPORTED_SCHEMES: &[&str] = &[
    "chrome-extension",
    "chrome",
    "chrome-search",
    "data",
    "about",
    "edge",
    "brave",
    "arc",
];

#[async_trait]
pub trait TabRegistry: Send + Sync {
    /// `Ok(None)` when the tab no longer exists.
    async fn get(&self, tab_id: TabId) -> Result<Option<Tab>, SummaryError>;

    async fn list(&self) -> Result<Vec<Tab>, SummaryError>;
}

#[async_trait]
pub trait ContentExtractor: Send + Sync {
    /// `Ok(None)` signals extraction failure; `Ok(Some(""))` is legitimately empty content.
    async fn extract(&self, tab_id: TabId, url: &str) -> Result<Option<String>, SummaryError>;
}

/// True for locators the extension cannot script: blank URLs and browser-internal schemes.
#[must_use]
pub fn is_unsupported_locator(url: &str) -> bool {
    let url = url.trim();
    if url.is_empty() {
        return true;
    }

    match Url::parse(url) {
        Ok(parsed) => UNSUPPORTED_SCHEMES.contains(&parsed.scheme()),
        Err(_) => {
            let lowered = url.to_ascii_lowercase();
            UNSUPPORTED_SCHEMES
                .iter()
                .any(|scheme| lowered.starts_with(&format!("{scheme}:")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_schemes_are_unsupported() {
        for url in [
            "",
            "   ",
            "chrome://settings",
            "chrome-extension://abcdef/popup.html",
            "chrome-search://local-ntp/local-ntp.html",
            "data:text/html,hello",
            "about:blank",
            "edge://newtab",
            "brave://rewards",
            "arc://history",
        ] {
            assert!(is_unsupported_locator(url), "expected unsupported: {url}");
        }
    }

    #[test]
    fn test_web_pages_are_supported() {
        for url in [
            "https://example.com/article",
            "http://localhost:8080",
            "https://www.youtube.com/watch?v=abc",
        ] {
            assert!(!is_unsupported_locator(url), "expected supported: {url}");
        }
    }
}
