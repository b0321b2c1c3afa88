//! Rendering collaborator contract.
//!
//! Rendered-page adapters only depend on these traits, never on a concrete
//! browser engine. The shipped `StaticBrowser` implementation fetches the
//! page once over HTTP and treats interaction as a no-op, which degrades
//! scraping to first-viewport extraction but keeps every adapter runnable
//! and testable without an engine; a real headless browser plugs in behind
//! the same seam.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use scraper::{Html, Selector};
use thiserror::Error;

use crate::infrastructure::http_client::HttpClient;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("timed out loading {url}")]
    Timeout { url: String },

    #[error("renderer protocol error: {0}")]
    Protocol(String),
}

/// An open page. Interaction methods mutate renderer state; `html()`
/// returns the current DOM snapshot for extraction.
#[async_trait]
pub trait PageSession: Send {
    async fn html(&mut self) -> Result<String, RenderError>;

    /// Number of elements currently matching the (comma-separable) selector.
    async fn element_count(&mut self, selector: &str) -> Result<usize, RenderError>;

    /// Scroll one viewport height down.
    async fn scroll_by_viewport(&mut self) -> Result<(), RenderError>;

    /// Click the first element matching any of the selectors; false when
    /// nothing matched.
    async fn click_first(&mut self, selectors: &[&str]) -> Result<bool, RenderError>;

    /// Wait until any selector matches, up to the timeout; false on expiry.
    async fn wait_for_any(&mut self, selectors: &[&str], timeout: Duration)
        -> Result<bool, RenderError>;
}

#[async_trait]
pub trait Browser: Send + Sync {
    async fn open(&self, url: &str, timeout: Duration) -> Result<Box<dyn PageSession>, RenderError>;
}

/// Open a page with bounded retries; transient navigation failures back
/// off briefly, the last failure propagates.
pub async fn open_with_retry(
    browser: &dyn Browser,
    url: &str,
    timeout: Duration,
    max_attempts: u32,
) -> Result<Box<dyn PageSession>, RenderError> {
    let mut last_err = None;
    for attempt in 1..=max_attempts.max(1) {
        match browser.open(url, timeout).await {
            Ok(page) => return Ok(page),
            Err(e) => {
                tracing::warn!("Navigation attempt {}/{} failed for {}: {}", attempt, max_attempts, url, e);
                last_err = Some(e);
                if attempt < max_attempts {
                    tokio::time::sleep(Duration::from_secs(2)).await;
                }
            }
        }
    }
    Err(last_err.unwrap_or(RenderError::Protocol("no attempts made".to_string())))
}

/// HTTP-backed renderer: one fetch, no script execution.
pub struct StaticBrowser {
    http: Arc<HttpClient>,
}

impl StaticBrowser {
    pub fn new(http: Arc<HttpClient>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Browser for StaticBrowser {
    async fn open(&self, url: &str, timeout: Duration) -> Result<Box<dyn PageSession>, RenderError> {
        let fetch = tokio::time::timeout(timeout, self.http.get_text(url));
        let html = match fetch.await {
            Ok(Ok(html)) => html,
            Ok(Err(e)) => {
                return Err(RenderError::Navigation {
                    url: url.to_string(),
                    reason: e.to_string(),
                })
            }
            Err(_) => {
                return Err(RenderError::Timeout {
                    url: url.to_string(),
                })
            }
        };
        Ok(Box::new(StaticPage { html }))
    }
}

struct StaticPage {
    html: String,
}

fn count_matches(html: &str, selector: &str) -> usize {
    let Ok(parsed) = Selector::parse(selector) else {
        return 0;
    };
    let doc = Html::parse_document(html);
    doc.select(&parsed).count()
}

#[async_trait]
impl PageSession for StaticPage {
    async fn html(&mut self) -> Result<String, RenderError> {
        Ok(self.html.clone())
    }

    async fn element_count(&mut self, selector: &str) -> Result<usize, RenderError> {
        Ok(count_matches(&self.html, selector))
    }

    async fn scroll_by_viewport(&mut self) -> Result<(), RenderError> {
        // Static snapshot: nothing more loads.
        Ok(())
    }

    async fn click_first(&mut self, _selectors: &[&str]) -> Result<bool, RenderError> {
        Ok(false)
    }

    async fn wait_for_any(
        &mut self,
        selectors: &[&str],
        _timeout: Duration,
    ) -> Result<bool, RenderError> {
        Ok(selectors.iter().any(|sel| count_matches(&self.html, sel) > 0))
    }
}

#[cfg(test)]
pub mod fixtures {
    //! A canned-page browser for adapter tests.

    use super::{Browser, PageSession, RenderError};
    use async_trait::async_trait;
    use std::time::Duration;

    pub struct FixtureBrowser {
        pub html: String,
    }

    #[async_trait]
    impl Browser for FixtureBrowser {
        async fn open(
            &self,
            _url: &str,
            _timeout: Duration,
        ) -> Result<Box<dyn PageSession>, RenderError> {
            Ok(Box::new(FixturePage {
                html: self.html.clone(),
            }))
        }
    }

    pub struct FixturePage {
        html: String,
    }

    #[async_trait]
    impl PageSession for FixturePage {
        async fn html(&mut self) -> Result<String, RenderError> {
            Ok(self.html.clone())
        }

        async fn element_count(&mut self, selector: &str) -> Result<usize, RenderError> {
            Ok(super::count_matches(&self.html, selector))
        }

        async fn scroll_by_viewport(&mut self) -> Result<(), RenderError> {
            Ok(())
        }

        async fn click_first(&mut self, _selectors: &[&str]) -> Result<bool, RenderError> {
            Ok(false)
        }

        async fn wait_for_any(
            &mut self,
            selectors: &[&str],
            _timeout: Duration,
        ) -> Result<bool, RenderError> {
            Ok(selectors
                .iter()
                .any(|sel| super::count_matches(&self.html, sel) > 0))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_count_uses_comma_selectors() {
        let html = r#"<div class="a"></div><div class="b"></div>"#;
        assert_eq!(count_matches(html, ".a, .b"), 2);
        assert_eq!(count_matches(html, ".missing"), 0);
    }
}
