//! The common source-adapter contract.

use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::item::{FashionCategory, FashionItem};
use crate::infrastructure::http_client::HttpClient;
use crate::scraping::browser::RenderError;

/// Fatal scrape failures. Recoverable conditions (an empty result page, a
/// single broken product card) never surface here; adapters degrade to
/// skipping the element or returning an empty list instead.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("invalid target url '{0}'")]
    InvalidUrl(String),

    #[error("failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("navigation to {url} failed after retries: {reason}")]
    Navigation { url: String, reason: String },

    #[error("blocked by anti-bot protection at {url}")]
    Blocked { url: String },

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("image download failed for {url}: {reason}")]
    ImageDownload { url: String, reason: String },
}

/// A source adapter: given a target URL and an item budget, produce
/// normalized catalog candidates.
///
/// Guarantees: at most `max_items` returned; every item has a non-empty
/// name, a product URL and a valid category; unparseable prices come back
/// as 0.0 rather than failing the element.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Short identifier used in logs and session rows.
    fn name(&self) -> &'static str;

    /// HTTP client used for the default image download implementation.
    fn http_client(&self) -> &HttpClient;

    async fn scrape(
        &self,
        url: &str,
        max_items: usize,
        category_filter: Option<FashionCategory>,
    ) -> Result<Vec<FashionItem>, ScrapeError>;

    /// Download a product image to a local path. Returns false (without
    /// erroring) for empty URLs.
    async fn download_image(&self, image_url: &str, save_path: &Path) -> Result<bool, ScrapeError> {
        if image_url.is_empty() {
            return Ok(false);
        }
        let bytes = self
            .http_client()
            .get_bytes(image_url)
            .await
            .map_err(|e| ScrapeError::ImageDownload {
                url: image_url.to_string(),
                reason: e.to_string(),
            })?;
        if let Some(parent) = save_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ScrapeError::ImageDownload {
                    url: image_url.to_string(),
                    reason: e.to_string(),
                })?;
        }
        tokio::fs::write(save_path, bytes)
            .await
            .map_err(|e| ScrapeError::ImageDownload {
                url: image_url.to_string(),
                reason: e.to_string(),
            })?;
        Ok(true)
    }
}

/// Cache filename for a downloaded image: product id plus a short content
/// hash of the URL, keeping re-downloads idempotent.
pub fn image_cache_filename(product_id: &str, image_url: &str) -> String {
    let hash = blake3::hash(image_url.as_bytes()).to_hex();
    let ext = image_url
        .split('?')
        .next()
        .and_then(|path| path.rsplit('.').next())
        .filter(|ext| ext.len() <= 4)
        .unwrap_or("jpg");
    format!("{product_id}_{}.{ext}", &hash.as_str()[..12])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_filename_is_stable_and_extension_aware() {
        let a = image_cache_filename("p1", "https://cdn.example.com/a.png?v=2");
        let b = image_cache_filename("p1", "https://cdn.example.com/a.png?v=2");
        assert_eq!(a, b);
        assert!(a.starts_with("p1_"));
        assert!(a.ends_with(".png"));
    }

    #[test]
    fn image_filename_defaults_extension() {
        let name = image_cache_filename("p2", "https://cdn.example.com/image-no-ext");
        assert!(name.ends_with(".jpg"));
    }
}
