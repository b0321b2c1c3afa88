//! Tullabee adapter.
//!
//! Tullabee is a Shopify storefront sitting behind Cloudflare, so the JSON
//! feed is unreachable and the rendered page is the only way in. The
//! adapter waits out the interstitial before touching the grid and treats
//! a page that never leaves the challenge as a hard block.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use scraper::Html;
use tracing::{debug, info, warn};
use url::Url;

use crate::domain::item::{FashionCategory, FashionItem};
use crate::extraction::category::CategoryMatcher;
use crate::extraction::trend::TrendWeights;
use crate::extraction::{keywords, price};
use crate::infrastructure::http_client::HttpClient;
use crate::scraping::adapter::{ScrapeError, SourceAdapter};
use crate::scraping::browser::{open_with_retry, Browser};
use crate::scraping::dom::{self, SettleOptions};

const DEFAULT_URL: &str = "https://tullabee.com/collections/all";

const GRID: &str = ".product-card, .product-item, [data-product-id], .grid__item";

const NAME: &[&str] = &[".product-card__title", ".card__heading", ".product__title", "h3", "h2"];
const PRICE: &[&str] = &[".price-item", ".price__regular", ".money"];

const LOAD_MORE: &[&str] = &[".load-more-btn", "[data-load-more]"];

const NAV_TIMEOUT: Duration = Duration::from_secs(45);
const NAV_RETRIES: u32 = 3;
const SCROLL_ROUNDS: u32 = 15;

/// Interstitial markers; seeing these after the grace period means the
/// challenge was never solved.
const CHALLENGE_MARKERS: &[&str] = &["Just a moment", "challenge-platform", "cf-chl"];

pub struct TullabeeAdapter {
    http: Arc<HttpClient>,
    browser: Arc<dyn Browser>,
    weights: TrendWeights,
    matcher: CategoryMatcher,
    challenge_grace: Duration,
}

impl TullabeeAdapter {
    pub fn new(http: Arc<HttpClient>, browser: Arc<dyn Browser>, weights: TrendWeights) -> Self {
        Self {
            http,
            browser,
            weights,
            // Kids' boutique: unclassifiable garments default to dresswear.
            matcher: CategoryMatcher::new(FashionCategory::Dress),
            challenge_grace: Duration::from_secs(5),
        }
    }

    /// Shorten the interstitial grace period (tests).
    pub fn with_challenge_grace(mut self, grace: Duration) -> Self {
        self.challenge_grace = grace;
        self
    }

    fn looks_blocked(html: &str) -> bool {
        CHALLENGE_MARKERS.iter().any(|marker| html.contains(marker))
    }

    fn extract_items(
        &self,
        html: &str,
        base: &Url,
        max_items: usize,
        category_filter: Option<FashionCategory>,
    ) -> Vec<FashionItem> {
        let doc = Html::parse_document(html);
        let mut cards = dom::select_cards(&doc, &[GRID]);
        if cards.is_empty() {
            // Markup drift fallback: any product link.
            cards = dom::select_cards(&doc, &["a[href*='/products/']"]);
        }
        debug!("Tullabee grid holds {} cards", cards.len());

        let mut items = Vec::new();
        for card in cards {
            if items.len() >= max_items {
                break;
            }

            let Some(name) = dom::first_text(card, NAME) else {
                // A card without any title is navigation chrome, skip it.
                continue;
            };
            let name = dom::clamp_chars(name.trim(), 100);

            let current = dom::first_text(card, PRICE)
                .map(|t| price::parse_price(&t))
                .unwrap_or(0.0);

            let product_url = dom::link_url(card, base);

            let mut item = FashionItem::new(
                dom::external_id(card, &["data-product-id"], &product_url),
                name.clone(),
                "Tullabee",
            );
            item.price = current;
            item.image_url = dom::image_url(card, base);
            item.product_url = product_url;
            item.category = self.matcher.infer_or_default(&name);
            item.colors = keywords::extract_colors(&name);
            item.tags = keywords::extract_tags(&name);
            self.weights.apply(&mut item);

            if let Some(filter) = category_filter {
                if item.category != filter {
                    continue;
                }
            }
            items.push(item);
        }
        items
    }
}

#[async_trait]
impl SourceAdapter for TullabeeAdapter {
    fn name(&self) -> &'static str {
        "tullabee"
    }

    fn http_client(&self) -> &HttpClient {
        &self.http
    }

    async fn scrape(
        &self,
        url: &str,
        max_items: usize,
        category_filter: Option<FashionCategory>,
    ) -> Result<Vec<FashionItem>, ScrapeError> {
        let url = if url.is_empty() { DEFAULT_URL } else { url };
        let base = Url::parse(url).map_err(|_| ScrapeError::InvalidUrl(url.to_string()))?;

        let mut page = open_with_retry(self.browser.as_ref(), url, NAV_TIMEOUT, NAV_RETRIES)
            .await
            .map_err(|e| ScrapeError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        // Give the Cloudflare challenge time to clear before inspecting.
        tokio::time::sleep(self.challenge_grace).await;
        let snapshot = page.html().await?;
        if Self::looks_blocked(&snapshot) {
            warn!("Cloudflare interstitial still up on {}, waiting it out", url);
            tokio::time::sleep(self.challenge_grace + self.challenge_grace / 2).await;
            let retry = page.html().await?;
            if Self::looks_blocked(&retry) {
                return Err(ScrapeError::Blocked {
                    url: url.to_string(),
                });
            }
        }

        let opts = SettleOptions {
            grid_selector: GRID,
            load_more_selectors: LOAD_MORE,
            max_rounds: SCROLL_ROUNDS,
            min_delay_ms: 1200,
            max_delay_ms: 1800,
        };
        dom::settle_listing(&mut page, &opts, max_items).await?;

        let html = page.html().await?;
        let items = self.extract_items(&html, &base, max_items, category_filter);

        info!("Tullabee scrape of {} yielded {} items", url, items.len());
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::http_client::HttpClientConfig;
    use crate::scraping::browser::fixtures::FixtureBrowser;

    fn adapter_with(html: &str) -> TullabeeAdapter {
        let http = Arc::new(HttpClient::new(HttpClientConfig::default()).unwrap());
        let browser = Arc::new(FixtureBrowser {
            html: html.to_string(),
        });
        TullabeeAdapter::new(http, browser, TrendWeights::default())
            .with_challenge_grace(Duration::from_millis(10))
    }

    #[tokio::test]
    async fn persistent_challenge_is_a_block() {
        let adapter = adapter_with("<html><title>Just a moment...</title></html>");
        let err = adapter
            .scrape("https://tullabee.com/collections/all", 10, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ScrapeError::Blocked { .. }));
    }

    #[tokio::test]
    async fn kids_default_category_is_dress() {
        let adapter = adapter_with(
            r#"<div class="product-card" data-product-id="777">
                 <a class="product-card__link" href="/products/magnolia-bubble">x</a>
                 <h3 class="product-card__title">Magnolia Bubble</h3>
                 <span class="price-item">$42.00</span>
               </div>"#,
        );
        let items = adapter
            .scrape("https://tullabee.com/collections/all", 10, None)
            .await
            .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].category, FashionCategory::Dress);
        assert_eq!(items[0].external_id, "777");
    }
}
