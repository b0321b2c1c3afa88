//! Generic rendered-page adapter: the fallback for hosts without a
//! dedicated adapter. Common-denominator selectors only; sites that matter
//! get their own adapter with tuned cascades.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use scraper::Html;
use tracing::{debug, info};
use url::Url;

use crate::domain::item::{FashionCategory, FashionItem};
use crate::extraction::category::CategoryMatcher;
use crate::extraction::trend::TrendWeights;
use crate::extraction::{keywords, price};
use crate::infrastructure::http_client::HttpClient;
use crate::scraping::adapter::{ScrapeError, SourceAdapter};
use crate::scraping::browser::{open_with_retry, Browser};
use crate::scraping::dom::{self, SettleOptions};

const GRID: &str = "[data-testid='product'], .product-card, .product-item, article.product";

const NAME: &[&str] = &[".product-name", ".product-title", "h3", "h2"];
const PRICE: &[&str] = &[".price", ".product-price", "[data-testid='price']"];

const NAV_TIMEOUT: Duration = Duration::from_secs(30);
const NAV_RETRIES: u32 = 2;
const SCROLL_ROUNDS: u32 = 6;

pub struct GenericAdapter {
    http: Arc<HttpClient>,
    browser: Arc<dyn Browser>,
    weights: TrendWeights,
    matcher: CategoryMatcher,
}

impl GenericAdapter {
    pub fn new(http: Arc<HttpClient>, browser: Arc<dyn Browser>, weights: TrendWeights) -> Self {
        Self {
            http,
            browser,
            weights,
            matcher: CategoryMatcher::new(FashionCategory::Top),
        }
    }

    /// Brand guess from the host: `www.mango.com` reads as "Mango".
    fn brand_from_url(base: &Url) -> String {
        let host = base.host_str().unwrap_or_default();
        let stripped = host.strip_prefix("www.").unwrap_or(host);
        let name = stripped.split('.').next().unwrap_or(stripped);
        let mut chars = name.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
            None => "Unknown".to_string(),
        }
    }

    fn extract_items(
        &self,
        html: &str,
        base: &Url,
        max_items: usize,
        category_filter: Option<FashionCategory>,
    ) -> Vec<FashionItem> {
        let doc = Html::parse_document(html);
        let cards = dom::select_cards(&doc, &[GRID]);
        debug!("Generic grid holds {} cards", cards.len());

        let brand = Self::brand_from_url(base);

        let mut items = Vec::new();
        for (index, card) in cards.into_iter().enumerate() {
            if items.len() >= max_items {
                break;
            }

            let name = dom::first_text(card, NAME)
                .unwrap_or_else(|| format!("Product {}", index + 1));
            let name = dom::clamp_chars(name.trim(), 100);

            let current = dom::first_text(card, PRICE)
                .map(|t| price::parse_price(&t))
                .unwrap_or(0.0);

            let product_url = dom::link_url(card, base);

            let mut item = FashionItem::new(
                dom::external_id(card, &["data-product-id", "data-sku"], &product_url),
                name.clone(),
                brand.clone(),
            );
            item.price = current;
            item.image_url = dom::image_url(card, base);
            item.product_url = product_url;
            item.category = self.matcher.infer_or_default(&name);
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
impl SourceAdapter for GenericAdapter {
    fn name(&self) -> &'static str {
        "generic"
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
        let base = Url::parse(url).map_err(|_| ScrapeError::InvalidUrl(url.to_string()))?;

        let mut page = open_with_retry(self.browser.as_ref(), url, NAV_TIMEOUT, NAV_RETRIES)
            .await
            .map_err(|e| ScrapeError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let opts = SettleOptions {
            grid_selector: GRID,
            load_more_selectors: &[],
            max_rounds: SCROLL_ROUNDS,
            min_delay_ms: 800,
            max_delay_ms: 1200,
        };
        dom::settle_listing(&mut page, &opts, max_items).await?;

        let html = page.html().await?;
        let items = self.extract_items(&html, &base, max_items, category_filter);

        // Selector drift on an unknown site degrades to an empty list; the
        // caller decides whether that is worth reporting.
        info!("Generic scrape of {} yielded {} items", url, items.len());
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::http_client::HttpClientConfig;
    use crate::scraping::browser::fixtures::FixtureBrowser;

    #[tokio::test]
    async fn unknown_markup_degrades_to_empty_list() {
        let http = Arc::new(HttpClient::new(HttpClientConfig::default()).unwrap());
        let browser = Arc::new(FixtureBrowser {
            html: "<html><body><p>nothing for sale here</p></body></html>".to_string(),
        });
        let adapter = GenericAdapter::new(http, browser, TrendWeights::default());
        let items = adapter
            .scrape("https://blog.example.com/lookbook", 10, None)
            .await
            .unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn brand_derived_from_host() {
        let base = Url::parse("https://www.mango.com/us").unwrap();
        assert_eq!(GenericAdapter::brand_from_url(&base), "Mango");
    }
}
