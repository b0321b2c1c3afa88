//! ZARA adapter.
//!
//! ZARA is a React SPA: the grid hydrates after load, a cookie-consent
//! dialog gates interaction, and images mostly live in srcset attributes.
//! Cards carry no review or sales signals at all.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use scraper::Html;
use tracing::{debug, info};
use url::Url;

use crate::domain::item::{FashionCategory, FashionItem};
use crate::extraction::category::CategoryMatcher;
use crate::extraction::price;
use crate::extraction::trend::TrendWeights;
use crate::infrastructure::http_client::HttpClient;
use crate::scraping::adapter::{ScrapeError, SourceAdapter};
use crate::scraping::browser::{open_with_retry, Browser};
use crate::scraping::dom::{self, SettleOptions};

const GRID: &str =
    ".product-grid__product, .product-grid-product, [data-productid], a.product-link";

const NAME: &[&str] =
    &[".product-grid-product-info__name", ".product-link__name", ".product-name", "h2"];
const CURRENT_PRICE: &[&str] = &[".money-amount__main", ".price__amount", ".product-price"];
const ORIGINAL_PRICE: &[&str] = &[".price__amount--old", ".money-amount__main--old"];

const CONSENT_BUTTONS: &[&str] = &["#onetrust-accept-btn-handler", "[data-qa='cookies-accept']"];

/// Style descriptors ZARA bakes into product names.
const NAME_TAGS: &[&str] = &[
    "basic", "premium", "limited", "oversized", "cropped", "fitted", "printed", "striped",
    "floral", "knit", "satin", "leather", "linen",
];

const NAV_TIMEOUT: Duration = Duration::from_secs(30);
const NAV_RETRIES: u32 = 3;
const SCROLL_ROUNDS: u32 = 8;

pub struct ZaraAdapter {
    http: Arc<HttpClient>,
    browser: Arc<dyn Browser>,
    weights: TrendWeights,
    matcher: CategoryMatcher,
}

impl ZaraAdapter {
    pub fn new(http: Arc<HttpClient>, browser: Arc<dyn Browser>, weights: TrendWeights) -> Self {
        Self {
            http,
            browser,
            weights,
            matcher: CategoryMatcher::new(FashionCategory::Top),
        }
    }

    fn name_tags(name: &str) -> Vec<String> {
        let lowered = name.to_lowercase();
        NAME_TAGS
            .iter()
            .filter(|kw| lowered.contains(*kw))
            .take(5)
            .map(|kw| (*kw).to_string())
            .collect()
    }

    fn extract_items(
        &self,
        html: &str,
        base: &Url,
        max_items: usize,
        url_category: Option<FashionCategory>,
        category_filter: Option<FashionCategory>,
    ) -> Vec<FashionItem> {
        let doc = Html::parse_document(html);
        let mut cards = dom::select_cards(&doc, &[GRID]);
        if cards.is_empty() {
            // Redesigned grid: fall back to bare product anchors.
            cards = dom::select_cards(&doc, &["a[href*='/p/']"]);
        }
        debug!("ZARA grid holds {} cards", cards.len());

        let mut items = Vec::new();
        for (index, card) in cards.into_iter().enumerate() {
            if items.len() >= max_items {
                break;
            }

            let name = dom::first_text(card, NAME)
                .unwrap_or_else(|| format!("ZARA Product {}", index + 1));
            let name = dom::clamp_chars(name.trim(), 100);

            let current = dom::first_text(card, CURRENT_PRICE)
                .map(|t| price::parse_price(&t))
                .unwrap_or(0.0);
            let original = dom::first_text(card, ORIGINAL_PRICE).map(|t| price::parse_price(&t));

            let product_url = dom::link_url(card, base);

            let mut item = FashionItem::new(
                dom::external_id(card, &["data-productid"], &product_url),
                name.clone(),
                "ZARA",
            );
            item.price = current;
            item.set_original_price(original);
            item.image_url = dom::image_url(card, base);
            item.product_url = product_url;
            item.category = url_category.unwrap_or_else(|| self.matcher.infer_or_default(&name));
            item.tags = Self::name_tags(&name);
            self.weights.apply(&mut item);

            if let Some(filter) = category_filter {
                if item.category != filter {
                    continue;
                }
            }
            items.push(item);
        }

        items.sort_by(|a, b| {
            b.trend_score.partial_cmp(&a.trend_score).unwrap_or(std::cmp::Ordering::Equal)
        });
        items
    }
}

#[async_trait]
impl SourceAdapter for ZaraAdapter {
    fn name(&self) -> &'static str {
        "zara"
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

        // Consent dialog blocks scrolling when present.
        if page.click_first(CONSENT_BUTTONS).await? {
            debug!("Dismissed cookie consent on {}", url);
            tokio::time::sleep(Duration::from_millis(1000)).await;
        }

        let opts = SettleOptions {
            grid_selector: GRID,
            load_more_selectors: &[],
            max_rounds: SCROLL_ROUNDS,
            min_delay_ms: 1200,
            max_delay_ms: 1800,
        };
        dom::settle_listing(&mut page, &opts, max_items).await?;

        let html = page.html().await?;
        let url_category = CategoryMatcher::from_url(url);
        let items = self.extract_items(&html, &base, max_items, url_category, category_filter);

        info!("ZARA scrape of {} yielded {} items", url, items.len());
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::http_client::HttpClientConfig;
    use crate::scraping::browser::fixtures::FixtureBrowser;

    const FIXTURE: &str = r#"
        <div class="product-grid__product" data-productid="410998">
          <a class="product-link" href="/us/en/ribbed-knit-dress-p410998.html">x</a>
          <div class="product-grid-product-info__name">RIBBED KNIT DRESS</div>
          <span class="money-amount__main">$49.90</span>
          <img srcset="//static.example.com/410998.jpg 750w, //static.example.com/410998-2x.jpg 1500w">
        </div>
    "#;

    fn adapter() -> ZaraAdapter {
        let http = Arc::new(HttpClient::new(HttpClientConfig::default()).unwrap());
        let browser = Arc::new(FixtureBrowser {
            html: FIXTURE.to_string(),
        });
        ZaraAdapter::new(http, browser, TrendWeights::default())
    }

    #[tokio::test]
    async fn extracts_spa_grid_card() {
        let items = adapter()
            .scrape("https://www.zara.com/us/en/woman-best-sellers-l1314.html", 10, None)
            .await
            .unwrap();
        assert_eq!(items.len(), 1);
        let item = &items[0];
        assert_eq!(item.external_id, "410998");
        assert_eq!(item.brand, "ZARA");
        assert_eq!(item.category, FashionCategory::Dress);
        assert!((item.price - 49.90).abs() < f64::EPSILON);
        assert_eq!(item.image_url, "https://static.example.com/410998.jpg");
        assert!(item.tags.contains(&"knit".to_string()));
    }

    #[tokio::test]
    async fn url_category_overrides_name_guess() {
        let items = adapter()
            .scrape("https://www.zara.com/us/en/kids-girl-dresses-l6057.html", 10, None)
            .await
            .unwrap();
        assert_eq!(items[0].category, FashionCategory::Dress);
    }
}
