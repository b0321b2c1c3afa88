//! H&M adapter.
//!
//! H&M paginates with an explicit "load more" control on top of lazy
//! loading, so the settle loop clicks as well as scrolls.

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

const GRID: &str =
    "[data-testid='product-grid-item'], .product-item, article.hm-product-item, li.product-item";

const NAME: &[&str] =
    &["[data-testid='product-title']", ".item-heading a", ".product-item-headline"];
const CURRENT_PRICE: &[&str] = &["[data-testid='product-price']", ".price-value", ".item-price span"];
const ORIGINAL_PRICE: &[&str] = &["[data-testid='product-price-original']", ".price-regular"];

const CONSENT_BUTTONS: &[&str] =
    &["#onetrust-accept-btn-handler", "button[id*='accept']", "[data-testid='cookie-accept']"];
const LOAD_MORE: &[&str] = &["button[data-testid='load-more']", ".load-more-button"];

const NAV_TIMEOUT: Duration = Duration::from_secs(30);
const NAV_RETRIES: u32 = 3;
const SCROLL_ROUNDS: u32 = 10;

pub struct HmAdapter {
    http: Arc<HttpClient>,
    browser: Arc<dyn Browser>,
    weights: TrendWeights,
    matcher: CategoryMatcher,
}

impl HmAdapter {
    pub fn new(http: Arc<HttpClient>, browser: Arc<dyn Browser>, weights: TrendWeights) -> Self {
        Self {
            http,
            browser,
            weights,
            matcher: CategoryMatcher::new(FashionCategory::Top),
        }
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
            cards = dom::select_cards(&doc, &["article[class*='product']", "li[class*='product']"]);
        }
        debug!("H&M grid holds {} cards", cards.len());

        let mut items = Vec::new();
        for (index, card) in cards.into_iter().enumerate() {
            if items.len() >= max_items {
                break;
            }

            let name = dom::first_text(card, NAME)
                .unwrap_or_else(|| format!("H&M Product {}", index + 1));
            let name = dom::clamp_chars(name.trim(), 100);

            let current = dom::first_text(card, CURRENT_PRICE)
                .map(|t| price::parse_price(&t))
                .unwrap_or(0.0);
            let original = dom::first_text(card, ORIGINAL_PRICE).map(|t| price::parse_price(&t));

            let product_url = dom::link_url(card, base);

            let mut item = FashionItem::new(
                dom::external_id(card, &["data-articlecode"], &product_url),
                name.clone(),
                "H&M",
            );
            item.price = current;
            item.set_original_price(original);
            item.image_url = dom::image_url(card, base);
            item.product_url = product_url;
            item.category = url_category.unwrap_or_else(|| self.matcher.infer_or_default(&name));
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
impl SourceAdapter for HmAdapter {
    fn name(&self) -> &'static str {
        "hm"
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

        if page.click_first(CONSENT_BUTTONS).await? {
            debug!("Dismissed cookie consent on {}", url);
            tokio::time::sleep(Duration::from_millis(1000)).await;
        }

        let opts = SettleOptions {
            grid_selector: GRID,
            load_more_selectors: LOAD_MORE,
            max_rounds: SCROLL_ROUNDS,
            min_delay_ms: 900,
            max_delay_ms: 1500,
        };
        dom::settle_listing(&mut page, &opts, max_items).await?;

        let html = page.html().await?;
        let url_category = CategoryMatcher::from_url(url);
        let items = self.extract_items(&html, &base, max_items, url_category, category_filter);

        info!("H&M scrape of {} yielded {} items", url, items.len());
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::http_client::HttpClientConfig;
    use crate::scraping::browser::fixtures::FixtureBrowser;

    const FIXTURE: &str = r#"
        <li class="product-item" data-articlecode="1216759001">
          <a class="item-link" href="/en_us/productpage.1216759001.html">
            <h3 class="item-heading"><a>Oversized Cotton Shirt</a></h3>
          </a>
          <span class="price-value">$24.99</span>
          <span class="price-regular">$34.99</span>
          <img class="product-item-image" src="https://image.example.com/1216759001.jpg">
        </li>
    "#;

    fn adapter() -> HmAdapter {
        let http = Arc::new(HttpClient::new(HttpClientConfig::default()).unwrap());
        let browser = Arc::new(FixtureBrowser {
            html: FIXTURE.to_string(),
        });
        HmAdapter::new(http, browser, TrendWeights::default())
    }

    #[tokio::test]
    async fn extracts_card_with_markdown() {
        let items = adapter()
            .scrape("https://www2.hm.com/en_us/women/products/shirts-blouses.html", 10, None)
            .await
            .unwrap();
        assert_eq!(items.len(), 1);
        let item = &items[0];
        assert_eq!(item.external_id, "1216759001");
        assert!((item.price - 24.99).abs() < f64::EPSILON);
        assert_eq!(item.original_price, Some(34.99));
        assert!(item.tags.contains(&"oversized".to_string()));
    }
}
