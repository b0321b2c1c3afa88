//! Lilly Pulitzer adapter.
//!
//! The storefront runs on Salesforce Commerce Cloud (Demandware): product
//! tiles instead of cards, a newsletter modal that covers the grid on
//! entry, and a "show more" button for pagination.

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

const GRID: &str = ".product-tile, .product, [data-product-tile], .product-grid-item";

const NAME: &[&str] = &[".product-tile__name", ".product-name", ".pdp-link a", ".link"];
const CURRENT_PRICE: &[&str] =
    &[".product-tile__price .sales .value", ".sales .value", ".product-tile__price", ".price .value"];
const ORIGINAL_PRICE: &[&str] = &[".strike-through .value", ".price .strike-through"];

const POPUP_CLOSE: &[&str] =
    &["button.modal-close", ".email-signup-modal .close", "[aria-label='Close dialog']"];
const SHOW_MORE: &[&str] = &[".show-more button", ".load-more", "[data-load-more]"];

const NAV_TIMEOUT: Duration = Duration::from_secs(30);
const NAV_RETRIES: u32 = 3;
const SCROLL_ROUNDS: u32 = 12;

pub struct LillyAdapter {
    http: Arc<HttpClient>,
    browser: Arc<dyn Browser>,
    weights: TrendWeights,
    matcher: CategoryMatcher,
}

impl LillyAdapter {
    pub fn new(http: Arc<HttpClient>, browser: Arc<dyn Browser>, weights: TrendWeights) -> Self {
        Self {
            http,
            browser,
            weights,
            matcher: CategoryMatcher::new(FashionCategory::Dress),
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
        let cards = dom::select_cards(&doc, &[GRID]);
        debug!("Lilly Pulitzer grid holds {} tiles", cards.len());

        let mut items = Vec::new();
        for card in cards {
            if items.len() >= max_items {
                break;
            }

            let Some(name) = dom::first_text(card, NAME) else {
                continue;
            };
            let name = dom::clamp_chars(name.trim(), 100);

            let current = dom::first_text(card, CURRENT_PRICE)
                .map(|t| price::parse_price(&t))
                .unwrap_or(0.0);
            let original = dom::first_text(card, ORIGINAL_PRICE).map(|t| price::parse_price(&t));

            let product_url = dom::link_url(card, base);

            let mut item = FashionItem::new(
                dom::external_id(card, &["data-pid", "data-product-id"], &product_url),
                name.clone(),
                "Lilly Pulitzer",
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
impl SourceAdapter for LillyAdapter {
    fn name(&self) -> &'static str {
        "lillypulitzer"
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

        // The signup modal swallows the first interaction when present.
        if page.click_first(POPUP_CLOSE).await? {
            debug!("Closed entry popup on {}", url);
            tokio::time::sleep(Duration::from_millis(800)).await;
        }

        let opts = SettleOptions {
            grid_selector: GRID,
            load_more_selectors: SHOW_MORE,
            max_rounds: SCROLL_ROUNDS,
            min_delay_ms: 1000,
            max_delay_ms: 1600,
        };
        dom::settle_listing(&mut page, &opts, max_items).await?;

        let html = page.html().await?;
        let url_category = CategoryMatcher::from_url(url);
        let items = self.extract_items(&html, &base, max_items, url_category, category_filter);

        info!("Lilly Pulitzer scrape of {} yielded {} items", url, items.len());
        Ok(items)
    }
}
