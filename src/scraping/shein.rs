//! SHEIN adapter.
//!
//! SHEIN renders its grid client-side and is the one source family that
//! exposes sales volume on listing cards, which makes it the main feeder
//! for the sales term of the trend formula.

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

/// Grid cards; comma-joined so one count covers every known layout.
const GRID: &str = ".S-product-item, .product-list-item, [data-sku], .goods-list-item, .product-card";

const NAME: &[&str] = &[".S-product-item__name", ".product-item-name", ".goods-title-link"];
const CURRENT_PRICE: &[&str] = &[".S-product-item__price", ".product-item-price", ".normal-price"];
const ORIGINAL_PRICE: &[&str] =
    &[".S-product-item__price-del", ".product-item-price-del", ".del-price"];
const REVIEWS: &[&str] = &[".S-product-item__review", ".review-count"];
const RATING: &[&str] = &[".S-product-item__star", ".star-icon-container", ".rating-stars"];
const SOLD: &[&str] = &[".S-product-item__sold", ".sold-num"];

const NAV_TIMEOUT: Duration = Duration::from_secs(30);
const NAV_RETRIES: u32 = 3;
const SCROLL_ROUNDS: u32 = 10;

pub struct SheinAdapter {
    http: Arc<HttpClient>,
    browser: Arc<dyn Browser>,
    weights: TrendWeights,
    matcher: CategoryMatcher,
}

impl SheinAdapter {
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
        let cards = dom::select_cards(&doc, &[GRID]);
        debug!("SHEIN grid holds {} cards", cards.len());

        let mut items = Vec::new();
        for (index, card) in cards.into_iter().enumerate() {
            if items.len() >= max_items {
                break;
            }

            let name = dom::first_text(card, NAME)
                .unwrap_or_else(|| format!("SHEIN Product {}", index + 1));
            let name = dom::clamp_chars(name.trim(), 100);

            let current = dom::first_text(card, CURRENT_PRICE)
                .map(|t| price::parse_price(&t))
                .unwrap_or(0.0);
            let original = dom::first_text(card, ORIGINAL_PRICE).map(|t| price::parse_price(&t));

            let product_url = dom::link_url(card, base);

            let rating = dom::first_attr(card, RATING, "style")
                .or_else(|| dom::first_text(card, RATING))
                .map(|t| price::parse_rating(&t))
                .unwrap_or(0.0);
            let reviews = dom::first_text(card, REVIEWS)
                .map(|t| price::parse_count(&t))
                .unwrap_or(0);
            let sales = dom::first_text(card, SOLD)
                .map(|t| price::parse_count(&t))
                .unwrap_or(0);

            let mut item = FashionItem::new(
                dom::external_id(card, &["data-sku"], &product_url),
                name.clone(),
                "SHEIN",
            );
            item.price = current;
            item.set_original_price(original);
            item.image_url = dom::image_url(card, base);
            item.product_url = product_url;
            item.category = url_category.unwrap_or_else(|| self.matcher.infer_or_default(&name));
            item.tags = keywords::extract_tags(&name);
            item.rating = rating;
            item.reviews_count = reviews;
            item.sales_count = sales;
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
impl SourceAdapter for SheinAdapter {
    fn name(&self) -> &'static str {
        "shein"
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

        // The grid may take a moment to hydrate; absence is not fatal, the
        // settle loop below will keep probing.
        let grid_ready = page
            .wait_for_any(&[".S-product-item", ".product-list-item", "[data-sku]"], Duration::from_secs(10))
            .await?;
        if !grid_ready {
            debug!("Product grid not found up front on {}, proceeding anyway", url);
        }

        let opts = SettleOptions {
            grid_selector: GRID,
            load_more_selectors: &[],
            max_rounds: SCROLL_ROUNDS,
            min_delay_ms: 800,
            max_delay_ms: 1400,
        };
        dom::settle_listing(&mut page, &opts, max_items).await?;

        let html = page.html().await?;
        let url_category = CategoryMatcher::from_url(url);
        let items = self.extract_items(&html, &base, max_items, url_category, category_filter);

        info!("SHEIN scrape of {} yielded {} items", url, items.len());
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::http_client::HttpClientConfig;
    use crate::scraping::browser::fixtures::FixtureBrowser;

    const FIXTURE: &str = r#"
        <div class="S-product-item" data-sku="sw2301">
          <a class="goods-title-link" href="/p/sw2301.html">x</a>
          <span class="S-product-item__name">Floral Maxi Dress</span>
          <span class="S-product-item__price">$23.49</span>
          <span class="S-product-item__price-del">$39.00</span>
          <div class="S-product-item__star" style="width: 90%"></div>
          <span class="S-product-item__review">1.2k</span>
          <span class="S-product-item__sold">3,400 sold</span>
          <img data-src="//img.example.com/sw2301.jpg">
        </div>
        <div class="S-product-item" data-sku="sw2302">
          <span class="S-product-item__name">Ribbed Knit Top</span>
          <span class="S-product-item__price">Sold Out</span>
        </div>
    "#;

    fn adapter() -> SheinAdapter {
        let http = Arc::new(HttpClient::new(HttpClientConfig::default()).unwrap());
        let browser = Arc::new(FixtureBrowser {
            html: FIXTURE.to_string(),
        });
        SheinAdapter::new(http, browser, TrendWeights::default())
    }

    #[tokio::test]
    async fn extracts_cards_with_sales_signals() {
        let items = adapter()
            .scrape("https://us.shein.com/bestsellers.html", 10, None)
            .await
            .unwrap();
        assert_eq!(items.len(), 2);

        // Sorted by trend score, so the reviewed dress comes first.
        let dress = &items[0];
        assert_eq!(dress.external_id, "sw2301");
        assert_eq!(dress.category, FashionCategory::Dress);
        assert!((dress.price - 23.49).abs() < f64::EPSILON);
        assert_eq!(dress.original_price, Some(39.0));
        assert_eq!(dress.reviews_count, 1200);
        assert_eq!(dress.sales_count, 3400);
        assert!((dress.rating - 4.5).abs() < f64::EPSILON);
        assert_eq!(dress.image_url, "https://img.example.com/sw2301.jpg");
        assert!(dress.trend_score > items[1].trend_score);
    }

    #[tokio::test]
    async fn max_items_cap_is_respected() {
        let items = adapter()
            .scrape("https://us.shein.com/bestsellers.html", 1, None)
            .await
            .unwrap();
        assert_eq!(items.len(), 1);
    }

    #[tokio::test]
    async fn category_filter_drops_non_matching() {
        let items = adapter()
            .scrape(
                "https://us.shein.com/bestsellers.html",
                10,
                Some(FashionCategory::Dress),
            )
            .await
            .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "Floral Maxi Dress");
    }

    #[tokio::test]
    async fn unparseable_price_defaults_to_zero() {
        let items = adapter()
            .scrape("https://us.shein.com/all.html", 10, None)
            .await
            .unwrap();
        let top = items.iter().find(|i| i.name == "Ribbed Knit Top").unwrap();
        assert!((top.price - 0.0).abs() < f64::EPSILON);
        assert_eq!(top.original_price, None);
    }
}
