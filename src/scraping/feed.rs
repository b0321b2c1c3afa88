//! Feed-based adapter for Shopify storefronts.
//!
//! Every Shopify store exposes `/collections/{handle}/products.json`; one
//! adapter therefore covers the whole family of boutique storefronts, with
//! a small per-domain table for naming and category quirks.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde::Deserialize;
use tracing::{debug, info, warn};
use url::Url;

use crate::domain::item::{FashionCategory, FashionItem};
use crate::extraction::category::CategoryMatcher;
use crate::extraction::trend::TrendWeights;
use crate::extraction::{keywords, price};
use crate::infrastructure::http_client::HttpClient;
use crate::scraping::adapter::{ScrapeError, SourceAdapter};

/// Page size requested from the feed; Shopify caps at 250.
const FEED_PAGE_LIMIT: usize = 250;
/// Safety ceiling against malformed feeds that paginate forever.
const MAX_FEED_PAGES: u32 = 20;

/// Per-store configuration for known boutiques.
#[derive(Debug, Clone)]
struct StoreConfig {
    display_name: &'static str,
    default_collection: &'static str,
    /// Some stores only answer on their www host.
    base_url: Option<&'static str>,
    default_category: FashionCategory,
}

static STORE_CONFIGS: Lazy<HashMap<&'static str, StoreConfig>> = Lazy::new(|| {
    let mut m = HashMap::new();
    let kids = FashionCategory::Dress;
    m.insert("classicwhimsy.com", StoreConfig {
        display_name: "Classic Whimsy",
        default_collection: "all",
        base_url: None,
        default_category: kids,
    });
    m.insert("shrimpandgritskids.com", StoreConfig {
        display_name: "Shrimp and Grits Kids",
        default_collection: "all",
        base_url: None,
        default_category: kids,
    });
    m.insert("jamiekay.com", StoreConfig {
        display_name: "Jamie Kay",
        default_collection: "all",
        base_url: None,
        default_category: kids,
    });
    m.insert("gigiandmax.com", StoreConfig {
        display_name: "Gigi and Max",
        default_collection: "all",
        base_url: Some("https://www.gigiandmax.com"),
        default_category: kids,
    });
    m.insert("stitchyfish.com", StoreConfig {
        display_name: "Stitchy Fish",
        default_collection: "all",
        base_url: None,
        default_category: kids,
    });
    m.insert("littlebearsmocks.com", StoreConfig {
        display_name: "Little Bear Smocks",
        default_collection: "all",
        base_url: None,
        default_category: kids,
    });
    m.insert("zuccinikids.com", StoreConfig {
        display_name: "Zuccini Kids",
        default_collection: "all",
        base_url: None,
        default_category: kids,
    });
    m.insert("marienicoleclothing.com", StoreConfig {
        display_name: "Marie Nicole Clothing",
        default_collection: "all",
        base_url: None,
        default_category: kids,
    });
    m.insert("morninglavender.com", StoreConfig {
        display_name: "Morning Lavender",
        default_collection: "all",
        base_url: None,
        default_category: FashionCategory::Top,
    });
    m.insert("matildajaneclothing.com", StoreConfig {
        display_name: "Matilda Jane Clothing",
        default_collection: "all",
        base_url: None,
        default_category: kids,
    });
    m
});

// Raw feed records. Prices arrive as strings; tags as an array.

#[derive(Debug, Deserialize)]
struct FeedPage {
    #[serde(default)]
    products: Vec<FeedProduct>,
}

#[derive(Debug, Deserialize)]
struct FeedProduct {
    id: u64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    handle: String,
    #[serde(default)]
    vendor: String,
    #[serde(default)]
    product_type: String,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    variants: Vec<FeedVariant>,
    #[serde(default)]
    images: Vec<FeedImage>,
}

#[derive(Debug, Deserialize)]
struct FeedVariant {
    #[serde(default)]
    price: Option<String>,
    #[serde(default)]
    compare_at_price: Option<String>,
    #[serde(default)]
    option1: Option<String>,
    #[serde(default)]
    inventory_quantity: Option<i64>,
    #[serde(default)]
    available: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct FeedImage {
    #[serde(default)]
    src: String,
}

/// Inventory-depletion signal derived from variant stock levels; low stock
/// on an actively managed product reads as demand.
#[derive(Debug, Clone, Copy)]
struct InventoryStatus {
    is_low_stock: bool,
    is_sold_out: bool,
}

pub struct ShopifyAdapter {
    http: Arc<HttpClient>,
    weights: TrendWeights,
}

impl ShopifyAdapter {
    pub fn new(http: Arc<HttpClient>, weights: TrendWeights) -> Self {
        Self { http, weights }
    }

    fn domain_of(url: &Url) -> String {
        let host = url.host_str().unwrap_or_default().to_lowercase();
        host.strip_prefix("www.").unwrap_or(host.as_str()).to_string()
    }

    fn store_config(domain: &str) -> StoreConfig {
        STORE_CONFIGS.get(domain).cloned().unwrap_or(StoreConfig {
            display_name: "",
            default_collection: "all",
            base_url: None,
            default_category: FashionCategory::Top,
        })
    }

    fn base_url(url: &Url, config: &StoreConfig) -> String {
        if let Some(base) = config.base_url {
            return base.to_string();
        }
        let host = url.host_str().unwrap_or_default();
        match url.port() {
            Some(port) => format!("{}://{host}:{port}", url.scheme()),
            None => format!("{}://{host}", url.scheme()),
        }
    }

    /// Collection handle from a `/collections/{handle}` path, if any.
    fn collection_of(url: &Url) -> Option<String> {
        let mut segments = url.path_segments()?;
        while let Some(segment) = segments.next() {
            if segment == "collections" {
                return segments.next().map(|s| s.to_string());
            }
        }
        None
    }

    fn map_category(product: &FeedProduct, matcher: &CategoryMatcher) -> FashionCategory {
        let product_type = product.product_type.to_lowercase();
        if let Some(category) = CategoryMatcher::infer(&product_type) {
            return category;
        }
        let tag_text = product.tags.join(" ");
        if let Some(category) = CategoryMatcher::infer(&tag_text) {
            return category;
        }
        matcher.infer_or_default(&product.title)
    }

    fn extract_colors(product: &FeedProduct) -> Vec<String> {
        let mut colors: Vec<String> = product
            .tags
            .iter()
            .filter_map(|tag| keywords::color_from_tag(tag))
            .collect();

        for variant in product.variants.iter().take(5) {
            if colors.len() >= keywords::MAX_COLORS {
                break;
            }
            if let Some(option) = &variant.option1 {
                if keywords::looks_like_color(option) && !colors.contains(option) {
                    colors.push(option.clone());
                }
            }
        }

        colors.truncate(keywords::MAX_COLORS);
        colors
    }

    fn variant_price(product: &FeedProduct) -> f64 {
        product
            .variants
            .iter()
            .filter_map(|v| v.price.as_deref())
            .map(price::parse_price)
            .find(|p| *p > 0.0)
            .unwrap_or(0.0)
    }

    fn compare_at_price(product: &FeedProduct) -> Option<f64> {
        product
            .variants
            .iter()
            .filter_map(|v| v.compare_at_price.as_deref())
            .map(price::parse_price)
            .find(|p| *p > 0.0)
    }

    fn inventory_status(product: &FeedProduct) -> InventoryStatus {
        let mut total_inventory = 0i64;
        let mut available = 0usize;
        for variant in &product.variants {
            match variant.inventory_quantity {
                Some(qty) if qty > 0 => {
                    total_inventory += qty;
                    available += 1;
                }
                _ => {
                    if variant.available.unwrap_or(true) {
                        available += 1;
                    }
                }
            }
        }
        InventoryStatus {
            is_low_stock: total_inventory > 0 && total_inventory < 10,
            is_sold_out: available == 0,
        }
    }

    /// Popularity estimate (0-100) from the signals a feed actually has:
    /// stock depletion and merchandising tags. Feeds carry no reviews or
    /// sales counts.
    fn popularity_score(product: &FeedProduct, inventory: InventoryStatus) -> f64 {
        let mut score: f64 = 50.0;
        if inventory.is_low_stock {
            score += 20.0;
        }
        if inventory.is_sold_out {
            score -= 10.0;
        }
        let popularity_tags =
            ["bestseller", "best-seller", "popular", "trending", "hot", "new-arrival", "featured"];
        if product
            .tags
            .iter()
            .any(|tag| popularity_tags.iter().any(|p| tag.to_lowercase().contains(p)))
        {
            score += 15.0;
        }
        score.clamp(0.0, 100.0)
    }

    fn to_item(
        &self,
        product: &FeedProduct,
        base_url: &str,
        config: &StoreConfig,
        matcher: &CategoryMatcher,
    ) -> FashionItem {
        let current_price = Self::variant_price(product);
        let inventory = Self::inventory_status(product);

        let brand = if product.vendor.is_empty() {
            config.display_name.to_string()
        } else {
            product.vendor.clone()
        };

        let mut item = FashionItem::new(product.id.to_string(), product.title.clone(), brand);
        item.price = current_price;
        item.set_original_price(Self::compare_at_price(product));
        item.category = Self::map_category(product, matcher);
        item.colors = Self::extract_colors(product);
        item.tags = keywords::clean_source_tags(&product.tags);
        item.image_url = product.images.first().map(|i| i.src.clone()).unwrap_or_default();
        item.product_url = format!("{base_url}/products/{}", product.handle);
        // The storefront feed exposes no review/rating/sales counters; the
        // weighted formula would sit at zero, so the inventory-derived
        // estimate stands in for it.
        self.weights.apply(&mut item);
        if item.trend_score == 0.0 {
            item.trend_score = Self::popularity_score(product, inventory);
            item.trend_level = crate::domain::item::TrendLevel::from_score(item.trend_score);
        }
        item
    }
}

#[async_trait]
impl SourceAdapter for ShopifyAdapter {
    fn name(&self) -> &'static str {
        "shopify"
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
        let parsed = Url::parse(url).map_err(|_| ScrapeError::InvalidUrl(url.to_string()))?;
        let domain = Self::domain_of(&parsed);
        let config = Self::store_config(&domain);
        let matcher = CategoryMatcher::new(config.default_category);
        let base_url = Self::base_url(&parsed, &config);

        let collection = Self::collection_of(&parsed)
            .unwrap_or_else(|| config.default_collection.to_string());
        let api_url = format!("{base_url}/collections/{collection}/products.json");

        info!("Fetching Shopify feed: {}", api_url);

        let mut items: Vec<FashionItem> = Vec::new();
        let mut page: u32 = 1;

        while items.len() < max_items {
            let remaining = max_items - items.len();
            let params = [
                ("limit", FEED_PAGE_LIMIT.min(remaining).to_string()),
                ("page", page.to_string()),
            ];

            let feed: FeedPage = match self.http.get_json(&api_url, &params).await {
                Ok(feed) => feed,
                Err(e) => {
                    // The first page failing is a real fetch failure; later
                    // pages degrade to "stop paginating".
                    if page == 1 {
                        return Err(ScrapeError::Fetch {
                            url: api_url,
                            reason: e.to_string(),
                        });
                    }
                    warn!("Feed page {} failed, stopping pagination: {}", page, e);
                    break;
                }
            };

            if feed.products.is_empty() {
                debug!("Feed page {} empty, pagination complete", page);
                break;
            }

            for product in &feed.products {
                if items.len() >= max_items {
                    break;
                }
                if product.title.is_empty() || product.handle.is_empty() {
                    continue;
                }
                let item = self.to_item(product, &base_url, &config, &matcher);
                if let Some(filter) = category_filter {
                    if item.category != filter {
                        continue;
                    }
                }
                items.push(item);
            }

            page += 1;
            if page > MAX_FEED_PAGES {
                warn!("Feed pagination ceiling reached for {}", api_url);
                break;
            }
        }

        info!(
            "Shopify feed yielded {} items from {}",
            items.len(),
            if config.display_name.is_empty() { domain.as_str() } else { config.display_name }
        );
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(title: &str, tags: &[&str], price: &str, compare_at: Option<&str>) -> FeedProduct {
        FeedProduct {
            id: 42,
            title: title.to_string(),
            handle: "test-product".to_string(),
            vendor: "Test Vendor".to_string(),
            product_type: String::new(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            variants: vec![FeedVariant {
                price: Some(price.to_string()),
                compare_at_price: compare_at.map(|s| s.to_string()),
                option1: Some("Navy".to_string()),
                inventory_quantity: Some(3),
                available: Some(true),
            }],
            images: vec![FeedImage {
                src: "https://cdn.example.com/p.jpg".to_string(),
            }],
        }
    }

    fn adapter() -> ShopifyAdapter {
        let http = Arc::new(
            HttpClient::new(crate::infrastructure::http_client::HttpClientConfig::default())
                .unwrap(),
        );
        ShopifyAdapter::new(http, TrendWeights::default())
    }

    #[test]
    fn compare_at_below_price_is_dropped() {
        let adapter = adapter();
        let config = ShopifyAdapter::store_config("unknown.example");
        let matcher = CategoryMatcher::new(config.default_category);
        let p = product("Smocked Dress", &[], "20.00", Some("15.00"));
        let item = adapter.to_item(&p, "https://shop.example.com", &config, &matcher);
        assert_eq!(item.original_price, None);

        let p = product("Smocked Dress", &[], "20.00", Some("32.00"));
        let item = adapter.to_item(&p, "https://shop.example.com", &config, &matcher);
        assert_eq!(item.original_price, Some(32.0));
    }

    #[test]
    fn colors_come_from_tags_then_variant_options() {
        let adapter = adapter();
        let config = ShopifyAdapter::store_config("classicwhimsy.com");
        let matcher = CategoryMatcher::new(config.default_category);
        let p = product("Bubble Romper", &["color_pink", "heirloom"], "48.00", None);
        let item = adapter.to_item(&p, "https://classicwhimsy.com", &config, &matcher);
        assert!(item.colors.contains(&"Pink".to_string()));
        assert!(item.colors.contains(&"Navy".to_string()));
    }

    #[test]
    fn kids_store_defaults_to_dress() {
        let adapter = adapter();
        let config = ShopifyAdapter::store_config("classicwhimsy.com");
        let matcher = CategoryMatcher::new(config.default_category);
        let p = product("Mystery Box", &[], "25.00", None);
        let item = adapter.to_item(&p, "https://classicwhimsy.com", &config, &matcher);
        assert_eq!(item.category, FashionCategory::Dress);
    }

    #[test]
    fn low_stock_lifts_popularity() {
        let p = product("Bubble Romper", &["best-seller"], "48.00", None);
        let inventory = ShopifyAdapter::inventory_status(&p);
        assert!(inventory.is_low_stock);
        let score = ShopifyAdapter::popularity_score(&p, inventory);
        assert!((score - 85.0).abs() < f64::EPSILON);
    }

    #[test]
    fn collection_handle_extraction() {
        let url = Url::parse("https://classicwhimsy.com/collections/best-sellers?page=2").unwrap();
        assert_eq!(
            ShopifyAdapter::collection_of(&url),
            Some("best-sellers".to_string())
        );
        let bare = Url::parse("https://classicwhimsy.com/").unwrap();
        assert_eq!(ShopifyAdapter::collection_of(&bare), None);
    }
}
