//! Synthetic adapter used in demo mode and anywhere no network capability
//! exists. It conforms to the exact same contract as the real adapters —
//! same field population rules, same trend formula — so downstream code
//! cannot structurally tell its output apart from a live scrape.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use url::Url;

use crate::domain::item::{FashionCategory, FashionItem};
use crate::extraction::trend::TrendWeights;
use crate::infrastructure::http_client::HttpClient;
use crate::scraping::adapter::{ScrapeError, SourceAdapter};

struct SampleSeed {
    name: &'static str,
    category: FashionCategory,
    price: f64,
    colors: &'static [&'static str],
    tags: &'static [&'static str],
}

const SAMPLE_CATALOG: &[SampleSeed] = &[
    SampleSeed { name: "Floral Maxi Dress", category: FashionCategory::Dress, price: 89.99, colors: &["Coral", "Navy"], tags: &["summer", "boho", "floral"] },
    SampleSeed { name: "Satin Slip Dress", category: FashionCategory::Dress, price: 129.99, colors: &["Champagne", "Black"], tags: &["elegant", "evening", "minimalist"] },
    SampleSeed { name: "Knit Midi Dress", category: FashionCategory::Dress, price: 79.99, colors: &["Camel", "Olive"], tags: &["casual", "fall", "cozy"] },
    SampleSeed { name: "Sequin Mini Dress", category: FashionCategory::Dress, price: 149.99, colors: &["Silver", "Gold"], tags: &["party", "sparkle"] },
    SampleSeed { name: "Linen Wrap Dress", category: FashionCategory::Dress, price: 99.99, colors: &["White", "Sage"], tags: &["summer", "natural", "classic"] },
    SampleSeed { name: "Oversized Blazer Top", category: FashionCategory::Top, price: 119.99, colors: &["Black", "Beige"], tags: &["professional", "trending"] },
    SampleSeed { name: "Cropped Cardigan", category: FashionCategory::Top, price: 59.99, colors: &["Pink", "Lavender", "Cream"], tags: &["y2k", "layering"] },
    SampleSeed { name: "Silk Button-Up", category: FashionCategory::Top, price: 139.99, colors: &["Ivory", "Navy"], tags: &["luxe", "classic", "versatile"] },
    SampleSeed { name: "Graphic Print Tee", category: FashionCategory::Top, price: 34.99, colors: &["White", "Black"], tags: &["streetwear", "casual", "vintage"] },
    SampleSeed { name: "Cable Knit Sweater", category: FashionCategory::Top, price: 89.99, colors: &["Cream", "Forest"], tags: &["cozy", "fall", "classic"] },
    SampleSeed { name: "Wide Leg Trousers", category: FashionCategory::Pants, price: 79.99, colors: &["Black", "Tan", "Grey"], tags: &["office", "chic"] },
    SampleSeed { name: "High-Rise Mom Jeans", category: FashionCategory::Pants, price: 69.99, colors: &["Light Wash", "Dark Wash"], tags: &["denim", "vintage", "everyday"] },
    SampleSeed { name: "Pleated Palazzo Pants", category: FashionCategory::Pants, price: 89.99, colors: &["Olive", "Cream"], tags: &["flowy", "elegant", "summer"] },
    SampleSeed { name: "Pleated Midi Skirt", category: FashionCategory::Skirt, price: 69.99, colors: &["Navy", "Burgundy"], tags: &["classic", "feminine", "office"] },
    SampleSeed { name: "Denim Mini Skirt", category: FashionCategory::Skirt, price: 49.99, colors: &["Blue", "White"], tags: &["casual", "y2k", "summer"] },
    SampleSeed { name: "Cropped Leather Jacket", category: FashionCategory::Jacket, price: 249.99, colors: &["Black", "Brown"], tags: &["edgy", "classic", "investment"] },
    SampleSeed { name: "Quilted Bomber", category: FashionCategory::Jacket, price: 129.99, colors: &["Olive", "Black", "Cream"], tags: &["sporty", "warm"] },
    SampleSeed { name: "Wool Blend Overcoat", category: FashionCategory::Coat, price: 299.99, colors: &["Camel", "Black", "Grey"], tags: &["classic", "winter", "investment"] },
    SampleSeed { name: "Faux Fur Teddy Coat", category: FashionCategory::Coat, price: 179.99, colors: &["Cream", "Brown"], tags: &["cozy", "statement", "winter"] },
    SampleSeed { name: "High-Waist Leggings", category: FashionCategory::Activewear, price: 79.99, colors: &["Black", "Navy", "Burgundy"], tags: &["workout", "athleisure"] },
    SampleSeed { name: "Sports Bra Set", category: FashionCategory::Activewear, price: 59.99, colors: &["Black", "White", "Rose"], tags: &["gym", "matching", "support"] },
    SampleSeed { name: "Structured Tote Bag", category: FashionCategory::Accessories, price: 189.99, colors: &["Black", "Tan", "Cream"], tags: &["work", "everyday", "classic"] },
    SampleSeed { name: "Chain Link Belt", category: FashionCategory::Accessories, price: 49.99, colors: &["Gold", "Silver"], tags: &["statement", "90s", "versatile"] },
    SampleSeed { name: "Ruffle One-Piece Swimsuit", category: FashionCategory::Swimwear, price: 74.99, colors: &["Coral", "Navy"], tags: &["beach", "summer"] },
    SampleSeed { name: "Leather Ankle Boots", category: FashionCategory::Shoes, price: 159.99, colors: &["Black", "Brown"], tags: &["fall", "classic"] },
];

const PLACEHOLDER_IMAGES: &[&str] = &[
    "https://images.unsplash.com/photo-1539109136881-3be0616acf4b?w=400",
    "https://images.unsplash.com/photo-1558618666-fcd25c85cd64?w=400",
    "https://images.unsplash.com/photo-1434389677669-e08b4cac3105?w=400",
    "https://images.unsplash.com/photo-1490481651871-ab68de25d43d?w=400",
    "https://images.unsplash.com/photo-1445205170230-053b83016050?w=400",
    "https://images.unsplash.com/photo-1558171813-4c088753af8f?w=400",
];

/// Brand names recognized in target URLs.
const KNOWN_BRANDS: &[(&str, &str)] = &[
    ("shein", "SHEIN"),
    ("zara", "Zara"),
    ("hm.", "H&M"),
    ("asos", "ASOS"),
    ("forever21", "Forever 21"),
    ("uniqlo", "UNIQLO"),
    ("mango", "Mango"),
    ("nordstrom", "Nordstrom"),
    ("revolve", "Revolve"),
];

pub struct SampleAdapter {
    http: Arc<HttpClient>,
    weights: TrendWeights,
}

impl SampleAdapter {
    pub fn new(http: Arc<HttpClient>, weights: TrendWeights) -> Self {
        Self { http, weights }
    }

    fn brand_from_url(url: &str) -> String {
        let lowered = url.to_lowercase();
        for (needle, brand) in KNOWN_BRANDS {
            if lowered.contains(needle) {
                return (*brand).to_string();
            }
        }
        Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_string()))
            .map(|host| {
                let stripped = host.strip_prefix("www.").unwrap_or(&host).to_string();
                let name = stripped.split('.').next().unwrap_or("sample").to_string();
                let mut chars = name.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                    None => "Sample".to_string(),
                }
            })
            .unwrap_or_else(|| "Sample".to_string())
    }
}

#[async_trait]
impl SourceAdapter for SampleAdapter {
    fn name(&self) -> &'static str {
        "sample"
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
        let brand = Self::brand_from_url(url);
        let mut items = Vec::new();

        for (index, seed) in SAMPLE_CATALOG
            .iter()
            .filter(|seed| category_filter.is_none_or(|f| seed.category == f))
            .take(max_items)
            .enumerate()
        {
            let reviews = fastrand::u32(50..2000);
            let rating = 3.5 + f64::from(fastrand::u32(0..=15)) / 10.0;
            let sales = fastrand::u32(100..10_000);

            let mut item = FashionItem::new(
                format!("sample-{:03}", index + 1),
                seed.name,
                brand.clone(),
            );
            item.price = seed.price;
            let marked_down = fastrand::bool();
            item.set_original_price(
                marked_down.then(|| seed.price * (1.1 + f64::from(fastrand::u32(0..=40)) / 100.0)),
            );
            item.category = seed.category;
            item.colors = seed.colors.iter().map(|c| (*c).to_string()).collect();
            item.tags = seed.tags.iter().map(|t| (*t).to_string()).collect();
            item.image_url =
                PLACEHOLDER_IMAGES[index % PLACEHOLDER_IMAGES.len()].to_string();
            item.product_url = format!("{}/product/{}", url.trim_end_matches('/'), index + 1);
            item.reviews_count = reviews;
            item.rating = (rating * 10.0).round() / 10.0;
            item.sales_count = sales;
            item.scraped_at = Utc::now() - ChronoDuration::minutes(i64::from(fastrand::u32(0..60)));
            self.weights.apply(&mut item);
            items.push(item);
        }

        items.sort_by(|a, b| {
            b.trend_score.partial_cmp(&a.trend_score).unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::item::TrendLevel;
    use crate::infrastructure::http_client::HttpClientConfig;

    fn adapter() -> SampleAdapter {
        let http = Arc::new(HttpClient::new(HttpClientConfig::default()).unwrap());
        SampleAdapter::new(http, TrendWeights::default())
    }

    #[tokio::test]
    async fn respects_max_items_and_contract() {
        let items = adapter()
            .scrape("https://www.shein.com/trends", 10, None)
            .await
            .unwrap();
        assert_eq!(items.len(), 10);
        for item in &items {
            assert!(!item.name.is_empty());
            assert!(!item.product_url.is_empty());
            assert!((0.0..=100.0).contains(&item.trend_score));
            assert!(item.colors.len() <= 5);
            assert!(item.tags.len() <= 10);
            if let Some(original) = item.original_price {
                assert!(original > item.price);
            }
            // Level always derives from the score thresholds.
            assert_eq!(item.trend_level, TrendLevel::from_score(item.trend_score));
        }
        assert_eq!(items[0].brand, "SHEIN");
    }

    #[tokio::test]
    async fn category_filter_limits_output() {
        let items = adapter()
            .scrape("https://example.com", 50, Some(FashionCategory::Dress))
            .await
            .unwrap();
        assert!(!items.is_empty());
        assert!(items.iter().all(|i| i.category == FashionCategory::Dress));
    }
}
