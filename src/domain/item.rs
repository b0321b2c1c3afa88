//! Normalized fashion item produced by every source adapter.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Closed set of catalog categories. Inference that matches nothing falls
/// back to an adapter-specific default, never to an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FashionCategory {
    Dress,
    Top,
    Pants,
    Skirt,
    Jacket,
    Coat,
    Shoes,
    Accessories,
    Swimwear,
    Activewear,
}

impl FashionCategory {
    /// Stable string form used in the database and in rollup keys.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dress => "dress",
            Self::Top => "top",
            Self::Pants => "pants",
            Self::Skirt => "skirt",
            Self::Jacket => "jacket",
            Self::Coat => "coat",
            Self::Shoes => "shoes",
            Self::Accessories => "accessories",
            Self::Swimwear => "swimwear",
            Self::Activewear => "activewear",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "dress" => Some(Self::Dress),
            "top" => Some(Self::Top),
            "pants" => Some(Self::Pants),
            "skirt" => Some(Self::Skirt),
            "jacket" => Some(Self::Jacket),
            "coat" => Some(Self::Coat),
            "shoes" => Some(Self::Shoes),
            "accessories" => Some(Self::Accessories),
            "swimwear" => Some(Self::Swimwear),
            "activewear" => Some(Self::Activewear),
            _ => None,
        }
    }
}

impl std::fmt::Display for FashionCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Popularity band derived from the adapter-level trend score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendLevel {
    Hot,
    Rising,
    Stable,
    Declining,
}

impl TrendLevel {
    pub fn from_score(score: f64) -> Self {
        if score >= 75.0 {
            Self::Hot
        } else if score >= 50.0 {
            Self::Rising
        } else if score >= 25.0 {
            Self::Stable
        } else {
            Self::Declining
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hot => "hot",
            Self::Rising => "rising",
            Self::Stable => "stable",
            Self::Declining => "declining",
        }
    }
}

/// Ranking movement classification kept per product in the trend store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RankTrend {
    New,
    Up,
    Down,
    Stable,
}

impl RankTrend {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Up => "up",
            Self::Down => "down",
            Self::Stable => "stable",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "new" => Some(Self::New),
            "up" => Some(Self::Up),
            "down" => Some(Self::Down),
            "stable" => Some(Self::Stable),
            _ => None,
        }
    }
}

/// A normalized product observation. Adapters produce these; only the
/// store assigns persistent ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FashionItem {
    /// Source-native id (or URL-derived when the site exposes none).
    /// Unique per source, not globally.
    pub external_id: String,
    pub name: String,
    pub brand: String,
    pub price: f64,
    /// Only set when strictly greater than `price` (markdown signal).
    pub original_price: Option<f64>,
    pub currency: String,
    pub category: FashionCategory,
    pub colors: Vec<String>,
    pub tags: Vec<String>,
    pub image_url: String,
    pub product_url: String,
    pub rating: f64,
    pub reviews_count: u32,
    pub sales_count: u32,
    pub trend_score: f64,
    pub trend_level: TrendLevel,
    pub scraped_at: DateTime<Utc>,
}

impl FashionItem {
    /// Minimal constructor with neutral signal defaults; adapters fill in
    /// whatever their source actually exposes.
    pub fn new(external_id: impl Into<String>, name: impl Into<String>, brand: impl Into<String>) -> Self {
        Self {
            external_id: external_id.into(),
            name: name.into(),
            brand: brand.into(),
            price: 0.0,
            original_price: None,
            currency: "USD".to_string(),
            category: FashionCategory::Top,
            colors: Vec::new(),
            tags: Vec::new(),
            image_url: String::new(),
            product_url: String::new(),
            rating: 0.0,
            reviews_count: 0,
            sales_count: 0,
            trend_score: 0.0,
            trend_level: TrendLevel::Stable,
            scraped_at: Utc::now(),
        }
    }

    /// Apply the markdown guard: a compare-at price at or below the current
    /// price is noise, not a sale.
    pub fn set_original_price(&mut self, original: Option<f64>) {
        self.original_price = original.filter(|o| *o > self.price);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_round_trips_through_str() {
        for cat in [
            FashionCategory::Dress,
            FashionCategory::Shoes,
            FashionCategory::Activewear,
        ] {
            assert_eq!(FashionCategory::parse(cat.as_str()), Some(cat));
        }
        assert_eq!(FashionCategory::parse("hatstand"), None);
    }

    #[test]
    fn trend_level_thresholds() {
        assert_eq!(TrendLevel::from_score(90.0), TrendLevel::Hot);
        assert_eq!(TrendLevel::from_score(75.0), TrendLevel::Hot);
        assert_eq!(TrendLevel::from_score(60.0), TrendLevel::Rising);
        assert_eq!(TrendLevel::from_score(30.0), TrendLevel::Stable);
        assert_eq!(TrendLevel::from_score(10.0), TrendLevel::Declining);
    }

    #[test]
    fn original_price_guard_rejects_lower_compare_at() {
        let mut item = FashionItem::new("1", "Linen Wrap Dress", "Acme");
        item.price = 20.0;
        item.set_original_price(Some(15.0));
        assert_eq!(item.original_price, None);
        item.set_original_price(Some(29.99));
        assert_eq!(item.original_price, Some(29.99));
    }
}
