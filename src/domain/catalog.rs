//! Persisted catalog rows and the query/result DTOs exposed by the store.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::item::{FashionCategory, RankTrend};

/// A product as stored in the catalog, with its surrogate id and
/// lifecycle timestamps. The (external_id, source) pair is unique.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredProduct {
    pub id: String,
    pub external_id: String,
    pub name: String,
    pub brand: String,
    pub source: String,
    pub product_url: String,
    pub image_url: String,
    pub category: FashionCategory,
    pub price: f64,
    pub original_price: Option<f64>,
    pub currency: String,
    pub colors: Vec<String>,
    pub tags: Vec<String>,
    pub rating: f64,
    pub reviews_count: i64,
    pub first_seen_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
    pub is_active: bool,
}

/// Append-only price observation. Written at first insert and again on
/// every upsert that sees a changed price.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceHistoryEntry {
    pub id: i64,
    pub product_id: String,
    pub price: f64,
    pub original_price: Option<f64>,
    pub recorded_at: DateTime<Utc>,
}

/// One row per appearance of a product in a ranked bestseller listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingObservation {
    pub id: i64,
    pub product_id: String,
    pub source: String,
    pub rank: i64,
    pub recorded_at: DateTime<Utc>,
}

/// The single trend record kept per product; replaced on conflict, with a
/// monotonically growing weeks counter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendScoreRecord {
    pub product_id: String,
    pub trend_score: f64,
    pub rank_trend: RankTrend,
    pub weeks_in_bestseller: i64,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Running,
    Completed,
    Failed,
}

impl SessionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// One row per scrape run; created when the job starts and completed
/// exactly once when it ends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeSession {
    pub id: i64,
    pub source: String,
    pub url: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub items_found: i64,
    pub items_new: i64,
    pub items_updated: i64,
    pub status: SessionStatus,
    pub error: Option<String>,
}

/// Periodic aggregate keyed by (period, period_start, source, category, brand).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendRollup {
    pub period: String,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub source: String,
    pub category: String,
    pub brand: String,
    pub total_products: i64,
    pub new_products: i64,
    pub avg_price: f64,
    pub min_price: f64,
    pub max_price: f64,
    pub top_colors: Vec<String>,
    pub top_tags: Vec<String>,
}

/// Filterable catalog query. All filters are conjunctive.
#[derive(Debug, Clone, Default)]
pub struct ProductQuery {
    pub source: Option<String>,
    pub category: Option<FashionCategory>,
    pub brand: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub active_only: bool,
    pub limit: i64,
    pub offset: i64,
}

impl ProductQuery {
    pub fn active() -> Self {
        Self {
            active_only: true,
            limit: 100,
            ..Self::default()
        }
    }
}

/// One page of catalog results.
#[derive(Debug, Clone, Serialize)]
pub struct ProductPage {
    pub products: Vec<StoredProduct>,
    pub total_count: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Aggregate counts returned by a bulk upsert. `failed` items were counted
/// but their errors did not abort the rest of the batch.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct UpsertStats {
    pub total: u32,
    pub new: u32,
    pub updated: u32,
    pub failed: u32,
}

/// Snapshot statistics over the active catalog.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogStats {
    pub total_active: i64,
    pub by_source: Vec<(String, i64)>,
    pub by_category: Vec<(String, i64)>,
    pub updated_today: i64,
    pub new_today: i64,
}
