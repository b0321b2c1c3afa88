//! Adapter-level trend score: a weighted blend of review volume, rating
//! and sales volume, each normalized against a saturation ceiling.
//!
//! The weights are empirical and therefore carried as configuration, not
//! constants; the store-level ranking trend in `storage::trend_repository`
//! is a separate computation that also factors rank deltas.

use serde::{Deserialize, Serialize};

use crate::domain::item::{FashionItem, TrendLevel};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TrendWeights {
    pub review_weight: f64,
    pub rating_weight: f64,
    pub sales_weight: f64,
    /// Review count at which the review sub-score saturates.
    pub review_ceiling: f64,
    /// Sales count at which the sales sub-score saturates.
    pub sales_ceiling: f64,
}

impl Default for TrendWeights {
    fn default() -> Self {
        Self {
            review_weight: 0.3,
            rating_weight: 0.3,
            sales_weight: 0.4,
            review_ceiling: 1000.0,
            sales_ceiling: 5000.0,
        }
    }
}

impl TrendWeights {
    /// Score in [0, 100], rounded to one decimal.
    pub fn score(&self, item: &FashionItem) -> f64 {
        let review_score = (f64::from(item.reviews_count) / self.review_ceiling).min(1.0) * 100.0;
        let rating_score = (item.rating / 5.0) * 100.0;
        let sales_score = (f64::from(item.sales_count) / self.sales_ceiling).min(1.0) * 100.0;

        let score = review_score * self.review_weight
            + rating_score * self.rating_weight
            + sales_score * self.sales_weight;

        (score.clamp(0.0, 100.0) * 10.0).round() / 10.0
    }

    /// Score the item and stamp both `trend_score` and `trend_level`.
    pub fn apply(&self, item: &mut FashionItem) {
        item.trend_score = self.score(item);
        item.trend_level = TrendLevel::from_score(item.trend_score);
    }
}
