//! Bestseller trend tracking.
//!
//! One pass scrapes each brand's "best sellers" collection in listing
//! order, upserts every item, records its rank, derives the rank delta
//! against the previous pass and updates the per-product trend record.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::scraping::selector::AdapterRegistry;
use crate::storage::catalog_repository::CatalogRepository;
use crate::storage::trend_repository::TrendRepository;

/// Bestseller collections of the tracked Shopify boutiques.
pub fn default_bestseller_collections() -> Vec<(String, String)> {
    [
        ("classicwhimsy.com", "https://classicwhimsy.com/collections/best-sellers"),
        ("jamiekay.com", "https://jamiekay.com/collections/best-sellers"),
        ("shrimpandgritskids.com", "https://shrimpandgritskids.com/collections/best-sellers"),
        ("gigiandmax.com", "https://www.gigiandmax.com/collections/best-sellers"),
        ("stitchyfish.com", "https://stitchyfish.com/collections/best-sellers"),
        ("littlebearsmocks.com", "https://littlebearsmocks.com/collections/best-sellers"),
        ("zuccinikids.com", "https://zuccinikids.com/collections/best-sellers"),
        ("marienicoleclothing.com", "https://marienicoleclothing.com/collections/best-sellers"),
        ("morninglavender.com", "https://morninglavender.com/collections/best-sellers"),
        ("matildajaneclothing.com", "https://matildajaneclothing.com/collections/best-sellers"),
    ]
    .into_iter()
    .map(|(source, url)| (source.to_string(), url.to_string()))
    .collect()
}

/// Items pulled per collection; rank is the position in this listing.
const TRACKING_BUDGET: usize = 50;

#[derive(Debug, Clone, Serialize)]
pub struct TrendEntry {
    pub source: String,
    pub name: String,
    pub rank: i64,
    /// Negative means the item climbed since the previous pass.
    pub change: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TopRank {
    pub rank: i64,
    pub name: String,
    pub price: f64,
    pub change: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceTracking {
    pub source: String,
    pub tracked: usize,
    pub top: Vec<TopRank>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrackingReport {
    pub timestamp: DateTime<Utc>,
    pub sources: Vec<SourceTracking>,
    pub trending_up: Vec<TrendEntry>,
    pub new_entries: Vec<TrendEntry>,
}

pub struct TrendTracker {
    catalog: CatalogRepository,
    trends: TrendRepository,
    registry: AdapterRegistry,
}

impl TrendTracker {
    pub fn new(
        catalog: CatalogRepository,
        trends: TrendRepository,
        registry: AdapterRegistry,
    ) -> Self {
        Self {
            catalog,
            trends,
            registry,
        }
    }

    /// Track every collection. Per-source failures are captured in the
    /// report; one brand erroring never stops the rest.
    pub async fn track_bestsellers(
        &self,
        collections: &[(String, String)],
    ) -> Result<TrackingReport> {
        let mut report = TrackingReport {
            timestamp: Utc::now(),
            sources: Vec::new(),
            trending_up: Vec::new(),
            new_entries: Vec::new(),
        };

        for (source, url) in collections {
            info!("Tracking bestsellers: {}", source);

            let adapter = self.registry.select(url);
            let items = match adapter.scrape(url, TRACKING_BUDGET, None).await {
                Ok(items) => items,
                Err(e) => {
                    warn!("Tracking failed for {}: {}", source, e);
                    report.sources.push(SourceTracking {
                        source: source.clone(),
                        tracked: 0,
                        top: Vec::new(),
                        error: Some(e.to_string()),
                    });
                    continue;
                }
            };

            if items.is_empty() {
                warn!("No items in bestseller listing for {}", source);
                report.sources.push(SourceTracking {
                    source: source.clone(),
                    tracked: 0,
                    top: Vec::new(),
                    error: None,
                });
                continue;
            }

            let mut tracking = SourceTracking {
                source: source.clone(),
                tracked: items.len(),
                top: Vec::new(),
                error: None,
            };

            for (index, item) in items.iter().enumerate() {
                let rank = (index + 1) as i64;

                let (product_id, is_new) = self.catalog.upsert_product(item, source).await?;
                self.trends.record_ranking(&product_id, source, rank).await?;
                let delta = self.trends.rank_delta(&product_id, source).await?;

                if rank <= 5 {
                    tracking.top.push(TopRank {
                        rank,
                        name: truncated(&item.name, 40),
                        price: item.price,
                        change: delta,
                    });
                }

                if is_new {
                    report.new_entries.push(TrendEntry {
                        source: source.clone(),
                        name: item.name.clone(),
                        rank,
                        change: None,
                    });
                } else if let Some(change) = delta {
                    if change < 0 {
                        report.trending_up.push(TrendEntry {
                            source: source.clone(),
                            name: item.name.clone(),
                            rank,
                            change: Some(change),
                        });
                    }
                }

                self.trends
                    .update_trend_score(&product_id, rank, delta, is_new)
                    .await?;
            }

            info!("Tracked {} items for {}", tracking.tracked, source);
            report.sources.push(tracking);
        }

        Ok(report)
    }

    /// Plain-text tracking report for the CLI and cron logs.
    pub fn render_report(report: &TrackingReport) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "Bestseller trend report — {}\n",
            report.timestamp.format("%Y-%m-%d %H:%M UTC")
        ));

        out.push_str("\nTrending up:\n");
        if report.trending_up.is_empty() {
            out.push_str("  (none)\n");
        }
        for entry in report.trending_up.iter().take(10) {
            out.push_str(&format!(
                "  [{}] {} (climbed {} places, now #{})\n",
                truncated(&entry.source, 24),
                truncated(&entry.name, 36),
                -entry.change.unwrap_or(0),
                entry.rank
            ));
        }

        out.push_str("\nNew entries:\n");
        if report.new_entries.is_empty() {
            out.push_str("  (none)\n");
        }
        for entry in report.new_entries.iter().take(10) {
            out.push_str(&format!(
                "  [{}] {} (#{})\n",
                truncated(&entry.source, 24),
                truncated(&entry.name, 36),
                entry.rank
            ));
        }

        out.push_str("\nTop 3 per brand:\n");
        for tracking in &report.sources {
            if tracking.error.is_some() {
                out.push_str(&format!("  {}: failed ({})\n", tracking.source, tracking.error.as_deref().unwrap_or("")));
                continue;
            }
            out.push_str(&format!("  {}:\n", tracking.source));
            for top in tracking.top.iter().take(3) {
                let movement = match top.change {
                    Some(change) if change < 0 => format!(" (+{})", -change),
                    Some(change) if change > 0 => format!(" (-{change})"),
                    _ => String::new(),
                };
                out.push_str(&format!(
                    "    {}. {} ${:.2}{}\n",
                    top.rank,
                    truncated(&top.name, 30),
                    top.price,
                    movement
                ));
            }
        }

        out
    }
}

fn truncated(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        text.chars().take(max).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_rendering_handles_empty_sections() {
        let report = TrackingReport {
            timestamp: Utc::now(),
            sources: vec![SourceTracking {
                source: "classicwhimsy.com".to_string(),
                tracked: 2,
                top: vec![TopRank {
                    rank: 1,
                    name: "Magnolia Bubble".to_string(),
                    price: 42.0,
                    change: Some(-4),
                }],
                error: None,
            }],
            trending_up: Vec::new(),
            new_entries: Vec::new(),
        };
        let text = TrendTracker::render_report(&report);
        assert!(text.contains("(none)"));
        assert!(text.contains("Magnolia Bubble"));
        assert!(text.contains("(+4)"));
    }
}
