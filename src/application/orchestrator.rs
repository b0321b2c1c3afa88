//! Sequencing of scrape jobs across sources.
//!
//! Sources run strictly sequentially. Feed-based targets go first: they
//! are cheap, and a slow browser session later in the batch should never
//! starve them. Each source gets its own session row and its own error
//! capture — one source failing cannot abort the batch or touch another
//! source's committed rows.

use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::domain::catalog::UpsertStats;
use crate::infrastructure::config::AppConfig;
use crate::scraping::selector::AdapterRegistry;
use crate::storage::catalog_repository::CatalogRepository;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SourceKind {
    /// JSON product feed; no browser involved.
    Feed,
    /// Browser-rendered listing page.
    Rendered,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScrapeTarget {
    pub name: String,
    pub url: String,
    pub kind: SourceKind,
    pub max_items: usize,
}

impl ScrapeTarget {
    pub fn new(name: &str, url: &str, kind: SourceKind, max_items: usize) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            kind,
            max_items,
        }
    }
}

/// The reference source list: the Shopify boutiques plus the rendered
/// storefronts with dedicated adapters.
pub fn default_targets() -> Vec<ScrapeTarget> {
    use SourceKind::{Feed, Rendered};
    vec![
        ScrapeTarget::new("classicwhimsy.com", "https://classicwhimsy.com/collections/all", Feed, 250),
        ScrapeTarget::new("shrimpandgritskids.com", "https://shrimpandgritskids.com/collections/all", Feed, 250),
        ScrapeTarget::new("jamiekay.com", "https://jamiekay.com/collections/all", Feed, 250),
        ScrapeTarget::new("gigiandmax.com", "https://www.gigiandmax.com/collections/all", Feed, 250),
        ScrapeTarget::new("stitchyfish.com", "https://stitchyfish.com/collections/all", Feed, 250),
        ScrapeTarget::new("littlebearsmocks.com", "https://littlebearsmocks.com/collections/all", Feed, 250),
        ScrapeTarget::new("zuccinikids.com", "https://zuccinikids.com/collections/all", Feed, 250),
        ScrapeTarget::new("marienicoleclothing.com", "https://marienicoleclothing.com/collections/all", Feed, 250),
        ScrapeTarget::new("morninglavender.com", "https://morninglavender.com/collections/all", Feed, 250),
        ScrapeTarget::new("matildajaneclothing.com", "https://matildajaneclothing.com/collections/all", Feed, 250),
        ScrapeTarget::new("shein", "https://us.shein.com/bestsellers-Women-Clothing-sc-00891882.html", Rendered, 100),
        ScrapeTarget::new("zara", "https://www.zara.com/us/en/kids-girl-dresses-l6057.html", Rendered, 200),
        ScrapeTarget::new("tullabee", "https://tullabee.com/collections/all", Rendered, 200),
        ScrapeTarget::new("lillypulitzer", "https://www.lillypulitzer.com/new-arrivals/", Rendered, 200),
    ]
}

/// Outcome of one source's scrape job.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub source: String,
    pub session_id: i64,
    pub items_found: i64,
    pub items_new: i64,
    pub items_updated: i64,
    pub items_failed: i64,
    pub deactivated: u64,
    pub error: Option<String>,
}

impl SessionSummary {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub summaries: Vec<SessionSummary>,
}

impl BatchReport {
    pub fn sources_succeeded(&self) -> usize {
        self.summaries.iter().filter(|s| s.succeeded()).count()
    }

    pub fn sources_failed(&self) -> usize {
        self.summaries.len() - self.sources_succeeded()
    }

    pub fn total_new(&self) -> i64 {
        self.summaries.iter().map(|s| s.items_new).sum()
    }
}

pub struct ScrapeOrchestrator {
    catalog: CatalogRepository,
    registry: AdapterRegistry,
    config: AppConfig,
}

impl ScrapeOrchestrator {
    pub fn new(catalog: CatalogRepository, registry: AdapterRegistry, config: AppConfig) -> Self {
        Self {
            catalog,
            registry,
            config,
        }
    }

    /// Run one source end to end: session row, adapter call under a hard
    /// job deadline, bulk upsert, staleness pass, session completion.
    ///
    /// Adapter failures are captured on the session and in the summary;
    /// only store-level failures propagate as errors.
    pub async fn scrape_source(&self, target: &ScrapeTarget) -> Result<SessionSummary> {
        info!("Scraping source '{}' from {}", target.name, target.url);

        let session_id = self
            .catalog
            .start_scrape_session(&target.name, Some(&target.url))
            .await?;

        let adapter = self.registry.select(&target.url);
        let deadline = Duration::from_secs(self.config.scraping.job_deadline_seconds);

        let scrape_result =
            tokio::time::timeout(deadline, adapter.scrape(&target.url, target.max_items, None)).await;

        let items = match scrape_result {
            Ok(Ok(items)) => items,
            Ok(Err(e)) => {
                let reason = e.to_string();
                error!("Source '{}' failed: {}", target.name, reason);
                self.catalog
                    .complete_scrape_session(session_id, 0, 0, 0, Some(&reason))
                    .await?;
                return Ok(SessionSummary {
                    source: target.name.clone(),
                    session_id,
                    items_found: 0,
                    items_new: 0,
                    items_updated: 0,
                    items_failed: 0,
                    deactivated: 0,
                    error: Some(reason),
                });
            }
            Err(_) => {
                let reason = format!("job deadline of {}s exceeded", deadline.as_secs());
                error!("Source '{}' timed out: {}", target.name, reason);
                self.catalog
                    .complete_scrape_session(session_id, 0, 0, 0, Some(&reason))
                    .await?;
                return Ok(SessionSummary {
                    source: target.name.clone(),
                    session_id,
                    items_found: 0,
                    items_new: 0,
                    items_updated: 0,
                    items_failed: 0,
                    deactivated: 0,
                    error: Some(reason),
                });
            }
        };

        let stats: UpsertStats = self.catalog.bulk_upsert(&items, &target.name).await;

        let deactivated = if self.config.staleness.enabled {
            self.catalog
                .deactivate_stale(&target.name, self.config.staleness.max_age_days)
                .await?
        } else {
            0
        };

        self.catalog
            .complete_scrape_session(
                session_id,
                i64::from(stats.total),
                i64::from(stats.new),
                i64::from(stats.updated),
                None,
            )
            .await?;

        info!(
            "Source '{}': {} found, {} new, {} updated, {} failed",
            target.name, stats.total, stats.new, stats.updated, stats.failed
        );

        Ok(SessionSummary {
            source: target.name.clone(),
            session_id,
            items_found: i64::from(stats.total),
            items_new: i64::from(stats.new),
            items_updated: i64::from(stats.updated),
            items_failed: i64::from(stats.failed),
            deactivated,
            error: None,
        })
    }

    /// Run a whole batch sequentially, feed targets before rendered ones,
    /// with a pause between sources.
    pub async fn run_batch(&self, targets: &[ScrapeTarget]) -> Result<BatchReport> {
        let started_at = Utc::now();

        let mut ordered: Vec<&ScrapeTarget> = Vec::with_capacity(targets.len());
        ordered.extend(targets.iter().filter(|t| t.kind == SourceKind::Feed));
        ordered.extend(targets.iter().filter(|t| t.kind == SourceKind::Rendered));

        let mut summaries = Vec::with_capacity(ordered.len());
        for (index, target) in ordered.iter().enumerate() {
            match self.scrape_source(target).await {
                Ok(summary) => summaries.push(summary),
                Err(e) => {
                    // Store-level failure: the session row may be stuck in
                    // 'running'; record what we can and keep the batch alive.
                    warn!("Store error while scraping '{}': {}", target.name, e);
                    summaries.push(SessionSummary {
                        source: target.name.clone(),
                        session_id: -1,
                        items_found: 0,
                        items_new: 0,
                        items_updated: 0,
                        items_failed: 0,
                        deactivated: 0,
                        error: Some(e.to_string()),
                    });
                }
            }

            if index + 1 < ordered.len() {
                tokio::time::sleep(Duration::from_millis(
                    self.config.scraping.inter_source_delay_ms,
                ))
                .await;
            }
        }

        Ok(BatchReport {
            started_at,
            completed_at: Utc::now(),
            summaries,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_targets_put_feeds_first_after_ordering() {
        let targets = default_targets();
        assert!(targets.iter().any(|t| t.kind == SourceKind::Feed));
        assert!(targets.iter().any(|t| t.kind == SourceKind::Rendered));

        let ordered: Vec<SourceKind> = {
            let mut v: Vec<&ScrapeTarget> = Vec::new();
            v.extend(targets.iter().filter(|t| t.kind == SourceKind::Feed));
            v.extend(targets.iter().filter(|t| t.kind == SourceKind::Rendered));
            v.iter().map(|t| t.kind).collect()
        };
        let first_rendered = ordered.iter().position(|k| *k == SourceKind::Rendered).unwrap();
        assert!(ordered[..first_rendered].iter().all(|k| *k == SourceKind::Feed));
        assert!(ordered[first_rendered..].iter().all(|k| *k == SourceKind::Rendered));
    }
}
