//! Application layer: batch orchestration of scrape jobs and the
//! bestseller trend-tracking pass.

pub mod orchestrator;
pub mod trend_tracker;

pub use orchestrator::{
    default_targets, BatchReport, ScrapeOrchestrator, ScrapeTarget, SessionSummary, SourceKind,
};
pub use trend_tracker::{default_bestseller_collections, TrackingReport, TrendTracker};
