//! trendsift — fashion e-commerce catalog scraper with price and
//! bestseller trend tracking.
//!
//! Heterogeneous sources (Shopify JSON feeds, rendered SPA storefronts,
//! Cloudflare-gated shops) are normalized through a common adapter
//! contract into a SQLite catalog that deduplicates across re-scrapes,
//! records price history on change, and derives ranking-based trend
//! scores and periodic rollups.

pub mod application;
pub mod domain;
pub mod extraction;
pub mod infrastructure;
pub mod scraping;
pub mod storage;
