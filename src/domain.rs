//! Domain module - core entities of the fashion catalog
//!
//! Each submodule is its own file in the domain/ directory; public
//! exports are collected here for convenience.

pub mod catalog;
pub mod item;

pub use catalog::{
    CatalogStats, PriceHistoryEntry, ProductPage, ProductQuery, RankingObservation,
    ScrapeSession, SessionStatus, StoredProduct, TrendRollup, TrendScoreRecord, UpsertStats,
};
pub use item::{FashionCategory, FashionItem, RankTrend, TrendLevel};
