//! Storage layer: SQLite connection lifecycle and the catalog/trend
//! repositories.

pub mod catalog_repository;
pub mod connection;
pub mod trend_repository;

pub use catalog_repository::CatalogRepository;
pub use connection::DatabaseConnection;
pub use trend_repository::{RollupOutcome, RollupPeriod, TrendRepository, TrendingProduct};
