//! Pure extraction utilities shared by every source adapter.
//!
//! Nothing in this tree performs I/O; it is all string-in, value-out so the
//! parsing rules can be tested without a network or a database.

pub mod category;
pub mod keywords;
pub mod price;
pub mod trend;

pub use category::CategoryMatcher;
pub use trend::TrendWeights;
