//! Scraping layer: the source-adapter contract, the rendering-collaborator
//! seam, per-site adapters and the host-based adapter registry.
//!
//! Two extraction strategies live here. Feed adapters page through a JSON
//! product feed; rendered adapters drive a (pluggable) browser session
//! through scroll/click rounds and then extract from the DOM snapshot with
//! ordered selector cascades.

pub mod adapter;
pub mod browser;
pub mod dom;
pub mod feed;
pub mod generic;
pub mod hm;
pub mod lilly;
pub mod sample;
pub mod selector;
pub mod shein;
pub mod tullabee;
pub mod zara;

pub use adapter::{ScrapeError, SourceAdapter};
pub use browser::{Browser, PageSession, RenderError, StaticBrowser};
pub use feed::ShopifyAdapter;
pub use generic::GenericAdapter;
pub use sample::SampleAdapter;
pub use selector::AdapterRegistry;
