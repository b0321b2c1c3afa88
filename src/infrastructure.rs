//! Infrastructure layer: HTTP client, configuration and logging.

pub mod config;
pub mod http_client;
pub mod logging;

pub use config::AppConfig;
pub use http_client::{HttpClient, HttpClientConfig};
pub use logging::init_logging;
