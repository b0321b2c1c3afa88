//! Application configuration.
//!
//! Settings are serde-backed with layered defaults: the JSON config file
//! (if present) overrides defaults, and a handful of environment variables
//! override the file for things operators toggle per run.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::info;

use crate::extraction::TrendWeights;
use crate::infrastructure::http_client::HttpClientConfig;

/// Complete application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub scraping: ScrapingConfig,
    pub trend: TrendWeights,
    pub staleness: StalenessConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite URL; `None` resolves to `<data dir>/trendsift/catalog.db`.
    pub url: Option<String>,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapingConfig {
    /// Fall back to the synthetic sample adapter for every URL.
    pub demo_mode: bool,
    /// Default per-source item budget.
    pub max_items_per_scan: u32,
    /// Hard deadline for a whole source job, independent of adapter-level
    /// timeouts.
    pub job_deadline_seconds: u64,
    /// Pause between sources in a batch, in milliseconds.
    pub inter_source_delay_ms: u64,
    pub http: HttpClientConfig,
}

impl Default for ScrapingConfig {
    fn default() -> Self {
        Self {
            demo_mode: false,
            max_items_per_scan: 50,
            job_deadline_seconds: 300,
            inter_source_delay_ms: 1500,
            http: HttpClientConfig::default(),
        }
    }
}

/// Policy for flipping `is_active` off on items that stop appearing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StalenessConfig {
    pub enabled: bool,
    /// Items not re-observed within this many days are deactivated.
    pub max_age_days: i64,
}

impl Default for StalenessConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_age_days: 14,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub level: String,
    pub console_output: bool,
    pub file_output: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            console_output: true,
            file_output: false,
        }
    }
}

impl AppConfig {
    /// Default config file location under the platform config directory.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("trendsift")
            .join("config.json")
    }

    /// Resolved database URL, creating the data directory lazily.
    pub fn database_url(&self) -> String {
        if let Some(url) = &self.database.url {
            return url.clone();
        }
        let dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("trendsift");
        format!("sqlite:{}", dir.join("catalog.db").display())
    }

    /// Load from the given path (or the default), then apply environment
    /// overrides. A missing file is not an error; defaults are used.
    pub async fn load(path: Option<PathBuf>) -> Result<Self> {
        let path = path.unwrap_or_else(Self::default_path);

        let mut config = if path.exists() {
            let raw = fs::read_to_string(&path)
                .await
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            let config: Self = serde_json::from_str(&raw)
                .with_context(|| format!("Invalid config file: {}", path.display()))?;
            info!("Loaded configuration from {}", path.display());
            config
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Persist the current configuration (used to seed a fresh install).
    pub async fn save(&self, path: Option<PathBuf>) -> Result<()> {
        let path = path.unwrap_or_else(Self::default_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let raw = serde_json::to_string_pretty(self)?;
        fs::write(&path, raw)
            .await
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(value) = std::env::var("TRENDSIFT_DEMO") {
            self.scraping.demo_mode = matches!(value.as_str(), "1" | "true" | "yes");
        }
        if let Ok(url) = std::env::var("TRENDSIFT_DATABASE_URL") {
            self.database.url = Some(url);
        }
        if let Ok(level) = std::env::var("TRENDSIFT_LOG") {
            self.logging.level = level;
        }
    }
}
