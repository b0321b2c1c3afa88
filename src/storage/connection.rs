//! Database connection and pool management.
//!
//! The connection is constructed explicitly and handed to the repositories;
//! there is no process-wide handle, so tests can run against throwaway
//! files.

use std::path::Path;

use anyhow::Result;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

pub struct DatabaseConnection {
    pool: SqlitePool,
}

impl DatabaseConnection {
    pub async fn new(database_url: &str) -> Result<Self> {
        let db_path = database_url
            .trim_start_matches("sqlite://")
            .trim_start_matches("sqlite:");

        // In-memory databases have no backing file to create.
        if db_path != ":memory:" {
            if let Some(parent) = Path::new(db_path).parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            if !Path::new(db_path).exists() {
                std::fs::File::create(db_path)?;
            }
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    pub async fn migrate(&self) -> Result<()> {
        let create_products_sql = r#"
            CREATE TABLE IF NOT EXISTS products (
                id TEXT PRIMARY KEY,
                external_id TEXT NOT NULL,
                name TEXT NOT NULL,
                brand TEXT NOT NULL,
                source TEXT NOT NULL,
                product_url TEXT,
                image_url TEXT,
                category TEXT NOT NULL,
                price REAL NOT NULL DEFAULT 0,
                original_price REAL,
                currency TEXT NOT NULL DEFAULT 'USD',
                colors TEXT,
                tags TEXT,
                rating REAL NOT NULL DEFAULT 0,
                reviews_count INTEGER NOT NULL DEFAULT 0,
                first_seen_at DATETIME NOT NULL,
                last_seen_at DATETIME NOT NULL,
                is_active INTEGER NOT NULL DEFAULT 1,
                UNIQUE(external_id, source)
            )
        "#;

        let create_sessions_sql = r#"
            CREATE TABLE IF NOT EXISTS scrape_sessions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                source TEXT NOT NULL,
                url TEXT,
                started_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
                completed_at DATETIME,
                items_found INTEGER NOT NULL DEFAULT 0,
                items_new INTEGER NOT NULL DEFAULT 0,
                items_updated INTEGER NOT NULL DEFAULT 0,
                status TEXT NOT NULL DEFAULT 'running',
                error TEXT
            )
        "#;

        let create_price_history_sql = r#"
            CREATE TABLE IF NOT EXISTS price_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                product_id TEXT NOT NULL,
                price REAL NOT NULL,
                original_price REAL,
                recorded_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (product_id) REFERENCES products(id)
            )
        "#;

        let create_rankings_sql = r#"
            CREATE TABLE IF NOT EXISTS bestseller_rankings (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                product_id TEXT NOT NULL,
                source TEXT NOT NULL,
                rank INTEGER NOT NULL,
                recorded_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (product_id) REFERENCES products(id)
            )
        "#;

        let create_trend_scores_sql = r#"
            CREATE TABLE IF NOT EXISTS trend_scores (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                product_id TEXT NOT NULL UNIQUE,
                trend_score REAL NOT NULL DEFAULT 0,
                rank_trend TEXT NOT NULL DEFAULT 'new',
                weeks_in_bestseller INTEGER NOT NULL DEFAULT 0,
                last_updated DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (product_id) REFERENCES products(id)
            )
        "#;

        let create_trends_sql = r#"
            CREATE TABLE IF NOT EXISTS trends (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                period TEXT NOT NULL,
                period_start DATE NOT NULL,
                period_end DATE NOT NULL,
                source TEXT,
                category TEXT,
                brand TEXT,
                total_products INTEGER NOT NULL DEFAULT 0,
                new_products INTEGER NOT NULL DEFAULT 0,
                avg_price REAL,
                min_price REAL,
                max_price REAL,
                top_colors TEXT,
                top_tags TEXT,
                created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
                UNIQUE(period, period_start, source, category, brand)
            )
        "#;

        let create_indexes_sql = [
            "CREATE INDEX IF NOT EXISTS idx_products_source ON products (source)",
            "CREATE INDEX IF NOT EXISTS idx_products_category ON products (category)",
            "CREATE INDEX IF NOT EXISTS idx_products_brand ON products (brand)",
            "CREATE INDEX IF NOT EXISTS idx_products_last_seen ON products (last_seen_at)",
            "CREATE INDEX IF NOT EXISTS idx_price_history_product ON price_history (product_id)",
            "CREATE INDEX IF NOT EXISTS idx_rankings_product ON bestseller_rankings (product_id, source)",
            "CREATE INDEX IF NOT EXISTS idx_sessions_source ON scrape_sessions (source)",
            "CREATE INDEX IF NOT EXISTS idx_trends_period ON trends (period, period_start)",
        ];

        sqlx::query(create_products_sql).execute(&self.pool).await?;
        sqlx::query(create_sessions_sql).execute(&self.pool).await?;
        sqlx::query(create_price_history_sql).execute(&self.pool).await?;
        sqlx::query(create_rankings_sql).execute(&self.pool).await?;
        sqlx::query(create_trend_scores_sql).execute(&self.pool).await?;
        sqlx::query(create_trends_sql).execute(&self.pool).await?;
        for index_sql in create_indexes_sql {
            sqlx::query(index_sql).execute(&self.pool).await?;
        }

        Ok(())
    }
}
