//! Catalog repository: change-tracking upserts, queries, scrape sessions
//! and the staleness policy.
//!
//! Every mutating operation runs as a single transaction so readers never
//! observe a half-written item.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use sqlx::{Row, SqlitePool};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::catalog::{
    CatalogStats, PriceHistoryEntry, ProductPage, ProductQuery, ScrapeSession, SessionStatus,
    StoredProduct, UpsertStats,
};
use crate::domain::item::{FashionCategory, FashionItem};

const PRODUCT_COLUMNS: &str = "id, external_id, name, brand, source, product_url, image_url, \
     category, price, original_price, currency, colors, tags, rating, reviews_count, \
     first_seen_at, last_seen_at, is_active";

#[derive(Clone)]
pub struct CatalogRepository {
    pool: Arc<SqlitePool>,
}

impl CatalogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // ===============================
    // UPSERT
    // ===============================

    /// Insert or update one observation. Returns the store id and whether
    /// the product was new. Price history is appended at first insert and
    /// on change only; `last_seen_at` and `is_active` refresh on every
    /// call.
    pub async fn upsert_product(&self, item: &FashionItem, source: &str) -> Result<(String, bool)> {
        let mut tx = self.pool.begin().await.context("Failed to begin upsert transaction")?;

        let existing: Option<(String, f64)> =
            sqlx::query_as("SELECT id, price FROM products WHERE external_id = ? AND source = ?")
                .bind(&item.external_id)
                .bind(source)
                .fetch_optional(&mut *tx)
                .await?;

        let now = Utc::now();
        let colors_json = serde_json::to_string(&item.colors)?;
        let tags_json = serde_json::to_string(&item.tags)?;

        match existing {
            Some((product_id, old_price)) => {
                sqlx::query(
                    r#"
                    UPDATE products SET
                        name = ?, price = ?, original_price = ?, image_url = ?,
                        product_url = ?, category = ?, colors = ?, tags = ?,
                        rating = ?, reviews_count = ?, last_seen_at = ?, is_active = 1
                    WHERE id = ?
                    "#,
                )
                .bind(&item.name)
                .bind(item.price)
                .bind(item.original_price)
                .bind(&item.image_url)
                .bind(&item.product_url)
                .bind(item.category.as_str())
                .bind(&colors_json)
                .bind(&tags_json)
                .bind(item.rating)
                .bind(i64::from(item.reviews_count))
                .bind(now)
                .bind(&product_id)
                .execute(&mut *tx)
                .await?;

                if (old_price - item.price).abs() > 1e-9 {
                    debug!(
                        "Price change for {}: {} -> {}",
                        product_id, old_price, item.price
                    );
                    sqlx::query(
                        "INSERT INTO price_history (product_id, price, original_price, recorded_at) \
                         VALUES (?, ?, ?, ?)",
                    )
                    .bind(&product_id)
                    .bind(item.price)
                    .bind(item.original_price)
                    .bind(now)
                    .execute(&mut *tx)
                    .await?;
                }

                tx.commit().await?;
                Ok((product_id, false))
            }
            None => {
                let product_id = Uuid::new_v4().to_string();

                sqlx::query(
                    r#"
                    INSERT INTO products (
                        id, external_id, name, brand, source, product_url, image_url,
                        category, price, original_price, currency, colors, tags,
                        rating, reviews_count, first_seen_at, last_seen_at, is_active
                    ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 1)
                    "#,
                )
                .bind(&product_id)
                .bind(&item.external_id)
                .bind(&item.name)
                .bind(&item.brand)
                .bind(source)
                .bind(&item.product_url)
                .bind(&item.image_url)
                .bind(item.category.as_str())
                .bind(item.price)
                .bind(item.original_price)
                .bind(&item.currency)
                .bind(&colors_json)
                .bind(&tags_json)
                .bind(item.rating)
                .bind(i64::from(item.reviews_count))
                .bind(now)
                .bind(now)
                .execute(&mut *tx)
                .await?;

                sqlx::query(
                    "INSERT INTO price_history (product_id, price, original_price, recorded_at) \
                     VALUES (?, ?, ?, ?)",
                )
                .bind(&product_id)
                .bind(item.price)
                .bind(item.original_price)
                .bind(now)
                .execute(&mut *tx)
                .await?;

                tx.commit().await?;
                Ok((product_id, true))
            }
        }
    }

    /// Sequential upsert of a batch. A failure on one item is counted and
    /// logged but does not roll back or stop the rest.
    pub async fn bulk_upsert(&self, items: &[FashionItem], source: &str) -> UpsertStats {
        let mut stats = UpsertStats::default();
        for item in items {
            match self.upsert_product(item, source).await {
                Ok((_, true)) => {
                    stats.total += 1;
                    stats.new += 1;
                }
                Ok((_, false)) => {
                    stats.total += 1;
                    stats.updated += 1;
                }
                Err(e) => {
                    warn!("Upsert failed for '{}' from {}: {}", item.external_id, source, e);
                    stats.total += 1;
                    stats.failed += 1;
                }
            }
        }
        stats
    }

    // ===============================
    // QUERIES
    // ===============================

    pub async fn get_product_by_external_id(
        &self,
        external_id: &str,
        source: &str,
    ) -> Result<Option<StoredProduct>> {
        let row = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE external_id = ? AND source = ?"
        ))
        .bind(external_id)
        .bind(source)
        .fetch_optional(&*self.pool)
        .await?;

        row.map(|r| row_to_product(&r)).transpose()
    }

    pub async fn get_product(&self, product_id: &str) -> Result<Option<StoredProduct>> {
        let row = sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?"))
            .bind(product_id)
            .fetch_optional(&*self.pool)
            .await?;
        row.map(|r| row_to_product(&r)).transpose()
    }

    fn filter_clause(query: &ProductQuery) -> String {
        let mut clause = String::from(" WHERE 1=1");
        if query.source.is_some() {
            clause.push_str(" AND source = ?");
        }
        if query.category.is_some() {
            clause.push_str(" AND category = ?");
        }
        if query.brand.is_some() {
            clause.push_str(" AND brand = ?");
        }
        if query.min_price.is_some() {
            clause.push_str(" AND price >= ?");
        }
        if query.max_price.is_some() {
            clause.push_str(" AND price <= ?");
        }
        if query.active_only {
            clause.push_str(" AND is_active = 1");
        }
        clause
    }

    fn bind_filters<'q>(
        mut q: sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
        query: &'q ProductQuery,
    ) -> sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
        if let Some(source) = &query.source {
            q = q.bind(source);
        }
        if let Some(category) = query.category {
            q = q.bind(category.as_str());
        }
        if let Some(brand) = &query.brand {
            q = q.bind(brand);
        }
        if let Some(min_price) = query.min_price {
            q = q.bind(min_price);
        }
        if let Some(max_price) = query.max_price {
            q = q.bind(max_price);
        }
        q
    }

    /// Filtered page of products, most recently seen first, with the total
    /// matching count.
    pub async fn query_products(&self, query: &ProductQuery) -> Result<ProductPage> {
        let clause = Self::filter_clause(query);

        let count_sql = format!("SELECT COUNT(*) FROM products{clause}");
        let count_query = sqlx::query(&count_sql);
        let total_count: i64 = Self::bind_filters(count_query, query)
            .fetch_one(&*self.pool)
            .await?
            .get(0);

        let data_sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products{clause} \
             ORDER BY last_seen_at DESC LIMIT ? OFFSET ?"
        );
        let data_query = sqlx::query(&data_sql);
        let rows = Self::bind_filters(data_query, query)
            .bind(query.limit.max(1))
            .bind(query.offset.max(0))
            .fetch_all(&*self.pool)
            .await?;

        let products = rows
            .iter()
            .map(row_to_product)
            .collect::<Result<Vec<_>>>()?;

        Ok(ProductPage {
            products,
            total_count,
            limit: query.limit,
            offset: query.offset,
        })
    }

    pub async fn count_products(&self, source: Option<&str>, active_only: bool) -> Result<i64> {
        let mut sql = String::from("SELECT COUNT(*) FROM products WHERE 1=1");
        if source.is_some() {
            sql.push_str(" AND source = ?");
        }
        if active_only {
            sql.push_str(" AND is_active = 1");
        }
        let mut q = sqlx::query_scalar::<_, i64>(&sql);
        if let Some(source) = source {
            q = q.bind(source);
        }
        Ok(q.fetch_one(&*self.pool).await?)
    }

    pub async fn price_history(&self, product_id: &str) -> Result<Vec<PriceHistoryEntry>> {
        let rows = sqlx::query(
            "SELECT id, product_id, price, original_price, recorded_at \
             FROM price_history WHERE product_id = ? ORDER BY recorded_at ASC, id ASC",
        )
        .bind(product_id)
        .fetch_all(&*self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| PriceHistoryEntry {
                id: row.get("id"),
                product_id: row.get("product_id"),
                price: row.get("price"),
                original_price: row.get("original_price"),
                recorded_at: row.get("recorded_at"),
            })
            .collect())
    }

    // ===============================
    // SCRAPE SESSIONS
    // ===============================

    pub async fn start_scrape_session(&self, source: &str, url: Option<&str>) -> Result<i64> {
        let result = sqlx::query(
            "INSERT INTO scrape_sessions (source, url, started_at, status) VALUES (?, ?, ?, 'running')",
        )
        .bind(source)
        .bind(url)
        .bind(Utc::now())
        .execute(&*self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Terminal update of a session; status derives from error presence.
    pub async fn complete_scrape_session(
        &self,
        session_id: i64,
        items_found: i64,
        items_new: i64,
        items_updated: i64,
        error: Option<&str>,
    ) -> Result<()> {
        let status = if error.is_some() {
            SessionStatus::Failed
        } else {
            SessionStatus::Completed
        };
        sqlx::query(
            r#"
            UPDATE scrape_sessions SET
                completed_at = ?, items_found = ?, items_new = ?,
                items_updated = ?, status = ?, error = ?
            WHERE id = ?
            "#,
        )
        .bind(Utc::now())
        .bind(items_found)
        .bind(items_new)
        .bind(items_updated)
        .bind(status.as_str())
        .bind(error)
        .bind(session_id)
        .execute(&*self.pool)
        .await?;
        Ok(())
    }

    pub async fn recent_sessions(&self, limit: i64) -> Result<Vec<ScrapeSession>> {
        let rows = sqlx::query(
            "SELECT id, source, url, started_at, completed_at, items_found, items_new, \
             items_updated, status, error \
             FROM scrape_sessions ORDER BY started_at DESC, id DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&*self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| ScrapeSession {
                id: row.get("id"),
                source: row.get("source"),
                url: row.get("url"),
                started_at: row.get("started_at"),
                completed_at: row.get("completed_at"),
                items_found: row.get("items_found"),
                items_new: row.get("items_new"),
                items_updated: row.get("items_updated"),
                status: SessionStatus::parse(row.get::<String, _>("status").as_str())
                    .unwrap_or(SessionStatus::Failed),
                error: row.get("error"),
            })
            .collect())
    }

    // ===============================
    // STALENESS
    // ===============================

    /// Deactivate items from a source that have not been re-observed
    /// within the window. Returns the number of rows flipped.
    pub async fn deactivate_stale(&self, source: &str, max_age_days: i64) -> Result<u64> {
        let cutoff = Utc::now() - Duration::days(max_age_days);
        let result = sqlx::query(
            "UPDATE products SET is_active = 0 \
             WHERE source = ? AND is_active = 1 AND last_seen_at < ?",
        )
        .bind(source)
        .bind(cutoff)
        .execute(&*self.pool)
        .await?;
        let deactivated = result.rows_affected();
        if deactivated > 0 {
            debug!("Deactivated {} stale items from {}", deactivated, source);
        }
        Ok(deactivated)
    }

    // ===============================
    // STATISTICS
    // ===============================

    pub async fn get_stats(&self) -> Result<CatalogStats> {
        let total_active: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active = 1")
                .fetch_one(&*self.pool)
                .await?;

        let by_source = sqlx::query(
            "SELECT source, COUNT(*) as count FROM products WHERE is_active = 1 \
             GROUP BY source ORDER BY count DESC",
        )
        .fetch_all(&*self.pool)
        .await?
        .into_iter()
        .map(|row| (row.get::<String, _>("source"), row.get::<i64, _>("count")))
        .collect();

        let by_category = sqlx::query(
            "SELECT category, COUNT(*) as count FROM products WHERE is_active = 1 \
             GROUP BY category ORDER BY count DESC",
        )
        .fetch_all(&*self.pool)
        .await?
        .into_iter()
        .map(|row| (row.get::<String, _>("category"), row.get::<i64, _>("count")))
        .collect();

        let updated_today: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM products WHERE date(last_seen_at) = date('now')",
        )
        .fetch_one(&*self.pool)
        .await?;

        let new_today: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM products WHERE date(first_seen_at) = date('now')",
        )
        .fetch_one(&*self.pool)
        .await?;

        Ok(CatalogStats {
            total_active,
            by_source,
            by_category,
            updated_today,
            new_today,
        })
    }
}

/// Map a products row to the domain struct; colors/tags are JSON columns.
fn row_to_product(row: &sqlx::sqlite::SqliteRow) -> Result<StoredProduct> {
    let category_raw: String = row.get("category");
    let colors_raw: Option<String> = row.get("colors");
    let tags_raw: Option<String> = row.get("tags");

    Ok(StoredProduct {
        id: row.get("id"),
        external_id: row.get("external_id"),
        name: row.get("name"),
        brand: row.get("brand"),
        source: row.get("source"),
        product_url: row.get::<Option<String>, _>("product_url").unwrap_or_default(),
        image_url: row.get::<Option<String>, _>("image_url").unwrap_or_default(),
        category: FashionCategory::parse(&category_raw).unwrap_or(FashionCategory::Top),
        price: row.get("price"),
        original_price: row.get("original_price"),
        currency: row.get("currency"),
        colors: colors_raw
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or_default(),
        tags: tags_raw
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or_default(),
        rating: row.get("rating"),
        reviews_count: row.get("reviews_count"),
        first_seen_at: row.get("first_seen_at"),
        last_seen_at: row.get("last_seen_at"),
        is_active: row.get::<i64, _>("is_active") != 0,
    })
}
