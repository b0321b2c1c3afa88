//! Trend repository: ranking history, per-product trend scores and the
//! periodic rollups.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use chrono::{Datelike, Duration, NaiveDate, Utc};
use serde::Serialize;
use sqlx::{Row, SqlitePool};
use tracing::debug;

use crate::domain::catalog::{RankingObservation, TrendRollup, TrendScoreRecord};
use crate::domain::item::RankTrend;

/// Rank movement beyond this many positions counts as a real trend, not
/// noise.
const RANK_TREND_THRESHOLD: i64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RollupPeriod {
    Daily,
    Weekly,
    Monthly,
}

impl RollupPeriod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "daily" => Some(Self::Daily),
            "weekly" => Some(Self::Weekly),
            "monthly" => Some(Self::Monthly),
            _ => None,
        }
    }

    /// Date window for the current period. Weekly runs Monday through
    /// Sunday; monthly covers the calendar month.
    pub fn window(self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        match self {
            Self::Daily => (today, today),
            Self::Weekly => {
                let start = today - Duration::days(i64::from(today.weekday().num_days_from_monday()));
                (start, start + Duration::days(6))
            }
            Self::Monthly => {
                let start = today.with_day(1).expect("first of month is valid");
                let next_month = if start.month() == 12 {
                    NaiveDate::from_ymd_opt(start.year() + 1, 1, 1)
                } else {
                    NaiveDate::from_ymd_opt(start.year(), start.month() + 1, 1)
                }
                .expect("first of next month is valid");
                (start, next_month - Duration::days(1))
            }
        }
    }
}

/// Summary returned by a rollup computation.
#[derive(Debug, Clone, Serialize)]
pub struct RollupOutcome {
    pub period: String,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub groups: usize,
}

/// A trending product joined with its catalog row.
#[derive(Debug, Clone, Serialize)]
pub struct TrendingProduct {
    pub product_id: String,
    pub name: String,
    pub price: f64,
    pub source: String,
    pub image_url: String,
    pub product_url: String,
    pub trend_score: f64,
    pub rank_trend: RankTrend,
    pub weeks_in_bestseller: i64,
}

/// Base score from list position plus a bonus for upward movement. Rank 1
/// scores 49; anything past rank 50 bottoms out at 0.
pub fn ranking_score(rank: i64, rank_delta: Option<i64>) -> f64 {
    let base = (50 - rank).max(0) as f64;
    let bonus = rank_delta.map_or(0.0, |delta| (-delta * 2) as f64);
    base + bonus
}

/// Movement classification; deltas within the threshold are stable.
pub fn classify_rank_trend(is_new: bool, rank_delta: Option<i64>) -> RankTrend {
    if is_new {
        return RankTrend::New;
    }
    match rank_delta {
        Some(delta) if delta < -RANK_TREND_THRESHOLD => RankTrend::Up,
        Some(delta) if delta > RANK_TREND_THRESHOLD => RankTrend::Down,
        _ => RankTrend::Stable,
    }
}

#[derive(Clone)]
pub struct TrendRepository {
    pool: Arc<SqlitePool>,
}

impl TrendRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    // ===============================
    // RANKINGS
    // ===============================

    /// Append one ranking observation.
    pub async fn record_ranking(&self, product_id: &str, source: &str, rank: i64) -> Result<()> {
        sqlx::query(
            "INSERT INTO bestseller_rankings (product_id, source, rank, recorded_at) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(product_id)
        .bind(source)
        .bind(rank)
        .bind(Utc::now())
        .execute(&*self.pool)
        .await?;
        Ok(())
    }

    /// Change between the two most recent observations for the pair:
    /// `current − previous`, negative meaning the item climbed. None until
    /// two observations exist.
    pub async fn rank_delta(&self, product_id: &str, source: &str) -> Result<Option<i64>> {
        let ranks: Vec<i64> = sqlx::query_scalar(
            "SELECT rank FROM bestseller_rankings \
             WHERE product_id = ? AND source = ? \
             ORDER BY recorded_at DESC, id DESC LIMIT 2",
        )
        .bind(product_id)
        .bind(source)
        .fetch_all(&*self.pool)
        .await?;

        if ranks.len() >= 2 {
            Ok(Some(ranks[0] - ranks[1]))
        } else {
            Ok(None)
        }
    }

    pub async fn ranking_history(
        &self,
        product_id: &str,
        source: &str,
        limit: i64,
    ) -> Result<Vec<RankingObservation>> {
        let rows = sqlx::query(
            "SELECT id, product_id, source, rank, recorded_at FROM bestseller_rankings \
             WHERE product_id = ? AND source = ? ORDER BY recorded_at DESC, id DESC LIMIT ?",
        )
        .bind(product_id)
        .bind(source)
        .bind(limit)
        .fetch_all(&*self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| RankingObservation {
                id: row.get("id"),
                product_id: row.get("product_id"),
                source: row.get("source"),
                rank: row.get("rank"),
                recorded_at: row.get("recorded_at"),
            })
            .collect())
    }

    // ===============================
    // TREND SCORES
    // ===============================

    /// Upsert the single trend record for a product. First insert starts
    /// the weeks counter at 1; every later upsert replaces score/trend and
    /// increments the counter.
    pub async fn update_trend_score(
        &self,
        product_id: &str,
        rank: i64,
        rank_delta: Option<i64>,
        is_new: bool,
    ) -> Result<()> {
        let score = ranking_score(rank, rank_delta);
        let trend = classify_rank_trend(is_new, rank_delta);

        sqlx::query(
            r#"
            INSERT INTO trend_scores (product_id, trend_score, rank_trend, weeks_in_bestseller, last_updated)
            VALUES (?, ?, ?, 1, ?)
            ON CONFLICT(product_id) DO UPDATE SET
                trend_score = excluded.trend_score,
                rank_trend = excluded.rank_trend,
                weeks_in_bestseller = weeks_in_bestseller + 1,
                last_updated = excluded.last_updated
            "#,
        )
        .bind(product_id)
        .bind(score)
        .bind(trend.as_str())
        .bind(Utc::now())
        .execute(&*self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_trend_score(&self, product_id: &str) -> Result<Option<TrendScoreRecord>> {
        let row = sqlx::query(
            "SELECT product_id, trend_score, rank_trend, weeks_in_bestseller, last_updated \
             FROM trend_scores WHERE product_id = ?",
        )
        .bind(product_id)
        .fetch_optional(&*self.pool)
        .await?;

        Ok(row.map(|row| TrendScoreRecord {
            product_id: row.get("product_id"),
            trend_score: row.get("trend_score"),
            rank_trend: RankTrend::parse(row.get::<String, _>("rank_trend").as_str())
                .unwrap_or(RankTrend::Stable),
            weeks_in_bestseller: row.get("weeks_in_bestseller"),
            last_updated: row.get("last_updated"),
        }))
    }

    /// Strongest movers: products currently trending up or newly ranked,
    /// ordered by score.
    pub async fn top_trending(&self, limit: i64) -> Result<Vec<TrendingProduct>> {
        let rows = sqlx::query(
            r#"
            SELECT p.id, p.name, p.price, p.source, p.image_url, p.product_url,
                   t.trend_score, t.rank_trend, t.weeks_in_bestseller
            FROM trend_scores t
            JOIN products p ON t.product_id = p.id
            WHERE t.rank_trend IN ('up', 'new')
            ORDER BY t.trend_score DESC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&*self.pool)
        .await?;

        Ok(rows.into_iter().map(|row| trending_from_row(&row)).collect())
    }

    /// Products that have held a bestseller slot for at least `min_weeks`
    /// tracking passes.
    pub async fn consistent_bestsellers(&self, min_weeks: i64, limit: i64) -> Result<Vec<TrendingProduct>> {
        let rows = sqlx::query(
            r#"
            SELECT p.id, p.name, p.price, p.source, p.image_url, p.product_url,
                   t.trend_score, t.rank_trend, t.weeks_in_bestseller
            FROM trend_scores t
            JOIN products p ON t.product_id = p.id
            WHERE t.weeks_in_bestseller >= ?
            ORDER BY t.weeks_in_bestseller DESC, t.trend_score DESC
            LIMIT ?
            "#,
        )
        .bind(min_weeks)
        .bind(limit)
        .fetch_all(&*self.pool)
        .await?;

        Ok(rows.into_iter().map(|row| trending_from_row(&row)).collect())
    }

    // ===============================
    // ROLLUPS
    // ===============================

    /// Compute and store the rollup for the current period. Rows replace
    /// on the natural key, so re-running within the same period with an
    /// unchanged catalog is deterministic.
    pub async fn calculate_trend_rollup(&self, period: RollupPeriod) -> Result<RollupOutcome> {
        let today = Utc::now().date_naive();
        let (start, end) = period.window(today);

        let groups = sqlx::query(
            r#"
            SELECT source, category, brand,
                   COUNT(*) as total_products,
                   SUM(CASE WHEN date(first_seen_at) >= ? THEN 1 ELSE 0 END) as new_products,
                   AVG(price) as avg_price,
                   MIN(price) as min_price,
                   MAX(price) as max_price
            FROM products
            WHERE is_active = 1 AND date(last_seen_at) >= ?
            GROUP BY source, category, brand
            "#,
        )
        .bind(start)
        .bind(start)
        .fetch_all(&*self.pool)
        .await?;

        let mut stored = 0usize;
        for group in &groups {
            let source: String = group.get("source");
            let category: String = group.get("category");
            let brand: String = group.get("brand");

            let (top_colors, top_tags) = self.top_attributes(&source, &category, &brand).await?;

            let avg_price: Option<f64> = group.get("avg_price");
            let avg_price = avg_price.map(|p| (p * 100.0).round() / 100.0).unwrap_or(0.0);

            sqlx::query(
                r#"
                INSERT OR REPLACE INTO trends (
                    period, period_start, period_end, source, category, brand,
                    total_products, new_products, avg_price, min_price, max_price,
                    top_colors, top_tags, created_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(period.as_str())
            .bind(start)
            .bind(end)
            .bind(&source)
            .bind(&category)
            .bind(&brand)
            .bind(group.get::<i64, _>("total_products"))
            .bind(group.get::<i64, _>("new_products"))
            .bind(avg_price)
            .bind(group.get::<Option<f64>, _>("min_price").unwrap_or(0.0))
            .bind(group.get::<Option<f64>, _>("max_price").unwrap_or(0.0))
            .bind(serde_json::to_string(&top_colors)?)
            .bind(serde_json::to_string(&top_tags)?)
            .bind(Utc::now())
            .execute(&*self.pool)
            .await?;
            stored += 1;
        }

        debug!("Rollup {} stored {} group rows", period.as_str(), stored);

        Ok(RollupOutcome {
            period: period.as_str().to_string(),
            period_start: start,
            period_end: end,
            groups: stored,
        })
    }

    /// Top-5 colors and top-10 tags by frequency within a group. Empty
    /// groups yield empty lists, never an error.
    async fn top_attributes(
        &self,
        source: &str,
        category: &str,
        brand: &str,
    ) -> Result<(Vec<String>, Vec<String>)> {
        let rows = sqlx::query(
            "SELECT colors, tags FROM products \
             WHERE source = ? AND category = ? AND brand = ? AND is_active = 1",
        )
        .bind(source)
        .bind(category)
        .bind(brand)
        .fetch_all(&*self.pool)
        .await?;

        let mut color_counts: HashMap<String, usize> = HashMap::new();
        let mut tag_counts: HashMap<String, usize> = HashMap::new();

        for row in rows {
            let colors: Vec<String> = row
                .get::<Option<String>, _>("colors")
                .as_deref()
                .and_then(|raw| serde_json::from_str(raw).ok())
                .unwrap_or_default();
            let tags: Vec<String> = row
                .get::<Option<String>, _>("tags")
                .as_deref()
                .and_then(|raw| serde_json::from_str(raw).ok())
                .unwrap_or_default();

            for color in colors {
                *color_counts.entry(color).or_insert(0) += 1;
            }
            for tag in tags {
                *tag_counts.entry(tag).or_insert(0) += 1;
            }
        }

        Ok((top_n(color_counts, 5), top_n(tag_counts, 10)))
    }

    pub async fn get_trends(
        &self,
        period: RollupPeriod,
        source: Option<&str>,
        category: Option<&str>,
        limit: i64,
    ) -> Result<Vec<TrendRollup>> {
        let mut sql = String::from(
            "SELECT period, period_start, period_end, source, category, brand, \
             total_products, new_products, avg_price, min_price, max_price, \
             top_colors, top_tags FROM trends WHERE period = ?",
        );
        if source.is_some() {
            sql.push_str(" AND source = ?");
        }
        if category.is_some() {
            sql.push_str(" AND category = ?");
        }
        sql.push_str(" ORDER BY period_start DESC, total_products DESC LIMIT ?");

        let mut q = sqlx::query(&sql).bind(period.as_str());
        if let Some(source) = source {
            q = q.bind(source);
        }
        if let Some(category) = category {
            q = q.bind(category);
        }
        q = q.bind(limit);

        let rows = q.fetch_all(&*self.pool).await?;

        Ok(rows
            .into_iter()
            .map(|row| TrendRollup {
                period: row.get("period"),
                period_start: row.get("period_start"),
                period_end: row.get("period_end"),
                source: row.get::<Option<String>, _>("source").unwrap_or_default(),
                category: row.get::<Option<String>, _>("category").unwrap_or_default(),
                brand: row.get::<Option<String>, _>("brand").unwrap_or_default(),
                total_products: row.get("total_products"),
                new_products: row.get("new_products"),
                avg_price: row.get::<Option<f64>, _>("avg_price").unwrap_or(0.0),
                min_price: row.get::<Option<f64>, _>("min_price").unwrap_or(0.0),
                max_price: row.get::<Option<f64>, _>("max_price").unwrap_or(0.0),
                top_colors: row
                    .get::<Option<String>, _>("top_colors")
                    .as_deref()
                    .and_then(|raw| serde_json::from_str(raw).ok())
                    .unwrap_or_default(),
                top_tags: row
                    .get::<Option<String>, _>("top_tags")
                    .as_deref()
                    .and_then(|raw| serde_json::from_str(raw).ok())
                    .unwrap_or_default(),
            })
            .collect())
    }
}

fn trending_from_row(row: &sqlx::sqlite::SqliteRow) -> TrendingProduct {
    TrendingProduct {
        product_id: row.get("id"),
        name: row.get("name"),
        price: row.get("price"),
        source: row.get("source"),
        image_url: row.get::<Option<String>, _>("image_url").unwrap_or_default(),
        product_url: row.get::<Option<String>, _>("product_url").unwrap_or_default(),
        trend_score: row.get("trend_score"),
        rank_trend: RankTrend::parse(row.get::<String, _>("rank_trend").as_str())
            .unwrap_or(RankTrend::Stable),
        weeks_in_bestseller: row.get("weeks_in_bestseller"),
    }
}

/// Highest-frequency keys, count-descending with alphabetical tie-break so
/// rollups stay deterministic.
fn top_n(counts: HashMap<String, usize>, n: usize) -> Vec<String> {
    let mut entries: Vec<(String, usize)> = counts.into_iter().collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    entries.into_iter().take(n).map(|(key, _)| key).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rank_score_baseline_and_bonus() {
        assert!((ranking_score(1, None) - 49.0).abs() < f64::EPSILON);
        assert!((ranking_score(50, None) - 0.0).abs() < f64::EPSILON);
        assert!((ranking_score(60, None) - 0.0).abs() < f64::EPSILON);
        // Climbed 5 positions: +10 bonus.
        assert!((ranking_score(10, Some(-5)) - 50.0).abs() < f64::EPSILON);
        // Fell 4 positions: -8.
        assert!((ranking_score(10, Some(4)) - 32.0).abs() < f64::EPSILON);
    }

    #[test]
    fn rank_trend_classification() {
        assert_eq!(classify_rank_trend(true, None), RankTrend::New);
        assert_eq!(classify_rank_trend(false, Some(-4)), RankTrend::Up);
        assert_eq!(classify_rank_trend(false, Some(4)), RankTrend::Down);
        assert_eq!(classify_rank_trend(false, Some(-3)), RankTrend::Stable);
        assert_eq!(classify_rank_trend(false, Some(3)), RankTrend::Stable);
        assert_eq!(classify_rank_trend(false, None), RankTrend::Stable);
    }

    #[test]
    fn period_windows() {
        let wednesday = NaiveDate::from_ymd_opt(2026, 8, 5).unwrap();
        assert_eq!(RollupPeriod::Daily.window(wednesday), (wednesday, wednesday));

        let (week_start, week_end) = RollupPeriod::Weekly.window(wednesday);
        assert_eq!(week_start, NaiveDate::from_ymd_opt(2026, 8, 3).unwrap());
        assert_eq!(week_end, NaiveDate::from_ymd_opt(2026, 8, 9).unwrap());

        let (month_start, month_end) = RollupPeriod::Monthly.window(wednesday);
        assert_eq!(month_start, NaiveDate::from_ymd_opt(2026, 8, 1).unwrap());
        assert_eq!(month_end, NaiveDate::from_ymd_opt(2026, 8, 31).unwrap());

        let december = NaiveDate::from_ymd_opt(2026, 12, 15).unwrap();
        let (_, december_end) = RollupPeriod::Monthly.window(december);
        assert_eq!(december_end, NaiveDate::from_ymd_opt(2026, 12, 31).unwrap());
    }

    #[test]
    fn top_n_is_deterministic_on_ties() {
        let mut counts = HashMap::new();
        counts.insert("Navy".to_string(), 2);
        counts.insert("Coral".to_string(), 2);
        counts.insert("Sage".to_string(), 1);
        assert_eq!(top_n(counts, 2), vec!["Coral".to_string(), "Navy".to_string()]);
    }
}
