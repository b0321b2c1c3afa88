//! Ranking history, trend scores and rollups against a real SQLite file.

use tempfile::TempDir;

use trendsift::domain::item::{FashionCategory, FashionItem, RankTrend};
use trendsift::storage::catalog_repository::CatalogRepository;
use trendsift::storage::connection::DatabaseConnection;
use trendsift::storage::trend_repository::{RollupPeriod, TrendRepository};

async fn test_repos() -> (TempDir, CatalogRepository, TrendRepository) {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = format!("sqlite:{}", dir.path().join("trends.db").display());
    let db = DatabaseConnection::new(&url).await.expect("connect");
    db.migrate().await.expect("migrate");
    (
        dir,
        CatalogRepository::new(db.pool().clone()),
        TrendRepository::new(db.pool().clone()),
    )
}

fn item(external_id: &str, name: &str, price: f64, category: FashionCategory) -> FashionItem {
    let mut item = FashionItem::new(external_id, name, "Boutique Brand");
    item.price = price;
    item.category = category;
    item.product_url = format!("https://shop.example.com/products/{external_id}");
    item.colors = vec!["Coral".to_string(), "Navy".to_string()];
    item.tags = vec!["summer".to_string()];
    item
}

#[tokio::test]
async fn rank_delta_sign_convention() {
    let (_dir, catalog, trends) = test_repos().await;
    let (id, _) = catalog
        .upsert_product(&item("r-1", "Bubble", 42.0, FashionCategory::Dress), "shop")
        .await
        .unwrap();

    // No observations yet.
    assert_eq!(trends.rank_delta(&id, "shop").await.unwrap(), None);

    trends.record_ranking(&id, "shop", 5).await.unwrap();
    // One observation is still not enough for a delta.
    assert_eq!(trends.rank_delta(&id, "shop").await.unwrap(), None);

    trends.record_ranking(&id, "shop", 2).await.unwrap();
    // Sequence [5, 2]: 2 - 5 = -3, negative means improvement.
    assert_eq!(trends.rank_delta(&id, "shop").await.unwrap(), Some(-3));
}

#[tokio::test]
async fn trend_score_upsert_increments_weeks_counter() {
    let (_dir, catalog, trends) = test_repos().await;
    let (id, _) = catalog
        .upsert_product(&item("t-1", "Romper", 38.0, FashionCategory::Dress), "shop")
        .await
        .unwrap();

    trends.update_trend_score(&id, 3, None, true).await.unwrap();
    let first = trends.get_trend_score(&id).await.unwrap().unwrap();
    assert_eq!(first.rank_trend, RankTrend::New);
    assert_eq!(first.weeks_in_bestseller, 1);
    assert!((first.trend_score - 47.0).abs() < f64::EPSILON);

    // Climbed 5 positions on the next pass.
    trends.update_trend_score(&id, 2, Some(-5), false).await.unwrap();
    let second = trends.get_trend_score(&id).await.unwrap().unwrap();
    assert_eq!(second.rank_trend, RankTrend::Up);
    assert_eq!(second.weeks_in_bestseller, 2);
    assert!((second.trend_score - 58.0).abs() < f64::EPSILON);

    // Small wobble classifies as stable; counter keeps growing.
    trends.update_trend_score(&id, 4, Some(2), false).await.unwrap();
    let third = trends.get_trend_score(&id).await.unwrap().unwrap();
    assert_eq!(third.rank_trend, RankTrend::Stable);
    assert_eq!(third.weeks_in_bestseller, 3);
}

#[tokio::test]
async fn top_trending_filters_to_up_and_new() {
    let (_dir, catalog, trends) = test_repos().await;

    let (rising, _) = catalog
        .upsert_product(&item("a", "Rising Dress", 50.0, FashionCategory::Dress), "shop")
        .await
        .unwrap();
    let (fresh, _) = catalog
        .upsert_product(&item("b", "Fresh Dress", 60.0, FashionCategory::Dress), "shop")
        .await
        .unwrap();
    let (sinking, _) = catalog
        .upsert_product(&item("c", "Sinking Dress", 70.0, FashionCategory::Dress), "shop")
        .await
        .unwrap();

    trends.update_trend_score(&rising, 2, Some(-6), false).await.unwrap();
    trends.update_trend_score(&fresh, 10, None, true).await.unwrap();
    trends.update_trend_score(&sinking, 30, Some(8), false).await.unwrap();

    let top = trends.top_trending(10).await.unwrap();
    assert_eq!(top.len(), 2);
    // Ordered by score: rank 2 with a +12 bonus beats rank 10 baseline.
    assert_eq!(top[0].product_id, rising);
    assert_eq!(top[0].rank_trend, RankTrend::Up);
    assert_eq!(top[1].product_id, fresh);
    assert_eq!(top[1].rank_trend, RankTrend::New);
    assert!(!top.iter().any(|t| t.product_id == sinking));
}

#[tokio::test]
async fn consistent_bestsellers_require_min_weeks() {
    let (_dir, catalog, trends) = test_repos().await;
    let (id, _) = catalog
        .upsert_product(&item("w-1", "Evergreen Dress", 45.0, FashionCategory::Dress), "shop")
        .await
        .unwrap();

    trends.update_trend_score(&id, 1, None, true).await.unwrap();
    trends.update_trend_score(&id, 1, Some(0), false).await.unwrap();
    trends.update_trend_score(&id, 1, Some(0), false).await.unwrap();

    assert!(trends.consistent_bestsellers(3, 10).await.unwrap().iter().any(|t| t.product_id == id));
    assert!(trends.consistent_bestsellers(4, 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn rollup_groups_and_is_deterministic() {
    let (_dir, catalog, trends) = test_repos().await;

    catalog
        .upsert_product(&item("g-1", "Dress One", 40.0, FashionCategory::Dress), "shop")
        .await
        .unwrap();
    catalog
        .upsert_product(&item("g-2", "Dress Two", 60.0, FashionCategory::Dress), "shop")
        .await
        .unwrap();
    catalog
        .upsert_product(&item("g-3", "Boots", 120.0, FashionCategory::Shoes), "shop")
        .await
        .unwrap();

    let first = trends.calculate_trend_rollup(RollupPeriod::Weekly).await.unwrap();
    assert_eq!(first.groups, 2);

    let rows_first = trends.get_trends(RollupPeriod::Weekly, None, None, 50).await.unwrap();
    let dress_row = rows_first
        .iter()
        .find(|r| r.category == "dress")
        .expect("dress group present");
    assert_eq!(dress_row.total_products, 2);
    assert_eq!(dress_row.new_products, 2);
    assert!((dress_row.avg_price - 50.0).abs() < f64::EPSILON);
    assert!((dress_row.min_price - 40.0).abs() < f64::EPSILON);
    assert!((dress_row.max_price - 60.0).abs() < f64::EPSILON);
    assert!(dress_row.top_colors.contains(&"Coral".to_string()));
    assert!(dress_row.top_tags.contains(&"summer".to_string()));

    // Re-running in the same period with no catalog changes replaces, not
    // accumulates: identical aggregates, same row count.
    let second = trends.calculate_trend_rollup(RollupPeriod::Weekly).await.unwrap();
    assert_eq!(second.groups, 2);
    let rows_second = trends.get_trends(RollupPeriod::Weekly, None, None, 50).await.unwrap();
    assert_eq!(rows_first.len(), rows_second.len());
    let dress_again = rows_second.iter().find(|r| r.category == "dress").unwrap();
    assert_eq!(dress_again.total_products, dress_row.total_products);
    assert!((dress_again.avg_price - dress_row.avg_price).abs() < f64::EPSILON);
}

#[tokio::test]
async fn rollup_on_empty_catalog_yields_no_groups() {
    let (_dir, _catalog, trends) = test_repos().await;
    let outcome = trends.calculate_trend_rollup(RollupPeriod::Daily).await.unwrap();
    assert_eq!(outcome.groups, 0);
    assert!(trends.get_trends(RollupPeriod::Daily, None, None, 10).await.unwrap().is_empty());
}
