//! End-to-end pipeline checks: feed pagination against a local HTTP
//! fixture, and a full demo-mode batch through the orchestrator.

use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};

use trendsift::application::orchestrator::{ScrapeOrchestrator, ScrapeTarget, SourceKind};
use trendsift::domain::catalog::ProductQuery;
use trendsift::extraction::trend::TrendWeights;
use trendsift::infrastructure::config::AppConfig;
use trendsift::infrastructure::http_client::{HttpClient, HttpClientConfig};
use trendsift::scraping::adapter::SourceAdapter;
use trendsift::scraping::browser::StaticBrowser;
use trendsift::scraping::feed::ShopifyAdapter;
use trendsift::scraping::selector::AdapterRegistry;
use trendsift::storage::catalog_repository::CatalogRepository;
use trendsift::storage::connection::DatabaseConnection;

const PAGE_ONE: &str = r#"{"products":[
  {"id":1,"title":"Smocked Bubble","handle":"smocked-bubble","vendor":"Fixture Kids",
   "product_type":"dress","tags":["color_navy","heirloom"],
   "variants":[{"price":"48.00","compare_at_price":"62.00","option1":"Navy","inventory_quantity":4,"available":true}],
   "images":[{"src":"https://cdn.example.com/1.jpg"}]},
  {"id":2,"title":"Pima Playsuit","handle":"pima-playsuit","vendor":"Fixture Kids",
   "product_type":"","tags":[],
   "variants":[{"price":"36.00","compare_at_price":null,"option1":"Sage","inventory_quantity":50,"available":true}],
   "images":[{"src":"https://cdn.example.com/2.jpg"}]},
  {"id":3,"title":"Gingham Shortall","handle":"gingham-shortall","vendor":"Fixture Kids",
   "product_type":"","tags":["best-seller"],
   "variants":[{"price":"44.00","compare_at_price":"40.00","option1":"Red","inventory_quantity":2,"available":true}],
   "images":[{"src":"https://cdn.example.com/3.jpg"}]}
]}"#;

const EMPTY_PAGE: &str = r#"{"products":[]}"#;

/// Minimal one-shot HTTP fixture: serves page 1 with three products and
/// every later page empty.
async fn spawn_feed_server() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            tokio::spawn(async move {
                let mut buf = vec![0u8; 8192];
                let n = socket.read(&mut buf).await.unwrap_or(0);
                let request = String::from_utf8_lossy(&buf[..n]);
                let body = if request.contains("page=1") { PAGE_ONE } else { EMPTY_PAGE };
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    format!("http://{addr}")
}

#[tokio::test]
async fn feed_pagination_stops_on_empty_page() {
    let base = spawn_feed_server().await;
    let http = Arc::new(HttpClient::new(HttpClientConfig::default()).unwrap());
    let adapter = ShopifyAdapter::new(http, TrendWeights::default());

    let url = format!("{base}/collections/all");
    let items = adapter.scrape(&url, 50, None).await.unwrap();

    // Page 1 has 3 items, page 2 is empty: exactly 3, pagination stopped.
    assert_eq!(items.len(), 3);

    let bubble = items.iter().find(|i| i.external_id == "1").unwrap();
    assert!((bubble.price - 48.0).abs() < f64::EPSILON);
    assert_eq!(bubble.original_price, Some(62.0));
    assert!(bubble.colors.contains(&"Navy".to_string()));

    // Compare-at below current price is not a markdown.
    let shortall = items.iter().find(|i| i.external_id == "3").unwrap();
    assert_eq!(shortall.original_price, None);
}

#[tokio::test]
async fn feed_respects_max_items() {
    let base = spawn_feed_server().await;
    let http = Arc::new(HttpClient::new(HttpClientConfig::default()).unwrap());
    let adapter = ShopifyAdapter::new(http, TrendWeights::default());

    let url = format!("{base}/collections/all");
    let items = adapter.scrape(&url, 2, None).await.unwrap();
    assert_eq!(items.len(), 2);
}

#[tokio::test]
async fn demo_batch_flows_into_the_store() {
    let dir = tempfile::tempdir().unwrap();
    let db_url = format!("sqlite:{}", dir.path().join("pipeline.db").display());
    let db = DatabaseConnection::new(&db_url).await.unwrap();
    db.migrate().await.unwrap();
    let catalog = CatalogRepository::new(db.pool().clone());

    let mut config = AppConfig::default();
    config.scraping.demo_mode = true;
    config.scraping.inter_source_delay_ms = 0;

    let http = Arc::new(HttpClient::new(config.scraping.http.clone()).unwrap());
    let browser = Arc::new(StaticBrowser::new(Arc::clone(&http)));
    let registry = AdapterRegistry::new(http, browser, config.trend, true);

    let orchestrator = ScrapeOrchestrator::new(catalog.clone(), registry, config);

    let targets = vec![
        ScrapeTarget::new("demo-feed", "https://shop-one.example.com", SourceKind::Feed, 8),
        ScrapeTarget::new("demo-spa", "https://shop-two.example.com", SourceKind::Rendered, 5),
    ];
    let report = orchestrator.run_batch(&targets).await.unwrap();

    assert_eq!(report.sources_succeeded(), 2);
    assert_eq!(report.sources_failed(), 0);

    let feed_summary = report.summaries.iter().find(|s| s.source == "demo-feed").unwrap();
    assert_eq!(feed_summary.items_found, 8);
    assert_eq!(feed_summary.items_new, 8);

    // Second run over the same synthetic catalog updates instead of
    // inserting.
    let report = orchestrator.run_batch(&targets).await.unwrap();
    let feed_summary = report.summaries.iter().find(|s| s.source == "demo-feed").unwrap();
    assert_eq!(feed_summary.items_new, 0);
    assert_eq!(feed_summary.items_updated, 8);

    let page = catalog.query_products(&ProductQuery::active()).await.unwrap();
    assert_eq!(page.total_count, 13);

    let sessions = catalog.recent_sessions(10).await.unwrap();
    assert_eq!(sessions.len(), 4);
    assert!(sessions.iter().all(|s| s.status.as_str() == "completed"));
}
