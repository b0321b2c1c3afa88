//! trendsift CLI: sequence scrape jobs, track bestsellers, compute
//! rollups and inspect the catalog.

use std::sync::Arc;

use anyhow::{bail, Result};

use trendsift::application::orchestrator::{default_targets, ScrapeOrchestrator};
use trendsift::application::trend_tracker::{default_bestseller_collections, TrendTracker};
use trendsift::infrastructure::config::AppConfig;
use trendsift::infrastructure::http_client::HttpClient;
use trendsift::infrastructure::logging::init_logging;
use trendsift::scraping::browser::StaticBrowser;
use trendsift::scraping::selector::AdapterRegistry;
use trendsift::storage::catalog_repository::CatalogRepository;
use trendsift::storage::connection::DatabaseConnection;
use trendsift::storage::trend_repository::{RollupPeriod, TrendRepository};

const USAGE: &str = "\
trendsift — fashion catalog scraper and trend tracker

USAGE:
    trendsift <command> [options]

COMMANDS:
    scrape [--source NAME] [--demo]   Scrape all (or one) configured source
    bestsellers [--demo]              Track bestseller rankings and trends
    rollup <daily|weekly|monthly>     Recompute the trend rollup
    trending [N]                      Show the top N trending products
    stats                             Catalog statistics
    sessions [N]                      Recent scrape sessions
";

struct Context {
    config: AppConfig,
    db: DatabaseConnection,
}

impl Context {
    async fn init(demo_override: bool) -> Result<Self> {
        let mut config = AppConfig::load(None).await?;
        if demo_override {
            config.scraping.demo_mode = true;
        }
        init_logging(&config.logging)?;

        let db = DatabaseConnection::new(&config.database_url()).await?;
        db.migrate().await?;

        Ok(Self { config, db })
    }

    fn registry(&self) -> Result<AdapterRegistry> {
        let http = Arc::new(HttpClient::new(self.config.scraping.http.clone())?);
        let browser = Arc::new(StaticBrowser::new(Arc::clone(&http)));
        Ok(AdapterRegistry::new(
            http,
            browser,
            self.config.trend,
            self.config.scraping.demo_mode,
        ))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first().map(String::as_str) else {
        print!("{USAGE}");
        return Ok(());
    };

    let demo = args.iter().any(|a| a == "--demo");

    match command {
        "scrape" => {
            let ctx = Context::init(demo).await?;
            let catalog = CatalogRepository::new(ctx.db.pool().clone());
            let orchestrator =
                ScrapeOrchestrator::new(catalog, ctx.registry()?, ctx.config.clone());

            let mut targets = default_targets();
            if let Some(pos) = args.iter().position(|a| a == "--source") {
                let Some(name) = args.get(pos + 1) else {
                    bail!("--source requires a value");
                };
                targets.retain(|t| &t.name == name);
                if targets.is_empty() {
                    bail!("unknown source '{name}'");
                }
            }

            let report = orchestrator.run_batch(&targets).await?;
            println!(
                "Batch done: {}/{} sources succeeded, {} new items",
                report.sources_succeeded(),
                report.summaries.len(),
                report.total_new()
            );
            for summary in &report.summaries {
                match &summary.error {
                    Some(error) => println!("  {}: FAILED ({error})", summary.source),
                    None => println!(
                        "  {}: {} found, {} new, {} updated",
                        summary.source, summary.items_found, summary.items_new, summary.items_updated
                    ),
                }
            }
        }
        "bestsellers" => {
            let ctx = Context::init(demo).await?;
            let catalog = CatalogRepository::new(ctx.db.pool().clone());
            let trends = TrendRepository::new(ctx.db.pool().clone());
            let tracker = TrendTracker::new(catalog, trends, ctx.registry()?);

            let report = tracker.track_bestsellers(&default_bestseller_collections()).await?;
            println!("{}", TrendTracker::render_report(&report));
        }
        "rollup" => {
            let Some(period) = args.get(1).and_then(|p| RollupPeriod::parse(p)) else {
                bail!("rollup requires a period: daily, weekly or monthly");
            };
            let ctx = Context::init(false).await?;
            let trends = TrendRepository::new(ctx.db.pool().clone());
            let outcome = trends.calculate_trend_rollup(period).await?;
            println!(
                "Rollup {} ({} .. {}): {} group rows",
                outcome.period, outcome.period_start, outcome.period_end, outcome.groups
            );
        }
        "trending" => {
            let limit: i64 = args.get(1).and_then(|n| n.parse().ok()).unwrap_or(20);
            let ctx = Context::init(false).await?;
            let trends = TrendRepository::new(ctx.db.pool().clone());
            let trending = trends.top_trending(limit).await?;
            if trending.is_empty() {
                println!("No trending products tracked yet.");
            }
            for item in trending {
                println!(
                    "  {:5.1}  [{}] {} (${:.2}, {} weeks listed)",
                    item.trend_score, item.source, item.name, item.price, item.weeks_in_bestseller
                );
            }
        }
        "stats" => {
            let ctx = Context::init(false).await?;
            let catalog = CatalogRepository::new(ctx.db.pool().clone());
            let stats = catalog.get_stats().await?;
            println!("Active products: {}", stats.total_active);
            println!("Updated today:   {}", stats.updated_today);
            println!("New today:       {}", stats.new_today);
            println!("By source:");
            for (source, count) in &stats.by_source {
                println!("  {source}: {count}");
            }
            println!("By category:");
            for (category, count) in &stats.by_category {
                println!("  {category}: {count}");
            }
        }
        "sessions" => {
            let limit: i64 = args.get(1).and_then(|n| n.parse().ok()).unwrap_or(10);
            let ctx = Context::init(false).await?;
            let catalog = CatalogRepository::new(ctx.db.pool().clone());
            for session in catalog.recent_sessions(limit).await? {
                println!(
                    "  #{} {} [{}] found={} new={} updated={}{}",
                    session.id,
                    session.source,
                    session.status.as_str(),
                    session.items_found,
                    session.items_new,
                    session.items_updated,
                    session
                        .error
                        .map(|e| format!(" error={e}"))
                        .unwrap_or_default()
                );
            }
        }
        "--help" | "-h" | "help" => print!("{USAGE}"),
        other => {
            eprintln!("Unknown command '{other}'.\n");
            print!("{USAGE}");
            std::process::exit(2);
        }
    }

    Ok(())
}
