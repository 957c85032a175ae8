use anyhow::{Context, Result};
use ratescraper::{
    adapter::TableAdapter,
    config::Config,
    crawl::Crawler,
    fetch::{Fetch, FetchClient},
    store::{MemoryStore, Store},
};
use std::{env, sync::Arc};
use tokio::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,ratescraper=info"));
    fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
    info!("startup");

    // ─── 2) load config ──────────────────────────────────────────────
    let path = env::args()
        .nth(1)
        .or_else(|| env::var("RATESCRAPER_CONFIG").ok());
    let config = match path {
        Some(p) => Config::load(&p)?,
        None => {
            warn!("no config given; running with defaults and no sources");
            Config::default()
        }
    };

    // ─── 3) register one adapter per source ──────────────────────────
    let fetcher: Arc<dyn Fetch> =
        Arc::new(FetchClient::new(&config.fetch).context("building fetch client")?);
    let mut crawler = Crawler::new(config.crawl.sink_capacity);
    for source in config.sources {
        crawler.register(Arc::new(TableAdapter::new(
            source,
            Arc::clone(&fetcher),
            config.dates.two_digit_year_pivot,
        )));
    }
    info!(sources = crawler.len(), "adapters registered");

    // ─── 4) crawl into the store ─────────────────────────────────────
    let start = Instant::now();
    let store = MemoryStore::new();
    let (report, stats) = crawler.run_into(&store).await?;
    info!(
        records = report.records.len(),
        failed = report.failed_sources.len(),
        inserted = stats.inserted,
        elapsed = ?start.elapsed(),
        "cycle complete"
    );

    // ─── 5) print snapshot ───────────────────────────────────────────
    let snapshot = store.get_all().await?;
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}
