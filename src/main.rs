mod input;
mod models;
mod proxy;
mod scrapers;
mod sink;

use input::resolve_postal_code;
use proxy::ProxyProvider;
use scrapers::{IdealistaBrowserScraper, ListingScraper, ScrapeConfig, StealthProfile};
use sink::{emit_record, DatasetSink, LocalFileSink};
use tracing::{info, warn, Level};
use tracing_subscriber;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    info!("🏠 Idealista Scout - Listing Page Scraper");
    info!("==========================================");

    let input = read_input().await;
    let codigo_postal = resolve_postal_code(input.as_ref());

    let config = ScrapeConfig {
        profile: StealthProfile::from_env(),
        ..ScrapeConfig::default()
    };

    let proxy = ProxyProvider::from_env().acquire().await;

    let scraper = IdealistaBrowserScraper::new(config, proxy);
    info!("Scraping {} para CP {codigo_postal}...", scraper.source_name());
    let record = scraper.scrape_postal_code(&codigo_postal).await;

    let dataset = DatasetSink::from_env();
    let local = LocalFileSink::default_dir();
    emit_record(&dataset, &local, &record).await?;

    Ok(())
}

/// Input object from the hosting platform, if one was provided.
async fn read_input() -> Option<serde_json::Value> {
    let path = std::env::var("SCOUT_INPUT_PATH").unwrap_or_else(|_| "input.json".to_string());
    let raw = match tokio::fs::read_to_string(&path).await {
        Ok(raw) => raw,
        Err(_) => {
            info!("Sin fichero de input en {path}; se usan los valores por defecto");
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!("Input ilegible en {path} ({err}); se usan los valores por defecto");
            None
        }
    }
}
