use crate::models::ScrapeRecord;
use async_trait::async_trait;

/// Common trait for all listing scrapers
/// This allows easy addition of new portals (Fotocasa, pisos.com, etc) in the future
#[async_trait]
pub trait ListingScraper: Send + Sync {
    /// Run one scrape against a postal code, always yielding a record
    async fn scrape_postal_code(&self, codigo_postal: &str) -> ScrapeRecord;

    /// Get the name of the scraper source
    fn source_name(&self) -> &'static str;
}
