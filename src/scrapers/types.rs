use crate::scrapers::stealth::StealthProfile;

/// Listing search URL, parameterized by postal code
pub const IDEALISTA_URL_TEMPLATE: &str = "https://www.idealista.com/geo/venta-viviendas/codigo-postal-{codigo_postal}/con-de-tres-dormitorios/pagina-1";

pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/129.0.0.0 Safari/537.36";

/// Immutable configuration for one scrape run.
///
/// Everything the navigation procedure depends on lives here so tests can
/// substitute their own values instead of reaching for module state.
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    pub url_template: String,
    pub headless: bool,
    pub viewport: (u32, u32),
    pub user_agent: String,
    pub locale: String,
    pub timezone: String,
    /// Latitude, longitude, accuracy in meters
    pub geolocation: (f64, f64, f64),
    pub profile: StealthProfile,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            url_template: IDEALISTA_URL_TEMPLATE.to_string(),
            headless: true,
            viewport: (1920, 1080),
            user_agent: USER_AGENT.to_string(),
            locale: "es-ES".to_string(),
            timezone: "Europe/Madrid".to_string(),
            // Central Madrid
            geolocation: (40.4168, -3.7038, 50.0),
            profile: StealthProfile::hardened(),
        }
    }
}

impl ScrapeConfig {
    /// Target URL for a postal code: the template with the placeholder
    /// substituted exactly once.
    pub fn listing_url(&self, codigo_postal: &str) -> String {
        self.url_template.replacen("{codigo_postal}", codigo_postal, 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_url_substitutes_postal_code_once() {
        let config = ScrapeConfig::default();
        let url = config.listing_url("28002");
        assert_eq!(
            url,
            "https://www.idealista.com/geo/venta-viviendas/codigo-postal-28002/con-de-tres-dormitorios/pagina-1"
        );
        assert!(!url.contains("{codigo_postal}"));
    }

    #[test]
    fn listing_url_alters_nothing_else() {
        let config = ScrapeConfig {
            url_template: "https://example.com/{codigo_postal}/x/{codigo_postal}".to_string(),
            ..ScrapeConfig::default()
        };
        // only the first placeholder is touched
        assert_eq!(
            config.listing_url("08001"),
            "https://example.com/08001/x/{codigo_postal}"
        );
    }
}
