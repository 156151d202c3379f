use std::collections::HashMap;
use std::ffi::OsStr;
use std::sync::Arc;
use std::thread;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use headless_chrome::protocol::cdp::Emulation::{
    SetGeolocationOverride, SetLocaleOverride, SetTimezoneOverride,
};
use headless_chrome::protocol::cdp::Page;
use headless_chrome::{Browser, LaunchOptions, Tab};
use scraper::{Html, Selector};
use tracing::{debug, error, info, warn};

use crate::models::ScrapeRecord;
use crate::proxy::ProxyConfig;
use crate::scrapers::stealth::{is_challenge_title, ContentMissPolicy, ScrollStrategy};
use crate::scrapers::traits::ListingScraper;
use crate::scrapers::types::ScrapeConfig;

/// How the HTTP status of the initial navigation was classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Denial {
    Blocked,
    HttpError,
}

/// 403 and 429 are what the anti-bot layer answers with, so they count as
/// blocks; every other 4xx/5xx is a plain HTTP error.
pub(crate) fn classify_status(status: i64) -> Option<Denial> {
    match status {
        403 | 429 => Some(Denial::Blocked),
        s if s >= 400 => Some(Denial::HttpError),
        _ => None,
    }
}

/// Where the content wait ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContentWait {
    Ready,
    ChallengeSuspected,
    ProceedingAnyway,
}

enum Outcome {
    Captured {
        html: String,
        items_count: Option<usize>,
    },
    Denied {
        denial: Denial,
        status_code: i64,
    },
}

/// Browser-based scraper for one Idealista listing page.
///
/// Each call launches a fresh Chrome, runs the navigate/wait/scroll/capture
/// sequence once, and always yields exactly one [`ScrapeRecord`]. The
/// browser process is tied to a scope-local value, so it is released on
/// every exit path, including errors.
pub struct IdealistaBrowserScraper {
    config: ScrapeConfig,
    proxy: Option<ProxyConfig>,
}

impl IdealistaBrowserScraper {
    pub fn new(config: ScrapeConfig, proxy: Option<ProxyConfig>) -> Self {
        Self { config, proxy }
    }

    /// Run the scrape for a postal code. Infallible by design: any error in
    /// the sequence becomes an `error` record here, at the outermost scope.
    pub fn scrape(&self, codigo_postal: &str) -> ScrapeRecord {
        let url = self.config.listing_url(codigo_postal);
        info!(
            "Iniciando scrape para CP {codigo_postal} (perfil {})",
            self.config.profile.name
        );

        match self.try_scrape(&url) {
            Ok(Outcome::Captured { html, items_count }) => {
                info!("Scrape completado para {codigo_postal}");
                ScrapeRecord::success(codigo_postal, &url, html, items_count)
            }
            Ok(Outcome::Denied {
                denial: Denial::Blocked,
                status_code,
            }) => {
                warn!("Acceso bloqueado (HTTP {status_code}) durante la carga de {url}");
                ScrapeRecord::blocked(codigo_postal, &url, status_code)
            }
            Ok(Outcome::Denied {
                denial: Denial::HttpError,
                status_code,
            }) => {
                warn!("Respuesta HTTP {status_code} durante la carga de {url}");
                ScrapeRecord::http_error(codigo_postal, &url, status_code)
            }
            Err(err) => {
                error!("Error durante el scrape: {err:#}");
                ScrapeRecord::error(codigo_postal, &url, &format!("{err:#}"))
            }
        }
    }

    fn try_scrape(&self, url: &str) -> Result<Outcome> {
        let browser = self.launch()?;
        let tab = browser.new_tab()?;
        self.prepare_tab(&tab)?;

        tab.set_default_timeout(self.config.profile.navigation_timeout);
        tab.navigate_to(url)?;
        tab.wait_until_navigated()?;

        let status = navigation_status(&tab)?;
        if status == 0 {
            bail!("No se recibio respuesta HTTP inicial");
        }
        if let Some(denial) = classify_status(status) {
            return Ok(Outcome::Denied {
                denial,
                status_code: status,
            });
        }

        self.await_content(&tab)?;
        self.scroll(&tab)?;

        let html = tab.get_content().context("Failed to capture page HTML")?;
        let items_count = self
            .config
            .profile
            .count_items
            .then(|| count_items(&html, self.config.profile.content_selector));

        Ok(Outcome::Captured { html, items_count })
    }

    fn launch(&self) -> Result<Browser> {
        info!("Launching headless Chrome...");

        let ua_arg = format!("--user-agent={}", self.config.user_agent);
        let lang_arg = format!("--lang={}", self.config.locale);
        let proxy_arg = self.proxy.as_ref().map(ProxyConfig::chrome_arg);

        let mut args = vec![
            OsStr::new("--disable-blink-features=AutomationControlled"),
            OsStr::new("--disable-infobars"),
        ];
        args.push(OsStr::new(&ua_arg));
        args.push(OsStr::new(&lang_arg));
        if let Some(arg) = proxy_arg.as_deref() {
            info!("Navegando a traves de proxy");
            args.push(OsStr::new(arg));
        }

        let options = LaunchOptions::default_builder()
            .headless(self.config.headless)
            .window_size(Some(self.config.viewport))
            .args(args)
            .build()
            .context("Failed to build launch options")?;

        Browser::new(options).context("Failed to launch Chrome browser")
    }

    /// Stealth injection and fingerprint overrides, before any navigation.
    fn prepare_tab(&self, tab: &Arc<Tab>) -> Result<()> {
        let profile = &self.config.profile;

        tab.call_method(Page::AddScriptToEvaluateOnNewDocument {
            source: profile.init_script.to_string(),
            world_name: None,
            include_command_line_api: None,
            run_immediately: None,
        })?;

        tab.call_method(SetTimezoneOverride {
            timezone_id: self.config.timezone.clone(),
        })?;
        tab.call_method(SetLocaleOverride {
            locale: Some(self.config.locale.clone()),
        })?;
        let (latitude, longitude, accuracy) = self.config.geolocation;
        tab.call_method(SetGeolocationOverride {
            latitude: Some(latitude),
            longitude: Some(longitude),
            accuracy: Some(accuracy),
            altitude: None,
            altitude_accuracy: None,
            heading: None,
            speed: None,
        })?;

        let accept_language = profile
            .headers
            .iter()
            .find(|(name, _)| *name == "Accept-Language")
            .map(|(_, value)| *value);
        tab.set_user_agent(&self.config.user_agent, accept_language, Some("Win32"))?;

        let headers: HashMap<&str, &str> = profile.headers.iter().copied().collect();
        tab.set_extra_http_headers(headers)?;

        Ok(())
    }

    /// Content wait as an explicit state machine:
    /// awaiting content -> Ready | ChallengeSuspected | ProceedingAnyway.
    fn await_content(&self, tab: &Arc<Tab>) -> Result<ContentWait> {
        let profile = &self.config.profile;

        match tab.wait_for_element_with_custom_timeout(
            profile.content_selector,
            profile.content_timeout,
        ) {
            Ok(_) => {
                debug!("Marcador de contenido {:?} presente", profile.content_selector);
                Ok(ContentWait::Ready)
            }
            Err(wait_err) => {
                let title = tab.get_title().unwrap_or_default();
                if let Some(grace) = profile.challenge_grace.filter(|_| is_challenge_title(&title)) {
                    warn!(
                        "Posible challenge ({title:?}); esperando {}s antes de continuar",
                        grace.as_secs()
                    );
                    thread::sleep(grace);
                    return Ok(ContentWait::ChallengeSuspected);
                }
                match profile.on_content_miss {
                    ContentMissPolicy::BestEffort => {
                        warn!(
                            "Marcador {:?} ausente tras {}s; se captura lo renderizado",
                            profile.content_selector,
                            profile.content_timeout.as_secs()
                        );
                        Ok(ContentWait::ProceedingAnyway)
                    }
                    ContentMissPolicy::Fail => Err(wait_err.context(format!(
                        "No aparecio el marcador de contenido {:?}",
                        profile.content_selector
                    ))),
                }
            }
        }
    }

    fn scroll(&self, tab: &Arc<Tab>) -> Result<()> {
        let profile = &self.config.profile;
        let await_promise = matches!(profile.scroll, ScrollStrategy::Incremental { .. });
        debug!("Desplazando la pagina ({:?})", profile.scroll);
        tab.evaluate(&profile.scroll_script(), await_promise)?;
        thread::sleep(profile.settle_delay);
        Ok(())
    }
}

#[async_trait]
impl ListingScraper for IdealistaBrowserScraper {
    async fn scrape_postal_code(&self, codigo_postal: &str) -> ScrapeRecord {
        self.scrape(codigo_postal)
    }

    fn source_name(&self) -> &'static str {
        "idealista"
    }
}

/// Document status of the navigation, from the performance timeline. Chrome
/// reports 0 when no response metadata exists for the entry.
fn navigation_status(tab: &Arc<Tab>) -> Result<i64> {
    let result = tab.evaluate(
        "performance.getEntriesByType('navigation')[0]?.responseStatus ?? 0",
        false,
    )?;
    Ok(result.value.and_then(|v| v.as_i64()).unwrap_or(0))
}

/// Count content-marker elements in the captured document.
pub(crate) fn count_items(html: &str, selector: &str) -> usize {
    let Ok(selector) = Selector::parse(selector) else {
        warn!("Selector invalido {selector:?}");
        return 0;
    };
    let document = Html::parse_document(html);
    document.select(&selector).count()
}
