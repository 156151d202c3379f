use std::time::Duration;

use tracing::warn;

/// Masks automation fingerprints before any page script runs.
const BASIC_INIT_SCRIPT: &str = r#"
Object.defineProperty(navigator, 'webdriver', { get: () => false });
window.chrome = { runtime: {} };
"#;

/// Extends the basic mask with plugin/language/hardware spoofing.
const HARDENED_INIT_SCRIPT: &str = r#"
Object.defineProperty(navigator, 'webdriver', { get: () => false });
window.chrome = { runtime: {} };
Object.defineProperty(navigator, 'plugins', { get: () => [1, 2, 3, 4, 5] });
Object.defineProperty(navigator, 'languages', { get: () => ['es-ES', 'es'] });
Object.defineProperty(navigator, 'hardwareConcurrency', { get: () => 8 });
Object.defineProperty(navigator, 'deviceMemory', { get: () => 8 });
"#;

const BASIC_HEADERS: &[(&str, &str)] = &[
    (
        "Accept",
        "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
    ),
    ("Accept-Language", "es-ES,es;q=0.9"),
    (
        "Sec-CH-UA",
        r#""Google Chrome";v="129", "Not=A?Brand";v="8", "Chromium";v="129""#,
    ),
    ("Sec-CH-UA-Platform", r#""Windows""#),
];

const HARDENED_HEADERS: &[(&str, &str)] = &[
    (
        "Accept",
        "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
    ),
    ("Accept-Language", "es-ES,es;q=0.9"),
    (
        "Sec-CH-UA",
        r#""Google Chrome";v="129", "Not=A?Brand";v="8", "Chromium";v="129""#,
    ),
    ("Sec-CH-UA-Mobile", "?0"),
    ("Sec-CH-UA-Platform", r#""Windows""#),
];

/// Page titles that identify an interstitial bot challenge.
const CHALLENGE_TITLE_MARKERS: &[&str] = &["just a moment", "cloudflare"];

/// What to do when the content marker never appears.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentMissPolicy {
    /// Treat the missing marker as a scrape failure
    Fail,
    /// Capture whatever rendered
    BestEffort,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollStrategy {
    /// One jump to the bottom of the document
    Jump,
    /// Step down the page on a fixed interval until the bottom is reached
    Incremental { step_px: u32, interval_ms: u64 },
}

/// One of the anti-bot countermeasure bundles the scraper can run with.
///
/// A profile fixes everything that varied across scraper revisions: the
/// injected fingerprint mask, the spoofed headers, the content marker and
/// its timeout, the scroll behavior, and whether challenge pages get a
/// grace period instead of an immediate failure.
#[derive(Debug, Clone)]
pub struct StealthProfile {
    pub name: &'static str,
    pub init_script: &'static str,
    pub headers: &'static [(&'static str, &'static str)],
    pub content_selector: &'static str,
    pub navigation_timeout: Duration,
    pub content_timeout: Duration,
    pub scroll: ScrollStrategy,
    pub settle_delay: Duration,
    /// When set, a suspected challenge sleeps this long and then proceeds
    pub challenge_grace: Option<Duration>,
    pub on_content_miss: ContentMissPolicy,
    pub count_items: bool,
}

impl StealthProfile {
    pub fn basic() -> Self {
        Self {
            name: "basic",
            init_script: BASIC_INIT_SCRIPT,
            headers: BASIC_HEADERS,
            content_selector: ".items-container",
            navigation_timeout: Duration::from_secs(60),
            content_timeout: Duration::from_secs(20),
            scroll: ScrollStrategy::Jump,
            settle_delay: Duration::from_secs(2),
            challenge_grace: None,
            on_content_miss: ContentMissPolicy::Fail,
            count_items: false,
        }
    }

    pub fn hardened() -> Self {
        Self {
            name: "hardened",
            init_script: HARDENED_INIT_SCRIPT,
            headers: HARDENED_HEADERS,
            content_selector: ".item",
            navigation_timeout: Duration::from_secs(90),
            content_timeout: Duration::from_secs(30),
            scroll: ScrollStrategy::Incremental {
                step_px: 600,
                interval_ms: 400,
            },
            settle_delay: Duration::from_secs(2),
            challenge_grace: Some(Duration::from_secs(15)),
            on_content_miss: ContentMissPolicy::BestEffort,
            count_items: true,
        }
    }

    /// Profile selected through `SCOUT_PROFILE`; unknown names warn and fall
    /// back to the hardened profile.
    pub fn from_env() -> Self {
        match std::env::var("SCOUT_PROFILE") {
            Ok(name) => match name.as_str() {
                "basic" => Self::basic(),
                "hardened" => Self::hardened(),
                other => {
                    warn!("Perfil desconocido {other:?}; se utilizara el perfil hardened");
                    Self::hardened()
                }
            },
            Err(_) => Self::hardened(),
        }
    }

    /// JavaScript that performs this profile's scroll. The incremental form
    /// resolves a promise once the bottom is reached, so it is evaluated
    /// with `await_promise`.
    pub fn scroll_script(&self) -> String {
        match self.scroll {
            ScrollStrategy::Jump => "window.scrollTo(0, document.body.scrollHeight)".to_string(),
            ScrollStrategy::Incremental { step_px, interval_ms } => format!(
                r#"
                (async () => {{
                    const delay = ms => new Promise(resolve => setTimeout(resolve, ms));
                    let position = 0;
                    while (position < document.body.scrollHeight) {{
                        position += {step_px};
                        window.scrollTo(0, position);
                        await delay({interval_ms});
                    }}
                }})()
                "#
            ),
        }
    }
}

/// Does this page title look like an anti-bot interstitial?
pub fn is_challenge_title(title: &str) -> bool {
    let lower = title.to_lowercase();
    CHALLENGE_TITLE_MARKERS
        .iter()
        .any(|marker| lower.contains(marker))
}
