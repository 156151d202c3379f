use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome classification for a scrape run
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScrapeStatus {
    Success,
    HttpError,
    Blocked,
    Error,
}

/// The single structured outcome emitted per run.
///
/// `status` determines which optional fields are set: `html` and
/// `items_count` only on `Success`, `status_code` on `HttpError`/`Blocked`,
/// `error` on `Error`. The constructors below are the only way the rest of
/// the crate builds records, so the invariant holds everywhere.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeRecord {
    pub codigo_postal: String,
    pub url: String,
    pub status: ScrapeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub scraped_at: DateTime<Utc>,
}

impl ScrapeRecord {
    fn base(codigo_postal: &str, url: &str, status: ScrapeStatus) -> Self {
        Self {
            codigo_postal: codigo_postal.to_string(),
            url: url.to_string(),
            status,
            status_code: None,
            html: None,
            items_count: None,
            error: None,
            scraped_at: Utc::now(),
        }
    }

    pub fn success(
        codigo_postal: &str,
        url: &str,
        html: String,
        items_count: Option<usize>,
    ) -> Self {
        Self {
            html: Some(html),
            items_count,
            ..Self::base(codigo_postal, url, ScrapeStatus::Success)
        }
    }

    pub fn http_error(codigo_postal: &str, url: &str, status_code: i64) -> Self {
        Self {
            status_code: Some(status_code),
            ..Self::base(codigo_postal, url, ScrapeStatus::HttpError)
        }
    }

    pub fn blocked(codigo_postal: &str, url: &str, status_code: i64) -> Self {
        Self {
            status_code: Some(status_code),
            ..Self::base(codigo_postal, url, ScrapeStatus::Blocked)
        }
    }

    pub fn error(codigo_postal: &str, url: &str, message: &str) -> Self {
        Self {
            error: Some(message.to_string()),
            ..Self::base(codigo_postal, url, ScrapeStatus::Error)
        }
    }

    /// Pretty JSON with 4-space indentation, non-ASCII left as-is.
    pub fn to_pretty_json(&self) -> anyhow::Result<String> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        Serialize::serialize(self, &mut ser)?;
        Ok(String::from_utf8(buf)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_record_carries_html_and_nothing_else() {
        let record =
            ScrapeRecord::success("28002", "https://example.com", "<html></html>".into(), Some(7));
        assert_eq!(record.status, ScrapeStatus::Success);
        assert_eq!(record.html.as_deref(), Some("<html></html>"));
        assert_eq!(record.items_count, Some(7));
        assert!(record.status_code.is_none());
        assert!(record.error.is_none());
    }

    #[test]
    fn failure_records_never_carry_html() {
        let http = ScrapeRecord::http_error("28002", "https://example.com", 500);
        let blocked = ScrapeRecord::blocked("28002", "https://example.com", 403);
        let error = ScrapeRecord::error("28002", "https://example.com", "navigation timed out");

        for record in [&http, &blocked, &error] {
            assert!(record.html.is_none());
            assert!(record.items_count.is_none());
        }
        assert_eq!(http.status_code, Some(500));
        assert_eq!(blocked.status_code, Some(403));
        assert_eq!(error.error.as_deref(), Some("navigation timed out"));
    }

    #[test]
    fn absent_fields_are_omitted_from_json() {
        let record = ScrapeRecord::blocked("28002", "https://example.com", 403);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["status"], "blocked");
        assert_eq!(json["status_code"], 403);
        let obj = json.as_object().unwrap();
        assert!(!obj.contains_key("html"));
        assert!(!obj.contains_key("items_count"));
        assert!(!obj.contains_key("error"));
    }

    #[test]
    fn pretty_json_uses_four_space_indent_and_keeps_non_ascii() {
        let record = ScrapeRecord::error("28002", "https://example.com", "página no disponible");
        let pretty = record.to_pretty_json().unwrap();
        assert!(pretty.contains("\n    \"codigo_postal\": \"28002\""));
        assert!(pretty.contains("página"));
        assert!(!pretty.contains("\\u"));
    }

    #[test]
    fn status_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&ScrapeStatus::HttpError).unwrap(),
            "\"http_error\""
        );
        assert_eq!(
            serde_json::to_string(&ScrapeStatus::Success).unwrap(),
            "\"success\""
        );
    }
}
