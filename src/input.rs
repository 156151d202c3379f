use serde_json::Value;
use tracing::warn;

/// Postal code used when the input carries none, or an invalid one.
pub const DEFAULT_POSTAL_CODE: &str = "28002";

/// Resolve the postal code from the platform input object.
///
/// The platform may send `codigo_postal` as a string or a bare number, so
/// both are stringified before validation. Only an exactly-5-digit value
/// survives; anything else falls back to [`DEFAULT_POSTAL_CODE`].
pub fn resolve_postal_code(input: Option<&Value>) -> String {
    let raw = input
        .and_then(|v| v.get("codigo_postal"))
        .map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .unwrap_or_else(|| DEFAULT_POSTAL_CODE.to_string());

    let trimmed = raw.trim();
    if trimmed.len() == 5 && trimmed.chars().all(|c| c.is_ascii_digit()) {
        return trimmed.to_string();
    }

    warn!(
        "Codigo postal invalido en el input ({raw:?}); se utilizara el valor por defecto {DEFAULT_POSTAL_CODE}"
    );
    DEFAULT_POSTAL_CODE.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_input_falls_back_to_default() {
        assert_eq!(resolve_postal_code(None), DEFAULT_POSTAL_CODE);
        assert_eq!(resolve_postal_code(Some(&json!({}))), DEFAULT_POSTAL_CODE);
    }

    #[test]
    fn invalid_values_fall_back_to_default() {
        for input in [
            json!({ "codigo_postal": "" }),
            json!({ "codigo_postal": "1234" }),
            json!({ "codigo_postal": "123456" }),
            json!({ "codigo_postal": "28a02" }),
            json!({ "codigo_postal": "2800 2" }),
            json!({ "codigo_postal": null }),
            json!({ "codigo_postal": true }),
            json!({ "codigo_postal": 280 }),
        ] {
            assert_eq!(resolve_postal_code(Some(&input)), DEFAULT_POSTAL_CODE);
        }
    }

    #[test]
    fn valid_codes_pass_through_unchanged() {
        for code in ["28002", "08001", "00000", "46021"] {
            let input = json!({ "codigo_postal": code });
            assert_eq!(resolve_postal_code(Some(&input)), code);
        }
    }

    #[test]
    fn surrounding_whitespace_is_trimmed() {
        let input = json!({ "codigo_postal": "  28002\n" });
        assert_eq!(resolve_postal_code(Some(&input)), "28002");
    }

    #[test]
    fn numeric_five_digit_input_is_accepted() {
        let input = json!({ "codigo_postal": 28002 });
        assert_eq!(resolve_postal_code(Some(&input)), "28002");
    }
}
