//! Adafruit IO "last data" records.

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;

pub const AIO_BASE_URL: &str = "https://io.adafruit.com/api/v2";

/// Response bodies larger than this are rejected.
pub const MAX_BODY_BYTES: usize = 32 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedRecord {
    pub id: String,
    pub value: String,
    pub created_at: Option<String>,
}

#[derive(Deserialize)]
struct RawRecord {
    id: Value,
    #[serde(default)]
    value: Value,
    #[serde(default)]
    created_at: Option<String>,
}

/// Parse the JSON document returned by `.../feeds/<key>/data/last`.
///
/// `id` and `value` may arrive as strings or numbers; both are kept as text.
pub fn parse_last(json: &str) -> Result<FeedRecord> {
    let raw: RawRecord = serde_json::from_str(json).context("feed JSON")?;
    let id = value_text(raw.id);
    anyhow::ensure!(!id.is_empty(), "feed record has no id");
    Ok(FeedRecord {
        id,
        value: value_text(raw.value),
        created_at: raw.created_at,
    })
}

fn value_text(v: Value) -> String {
    match v {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

pub fn last_data_url(username: &str, feed_key: &str) -> String {
    format!("{}/{}/feeds/{}/data/last", AIO_BASE_URL, username, feed_key)
}

/// Warn on the first failure and then every tenth in a row.
pub fn should_warn(consecutive_failures: u32) -> bool {
    consecutive_failures == 1 || (consecutive_failures > 0 && consecutive_failures % 10 == 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "id": "0F2Z7K6Q2A1B3C4D5E6F7G8H9J",
        "value": "Warp 5 engaged",
        "feed_id": 1234,
        "feed_key": "rx",
        "created_at": "2026-10-19T12:34:56Z",
        "lat": null,
        "lon": null,
        "ele": null
    }"#;

    #[test]
    fn parses_last_record_and_ignores_extras() {
        let r = parse_last(SAMPLE).unwrap();
        assert_eq!(r.id, "0F2Z7K6Q2A1B3C4D5E6F7G8H9J");
        assert_eq!(r.value, "Warp 5 engaged");
        assert_eq!(r.created_at.as_deref(), Some("2026-10-19T12:34:56Z"));
    }

    #[test]
    fn numeric_fields_become_text() {
        let r = parse_last(r#"{"id": 42, "value": 21.5}"#).unwrap();
        assert_eq!(r.id, "42");
        assert_eq!(r.value, "21.5");
        assert_eq!(r.created_at, None);
    }

    #[test]
    fn missing_value_is_empty() {
        assert_eq!(parse_last(r#"{"id": "a"}"#).unwrap().value, "");
    }

    #[test]
    fn rejects_bad_documents() {
        assert!(parse_last("not json").is_err());
        assert!(parse_last(r#"{"value": "x"}"#).is_err());
        assert!(parse_last(r#"{"id": "", "value": "x"}"#).is_err());
    }

    #[test]
    fn url_for_feed() {
        assert_eq!(
            last_data_url("picard", "rx"),
            "https://io.adafruit.com/api/v2/picard/feeds/rx/data/last"
        );
    }

    #[test]
    fn warn_cadence() {
        let warned: Vec<u32> = (0..=25).filter(|n| should_warn(*n)).collect();
        assert_eq!(warned, vec![1, 10, 20]);
    }
}
