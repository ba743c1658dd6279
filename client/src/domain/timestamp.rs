//! Lenient decoding of server timestamps.
//!
//! The backend renders local date-times without an offset
//! (`2024-05-01T12:30:00`), occasionally with fractional seconds or an
//! explicit offset. Values that match none of these shapes decode to `None`
//! so a cosmetic field never fails an otherwise valid payload.

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Deserializer};

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parse one timestamp string.
pub fn parse(raw: &str) -> Option<NaiveDateTime> {
    let trimmed = raw.trim();
    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
        .or_else(|| {
            DateTime::parse_from_rfc3339(trimmed)
                .ok()
                .map(|parsed| parsed.naive_utc())
        })
}

/// Serde helper for optional, leniently parsed timestamps.
pub fn deserialize_optional<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse))
}
