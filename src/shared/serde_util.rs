//! Custom serde helpers for backend wire formats.

use chrono::{DateTime, NaiveDateTime, Utc};

/// Parses the backend's ISO-8601-ish timestamp strings.
///
/// The backend emits `datetime.isoformat()` output, which carries no UTC
/// offset (`2024-01-01T00:05:00.123456`), while replayed and test fixtures
/// use RFC 3339 with an explicit offset (`2024-01-01T00:05:00Z`). Naive
/// values are interpreted as UTC.
pub fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Serde adapter for fields carrying the timestamp format above.
pub mod iso_instant {
    use super::parse_instant;
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse_instant(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {:?}", raw)))
    }

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_rfc3339())
    }
}
