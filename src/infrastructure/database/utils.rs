//! Row conversion helpers shared by the repository implementations.

use chrono::{DateTime, Utc};

use crate::domain::errors::{EngineError, EngineResult};

/// Parse an RFC 3339 column into a UTC timestamp.
pub fn parse_datetime(raw: &str) -> EngineResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|err| EngineError::Storage(format!("invalid timestamp {raw}: {err}")))
}

/// Serialize a JSON-ish column, treating empty text as the given default.
pub fn parse_json_or<T: serde::de::DeserializeOwned>(raw: &str, default: T) -> EngineResult<T> {
    if raw.trim().is_empty() {
        return Ok(default);
    }
    serde_json::from_str(raw).map_err(|err| EngineError::Serialization(err.to_string()))
}
