//! Duration parsing utilities.
//!
//! Human-readable durations like "15s", "1m", "500ms" in config files.

use std::time::Duration;

/// Parse a duration string like "10s", "30s", "1m", "500ms".
///
/// Supported formats:
/// - `"Nms"` - N milliseconds
/// - `"Ns"` - N seconds
/// - `"Nm"` - N minutes
/// - `"N"` - N seconds (no suffix)
///
/// Returns `None` if the string cannot be parsed.
///
/// ```
/// use mcp_fleet::config::parse_duration_string;
/// use std::time::Duration;
///
/// assert_eq!(parse_duration_string("15s"), Some(Duration::from_secs(15)));
/// assert_eq!(parse_duration_string("500ms"), Some(Duration::from_millis(500)));
/// ```
pub fn parse_duration_string(s: &str) -> Option<Duration> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Some(ms) = s.strip_suffix("ms") {
        ms.trim().parse::<u64>().ok().map(Duration::from_millis)
    } else if let Some(secs) = s.strip_suffix('s') {
        secs.trim().parse::<u64>().ok().map(Duration::from_secs)
    } else if let Some(mins) = s.strip_suffix('m') {
        mins.trim()
            .parse::<u64>()
            .ok()
            .map(|m| Duration::from_secs(m * 60))
    } else {
        s.parse::<u64>().ok().map(Duration::from_secs)
    }
}

/// Render a duration in the shortest form [`parse_duration_string`] reads back.
pub fn format_duration(d: Duration) -> String {
    let millis = d.as_millis();
    if millis % 60_000 == 0 && millis > 0 {
        format!("{}m", millis / 60_000)
    } else if millis % 1000 == 0 {
        format!("{}s", millis / 1000)
    } else {
        format!("{}ms", millis)
    }
}

/// `#[serde(with = "human_duration")]` for `Duration` fields.
pub mod human_duration {
    use super::{format_duration, parse_duration_string};
    use serde::{de, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_duration(*d))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Secs(u64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Secs(secs) => Ok(Duration::from_secs(secs)),
            Raw::Text(s) => parse_duration_string(&s)
                .ok_or_else(|| de::Error::custom(format!("invalid duration '{}'", s))),
        }
    }
}
