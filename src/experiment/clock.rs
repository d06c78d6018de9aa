//! Timestamp and duration text used in the ledger and log sheets
//!
//! Timestamps are local wall-clock time without fractional seconds
//! (`2024-03-01 14:05:09`). Durations read like `3:02:01`, or
//! `2 days, 3:02:01` once they pass a day.

use chrono::{Duration, Local, NaiveDateTime, Timelike};

/// Timestamp layout shared by every sheet.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Current local time truncated to whole seconds.
#[must_use]
pub fn now() -> NaiveDateTime {
    let now = Local::now().naive_local();
    now.with_nanosecond(0).unwrap_or(now)
}

/// Render a timestamp as stored in the sheets.
#[must_use]
pub fn format_timestamp(ts: NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a stored timestamp. Fractional seconds are accepted and dropped.
#[must_use]
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    let whole = text.split('.').next().unwrap_or(text);
    NaiveDateTime::parse_from_str(whole, TIMESTAMP_FORMAT).ok()
}

/// Render a duration, dropping fractional seconds. Negative spans clamp to zero.
#[must_use]
pub fn format_duration(duration: Duration) -> String {
    let total = duration.num_seconds().max(0);
    let days = total / 86_400;
    let rem = total % 86_400;
    let clock = format!("{}:{:02}:{:02}", rem / 3600, (rem % 3600) / 60, rem % 60);
    match days {
        0 => clock,
        1 => format!("1 day, {clock}"),
        n => format!("{n} days, {clock}"),
    }
}

/// Parse a duration written by [`format_duration`].
#[must_use]
pub fn parse_duration(text: &str) -> Option<Duration> {
    let text = text.trim();
    let (days, clock) = match text.split_once(", ") {
        Some((day_part, clock)) => {
            let count = day_part.split_whitespace().next()?;
            (count.parse::<i64>().ok()?, clock)
        }
        None => (0, text),
    };

    let clock = clock.split('.').next().unwrap_or(clock);
    let mut parts = clock.split(':');
    let hours: i64 = parts.next()?.parse().ok()?;
    let minutes: i64 = parts.next()?.parse().ok()?;
    let seconds: i64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }

    Some(Duration::seconds(
        days * 86_400 + hours * 3600 + minutes * 60 + seconds,
    ))
}

/// Serde adapter for optional timestamp columns (empty cell = `None`).
pub mod opt_timestamp {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    /// Write `None` as an empty cell.
    #[allow(clippy::ref_option)]
    pub fn serialize<S: Serializer>(
        value: &Option<NaiveDateTime>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(ts) => serializer.serialize_str(&super::format_timestamp(*ts)),
            None => serializer.serialize_str(""),
        }
    }

    /// Read an empty cell as `None`.
    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveDateTime>, D::Error> {
        let text = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
        if text.trim().is_empty() {
            return Ok(None);
        }
        super::parse_timestamp(&text)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{text}'")))
    }
}

/// Serde adapter for optional duration columns (empty cell = `None`).
pub mod opt_duration {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    /// Write `None` as an empty cell.
    #[allow(clippy::ref_option)]
    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => serializer.serialize_str(&super::format_duration(*d)),
            None => serializer.serialize_str(""),
        }
    }

    /// Read an empty cell as `None`.
    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        let text = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
        if text.trim().is_empty() {
            return Ok(None);
        }
        super::parse_duration(&text)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid duration '{text}'")))
    }
}
