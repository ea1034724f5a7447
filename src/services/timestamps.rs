//! Timestamp normalization for stored chat turns.
//!
//! Everything is written as ISO-8601. Epoch numbers and naive strings become
//! naive local time in the configured fixed offset; RFC 3339 strings carrying
//! the `Z` marker stay in UTC with the marker kept, and are shifted into local
//! time only when read back through [`to_local`].

use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use serde_json::Value;

/// Epoch values above this are milliseconds, everything else seconds.
const MILLIS_THRESHOLD: f64 = 1e10;

const ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";
const UTC_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.fZ";

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Canonical stored form of an inbound timestamp. Missing values take `now`.
/// Strings that cannot be read as a time are kept verbatim.
pub fn normalize(raw: Option<&Value>, offset: FixedOffset, now: DateTime<Utc>) -> String {
    match raw {
        None | Some(Value::Null) => render_local(now, offset),
        Some(Value::Number(n)) => match n.as_f64().and_then(from_epoch) {
            Some(dt) => render_local(dt, offset),
            None => {
                tracing::warn!(timestamp = %n, "epoch timestamp out of range, using now");
                render_local(now, offset)
            }
        },
        Some(Value::String(s)) => {
            let s = s.trim();
            if s.is_empty() {
                return render_local(now, offset);
            }
            if let Some(dt) = s.parse::<f64>().ok().and_then(from_epoch) {
                return render_local(dt, offset);
            }
            canonicalize(s, offset).unwrap_or_else(|| {
                tracing::warn!(timestamp = s, "unrecognized timestamp, storing verbatim");
                s.to_string()
            })
        }
        Some(other) => {
            tracing::warn!(timestamp = %other, "non-scalar timestamp, using now");
            render_local(now, offset)
        }
    }
}

/// Stored timestamp as naive local time. UTC-marked and offset-carrying
/// values are shifted into `offset`; naive values already are local.
pub fn to_local(ts: &str, offset: FixedOffset) -> Option<NaiveDateTime> {
    let ts = ts.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(ts) {
        return Some(dt.with_timezone(&offset).naive_local());
    }
    if let Some(utc) = ts.strip_suffix('Z').or_else(|| ts.strip_suffix('z')) {
        let naive = parse_naive(utc)?;
        return Some(naive.and_utc().with_timezone(&offset).naive_local());
    }
    parse_naive(ts)
}

pub fn local_now(offset: FixedOffset) -> NaiveDateTime {
    Utc::now().with_timezone(&offset).naive_local()
}

fn canonicalize(s: &str, offset: FixedOffset) -> Option<String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        if s.ends_with('Z') || s.ends_with('z') {
            return Some(dt.with_timezone(&Utc).format(UTC_FORMAT).to_string());
        }
        return Some(render_local(dt.with_timezone(&Utc), offset));
    }
    if let Some(utc) = s.strip_suffix('Z').or_else(|| s.strip_suffix('z')) {
        return parse_naive(utc).map(|n| n.format(UTC_FORMAT).to_string());
    }
    parse_naive(s).map(|n| n.format(ISO_FORMAT).to_string())
}

fn parse_naive(s: &str) -> Option<NaiveDateTime> {
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

fn from_epoch(value: f64) -> Option<DateTime<Utc>> {
    if !value.is_finite() {
        return None;
    }
    if value > MILLIS_THRESHOLD {
        return DateTime::from_timestamp_millis(value as i64);
    }
    let secs = value.trunc();
    let nanos = ((value - secs) * 1e9).round().clamp(0.0, 999_999_999.0) as u32;
    DateTime::from_timestamp(secs as i64, nanos)
}

fn render_local(dt: DateTime<Utc>, offset: FixedOffset) -> String {
    dt.with_timezone(&offset)
        .naive_local()
        .format(ISO_FORMAT)
        .to_string()
}
