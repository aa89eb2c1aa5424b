//! Timestamp normalization.
//!
//! One hook covers every timestamp field: epoch values convert through the
//! endpoint's declared [`TimestampUnit`], truncated time-of-day strings go
//! through [`reconstruct_time_of_day`]. The reference instant is always a
//! parameter so callers (and tests) control it; no wall-clock reads happen
//! here below the public `parse` entry points.

use chrono::{DateTime, Duration, Timelike, Utc};
use serde_json::Value;

use crate::error::ParseError;
use crate::spec::{TimeFormat, TimestampUnit};

/// Convert one wire timestamp value to the canonical UTC instant.
pub fn convert_timestamp(
    value: &Value,
    unit: TimestampUnit,
    format: TimeFormat,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>, ParseError> {
    match format {
        TimeFormat::Epoch => {
            let raw = epoch_value(value)?;
            let seconds = match unit {
                TimestampUnit::Seconds => raw,
                TimestampUnit::Milliseconds => raw / 1000.0,
            };
            from_unix_seconds(seconds)
        }
        TimeFormat::TimeOfDay => {
            let raw = value.as_str().ok_or_else(|| {
                ParseError::Protocol(format!("expected time-of-day string, got {value}"))
            })?;
            reconstruct_time_of_day(raw, now)
        }
    }
}

/// Numeric epoch value, accepting raw numbers and numeric strings.
fn epoch_value(value: &Value) -> Result<f64, ParseError> {
    match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| ParseError::Protocol(format!("non-finite timestamp {n}"))),
        Value::String(s) => s
            .parse::<f64>()
            .map_err(|_| ParseError::Protocol(format!("non-numeric timestamp {s:?}"))),
        other => Err(ParseError::Protocol(format!(
            "expected numeric timestamp, got {other}"
        ))),
    }
}

/// Canonical instant from fractional unix seconds.
pub fn from_unix_seconds(seconds: f64) -> Result<DateTime<Utc>, ParseError> {
    let millis = (seconds * 1000.0).round();
    if !millis.is_finite() || millis.abs() > i64::MAX as f64 {
        return Err(ParseError::Protocol(format!(
            "timestamp {seconds} out of range"
        )));
    }
    DateTime::<Utc>::from_timestamp_millis(millis as i64)
        .ok_or_else(|| ParseError::Protocol(format!("timestamp {seconds} out of range")))
}

/// Rebuild an absolute instant from a truncated time-of-day string.
///
/// Some venues stream only `"HH:MM:SS"` (or even `"MM:SS"`) for trade
/// events. The trailing two `:`-separated components are taken as minute
/// and second within the hour of `now`. This is a best-effort
/// reconstruction, not an echo of exchange time: it assumes the event was
/// produced in the same hour it is being processed. When the rebuilt
/// instant lands more than a minute ahead of `now` (delivery straddled an
/// hour boundary) it is rolled back one hour.
pub fn reconstruct_time_of_day(
    raw: &str,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>, ParseError> {
    let parts: Vec<&str> = raw.split(':').collect();
    if parts.len() < 2 {
        return Err(ParseError::Protocol(format!(
            "unparseable time-of-day {raw:?}"
        )));
    }
    let minute: i64 = parts[parts.len() - 2]
        .trim()
        .parse()
        .map_err(|_| ParseError::Protocol(format!("unparseable time-of-day {raw:?}")))?;
    let second: i64 = parts[parts.len() - 1]
        .trim()
        .parse()
        .map_err(|_| ParseError::Protocol(format!("unparseable time-of-day {raw:?}")))?;
    if !(0..60).contains(&minute) || !(0..60).contains(&second) {
        return Err(ParseError::Protocol(format!(
            "time-of-day {raw:?} out of range"
        )));
    }

    let hour_start = now
        .with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .expect("zeroing sub-hour fields cannot fail");
    let mut instant = hour_start + Duration::seconds(minute * 60 + second);
    if instant > now + Duration::seconds(60) {
        instant -= Duration::hours(1);
    }
    Ok(instant)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn at(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    #[test]
    fn milliseconds_scale_down_by_1000() {
        let ts = convert_timestamp(
            &json!(1_610_000_000_000_i64),
            TimestampUnit::Milliseconds,
            TimeFormat::Epoch,
            Utc::now(),
        )
        .unwrap();
        assert_eq!(ts.timestamp(), 1_610_000_000);
        // Re-scaling by 1000 recovers the original integer.
        assert_eq!(ts.timestamp_millis(), 1_610_000_000_000);
    }

    #[test]
    fn seconds_pass_through() {
        let ts = convert_timestamp(
            &json!(1_610_000_000_i64),
            TimestampUnit::Seconds,
            TimeFormat::Epoch,
            Utc::now(),
        )
        .unwrap();
        assert_eq!(ts.timestamp(), 1_610_000_000);
    }

    #[test]
    fn fractional_seconds_survive() {
        let ts = convert_timestamp(
            &json!(1_610_000_000.25),
            TimestampUnit::Seconds,
            TimeFormat::Epoch,
            Utc::now(),
        )
        .unwrap();
        assert_eq!(ts.timestamp_millis(), 1_610_000_000_250);
    }

    #[test]
    fn numeric_string_timestamps_accepted() {
        let ts = convert_timestamp(
            &json!("1610000000"),
            TimestampUnit::Seconds,
            TimeFormat::Epoch,
            Utc::now(),
        )
        .unwrap();
        assert_eq!(ts.timestamp(), 1_610_000_000);
    }

    #[test]
    fn time_of_day_lands_in_current_hour() {
        let now = at("2021-01-07T12:40:00Z");
        let ts = reconstruct_time_of_day("12:34:56", now).unwrap();
        assert_eq!(ts, at("2021-01-07T12:34:56Z"));
    }

    #[test]
    fn time_of_day_rolls_back_across_hour_boundary() {
        // Event minted at :59 delivered just after the hour flipped.
        let now = at("2021-01-07T13:00:05Z");
        let ts = reconstruct_time_of_day("12:59:58", now).unwrap();
        assert_eq!(ts, at("2021-01-07T12:59:58Z"));
    }

    #[test]
    fn time_of_day_tolerates_small_skew_ahead() {
        let now = at("2021-01-07T12:34:00Z");
        let ts = reconstruct_time_of_day("12:34:30", now).unwrap();
        assert_eq!(ts, at("2021-01-07T12:34:30Z"));
    }

    #[test]
    fn garbage_time_of_day_is_protocol_error() {
        let now = Utc::now();
        assert!(matches!(
            reconstruct_time_of_day("nope", now),
            Err(ParseError::Protocol(_))
        ));
        assert!(matches!(
            reconstruct_time_of_day("12:99", now),
            Err(ParseError::Protocol(_))
        ));
    }
}
