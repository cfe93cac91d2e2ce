//! Timestamp helpers shared by the normalizer and the provider adapters.

use chrono::{DateTime, NaiveDateTime, Utc};

/// Parses a timestamp as returned by calendar APIs or found in scraped spans.
///
/// Accepts RFC 3339 (`2025-03-26T20:00:00Z`, `2025-03-26T15:00:00-05:00`)
/// and naive ISO timestamps with optional fractional seconds
/// (`2025-03-26T20:00:00.0000000`), which are interpreted as UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M"))
        .ok()
        .map(|naive| naive.and_utc())
}

/// Returns the number of minutes between two instants, rounded to the
/// nearest minute.
pub fn minutes_between(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    let millis = (end - start).num_milliseconds();
    // Round half away from zero.
    if millis >= 0 {
        (millis + 30_000) / 60_000
    } else {
        (millis - 30_000) / 60_000
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_rfc3339() {
        let dt = parse_timestamp("2025-03-26T15:00:00-05:00").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2025, 3, 26, 20, 0, 0).unwrap());
    }

    #[test]
    fn parses_naive_as_utc() {
        let dt = parse_timestamp("2025-03-26T20:00:00.0000000").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2025, 3, 26, 20, 0, 0).unwrap());

        let dt = parse_timestamp("2025-03-26T20:00").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2025, 3, 26, 20, 0, 0).unwrap());
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("tomorrow").is_none());
    }

    #[test]
    fn minutes_round_to_nearest() {
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 10, 0, 0).unwrap();
        assert_eq!(minutes_between(start, start + chrono::Duration::minutes(25)), 25);
        assert_eq!(minutes_between(start, start + chrono::Duration::seconds(89)), 1);
        assert_eq!(minutes_between(start, start + chrono::Duration::seconds(90)), 2);
        assert_eq!(minutes_between(start, start - chrono::Duration::minutes(5)), -5);
    }
}
