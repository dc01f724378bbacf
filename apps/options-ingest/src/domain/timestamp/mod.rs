//! Timestamp Normalization
//!
//! Converts the time encodings seen across providers into a single epoch
//! millisecond integer (UTC).
//!
//! # Accepted Shapes
//!
//! | Shape                  | Result                                   |
//! |------------------------|------------------------------------------|
//! | calendar date          | midnight UTC of that date                |
//! | date-time (aware)      | its UTC instant                          |
//! | date-time (naive)      | interpreted as UTC                       |
//! | integer / float epoch  | `> 1e15` is nanoseconds, else millis     |
//! | text                   | parsed as one of the above, else dropped |
//!
//! The nanosecond threshold is a heuristic: raw epoch values carry no unit
//! tag, and every realistic millisecond value sits far below `1e15` while
//! every realistic nanosecond value sits far above it.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

/// Epoch values strictly greater than this are nanoseconds.
pub const NANOS_THRESHOLD: i64 = 1_000_000_000_000_000;

/// Divisor from nanoseconds to milliseconds.
const NANOS_PER_MILLI: i64 = 1_000_000;

/// Naive date-time layouts accepted in text form.
const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// A time value of provider-dependent shape.
#[derive(Debug, Clone, PartialEq)]
pub enum TimeValue {
    /// Calendar date without a time of day.
    Date(NaiveDate),
    /// Timezone-aware instant.
    DateTime(DateTime<Utc>),
    /// Date-time without zone information (treated as UTC).
    Naive(NaiveDateTime),
    /// Integer epoch in ms or ns.
    Integer(i64),
    /// Floating-point epoch in ms or ns.
    Float(f64),
    /// Unparsed text.
    Text(String),
    /// Field absent.
    Missing,
}

impl From<DateTime<Utc>> for TimeValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::DateTime(value)
    }
}

impl From<NaiveDate> for TimeValue {
    fn from(value: NaiveDate) -> Self {
        Self::Date(value)
    }
}

impl From<i64> for TimeValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl<T: Into<Self>> From<Option<T>> for TimeValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Missing, Into::into)
    }
}

/// Normalize a time value to epoch milliseconds.
///
/// Returns `None` when the value cannot be represented; callers drop the
/// record in that case.
#[must_use]
pub fn normalize_ts(value: &TimeValue) -> Option<i64> {
    match value {
        TimeValue::Date(date) => Some(date_to_millis(*date)),
        TimeValue::DateTime(dt) => Some(dt.timestamp_millis()),
        TimeValue::Naive(naive) => Some(naive.and_utc().timestamp_millis()),
        TimeValue::Integer(raw) => Some(epoch_to_millis(*raw)),
        TimeValue::Float(raw) => float_epoch_to_millis(*raw),
        TimeValue::Text(text) => normalize_text(text),
        TimeValue::Missing => None,
    }
}

/// Apply the nanosecond heuristic to an integer epoch.
#[must_use]
pub const fn epoch_to_millis(raw: i64) -> i64 {
    if raw > NANOS_THRESHOLD {
        raw / NANOS_PER_MILLI
    } else {
        raw
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn float_epoch_to_millis(raw: f64) -> Option<i64> {
    if !raw.is_finite() {
        return None;
    }
    let millis = if raw > NANOS_THRESHOLD as f64 {
        raw / NANOS_PER_MILLI as f64
    } else {
        raw
    };
    if millis.abs() >= i64::MAX as f64 {
        return None;
    }
    Some(millis.trunc() as i64)
}

fn normalize_text(text: &str) -> Option<i64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    if trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return trimmed.parse::<i64>().ok().map(epoch_to_millis);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.timestamp_millis());
    }

    if let Some(naive) = parse_naive_datetime(trimmed) {
        return Some(naive.and_utc().timestamp_millis());
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .map(date_to_millis)
}

fn parse_naive_datetime(text: &str) -> Option<NaiveDateTime> {
    NAIVE_DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
}

fn date_to_millis(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp_millis()
}

/// UTC calendar date of an epoch millisecond value.
#[must_use]
pub fn utc_date(ts_ms: i64) -> Option<NaiveDate> {
    DateTime::<Utc>::from_timestamp_millis(ts_ms).map(|dt| dt.date_naive())
}

/// Current wall-clock time in epoch milliseconds.
#[must_use]
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Parse a user-supplied date bound.
///
/// Tries an ISO date-time first (keeping the date as written, without
/// shifting to UTC), then a plain `YYYY-MM-DD` date. Blank or unparseable
/// input yields `None`.
#[must_use]
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.date_naive());
    }

    if let Some(naive) = parse_naive_datetime(trimmed) {
        return Some(naive.date());
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;
    use test_case::test_case;

    #[test]
    fn date_is_midnight_utc() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        assert_eq!(normalize_ts(&TimeValue::Date(date)), Some(1_704_153_600_000));
    }

    #[test]
    fn aware_datetime_uses_utc_instant() {
        let dt = Utc.with_ymd_and_hms(2024, 1, 2, 14, 30, 0).unwrap();
        assert_eq!(normalize_ts(&dt.into()), Some(1_704_205_800_000));
    }

    #[test]
    fn naive_datetime_is_treated_as_utc() {
        let naive = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(14, 30, 0)
            .unwrap();
        assert_eq!(
            normalize_ts(&TimeValue::Naive(naive)),
            Some(1_704_205_800_000)
        );
    }

    #[test_case(1_704_205_800_000_000_000, 1_704_205_800_000 ; "nanoseconds")]
    #[test_case(1_704_205_800_000, 1_704_205_800_000 ; "milliseconds")]
    #[test_case(NANOS_THRESHOLD, NANOS_THRESHOLD ; "threshold is milliseconds")]
    #[test_case(NANOS_THRESHOLD + 1, 1_000_000_000 ; "just above threshold")]
    #[test_case(0, 0 ; "zero")]
    fn integer_epoch(raw: i64, expected: i64) {
        assert_eq!(normalize_ts(&TimeValue::Integer(raw)), Some(expected));
    }

    #[test]
    fn float_epoch_nanoseconds() {
        assert_eq!(
            normalize_ts(&TimeValue::Float(1.704_205_800_5e18)),
            Some(1_704_205_800_500)
        );
    }

    #[test]
    fn float_nan_is_unrepresentable() {
        assert_eq!(normalize_ts(&TimeValue::Float(f64::NAN)), None);
        assert_eq!(normalize_ts(&TimeValue::Float(f64::INFINITY)), None);
    }

    #[test_case("1704205800000000000", Some(1_704_205_800_000) ; "digit string nanos")]
    #[test_case("2024-01-02T14:30:00Z", Some(1_704_205_800_000) ; "rfc3339")]
    #[test_case("2024-01-02T14:30:00.123456789Z", Some(1_704_205_800_123) ; "rfc3339 nanos")]
    #[test_case("2024-01-02T09:30:00-05:00", Some(1_704_205_800_000) ; "offset")]
    #[test_case("2024-01-02 14:30:00", Some(1_704_205_800_000) ; "naive text")]
    #[test_case("2024-01-02", Some(1_704_153_600_000) ; "date text")]
    #[test_case("yesterday", None ; "garbage")]
    #[test_case("", None ; "empty")]
    fn text_values(text: &str, expected: Option<i64>) {
        assert_eq!(normalize_ts(&TimeValue::Text(text.to_string())), expected);
    }

    #[test]
    fn missing_is_unrepresentable() {
        assert_eq!(normalize_ts(&TimeValue::Missing), None);
        assert_eq!(normalize_ts(&TimeValue::from(None::<i64>)), None);
    }

    #[test]
    fn utc_date_of_late_evening_trade() {
        // 2024-01-02T23:59:59.999Z
        assert_eq!(
            utc_date(1_704_239_999_999),
            NaiveDate::from_ymd_opt(2024, 1, 2)
        );
        assert_eq!(
            utc_date(1_704_240_000_000),
            NaiveDate::from_ymd_opt(2024, 1, 3)
        );
    }

    #[test_case("2024-01-02", Some((2024, 1, 2)) ; "plain date")]
    #[test_case("2024-01-02T10:00:00", Some((2024, 1, 2)) ; "naive datetime")]
    #[test_case("2024-01-02T23:00:00-05:00", Some((2024, 1, 2)) ; "keeps written date")]
    #[test_case("  ", None ; "blank")]
    #[test_case("01/02/2024", None ; "unsupported layout")]
    fn parse_date_cases(input: &str, expected: Option<(i32, u32, u32)>) {
        let expected = expected.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d));
        assert_eq!(parse_date(input), expected);
    }

    proptest! {
        #[test]
        fn nanos_round_trip(v in (NANOS_THRESHOLD + 1)..i64::MAX) {
            prop_assert_eq!(normalize_ts(&TimeValue::Integer(v)), Some(v / 1_000_000));
        }

        #[test]
        fn millis_unchanged(v in 0..=NANOS_THRESHOLD) {
            prop_assert_eq!(normalize_ts(&TimeValue::Integer(v)), Some(v));
        }
    }
}
