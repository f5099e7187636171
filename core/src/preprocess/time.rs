use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::error::DivebombError;

/// Layouts tried, in order, when no explicit time format is configured.
const DEFAULT_DATETIME_FORMATS: [&str; 5] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S%.f",
    "%d/%m/%Y %H:%M:%S%.f",
];

const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";

/// Convert a calendar timestamp to seconds since 1970-01-01T00:00:00Z.
///
/// With `format`, the value must match it exactly (a format containing an
/// offset directive is honoured). Without, RFC 3339 and the common layouts in
/// [`DEFAULT_DATETIME_FORMATS`] are tried. Timestamps without an offset are UTC.
pub fn parse_timestamp(value: &str, format: Option<&str>) -> Option<f64> {
    let value = value.trim();
    match format {
        Some(format) => parse_with_format(value, format),
        None => DateTime::parse_from_rfc3339(value)
            .ok()
            .map(|dt| epoch_seconds(dt.naive_utc()))
            .or_else(|| {
                DEFAULT_DATETIME_FORMATS
                    .iter()
                    .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
                    .map(epoch_seconds)
            })
            .or_else(|| {
                NaiveDate::parse_from_str(value, DEFAULT_DATE_FORMAT)
                    .ok()
                    .and_then(|date| date.and_hms_opt(0, 0, 0))
                    .map(epoch_seconds)
            }),
    }
}

fn parse_with_format(value: &str, format: &str) -> Option<f64> {
    if let Ok(dt) = DateTime::parse_from_str(value, format) {
        return Some(epoch_seconds(dt.naive_utc()));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
        return Some(epoch_seconds(naive));
    }
    NaiveDate::parse_from_str(value, format)
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(epoch_seconds)
}

fn epoch_seconds(naive: NaiveDateTime) -> f64 {
    let utc = naive.and_utc();
    utc.timestamp() as f64 + f64::from(utc.timestamp_subsec_nanos()) * 1e-9
}

/// Convert a column of timestamps, failing on the first unparseable row.
///
/// Empty cells become NaN.
pub fn parse_timestamps(values: &[String], format: Option<&str>) -> Result<Vec<f64>, DivebombError> {
    values
        .iter()
        .enumerate()
        .map(|(row, value)| {
            if value.trim().is_empty() {
                return Ok(f64::NAN);
            }
            parse_timestamp(value, format).ok_or_else(|| DivebombError::InvalidTimestamp {
                row,
                value: value.clone(),
            })
        })
        .collect()
}
