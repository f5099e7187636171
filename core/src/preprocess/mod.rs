//! Preprocessing of tabular depth recordings.
//!
//! Turns a raw table (read from delimited text or built in memory) into a
//! time-sorted [`Recording`]: the configured time and depth columns are
//! located, calendar timestamps are converted to seconds since 1970-01-01,
//! and rows without a finite time and depth are dropped.

pub mod reader;
pub mod table;
pub mod time;

use serde::Deserialize;

use crate::error::DivebombError;
use crate::models::{Recording, Sample};

pub use reader::read_delimited;
pub use table::{Column, RawTable};
pub use time::{parse_timestamp, parse_timestamps};

/// Names of the input columns holding time and depth.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ColumnMapping {
    pub time: String,
    pub depth: String,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            time: "time".to_string(),
            depth: "depth".to_string(),
        }
    }
}

/// Build a [`Recording`] from the mapped columns of a table.
///
/// A numeric time column is taken as seconds since 1970-01-01; a text column
/// is parsed as calendar timestamps (see [`parse_timestamp`]). A text depth
/// column must hold numbers in every non-empty cell.
pub fn normalize(
    table: &RawTable,
    columns: &ColumnMapping,
    time_format: Option<&str>,
) -> Result<Recording, DivebombError> {
    let time_column = table
        .column(&columns.time)
        .ok_or_else(|| DivebombError::MissingColumn(columns.time.clone()))?;
    let depth_column = table
        .column(&columns.depth)
        .ok_or_else(|| DivebombError::MissingColumn(columns.depth.clone()))?;

    let times = match time_column {
        Column::Numeric(values) => values.clone(),
        Column::Text(values) => parse_timestamps(values, time_format)?,
    };
    let depths = match depth_column {
        Column::Numeric(values) => values.clone(),
        Column::Text(values) => parse_numbers(&columns.depth, values)?,
    };

    let total = times.len();
    let samples: Vec<Sample> = times
        .into_iter()
        .zip(depths)
        .filter(|(time, depth)| time.is_finite() && depth.is_finite())
        .map(|(time, depth)| Sample::new(time, depth))
        .collect();

    let dropped = total - samples.len();
    if dropped > 0 {
        tracing::debug!(dropped, total, "dropped rows without a finite time and depth");
    }

    Ok(Recording::from_samples(samples))
}

fn parse_numbers(column: &str, values: &[String]) -> Result<Vec<f64>, DivebombError> {
    values
        .iter()
        .enumerate()
        .map(|(row, value)| {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                return Ok(f64::NAN);
            }
            trimmed.parse::<f64>().map_err(|_| DivebombError::InvalidValue {
                column: column.to_string(),
                row,
                value: value.clone(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(time: Column, depth: Column) -> RawTable {
        RawTable::new()
            .with_column("time", time)
            .unwrap()
            .with_column("depth", depth)
            .unwrap()
    }

    fn text(cells: &[&str]) -> Column {
        Column::Text(cells.iter().map(|c| c.to_string()).collect())
    }

    #[test]
    fn test_normalize_numeric_sorts_by_time() {
        let raw = table(
            Column::Numeric(vec![2.0, 0.0, 1.0]),
            Column::Numeric(vec![20.0, 0.0, 10.0]),
        );
        let recording = normalize(&raw, &ColumnMapping::default(), None).unwrap();

        let times: Vec<f64> = recording.samples().iter().map(|s| s.time).collect();
        assert_eq!(times, vec![0.0, 1.0, 2.0]);
        assert_eq!(recording.depths(), vec![0.0, 10.0, 20.0]);
    }

    #[test]
    fn test_normalize_text_timestamps() {
        let raw = table(
            text(&["1970-01-01 00:00:02", "1970-01-01 00:00:00"]),
            Column::Numeric(vec![4.0, 1.0]),
        );
        let recording = normalize(&raw, &ColumnMapping::default(), None).unwrap();
        assert_eq!(recording.samples()[0], Sample::new(0.0, 1.0));
        assert_eq!(recording.samples()[1], Sample::new(2.0, 4.0));
    }

    #[test]
    fn test_normalize_drops_non_finite_rows() {
        let raw = table(
            Column::Numeric(vec![0.0, f64::NAN, 2.0, 3.0]),
            Column::Numeric(vec![1.0, 2.0, f64::NAN, 4.0]),
        );
        let recording = normalize(&raw, &ColumnMapping::default(), None).unwrap();
        assert_eq!(recording.len(), 2, "rows with NaN time or depth must be dropped");
    }

    #[test]
    fn test_normalize_custom_columns() {
        let raw = RawTable::new()
            .with_column("Date", text(&["01.01.1970 00:00:05"]))
            .unwrap()
            .with_column("Pressure", text(&["12.5"]))
            .unwrap();
        let columns = ColumnMapping {
            time: "Date".to_string(),
            depth: "Pressure".to_string(),
        };
        let recording = normalize(&raw, &columns, Some("%d.%m.%Y %H:%M:%S")).unwrap();
        assert_eq!(recording.samples(), &[Sample::new(5.0, 12.5)]);
    }

    #[test]
    fn test_normalize_missing_column() {
        let raw = RawTable::new()
            .with_column("time", Column::Numeric(vec![0.0]))
            .unwrap();
        assert_eq!(
            normalize(&raw, &ColumnMapping::default(), None),
            Err(DivebombError::MissingColumn("depth".to_string()))
        );
    }

    #[test]
    fn test_normalize_bad_values() {
        let raw = table(text(&["1970-01-01", "later"]), Column::Numeric(vec![0.0, 1.0]));
        assert!(matches!(
            normalize(&raw, &ColumnMapping::default(), None),
            Err(DivebombError::InvalidTimestamp { row: 1, .. })
        ));

        let raw = table(Column::Numeric(vec![0.0, 1.0]), text(&["1", "deep"]));
        assert_eq!(
            normalize(&raw, &ColumnMapping::default(), None),
            Err(DivebombError::InvalidValue {
                column: "depth".to_string(),
                row: 1,
                value: "deep".to_string()
            })
        );
    }

    #[test]
    fn test_read_then_normalize() {
        let raw = read_delimited("time,depth\n1970-01-01 00:00:01,3\n1970-01-01 00:00:00,0\n", ',')
            .unwrap();
        let recording = normalize(&raw, &ColumnMapping::default(), None).unwrap();
        assert_eq!(recording.depths(), vec![0.0, 3.0]);
    }
}
