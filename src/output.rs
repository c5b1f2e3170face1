//! Output formatting and persistence for forecast results.
//!
//! Supports pretty-printing, JSON serialization, and CSV append.

use anyhow::Result;
use chrono::{DateTime, Utc};
use csv::WriterBuilder;
use serde::Serialize;
use std::fs::OpenOptions;
use std::path::Path;
use tracing::debug;

use crate::analyzers::types::{IntervalEvaluation, IntervalRow};

/// One CSV row: an interval evaluation stamped with where and when it ran.
#[derive(Debug, Serialize)]
struct CsvRecord<'a> {
    timestamp: DateTime<Utc>,
    spatial_cell: &'a str,
    interval: String,
    available: bool,
    temperature_f: Option<f64>,
    dewpoint_f: Option<f64>,
    wind_speed_mph: Option<f64>,
    index: Option<f64>,
    reason: Option<String>,
}

/// Logs a value using Rust's debug pretty-print format.
pub fn print_pretty<T: std::fmt::Debug>(value: &T) {
    debug!("{:#?}", value);
}

/// Writes a value to stdout as pretty-printed JSON.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Appends one row per evaluation to a CSV file.
///
/// Creates the file with headers if it does not already exist.
pub fn append_records(
    path: &str,
    spatial_cell: &str,
    timestamp: DateTime<Utc>,
    evaluations: &[IntervalEvaluation],
) -> Result<()> {
    let file_exists = Path::new(path).exists();
    debug!(path, file_exists, rows = evaluations.len(), "Appending CSV records");

    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists)
        .from_writer(file);

    for evaluation in evaluations {
        let row = IntervalRow::from(evaluation.clone());
        writer.serialize(CsvRecord {
            timestamp,
            spatial_cell,
            interval: row.interval,
            available: row.available,
            temperature_f: row.temperature_f,
            dewpoint_f: row.dewpoint_f,
            wind_speed_mph: row.wind_speed_mph,
            index: row.index,
            reason: row.reason,
        })?;
    }
    writer.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::types::{DerivedMetrics, IntervalStatus};
    use crate::schedule::Interval;
    use std::env;
    use std::fs;

    fn temp_path(name: &str) -> String {
        format!("{}/{}", env::temp_dir().display(), name)
    }

    fn evaluations() -> Vec<IntervalEvaluation> {
        vec![
            IntervalEvaluation {
                interval: Interval::new(0),
                status: IntervalStatus::Available(DerivedMetrics {
                    temperature_f: 70.2,
                    dewpoint_f: 55.0,
                    wind_speed_mph: 4.5,
                    index: 70.0,
                }),
            },
            IntervalEvaluation {
                interval: Interval::new(6),
                status: IntervalStatus::MissingFields(vec!["tp".into()]),
            },
        ]
    }

    #[test]
    fn test_print_pretty_does_not_panic() {
        print_pretty(&evaluations());
    }

    #[test]
    fn test_print_json_does_not_panic() {
        print_json(&evaluations()).unwrap();
    }

    #[test]
    fn test_append_records_writes_header_once() {
        let path = temp_path("hfi_forecast_test_header.csv");
        let _ = fs::remove_file(&path);

        let now = Utc::now();
        append_records(&path, "u4pruy", now, &evaluations()).unwrap();
        append_records(&path, "u4pruy", now, &evaluations()).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        // 1 header + 2 rows per append
        assert_eq!(lines.len(), 5);
        assert_eq!(
            lines.iter().filter(|l| l.starts_with("timestamp")).count(),
            1
        );
        assert!(lines[2].contains("missing fields: tp"));

        fs::remove_file(&path).unwrap();
    }
}
