//! Data types produced by the aggregation pipeline.

use crate::schedule::Interval;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Display quantities and index value for one available interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DerivedMetrics {
    pub temperature_f: f64,
    pub dewpoint_f: f64,
    pub wind_speed_mph: f64,
    pub index: f64,
}

/// Outcome of evaluating a single interval.
#[derive(Debug, Clone, PartialEq)]
pub enum IntervalStatus {
    Available(DerivedMetrics),
    /// The store holds no record for the interval.
    NoData,
    /// The record lacks (or has non-numeric) required fields.
    MissingFields(Vec<String>),
    /// The index formula failed.
    ComputationError(String),
}

impl IntervalStatus {
    pub fn metrics(&self) -> Option<&DerivedMetrics> {
        match self {
            IntervalStatus::Available(m) => Some(m),
            _ => None,
        }
    }

    /// Human-readable reason for an unavailable interval.
    pub fn reason(&self) -> Option<String> {
        match self {
            IntervalStatus::Available(_) => None,
            IntervalStatus::NoData => Some("no data".to_string()),
            IntervalStatus::MissingFields(names) => {
                Some(format!("missing fields: {}", names.join(", ")))
            }
            IntervalStatus::ComputationError(msg) => Some(format!("computation error: {msg}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(into = "IntervalRow")]
pub struct IntervalEvaluation {
    pub interval: Interval,
    pub status: IntervalStatus,
}

impl IntervalEvaluation {
    pub fn available(&self) -> bool {
        matches!(self.status, IntervalStatus::Available(_))
    }
}

/// Flat presentation of an [`IntervalEvaluation`]: metric columns are empty
/// when unavailable, `reason` is empty when available.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntervalRow {
    pub interval: String,
    pub available: bool,
    pub temperature_f: Option<f64>,
    pub dewpoint_f: Option<f64>,
    pub wind_speed_mph: Option<f64>,
    pub index: Option<f64>,
    pub reason: Option<String>,
}

impl From<IntervalEvaluation> for IntervalRow {
    fn from(e: IntervalEvaluation) -> Self {
        let metrics = e.status.metrics().copied();
        IntervalRow {
            interval: e.interval.to_string(),
            available: metrics.is_some(),
            temperature_f: metrics.map(|m| m.temperature_f),
            dewpoint_f: metrics.map(|m| m.dewpoint_f),
            wind_speed_mph: metrics.map(|m| m.wind_speed_mph),
            index: metrics.map(|m| m.index),
            reason: e.status.reason(),
        }
    }
}

/// Peak/average figures over the available intervals of a window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowSummary {
    pub peak_temperature_f: f64,
    pub mean_wind_speed_mph: f64,
    pub mean_index: f64,
    pub intervals_analyzed: usize,
    pub intervals_requested: usize,
}

/// A full pipeline run for one spatial cell.
#[derive(Debug, Clone, Serialize)]
pub struct ForecastReport {
    pub spatial_cell: String,
    pub generated_at: DateTime<Utc>,
    pub formula_version: String,
    pub intervals: Vec<IntervalEvaluation>,
    pub summary: Option<WindowSummary>,
}
