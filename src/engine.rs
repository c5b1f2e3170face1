//! Request-level operations: schedule, fetch, evaluate, summarize.

use crate::analyzers::aggregate::{evaluate_record, summarize};
use crate::analyzers::types::{ForecastReport, IntervalEvaluation, WindowSummary};
use crate::error::ForecastError;
use crate::formula::{IndexFormula, TemperatureUnit};
use crate::record::RecordFetcher;
use crate::schedule::{DEFAULT_CADENCE_HOURS, Interval, ScheduleError, resolve_intervals};
use crate::store::{ForecastStore, StoreError};
use chrono::{DateTime, Utc};
use tracing::{debug, info};

/// Owns the store handle and the index formula for the lifetime of the
/// hosting service. Every call recomputes from the store; nothing is cached.
pub struct ForecastEngine<S, F> {
    fetcher: RecordFetcher<S>,
    formula: F,
    unit: TemperatureUnit,
    cadence_hours: u32,
}

impl<S: ForecastStore, F: IndexFormula> ForecastEngine<S, F> {
    pub fn new(store: S, formula: F) -> Self {
        Self {
            fetcher: RecordFetcher::new(store),
            formula,
            unit: TemperatureUnit::default(),
            cadence_hours: DEFAULT_CADENCE_HOURS,
        }
    }

    /// Unit hint forwarded to the formula with every call.
    pub fn with_unit(mut self, unit: TemperatureUnit) -> Self {
        self.unit = unit;
        self
    }

    pub fn with_cadence(mut self, cadence_hours: u32) -> Self {
        self.cadence_hours = cadence_hours;
        self
    }

    pub fn store(&self) -> &S {
        self.fetcher.store()
    }

    pub fn formula(&self) -> &F {
        &self.formula
    }

    pub fn intervals(
        &self,
        now: DateTime<Utc>,
        window_count: usize,
    ) -> Result<Vec<Interval>, ScheduleError> {
        resolve_intervals(now, window_count, self.cadence_hours)
    }

    pub async fn evaluate_interval(
        &self,
        interval: Interval,
        spatial_cell: &str,
    ) -> Result<IntervalEvaluation, StoreError> {
        let record = self.fetcher.fetch(interval, spatial_cell).await?;
        let status = evaluate_record(record.as_ref(), &self.formula, self.unit);

        debug!(
            interval = %interval,
            available = status.metrics().is_some(),
            reason = ?status.reason(),
            "Interval evaluated"
        );

        Ok(IntervalEvaluation { interval, status })
    }

    /// Evaluates each interval in order. The result always has one entry per
    /// requested interval; only a store failure aborts the request.
    #[tracing::instrument(skip(self, intervals), fields(cell = %spatial_cell, intervals = intervals.len()))]
    pub async fn evaluate_window(
        &self,
        intervals: &[Interval],
        spatial_cell: &str,
    ) -> Result<Vec<IntervalEvaluation>, ForecastError> {
        let mut evaluations = Vec::with_capacity(intervals.len());
        for interval in intervals {
            evaluations.push(self.evaluate_interval(*interval, spatial_cell).await?);
        }

        let available = evaluations.iter().filter(|e| e.available()).count();
        info!(available, "Window evaluated");

        Ok(evaluations)
    }

    /// Summarizes the window, failing with [`ForecastError::WindowExhausted`]
    /// when none of the intervals has usable data.
    #[tracing::instrument(skip(self, intervals), fields(cell = %spatial_cell, intervals = intervals.len()))]
    pub async fn summarize_window(
        &self,
        intervals: &[Interval],
        spatial_cell: &str,
    ) -> Result<WindowSummary, ForecastError> {
        let evaluations = self.evaluate_window(intervals, spatial_cell).await?;

        summarize(&evaluations).ok_or_else(|| ForecastError::WindowExhausted {
            spatial_cell: spatial_cell.to_string(),
            requested: intervals.len(),
        })
    }

    /// Resolves the active window at `now` and returns both the per-interval
    /// list and the summary from a single pass over the store.
    #[tracing::instrument(skip(self), fields(cell = %spatial_cell))]
    pub async fn forecast(
        &self,
        now: DateTime<Utc>,
        window_count: usize,
        spatial_cell: &str,
    ) -> Result<ForecastReport, ForecastError> {
        let intervals = self.intervals(now, window_count)?;
        let evaluations = self.evaluate_window(&intervals, spatial_cell).await?;
        let summary = summarize(&evaluations);

        Ok(ForecastReport {
            spatial_cell: spatial_cell.to_string(),
            generated_at: now,
            formula_version: self.formula.version().to_string(),
            intervals: evaluations,
            summary,
        })
    }
}
