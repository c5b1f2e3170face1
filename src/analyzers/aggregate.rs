use crate::analyzers::metrics::compute_metrics;
use crate::analyzers::types::{IntervalEvaluation, IntervalStatus, WindowSummary};
use crate::analyzers::utility::round_to;
use crate::formula::{IndexFormula, TemperatureUnit};
use crate::record::ForecastRecord;
use tracing::{debug, warn};

/// Classifies one interval's record. Never fails: every problem becomes an
/// unavailable status so sibling intervals are unaffected.
pub fn evaluate_record<F: IndexFormula + ?Sized>(
    record: Option<&ForecastRecord>,
    formula: &F,
    unit: TemperatureUnit,
) -> IntervalStatus {
    let Some(record) = record else {
        return IntervalStatus::NoData;
    };

    let inputs = match record.validate() {
        Ok(inputs) => inputs,
        Err(missing) => {
            debug!(missing = ?missing.0, "Record incomplete");
            return IntervalStatus::MissingFields(missing.0);
        }
    };

    match compute_metrics(&inputs, formula, unit) {
        Ok(metrics) => IntervalStatus::Available(metrics),
        Err(e) => {
            warn!(error = %e, formula = formula.version(), "Index computation failed");
            IntervalStatus::ComputationError(e.to_string())
        }
    }
}

/// Folds the available intervals into a [`WindowSummary`].
///
/// Peak temperature and mean wind are rounded to one decimal, mean index to
/// two. Returns `None` when no interval contributed.
pub fn summarize(evaluations: &[IntervalEvaluation]) -> Option<WindowSummary> {
    let mut peak_temperature = f64::NEG_INFINITY;
    let mut wind_total = 0.0;
    let mut index_total = 0.0;
    let mut analyzed = 0usize;

    for metrics in evaluations.iter().filter_map(|e| e.status.metrics()) {
        peak_temperature = peak_temperature.max(metrics.temperature_f);
        wind_total += metrics.wind_speed_mph;
        index_total += metrics.index;
        analyzed += 1;
    }

    if analyzed == 0 {
        return None;
    }

    Some(WindowSummary {
        peak_temperature_f: round_to(peak_temperature, 1),
        mean_wind_speed_mph: round_to(wind_total / analyzed as f64, 1),
        mean_index: round_to(index_total / analyzed as f64, 2),
        intervals_analyzed: analyzed,
        intervals_requested: evaluations.len(),
    })
}
