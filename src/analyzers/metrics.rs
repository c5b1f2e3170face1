use crate::analyzers::types::DerivedMetrics;
use crate::analyzers::utility::{kelvin_to_fahrenheit, round_to, wind_speed_mph};
use crate::formula::{FormulaError, IndexFormula, TemperatureUnit};
use crate::record::RequiredInputs;

/// Derives display quantities and the index for one interval.
///
/// The formula sees the raw inputs; the °F and mph values are computed on the
/// side and rounded to one decimal for presentation. A non-finite index is a
/// formula failure.
pub fn compute_metrics<F: IndexFormula + ?Sized>(
    inputs: &RequiredInputs,
    formula: &F,
    unit: TemperatureUnit,
) -> Result<DerivedMetrics, FormulaError> {
    let index = formula.index(inputs, unit)?;
    if !index.is_finite() {
        return Err(FormulaError::Failed(format!(
            "{} returned a non-finite index ({index})",
            formula.version()
        )));
    }

    Ok(DerivedMetrics {
        temperature_f: round_to(kelvin_to_fahrenheit(inputs.temperature_k), 1),
        dewpoint_f: round_to(kelvin_to_fahrenheit(inputs.dewpoint_k), 1),
        wind_speed_mph: round_to(wind_speed_mph(inputs.wind_u, inputs.wind_v), 1),
        index,
    })
}
