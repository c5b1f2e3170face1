//! The index formula seam.
//!
//! The engine treats the index as an external, versioned pure function of
//! the five raw inputs. [`HeatIndexFormula`] is the bundled default and can
//! be swapped for any other [`IndexFormula`].

use crate::analyzers::utility::{kelvin_to_fahrenheit, round_to};
use crate::record::RequiredInputs;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormulaError {
    #[error("{field} out of range: {value}")]
    OutOfRange { field: &'static str, value: f64 },

    #[error("{0}")]
    Failed(String),
}

/// Unit of the temperature and dewpoint inputs handed to a formula.
///
/// Stored records are in kelvin; the hint exists for formulas that accept
/// other scales and is passed through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum TemperatureUnit {
    #[default]
    Kelvin,
    Celsius,
    Fahrenheit,
}

impl TemperatureUnit {
    pub fn to_fahrenheit(&self, value: f64) -> f64 {
        match self {
            TemperatureUnit::Kelvin => kelvin_to_fahrenheit(value),
            TemperatureUnit::Celsius => value * 9.0 / 5.0 + 32.0,
            TemperatureUnit::Fahrenheit => value,
        }
    }

    pub fn to_celsius(&self, value: f64) -> f64 {
        match self {
            TemperatureUnit::Kelvin => value - 273.15,
            TemperatureUnit::Celsius => value,
            TemperatureUnit::Fahrenheit => (value - 32.0) * 5.0 / 9.0,
        }
    }

    fn absolute_zero(&self) -> f64 {
        match self {
            TemperatureUnit::Kelvin => 0.0,
            TemperatureUnit::Celsius => -273.15,
            TemperatureUnit::Fahrenheit => -459.67,
        }
    }
}

impl fmt::Display for TemperatureUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TemperatureUnit::Kelvin => "K",
            TemperatureUnit::Celsius => "C",
            TemperatureUnit::Fahrenheit => "F",
        };
        f.write_str(s)
    }
}

impl FromStr for TemperatureUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "K" | "k" => Ok(TemperatureUnit::Kelvin),
            "C" | "c" => Ok(TemperatureUnit::Celsius),
            "F" | "f" => Ok(TemperatureUnit::Fahrenheit),
            _ => Err(format!("Invalid temperature unit '{s}'. Must be one of: K, C, F")),
        }
    }
}

pub trait IndexFormula: Send + Sync {
    /// Identifies the formula revision in logs and reports.
    fn version(&self) -> &str;

    fn index(&self, inputs: &RequiredInputs, unit: TemperatureUnit) -> Result<f64, FormulaError>;
}

/// NWS heat index (Rothfusz regression with the Steadman fallback), in °F.
///
/// Relative humidity is derived from temperature and dewpoint with the
/// Magnus approximation. Precipitation and wind do not enter this formula.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeatIndexFormula;

impl HeatIndexFormula {
    pub const VERSION: &'static str = "nws-rothfusz-1";
}

impl IndexFormula for HeatIndexFormula {
    fn version(&self) -> &str {
        Self::VERSION
    }

    fn index(&self, inputs: &RequiredInputs, unit: TemperatureUnit) -> Result<f64, FormulaError> {
        for (field, value) in [
            ("temperature", inputs.temperature_k),
            ("dewpoint", inputs.dewpoint_k),
        ] {
            if value < unit.absolute_zero() {
                return Err(FormulaError::OutOfRange { field, value });
            }
        }

        let t_c = unit.to_celsius(inputs.temperature_k);
        let td_c = unit.to_celsius(inputs.dewpoint_k);
        for (field, celsius, value) in [
            ("temperature", t_c, inputs.temperature_k),
            ("dewpoint", td_c, inputs.dewpoint_k),
        ] {
            if celsius <= MAGNUS_POLE_C {
                return Err(FormulaError::OutOfRange { field, value });
            }
        }

        let t = unit.to_fahrenheit(inputs.temperature_k);
        let rh = relative_humidity(t_c, td_c);

        Ok(round_to(heat_index(t, rh), 1))
    }
}

/// The Magnus approximation diverges at -243.12 °C.
const MAGNUS_POLE_C: f64 = -243.12;

/// Relative humidity in percent, clamped to 0..=100.
///
/// The ratio of the two saturation pressures is taken in log space so very
/// cold inputs cannot overflow or underflow into `inf / inf`.
fn relative_humidity(t_c: f64, td_c: f64) -> f64 {
    let magnus = |c: f64| 17.62 * c / (c - MAGNUS_POLE_C);
    (100.0 * (magnus(td_c) - magnus(t_c)).exp()).clamp(0.0, 100.0)
}

fn heat_index(t: f64, rh: f64) -> f64 {
    let simple = 0.5 * (t + 61.0 + (t - 68.0) * 1.2 + rh * 0.094);
    if (simple + t) / 2.0 < 80.0 {
        return simple;
    }

    let mut hi = -42.379 + 2.04901523 * t + 10.14333127 * rh
        - 0.22475541 * t * rh
        - 0.00683783 * t * t
        - 0.05481717 * rh * rh
        + 0.00122874 * t * t * rh
        + 0.00085282 * t * rh * rh
        - 0.00000199 * t * t * rh * rh;

    if rh < 13.0 && (80.0..=112.0).contains(&t) {
        hi -= ((13.0 - rh) / 4.0) * ((17.0 - (t - 95.0).abs()) / 17.0).sqrt();
    } else if rh > 85.0 && (80.0..=87.0).contains(&t) {
        hi += ((rh - 85.0) / 10.0) * ((87.0 - t) / 5.0);
    }

    hi
}
