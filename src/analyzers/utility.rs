/// Metres per second to miles per hour.
pub const MS_TO_MPH: f64 = 2.23694;

const KELVIN_OFFSET: f64 = 273.15;

pub fn kelvin_to_fahrenheit(kelvin: f64) -> f64 {
    (kelvin - KELVIN_OFFSET) * 9.0 / 5.0 + 32.0
}

/// Magnitude of the (u, v) wind vector, converted to mph.
pub fn wind_speed_mph(u: f64, v: f64) -> f64 {
    (u * u + v * v).sqrt() * MS_TO_MPH
}

/// Rounds half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_freezing_point() {
        assert_eq!(kelvin_to_fahrenheit(273.15), 32.0);
    }

    #[test]
    fn test_boiling_point() {
        assert_eq!(round_to(kelvin_to_fahrenheit(373.15), 1), 212.0);
    }

    #[test]
    fn test_wind_speed_is_vector_magnitude() {
        assert_eq!(wind_speed_mph(3.0, 4.0), 5.0 * MS_TO_MPH);
        assert_eq!(wind_speed_mph(-3.0, -4.0), 5.0 * MS_TO_MPH);
        assert_eq!(wind_speed_mph(0.0, 0.0), 0.0);
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(11.18470, 1), 11.2);
        assert_eq!(round_to(2.345678, 2), 2.35);
        assert_eq!(round_to(-0.04, 1), -0.0);
    }
}
