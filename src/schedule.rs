//! Resolution of the forecast intervals that are valid "now".
//!
//! Forecast snapshots are keyed by hours-offset from a single model run, and
//! model runs happen at every multiple of the cadence within a UTC day. The
//! scheduler turns a wall-clock instant into the ordered labels of the next
//! `window_count` intervals.

use chrono::{DateTime, Timelike, Utc};
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Spacing between model-run intervals in this domain.
pub const DEFAULT_CADENCE_HOURS: u32 = 6;

/// The first interval of the next day's run is always labeled with this offset.
pub const MAX_ANCHOR_HOURS: u32 = 24;

const SECONDS_PER_HOUR: u64 = 3600;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("window_count must be at least 1")]
    EmptyWindow,

    #[error("cadence_hours must be at least 1")]
    ZeroCadence,

    #[error("invalid interval label '{0}', expected '<hours>h'")]
    InvalidLabel(String),

    #[error("{window_count} intervals of {cadence_hours}h do not fit in an hours offset")]
    Overflow {
        window_count: usize,
        cadence_hours: u32,
    },
}

/// An hours-offset from the model run, rendered as `"{hours}h"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Interval {
    hours: u32,
}

impl Interval {
    pub fn new(hours: u32) -> Self {
        Self { hours }
    }

    pub fn hours(&self) -> u32 {
        self.hours
    }

    /// Store key for this interval in the given spatial cell, e.g. `6h:u4pruydqqvj`.
    pub fn key(&self, spatial_cell: &str) -> String {
        format!("{}:{}", self, spatial_cell)
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}h", self.hours)
    }
}

impl FromStr for Interval {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.strip_suffix('h')
            .and_then(|n| n.parse::<u32>().ok())
            .map(Interval::new)
            .ok_or_else(|| ScheduleError::InvalidLabel(s.to_string()))
    }
}

impl Serialize for Interval {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Returns the `window_count` intervals valid at `now`.
///
/// The anchor is the first multiple of `cadence_hours` at or after the
/// fractional hour-of-day of `now` (UTC). An instant exactly on a boundary
/// keeps that boundary: 06:00:00 anchors at `6h`, 06:00:01 at `12h`. Anchors
/// at or past the end of the day are clamped to `24h`, never wrapped to `0h`.
pub fn resolve_intervals(
    now: DateTime<Utc>,
    window_count: usize,
    cadence_hours: u32,
) -> Result<Vec<Interval>, ScheduleError> {
    if window_count == 0 {
        return Err(ScheduleError::EmptyWindow);
    }
    if cadence_hours == 0 {
        return Err(ScheduleError::ZeroCadence);
    }

    let overflow = || ScheduleError::Overflow {
        window_count,
        cadence_hours,
    };

    let anchor = anchor_hours(now, cadence_hours);
    let count = u32::try_from(window_count).map_err(|_| overflow())?;

    // The last label bounds every other one.
    (count - 1)
        .checked_mul(cadence_hours)
        .and_then(|span| span.checked_add(anchor))
        .ok_or_else(overflow)?;

    Ok((0..count)
        .map(|i| Interval::new(anchor + i * cadence_hours))
        .collect())
}

fn anchor_hours(now: DateTime<Utc>, cadence_hours: u32) -> u32 {
    let cadence_secs = cadence_hours as u64 * SECONDS_PER_HOUR;
    let secs = now.num_seconds_from_midnight() as u64;

    let mut steps = secs / cadence_secs;
    if secs % cadence_secs != 0 || now.nanosecond() != 0 {
        steps += 1;
    }

    let anchor = steps * cadence_hours as u64;
    anchor.min(MAX_ANCHOR_HOURS as u64) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 14, h, m, s).unwrap()
    }

    fn labels(intervals: &[Interval]) -> Vec<String> {
        intervals.iter().map(|i| i.to_string()).collect()
    }

    #[test]
    fn test_midday_rounds_up_to_next_run() {
        let intervals = resolve_intervals(at(10, 15, 0), 4, 6).unwrap();
        assert_eq!(labels(&intervals), vec!["12h", "18h", "24h", "30h"]);
    }

    #[test]
    fn test_exact_boundary_keeps_current_run() {
        let intervals = resolve_intervals(at(6, 0, 0), 4, 6).unwrap();
        assert_eq!(labels(&intervals), vec!["6h", "12h", "18h", "24h"]);
    }

    #[test]
    fn test_one_second_past_boundary_moves_on() {
        let intervals = resolve_intervals(at(6, 0, 1), 1, 6).unwrap();
        assert_eq!(labels(&intervals), vec!["12h"]);
    }

    #[test]
    fn test_sub_second_past_boundary_moves_on() {
        let now = at(6, 0, 0) + chrono::Duration::milliseconds(1);
        let intervals = resolve_intervals(now, 1, 6).unwrap();
        assert_eq!(labels(&intervals), vec!["12h"]);
    }

    #[test]
    fn test_midnight_is_zero_hour() {
        let intervals = resolve_intervals(at(0, 0, 0), 2, 6).unwrap();
        assert_eq!(labels(&intervals), vec!["0h", "6h"]);
    }

    #[test]
    fn test_late_evening_clamps_to_24h() {
        let intervals = resolve_intervals(at(18, 30, 0), 4, 6).unwrap();
        assert_eq!(labels(&intervals), vec!["24h", "30h", "36h", "42h"]);
    }

    #[test]
    fn test_anchor_past_day_end_is_clamped() {
        // 5h cadence: ceiling of 22.5 is 25, which clamps to 24.
        let intervals = resolve_intervals(at(22, 30, 0), 2, 5).unwrap();
        assert_eq!(labels(&intervals), vec!["24h", "29h"]);
    }

    #[test]
    fn test_labels_strictly_increase_by_cadence() {
        for hour in 0..24 {
            for minute in [0, 1, 29, 59] {
                let intervals = resolve_intervals(at(hour, minute, 0), 5, 6).unwrap();
                assert_eq!(intervals.len(), 5);
                for pair in intervals.windows(2) {
                    assert_eq!(pair[1].hours() - pair[0].hours(), 6);
                }
            }
        }
    }

    #[test]
    fn test_zero_window_is_rejected() {
        assert_eq!(
            resolve_intervals(at(1, 0, 0), 0, 6),
            Err(ScheduleError::EmptyWindow)
        );
    }

    #[test]
    fn test_zero_cadence_is_rejected() {
        assert_eq!(
            resolve_intervals(at(1, 0, 0), 4, 0),
            Err(ScheduleError::ZeroCadence)
        );
    }

    #[test]
    fn test_oversized_cadence_is_rejected() {
        assert_eq!(
            resolve_intervals(at(10, 0, 0), 4, 1_500_000_000),
            Err(ScheduleError::Overflow {
                window_count: 4,
                cadence_hours: 1_500_000_000
            })
        );
    }

    #[test]
    fn test_window_count_beyond_u32_is_rejected() {
        let count = u32::MAX as usize + 2;
        assert!(matches!(
            resolve_intervals(at(1, 0, 0), count, 1),
            Err(ScheduleError::Overflow { .. })
        ));
    }

    #[test]
    fn test_largest_representable_window_end() {
        // Anchor 24 plus one step of (u32::MAX - 24) lands exactly on u32::MAX.
        let intervals = resolve_intervals(at(23, 0, 0), 2, u32::MAX - 24).unwrap();
        assert_eq!(intervals[0].hours(), 24);
        assert_eq!(intervals[1].hours(), u32::MAX);
    }

    #[test]
    fn test_interval_key_format() {
        assert_eq!(Interval::new(6).key("u4pruydqqvj"), "6h:u4pruydqqvj");
    }

    #[test]
    fn test_interval_parse() {
        assert_eq!("18h".parse::<Interval>(), Ok(Interval::new(18)));
        assert!("18".parse::<Interval>().is_err());
        assert!("xh".parse::<Interval>().is_err());
    }
}
