use crate::schedule::ScheduleError;
use crate::store::StoreError;
use thiserror::Error;

/// Failures that end a whole request. Per-interval problems are reported as
/// [`IntervalStatus`](crate::analyzers::types::IntervalStatus) instead.
#[derive(Debug, Error)]
pub enum ForecastError {
    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("no forecast data for spatial cell '{spatial_cell}' in any of {requested} intervals")]
    WindowExhausted {
        spatial_cell: String,
        requested: usize,
    },
}
