//! Access to the forecast key-value store.
//!
//! [`ForecastStore`] is the async trait the engine reads through.
//! [`ValkeyStore`] talks to a Valkey/Redis server, [`MemoryStore`] keeps the
//! same data in process (JSON snapshots, tests).

mod client;
mod memory;
mod valkey;

pub use client::ForecastStore;
pub use memory::MemoryStore;
pub use valkey::ValkeyStore;

use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("forecast store unavailable: {0}")]
    Unavailable(String),

    /// The store answered, but the value at one key could not be read as a
    /// forecast hash. Affects that key only.
    #[error("unreadable record at '{key}': {message}")]
    Record { key: String, message: String },

    #[error("failed to load store snapshot '{path}'")]
    Snapshot {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl From<redis::RedisError> for StoreError {
    fn from(e: redis::RedisError) -> Self {
        StoreError::Unavailable(e.to_string())
    }
}

/// Distance units accepted by radius searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DistanceUnit {
    #[serde(rename = "m")]
    Meters,
    #[serde(rename = "km")]
    Kilometers,
    #[serde(rename = "mi")]
    Miles,
    #[serde(rename = "ft")]
    Feet,
}

impl DistanceUnit {
    pub const VALID: [&'static str; 4] = ["m", "km", "mi", "ft"];

    /// Number of meters in one of this unit.
    pub fn meters(&self) -> f64 {
        match self {
            DistanceUnit::Meters => 1.0,
            DistanceUnit::Kilometers => 1000.0,
            DistanceUnit::Miles => 1609.344,
            DistanceUnit::Feet => 0.3048,
        }
    }
}

impl fmt::Display for DistanceUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DistanceUnit::Meters => "m",
            DistanceUnit::Kilometers => "km",
            DistanceUnit::Miles => "mi",
            DistanceUnit::Feet => "ft",
        };
        f.write_str(s)
    }
}

impl FromStr for DistanceUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "m" => Ok(DistanceUnit::Meters),
            "km" => Ok(DistanceUnit::Kilometers),
            "mi" => Ok(DistanceUnit::Miles),
            "ft" => Ok(DistanceUnit::Feet),
            _ => Err(format!(
                "Invalid unit. Must be one of: {}",
                DistanceUnit::VALID.join(", ")
            )),
        }
    }
}

/// A radius search around a point, nearest results first.
#[derive(Debug, Clone)]
pub struct RadiusQuery {
    pub longitude: f64,
    pub latitude: f64,
    pub radius: f64,
    pub unit: DistanceUnit,
    /// Maximum number of results; `0` means no limit.
    pub count: usize,
}

impl RadiusQuery {
    pub const DEFAULT_RADIUS: f64 = 1000.0;
    pub const DEFAULT_COUNT: usize = 10;

    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            longitude,
            latitude,
            radius: Self::DEFAULT_RADIUS,
            unit: DistanceUnit::Meters,
            count: Self::DEFAULT_COUNT,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Coordinates {
    pub longitude: f64,
    pub latitude: f64,
}

/// One member of the geo set returned by a radius search.
#[derive(Debug, Clone, Serialize)]
pub struct NearbyPoint {
    pub key: String,
    /// Distance from the query point, in the query's unit.
    pub distance: f64,
    pub coordinates: Coordinates,
    pub hash: Option<i64>,
}
