pub mod analyzers;
pub mod config;
pub mod engine;
pub mod error;
pub mod formula;
pub mod output;
pub mod record;
pub mod schedule;
pub mod store;

pub use engine::ForecastEngine;
pub use error::ForecastError;
