//! CLI entry point for the forecast window engine.
//!
//! Provides subcommands for checking the store, listing the active
//! intervals, finding nearby grid cells, and evaluating or summarizing the
//! forecast window for a cell.

use anyhow::{Result, bail};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use hfi_forecast::config::StoreConfig;
use hfi_forecast::formula::{HeatIndexFormula, TemperatureUnit};
use hfi_forecast::output::{append_records, print_json, print_pretty};
use hfi_forecast::schedule::{DEFAULT_CADENCE_HOURS, resolve_intervals};
use hfi_forecast::store::{DistanceUnit, ForecastStore, MemoryStore, RadiusQuery, ValkeyStore};
use hfi_forecast::ForecastEngine;
use serde_json::json;
use std::ffi::OsStr;
use std::path::Path;
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "hfi_forecast")]
#[command(about = "Forecast window index engine over a gridded forecast store", long_about = None)]
struct Cli {
    /// Read from a JSON snapshot instead of the Valkey server
    #[arg(long, global = true, value_name = "FILE")]
    snapshot: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the forecast store is reachable
    Ping,
    /// Print the forecast intervals valid now (or at --at)
    Intervals {
        #[command(flatten)]
        window: WindowArgs,
    },
    /// List grid cells near a point
    Nearby {
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,

        #[arg(long, allow_negative_numbers = true)]
        lon: f64,

        /// Search radius
        #[arg(short, long, default_value_t = RadiusQuery::DEFAULT_RADIUS)]
        radius: f64,

        /// Unit of the radius and reported distances (m, km, mi, ft)
        #[arg(short, long, default_value = "m")]
        unit: DistanceUnit,

        /// Maximum number of results (0 for no limit)
        #[arg(short, long, default_value_t = RadiusQuery::DEFAULT_COUNT)]
        count: usize,
    },
    /// Evaluate every interval of the window
    Evaluate {
        #[command(flatten)]
        location: LocationArgs,

        #[command(flatten)]
        window: WindowArgs,

        /// CSV file to append results to
        #[arg(long, value_name = "FILE")]
        csv: Option<String>,
    },
    /// Peak temperature, mean wind and mean index over the window
    Summary {
        #[command(flatten)]
        location: LocationArgs,

        #[command(flatten)]
        window: WindowArgs,
    },
    /// Interval list and summary in one report
    Forecast {
        #[command(flatten)]
        location: LocationArgs,

        #[command(flatten)]
        window: WindowArgs,
    },
}

#[derive(Args)]
struct LocationArgs {
    /// Spatial cell (geohash) to query
    #[arg(long, conflicts_with_all = ["lat", "lon"])]
    cell: Option<String>,

    /// Latitude; the nearest stored cell is used
    #[arg(long, requires = "lon", allow_negative_numbers = true)]
    lat: Option<f64>,

    /// Longitude; the nearest stored cell is used
    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    lon: Option<f64>,

    /// How far (in meters) to look for the nearest cell
    #[arg(long, default_value_t = RadiusQuery::DEFAULT_RADIUS)]
    search_radius: f64,
}

#[derive(Args)]
struct WindowArgs {
    /// Number of intervals in the window
    #[arg(short = 'n', long, default_value_t = 4)]
    count: usize,

    /// Hours between model-run intervals
    #[arg(long, default_value_t = DEFAULT_CADENCE_HOURS)]
    cadence: u32,

    /// Evaluate as of this RFC 3339 instant instead of now
    #[arg(long, value_name = "TIME")]
    at: Option<DateTime<Utc>>,

    /// Unit hint passed to the index formula (K, C, F)
    #[arg(long, default_value = "K")]
    unit: TemperatureUnit,
}

impl WindowArgs {
    fn now(&self) -> DateTime<Utc> {
        self.at.unwrap_or_else(Utc::now)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/hfi_forecast.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("hfi_forecast.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.snapshot {
        Some(path) => {
            info!(path = %path, "Using store snapshot");
            run(MemoryStore::load(&path)?, cli.command).await
        }
        None => {
            let config = StoreConfig::from_env()?;
            run(ValkeyStore::connect(&config).await?, cli.command).await
        }
    }
}

async fn run<S: ForecastStore>(store: S, command: Commands) -> Result<()> {
    match command {
        Commands::Ping => {
            store.ping().await?;
            info!("Forecast store is reachable");
            print_json(&json!({ "status": "ok", "message": "Forecast store is reachable" }))?;
        }
        Commands::Intervals { window } => {
            let intervals = resolve_intervals(window.now(), window.count, window.cadence)?;
            print_json(&intervals)?;
        }
        Commands::Nearby {
            lat,
            lon,
            radius,
            unit,
            count,
        } => {
            let query = RadiusQuery {
                longitude: lon,
                latitude: lat,
                radius,
                unit,
                count,
            };
            let results = store.geo_radius(&query).await?;
            info!(count = results.len(), "Radius search complete");
            print_json(&json!({ "count": results.len(), "results": results }))?;
        }
        Commands::Evaluate {
            location,
            window,
            csv,
        } => {
            let cell = resolve_cell(&store, &location).await?;
            let engine = engine(store, &window);
            let now = window.now();

            let intervals = engine.intervals(now, window.count)?;
            let evaluations = engine.evaluate_window(&intervals, &cell).await?;
            print_pretty(&evaluations);

            if let Some(path) = csv {
                append_records(&path, &cell, now, &evaluations)?;
            }
            print_json(&json!({ "spatial_cell": cell, "intervals": evaluations }))?;
        }
        Commands::Summary { location, window } => {
            let cell = resolve_cell(&store, &location).await?;
            let engine = engine(store, &window);

            let intervals = engine.intervals(window.now(), window.count)?;
            let summary = engine.summarize_window(&intervals, &cell).await?;
            print_json(&json!({ "spatial_cell": cell, "summary": summary }))?;
        }
        Commands::Forecast { location, window } => {
            let cell = resolve_cell(&store, &location).await?;
            let engine = engine(store, &window);

            let report = engine.forecast(window.now(), window.count, &cell).await?;
            if report.summary.is_none() {
                warn!(cell = %cell, "No interval in the window has usable data");
            }
            print_json(&report)?;
        }
    }

    Ok(())
}

fn engine<S: ForecastStore>(store: S, window: &WindowArgs) -> ForecastEngine<S, HeatIndexFormula> {
    ForecastEngine::new(store, HeatIndexFormula)
        .with_cadence(window.cadence)
        .with_unit(window.unit)
}

/// Uses `--cell` as given, or the stored cell nearest to `--lat/--lon`.
async fn resolve_cell<S: ForecastStore>(store: &S, location: &LocationArgs) -> Result<String> {
    if let Some(cell) = &location.cell {
        return Ok(cell.clone());
    }

    let (Some(lat), Some(lon)) = (location.lat, location.lon) else {
        bail!("either --cell or --lat and --lon are required");
    };

    let mut query = RadiusQuery::new(lat, lon);
    query.radius = location.search_radius;
    query.unit = DistanceUnit::Meters;
    query.count = 1;

    match store.geo_radius(&query).await?.into_iter().next() {
        Some(nearest) => {
            info!(
                cell = %nearest.key,
                distance = nearest.distance,
                unit = %query.unit,
                "Nearest cell"
            );
            Ok(nearest.key)
        }
        None => bail!(
            "no forecast cell within {} m of ({}, {})",
            location.search_radius,
            lat,
            lon
        ),
    }
}
