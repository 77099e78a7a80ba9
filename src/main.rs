use clap::{Args, Parser, Subcommand};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use chrono::{DateTime, Utc};
use sat_transit::config::StationConfig;
use sat_transit::predict::{
    from_datetime, observe, transits, OrbitalElements, PredictError, Sgp4Propagator,
    StationCoordinates, TransitSummary,
};

const DEFAULT_WINDOW: &str = "1day";

#[derive(Parser)]
#[command(name = "sat-transit")]
#[command(about = "Satellite pass prediction and analysis")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Look angles of a satellite at one instant
    Observe {
        #[command(flatten)]
        target: Target,
        /// Time of observation (RFC3339), defaults to now
        #[arg(long)]
        at: Option<String>,
    },
    /// List upcoming transits
    Transits {
        #[command(flatten)]
        target: Target,
        /// Only transits ending after this time (RFC3339), defaults to now
        #[arg(long)]
        after: Option<String>,
        /// Search horizon, e.g. "12h" or "3days"
        #[arg(long)]
        within: Option<String>,
        /// Stop after this many transits
        #[arg(long)]
        count: Option<usize>,
        /// Trim each transit to the part above this elevation (degrees)
        #[arg(long)]
        min_elevation: Option<f64>,
    },
}

#[derive(Args)]
struct Target {
    /// File holding a three-line element set
    #[arg(long)]
    tle: PathBuf,
    /// Station YAML file (name, latitude, longitude, altitude)
    #[arg(long, conflicts_with_all = ["qth", "coordinates"])]
    station: Option<PathBuf>,
    /// predict QTH file
    #[arg(long, conflicts_with = "coordinates")]
    qth: Option<PathBuf>,
    /// "lat(N),long(W),alt(m)"
    #[arg(long, allow_hyphen_values = true)]
    coordinates: Option<String>,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Observe { target, at } => run_observe(&target, at.as_deref()),
        Commands::Transits {
            target,
            after,
            within,
            count,
            min_elevation,
        } => run_transits(
            &target,
            after.as_deref(),
            within.as_deref(),
            count,
            min_elevation,
        ),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_observe(target: &Target, at: Option<&str>) -> Result<(), String> {
    let (elements, station) = load_target(target)?;
    let at = at.map(parse_time).transpose()?;

    let obs =
        observe(&Sgp4Propagator::new(), &elements, &station, at).map_err(|e| e.to_string())?;
    let json = serde_json::to_string_pretty(&obs).map_err(|e| e.to_string())?;
    println!("{}", json);
    Ok(())
}

fn run_transits(
    target: &Target,
    after: Option<&str>,
    within: Option<&str>,
    count: Option<usize>,
    min_elevation: Option<f64>,
) -> Result<(), String> {
    let (elements, station) = load_target(target)?;
    let propagator = Sgp4Propagator::new();

    let after = match after {
        Some(s) => parse_time(s)?,
        None => from_datetime(Utc::now()),
    };
    let before = search_horizon(after, within, count, min_elevation)?;

    log::info!(
        "Predicting transits of {} after {}",
        elements.object_name(),
        after
    );

    let found = transits(&propagator, elements, station, Some(after), before);
    let found: Box<dyn Iterator<Item = _> + '_> = match min_elevation {
        Some(elevation) => Box::new(found.above(elevation)),
        None => Box::new(found),
    };

    for transit in found.take(count.unwrap_or(usize::MAX)) {
        let summary: TransitSummary = transit
            .and_then(|t| t.summary())
            .map_err(|e| e.to_string())?;
        let json = serde_json::to_string(&summary).map_err(|e| e.to_string())?;
        println!("{}", json);
    }
    Ok(())
}

/// End of the transit search, if any.
///
/// Only an unfiltered search with a count is left open-ended. Without a count
/// it would never stop, and with an elevation filter the count may never fill.
fn search_horizon(
    after: f64,
    within: Option<&str>,
    count: Option<usize>,
    min_elevation: Option<f64>,
) -> Result<Option<f64>, String> {
    let within = match (within, count, min_elevation) {
        (Some(w), _, _) => w,
        (None, Some(_), None) => return Ok(None),
        (None, _, _) => DEFAULT_WINDOW,
    };
    humantime::parse_duration(within)
        .map(|d| Some(after + d.as_secs_f64()))
        .map_err(|e| format!("invalid duration '{}': {}", within, e))
}

fn load_target(target: &Target) -> Result<(OrbitalElements, StationCoordinates), String> {
    let tle = fs::read_to_string(&target.tle)
        .map_err(|e| format!("Error reading {}: {}", target.tle.display(), e))?;
    let elements = OrbitalElements::from_text(&tle).map_err(|e| e.to_string())?;

    let station = if let Some(path) = &target.station {
        StationConfig::from_file(path)
            .map_err(|e| e.to_string())?
            .coordinates()
    } else if let Some(path) = &target.qth {
        StationConfig::from_qth_file(path)
            .map_err(|e| e.to_string())?
            .coordinates()
    } else if let Some(coordinates) = &target.coordinates {
        coordinates
            .parse()
            .map_err(|e: PredictError| e.to_string())?
    } else {
        return Err("one of --station, --qth or --coordinates is required".into());
    };

    Ok((elements, station))
}

fn parse_time(s: &str) -> Result<f64, String> {
    DateTime::parse_from_rfc3339(s.trim())
        .map(|dt| from_datetime(dt.with_timezone(&Utc)))
        .map_err(|e| format!("invalid time '{}': {}", s, e))
}
