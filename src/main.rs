//! CLI entry point for the transit delay dashboard.
//!
//! Provides subcommands for summarizing a data source, listing filtered and
//! styled routes, and deriving the dashboard resources from raw delay events.

use anyhow::{Context, Result};
use chrono::{NaiveDateTime, Utc};
use clap::{Parser, Subcommand};
use serde_json::{Value, json};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};
use transit_delay_dash::{
    analyzers::{
        aggregate::compute_statistics,
        performance::{location_analysis, rank_routes, route_performance},
    },
    cache::ResultCache,
    color::VisualizationMode,
    config::DashboardConfig,
    dashboard::DashboardView,
    fetch::BasicClient,
    filter::FilterState,
    gtfs::geometries_or_sample,
    loader::{
        DataLoader, LOCATION_ANALYSIS, ROUTE_GEOMETRIES, ROUTE_PERFORMANCE, SUMMARY_STATISTICS,
    },
    normalize::{delay_events, parse_date},
    output::{
        should_refresh, write_geometries_json, write_location_analysis_csv,
        write_route_performance_csv, write_summary_json,
    },
    parser::parse_json,
};

#[derive(Parser)]
#[command(name = "transit_delay_dash")]
#[command(about = "Transit delay dashboard data tool", long_about = None)]
struct Cli {
    /// JSON config file; defaults and DASH_* variables are used without one
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Data directory or base URL, overriding the configured source
    #[arg(short, long, global = true)]
    source: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load every resource and log the summary statistics
    Summary {
        /// Number of most delayed routes to list
        #[arg(short = 'n', long, default_value_t = 5)]
        top: usize,
    },
    /// Print filtered routes with their map styling as JSON
    Routes {
        /// Minimum average delay in minutes
        #[arg(long, default_value_t = 0.0)]
        min_delay: f64,

        /// Case-insensitive match on route id or name
        #[arg(long, default_value = "")]
        search: String,

        /// Start of the event date range
        #[arg(long, value_parser = parse_day)]
        start: Option<NaiveDateTime>,

        /// End of the event date range (inclusive of the whole day)
        #[arg(long, value_parser = parse_day)]
        end: Option<NaiveDateTime>,

        /// Metric driving the colours: delay or frequency
        #[arg(long, default_value = "delay")]
        mode: VisualizationMode,
    },
    /// Derive the dashboard resources from raw delay events
    Derive {
        /// Raw delay event JSON file
        #[arg(short, long, value_name = "FILE")]
        events: PathBuf,

        /// Directory holding GTFS shapes.txt and trips.txt
        #[arg(short, long)]
        gtfs_dir: Option<PathBuf>,

        /// Directory the derived files are written to
        #[arg(short, long, default_value = "assets/data")]
        output_dir: PathBuf,

        /// Rebuild even if the existing summary is less than an hour old
        #[arg(long, default_value_t = false)]
        force: bool,
    },
}

fn parse_day(s: &str) -> Result<NaiveDateTime, String> {
    parse_date(&Value::String(s.to_string())).ok_or_else(|| format!("unrecognised date: {s}"))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/transit_delay_dash.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("transit_delay_dash.log"));

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

    let mut config = match &cli.config {
        Some(path) => DashboardConfig::load(path)?,
        None => DashboardConfig::from_env()?,
    };
    if let Some(source) = cli.source {
        config.data_source = source;
    }

    match cli.command {
        Commands::Summary { top } => summary(&config, top).await?,
        Commands::Routes {
            min_delay,
            search,
            start,
            end,
            mode,
        } => {
            let filter = FilterState {
                start,
                end,
                delay_threshold: min_delay,
                search_query: search,
            };
            routes(&config, &filter, mode).await?;
        }
        Commands::Derive {
            events,
            gtfs_dir,
            output_dir,
            force,
        } => derive(&events, gtfs_dir.as_deref(), &output_dir, force)?,
    }

    Ok(())
}

#[tracing::instrument(skip(config), fields(source = %config.data_source))]
async fn summary(config: &DashboardConfig, top: usize) -> Result<()> {
    let cache = ResultCache::new();
    let loader = DataLoader::new(BasicClient::new(), config.data_source.clone(), &cache)
        .with_ttl(config.cache_ttl());
    let dataset = loader.load_all().await;
    let stats = DashboardView::compute(
        &dataset,
        &FilterState::default(),
        VisualizationMode::Delay,
        config.weights(),
    )
    .statistics;

    info!(
        total_delays = stats.total_delays,
        valid_delays = stats.valid_delays,
        avg_delay_minutes = stats.avg_delay_minutes,
        total_routes = stats.total_routes,
        unique_vehicles = stats.unique_vehicles,
        unique_locations = stats.unique_locations,
        coverage_percentage = stats.coverage_percentage,
        peak_delay_hour = %stats.peak_delay_hour,
        most_delayed_route = %stats.most_delayed_route,
        time_period = %stats.time_period,
        "Summary statistics"
    );

    for (rank, route) in rank_routes(&dataset.routes, top).iter().enumerate() {
        info!(
            rank = rank + 1,
            route_id = %route.route_id,
            name = %route.display_name,
            avg_delay_minutes = route.avg_delay_minutes,
            delay_count = route.delay_count,
            "Most delayed route"
        );
    }

    Ok(())
}

#[tracing::instrument(skip(config, filter), fields(source = %config.data_source))]
async fn routes(
    config: &DashboardConfig,
    filter: &FilterState,
    mode: VisualizationMode,
) -> Result<()> {
    let cache = ResultCache::new();
    let loader = DataLoader::new(BasicClient::new(), config.data_source.clone(), &cache)
        .with_ttl(config.cache_ttl());
    let dataset = loader.load_all().await;

    let view = DashboardView::compute(&dataset, filter, mode, config.weights());
    if view.routes.is_empty() {
        warn!("No routes match the current filters");
    }

    let styles = view.route_styles();
    let routes: Vec<Value> = view
        .routes
        .iter()
        .zip(styles.iter())
        .map(|(route, style)| {
            json!({
                "route_id": route.route_id,
                "name": route.display_name,
                "avg_delay_minutes": route.avg_delay_minutes,
                "delay_count": route.delay_count,
                "color": style.color.to_hex(),
                "weight": style.weight,
                "points": view.geometries.get(&route.route_id).map_or(0, Vec::len),
            })
        })
        .collect();

    let legend: Vec<Value> = view
        .legend()
        .iter()
        .map(|entry| json!({ "from": entry.from, "color": entry.color.to_hex() }))
        .collect();

    let report = json!({
        "mode": mode,
        "filter": filter,
        "routes": routes,
        "legend": legend,
        "statistics": view.statistics,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}

/// Builds the four dashboard resources from raw delay events.
#[tracing::instrument(
    skip(events, output_dir),
    fields(events = %events.display(), output_dir = %output_dir.display())
)]
fn derive(events: &Path, gtfs_dir: Option<&Path>, output_dir: &Path, force: bool) -> Result<()> {
    let now = Utc::now();
    let summary_path = output_dir.join(SUMMARY_STATISTICS);
    if !force && !should_refresh(&summary_path, now) {
        info!("Data is less than an hour old, skipping update");
        return Ok(());
    }

    let text = std::fs::read_to_string(events)
        .with_context(|| format!("reading {}", events.display()))?;
    let events = delay_events(&parse_json(&text)?)?;
    info!(events = events.len(), "Delay events loaded");

    let performance = route_performance(&events);
    let locations = location_analysis(&events);
    let summary = compute_statistics(&events).with_updated_at(now);

    let geometries = geometries_or_sample(gtfs_dir);

    std::fs::create_dir_all(output_dir)?;
    write_route_performance_csv(&output_dir.join(ROUTE_PERFORMANCE), &performance)?;
    write_geometries_json(&output_dir.join(ROUTE_GEOMETRIES), &geometries)?;
    write_location_analysis_csv(&output_dir.join(LOCATION_ANALYSIS), &locations)?;
    write_summary_json(&summary_path, &summary)?;

    info!(
        routes = performance.len(),
        geometries = geometries.len(),
        locations = locations.len(),
        "Derived data written"
    );
    Ok(())
}
