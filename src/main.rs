//! CLI entry point for the route unifier.
//!
//! Provides subcommands for listing the operator's lines, snapshotting the
//! live feed to CSV tables, and unifying shapes with stops into the
//! `routes_unified` table.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use route_unifier::batch::{BatchOutcome, unify_lines};
use route_unifier::config::{DEFAULT_TOLERANCE_METERS, LineSelection, UnifyConfig};
use route_unifier::feed::{DEFAULT_BASE_URL, FeedSource, TableDirFeed, UrbsFeed};
use route_unifier::fetch::BasicClient;
use route_unifier::fetch::auth::UrlParam;
use route_unifier::store::{
    CsvTableStore, LINES_TABLE, ROUTES_UNIFIED_TABLE, RUNS_TABLE, S3TableStore, SHAPES_TABLE,
    STOPS_TABLE, TableStore, WriteMode,
};
use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "route_unifier")]
#[command(about = "Merges bus route shapes with their stops", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the lines published by the live feed
    Lines,
    /// Save lines, shapes and stops from the live feed as CSV tables
    Snapshot {
        /// Directory to write lines.csv, shapes.csv and stops.csv into
        #[arg(short, long, default_value = "snapshot")]
        output_dir: String,

        /// JSON object keyed by line number restricting which lines are saved
        #[arg(long)]
        lines_file: Option<String>,
    },
    /// Unify shapes and stops of the selected lines
    Unify {
        /// Read a snapshot directory instead of the live feed
        #[arg(short, long)]
        input_dir: Option<String>,

        /// Line number to unify (repeatable)
        #[arg(short, long = "line")]
        lines: Vec<String>,

        /// JSON object keyed by line number selecting the lines to unify
        #[arg(long)]
        lines_file: Option<String>,

        /// Maximum distance in meters between shape and itinerary endpoints
        #[arg(short, long, default_value_t = DEFAULT_TOLERANCE_METERS)]
        tolerance: f64,

        /// Maximum number of lines processed concurrently
        #[arg(short, long, default_value_t = 5)]
        concurrency: usize,

        /// Directory for the CSV output tables
        #[arg(short, long, default_value = "output")]
        output_dir: String,

        /// Optional: S3 bucket to write the output tables to instead
        #[arg(long)]
        s3_bucket: Option<String>,

        /// Key prefix inside the S3 bucket
        #[arg(long, default_value = "")]
        s3_prefix: String,

        /// Optional: Gzip compress objects written to S3
        #[arg(long, default_value_t = false)]
        gzip: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/route_unifier.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("route_unifier.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse().unwrap()));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse().unwrap()));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Lines => {
            let feed = live_feed()?;
            let lines = feed.lines().await?;

            for line in &lines {
                info!(
                    line = %line.line_number,
                    name = %line.name,
                    category = line.service_category.as_deref().unwrap_or(""),
                    color = line.color.as_deref().unwrap_or(""),
                    "Line"
                );
            }
            info!(total = lines.len(), "Line list fetched");
        }
        Commands::Snapshot {
            output_dir,
            lines_file,
        } => {
            let selection = load_selection(lines_file.as_deref())?;
            snapshot(&live_feed()?, &CsvTableStore::new(&output_dir)?, &selection).await?;
        }
        Commands::Unify {
            input_dir,
            lines,
            lines_file,
            tolerance,
            concurrency,
            output_dir,
            s3_bucket,
            s3_prefix,
            gzip,
        } => {
            let config = UnifyConfig::with_tolerance(tolerance)?;
            let source: Arc<dyn FeedSource> = match &input_dir {
                Some(dir) => Arc::new(TableDirFeed::open(dir)?),
                None => Arc::new(live_feed()?),
            };

            let selection = load_selection(lines_file.as_deref())?;
            let lines = select_lines(source.as_ref(), lines, &selection).await?;
            if lines.is_empty() {
                warn!("No lines selected, nothing to unify");
                return Ok(());
            }

            let outcome = unify_lines(source, lines, config, concurrency).await;

            match s3_bucket {
                Some(bucket) => {
                    info!(bucket = %bucket, prefix = %s3_prefix, gzip, "Writing tables to S3");
                    let store = S3TableStore::from_env(&bucket, &s3_prefix, gzip).await;
                    persist(&store, &outcome).await?;
                }
                None => persist(&CsvTableStore::new(&output_dir)?, &outcome).await?,
            }
        }
    }

    Ok(())
}

/// Live feed authenticated with `URBS_API_KEY`.
fn live_feed() -> Result<UrbsFeed<UrlParam<BasicClient>>> {
    let api_key = std::env::var("URBS_API_KEY").context("URBS_API_KEY must be set")?;
    let base_url = std::env::var("URBS_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
    UrbsFeed::with_api_key(&base_url, api_key)
}

fn load_selection(path: Option<&str>) -> Result<LineSelection> {
    match path {
        Some(path) => {
            let selection = LineSelection::load(path)?;
            info!(path, lines = selection.line_numbers().count(), "Line selection loaded");
            Ok(selection)
        }
        None => Ok(LineSelection::default()),
    }
}

/// Explicit `--line` arguments win, then the selection file, then every line
/// in the source's catalogue.
async fn select_lines(
    source: &dyn FeedSource,
    explicit: Vec<String>,
    selection: &LineSelection,
) -> Result<Vec<String>> {
    if !explicit.is_empty() {
        return Ok(explicit);
    }
    if !selection.is_empty() {
        return Ok(selection.line_numbers().map(str::to_string).collect());
    }
    let lines = source.lines().await.context("failed to fetch line catalogue")?;
    Ok(lines.into_iter().map(|l| l.line_number).collect())
}

/// Copies the selected lines' records from `source` into `store`.
#[tracing::instrument(skip_all)]
async fn snapshot<S: TableStore>(
    source: &dyn FeedSource,
    store: &S,
    selection: &LineSelection,
) -> Result<()> {
    let mut lines = source.lines().await?;
    if !selection.is_empty() {
        lines.retain(|l| selection.contains(&l.line_number));
    }
    info!(lines = lines.len(), "Snapshotting lines");

    let mut shape_points = Vec::new();
    let mut stops = Vec::new();
    for line in &lines {
        match source.shape_points(&line.line_number).await {
            Ok(rows) => shape_points.extend(rows),
            Err(e) => error!(line = %line.line_number, error = format!("{e:#}"), "Shape fetch failed"),
        }
        match source.stops(&line.line_number).await {
            Ok(rows) => stops.extend(rows),
            Err(e) => error!(line = %line.line_number, error = format!("{e:#}"), "Stop fetch failed"),
        }
    }

    store.write_table(LINES_TABLE, &lines, WriteMode::Replace).await?;
    store.write_table(SHAPES_TABLE, &shape_points, WriteMode::Replace).await?;
    store.write_table(STOPS_TABLE, &stops, WriteMode::Replace).await?;

    info!(
        lines = lines.len(),
        shape_points = shape_points.len(),
        stops = stops.len(),
        "Snapshot complete"
    );
    Ok(())
}

/// Replaces the unified table and appends the run summary.
async fn persist<S: TableStore>(store: &S, outcome: &BatchOutcome) -> Result<()> {
    store
        .write_table(ROUTES_UNIFIED_TABLE, &outcome.points, WriteMode::Replace)
        .await?;
    store
        .write_table(RUNS_TABLE, std::slice::from_ref(&outcome.stats), WriteMode::Append)
        .await?;

    info!(
        points = outcome.points.len(),
        lines_unified = outcome.stats.lines_unified,
        lines_failed = outcome.stats.lines_failed,
        variant_success_pct = format!("{:.1}", outcome.stats.variant_success_pct()),
        "Run persisted"
    );
    Ok(())
}
