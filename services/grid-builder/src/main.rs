//! CHESS-SCAPE grid builder.
//!
//! Derives the 1km grid table from a pair of climate rasters, computes the
//! overlap tables of each administrative boundary and tags coastal regions.

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use ingestion::{
    select_boundaries, BoundaryDetailsWriter, CoastalTagger, GridBuilder, OverlapResolver,
};
use storage::{MemoryStore, PostgisStore};

use config::BuilderConfig;

#[derive(Parser, Debug)]
#[command(name = "grid-builder")]
#[command(about = "Build the CHESS-SCAPE grid and boundary overlap tables")]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config/grid-builder.yaml")]
    config: PathBuf,

    /// Log level, used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Use the in-memory store instead of the database (grid only)
    #[arg(long)]
    dry_run: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Rebuild the grid table from the raster pair
    Grid,
    /// Rebuild boundary overlap tables
    Overlaps {
        /// Boundary identifier (repeatable; default: all configured)
        #[arg(long = "boundary")]
        boundaries: Vec<String>,

        /// Leave regions without overlap unresolved
        #[arg(long)]
        skip_fallback: bool,
    },
    /// Tag coastal regions on boundary tables
    Coastal {
        /// Boundary identifier (repeatable; default: all configured)
        #[arg(long = "boundary")]
        boundaries: Vec<String>,
    },
    /// Rebuild the boundary_details table
    Details,
    /// Run grid, overlaps, coastal and details in order
    All,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    init_tracing(&args.log_level, args.log_format)?;

    let config = BuilderConfig::load(&args.config)?;
    info!(
        config = %args.config.display(),
        boundaries = config.boundaries.0.len(),
        dry_run = args.dry_run,
        "Loaded configuration"
    );

    if args.dry_run {
        return dry_run(&args.command, &config).await;
    }

    let store = PostgisStore::connect(
        &config.database.connection_url(),
        config.database.max_connections,
        config.grid.table.clone(),
    )
    .await
    .context("Failed to connect to database")?;
    store.ensure_postgis().await?;
    let store = Arc::new(store);

    match &args.command {
        Command::Grid => run_grid(store, &config).await,
        Command::Overlaps {
            boundaries,
            skip_fallback,
        } => run_overlaps(store, &config, boundaries, *skip_fallback).await,
        Command::Coastal { boundaries } => run_coastal(store, &config, boundaries).await,
        Command::Details => run_details(store, &config).await,
        Command::All => {
            run_grid(store.clone(), &config).await?;
            run_overlaps(store.clone(), &config, &[], false).await?;
            run_coastal(store.clone(), &config, &[]).await?;
            run_details(store, &config).await
        }
    }
}

fn init_tracing(level: &str, format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true);

    match format {
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish())?,
        LogFormat::Text => tracing::subscriber::set_global_default(builder.finish())?,
    }
    Ok(())
}

/// Grid derivation against the in-memory store; nothing is written.
async fn dry_run(command: &Command, config: &BuilderConfig) -> Result<()> {
    match command {
        Command::Grid => {}
        Command::All => warn!("Dry run covers the grid stage only; later stages are skipped"),
        other => anyhow::bail!("--dry-run is only supported for grid, not {:?}", other),
    }

    let store = Arc::new(MemoryStore::new());
    let report = GridBuilder::new(store, config.grid.processing.clone())
        .with_dry_run(true)
        .build_from_files(&raster_sources(config)?)
        .await?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn raster_sources(config: &BuilderConfig) -> Result<ingestion::RasterSources> {
    config
        .rasters
        .as_ref()
        .map(|r| r.sources())
        .context("The grid command needs a `rasters` section in the configuration")
}

async fn run_grid(store: Arc<PostgisStore>, config: &BuilderConfig) -> Result<()> {
    let sources = raster_sources(config)?;
    let report = GridBuilder::new(store, config.grid.processing.clone())
        .build_from_files(&sources)
        .await
        .context("Grid build failed")?;

    info!(
        rows = report.rows_loaded,
        coastal = ?report.coastal_counts,
        "Grid stage complete"
    );
    Ok(())
}

async fn run_overlaps(
    store: Arc<PostgisStore>,
    config: &BuilderConfig,
    requested: &[String],
    skip_fallback: bool,
) -> Result<()> {
    let selection = selected(config, requested);
    let boundaries = select_boundaries(&config.boundaries.0, selection)?;

    let report = OverlapResolver::new(store, config.overlaps.nearest_search.clone())
        .with_skip_fallback(skip_fallback)
        .resolve_all(boundaries)
        .await
        .context("Overlap processing failed")?;

    for boundary in &report.boundaries {
        info!(
            boundary = %boundary.boundary,
            overlap_rows = boundary.overlap_rows,
            fallbacks = boundary.fallbacks.len(),
            unresolved = boundary.unresolved.len(),
            "Boundary overlaps"
        );
        for fallback in &boundary.fallbacks {
            info!(
                boundary = %boundary.boundary,
                gid = fallback.gid,
                grid_cell_id = fallback.grid_cell_id,
                scale_factor = fallback.scale_factor,
                "Fallback"
            );
        }
    }
    Ok(())
}

async fn run_coastal(store: Arc<PostgisStore>, config: &BuilderConfig, requested: &[String]) -> Result<()> {
    let selection = selected(config, requested);
    let boundaries = select_boundaries(&config.boundaries.0, selection)?;

    let tagger = CoastalTagger::from_config(store, &config.coastal)?;
    let report = tagger.tag_all(boundaries).await;

    for (boundary, tagged) in &report.tagged {
        info!(boundary = %boundary, coastal_regions = tagged, "Coastal tagging");
    }
    for (boundary, message) in &report.failed {
        error!(boundary = %boundary, error = %message, "Coastal tagging failed");
    }

    if report.is_complete() {
        Ok(())
    } else {
        anyhow::bail!("Coastal tagging failed for {} boundaries", report.failed.len())
    }
}

async fn run_details(store: Arc<PostgisStore>, config: &BuilderConfig) -> Result<()> {
    let rows = BoundaryDetailsWriter::new(store)
        .write(&config.boundaries.0)
        .await
        .context("Writing boundary details failed")?;
    info!(rows, "Details stage complete");
    Ok(())
}

/// Command-line selection, or the configured one when none was given.
fn selected<'a>(config: &'a BuilderConfig, requested: &'a [String]) -> &'a [String] {
    if requested.is_empty() {
        &config.overlaps.boundaries
    } else {
        requested
    }
}
