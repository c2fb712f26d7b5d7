//! LandShift CLI - land-cover transition analysis from NDVI time series

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use landshift_algorithms::classification::classify;
use landshift_algorithms::imagery::reclassify;
use landshift_algorithms::statistics::band_range;
use landshift_algorithms::vector::{
    dissolve, label_period, regions_to_features, vectorize, Connectivity, LabelParams, Period,
    PolygonizeParams,
};
use landshift_core::io::{read_geojson, read_geotiff, read_geotiff_bands, write_geojson, write_geotiff};
use landshift_core::raster::BandSelection;
use landshift_core::{to_hectares, Raster};
use landshift_pipeline::{discover_datasets, DatasetStatus, Pipeline, RunConfig};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "landshift")]
#[command(author, version, about = "Land-cover transition analysis from NDVI rasters", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show information about a measurement raster
    Info {
        /// Input raster file
        input: PathBuf,
    },
    /// Reclassify a measurement band into equal-interval classes
    Classify {
        /// Input measurement raster
        input: PathBuf,
        /// Output class raster
        output: PathBuf,
        /// Number of classes
        #[arg(short = 'n', long, default_value = "5")]
        classes: usize,
        /// Band: auto or a 1-based band number
        #[arg(short, long, default_value = "auto")]
        band: String,
    },
    /// Turn a class raster into one polygon layer
    Vectorize {
        /// Input class raster
        input: PathBuf,
        /// Output GeoJSON file
        output: PathBuf,
        /// Join cells that touch only at a corner
        #[arg(short, long)]
        eight_connected: bool,
        /// Merge all regions of a class into one multipolygon
        #[arg(short, long)]
        dissolve: bool,
    },
    /// Rename the class field of a polygon layer after its period
    Label {
        /// Input GeoJSON layer
        input: PathBuf,
        /// Output GeoJSON file
        output: PathBuf,
        /// Period (usually a year)
        #[arg(short, long)]
        period: i32,
        /// Class field of the input
        #[arg(short, long, default_value = "DN")]
        field: String,
        /// Prefix of the output field
        #[arg(long, default_value = "Class")]
        prefix: String,
    },
    /// Run the transition pipeline described by a configuration file
    Transitions {
        /// TOML run configuration
        config: PathBuf,
        /// Override the number of datasets processed at once
        #[arg(short, long)]
        workers: Option<usize>,
        /// Override the output directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Build dataset entries from file names like NDVI_<sector>_<year>.tif
    Discover {
        /// Directory holding the inputs
        dir: PathBuf,
        /// Sector names to look for
        #[arg(short, long, required = true, num_args = 1..)]
        sector: Vec<String>,
        /// Output directory written into the configuration
        #[arg(short, long, default_value = "out")]
        output: PathBuf,
    },
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn parse_band(s: &str) -> Result<BandSelection> {
    if s.eq_ignore_ascii_case("auto") {
        return Ok(BandSelection::Auto);
    }
    let band: usize = s
        .parse()
        .with_context(|| format!("Band must be 'auto' or a number, got: {}", s))?;
    Ok(BandSelection::Index(band))
}

fn read_band(path: &Path, band: BandSelection) -> Result<(usize, Raster<f64>)> {
    let pb = spinner("Reading raster...");
    let bands = read_geotiff_bands(path).context("Failed to read raster")?;
    let index = band.resolve(bands.count())?;
    let raster = bands.into_band(BandSelection::Index(index))?;
    pb.finish_and_clear();
    info!("Input: {} x {}, band {}", raster.cols(), raster.rows(), index);
    Ok((index, raster))
}

fn done(name: &str, path: &Path, elapsed: std::time::Duration) {
    println!("{} saved to: {}", name, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        // ── Info ─────────────────────────────────────────────────────
        Commands::Info { input } => {
            let bands = read_geotiff_bands(&input).context("Failed to read raster")?;
            let first = bands.band(1)?;
            let (rows, cols) = first.shape();
            let bounds = first.bounds();

            println!("File: {}", input.display());
            println!("Dimensions: {} x {} ({} cells)", cols, rows, first.len());
            println!(
                "Cell size: {} ({:.4} ha per cell)",
                first.transform().cell_size(),
                to_hectares(first.cell_area())
            );
            println!(
                "Bounds: ({:.6}, {:.6}) - ({:.6}, {:.6})",
                bounds.0, bounds.1, bounds.2, bounds.3
            );
            match first.crs() {
                Some(crs) if crs.is_geographic() => {
                    println!("CRS: {} (geographic, areas will not be in hectares)", crs)
                }
                Some(crs) => println!("CRS: {}", crs),
                None => println!("CRS: unknown"),
            }
            if let Some(nodata) = first.nodata() {
                println!("NoData: {}", nodata);
            }
            println!(
                "Bands: {} (auto selects band {})",
                bands.count(),
                BandSelection::Auto.resolve(bands.count())?
            );

            for index in 1..=bands.count() {
                let stats = bands.band(index)?.statistics();
                println!("\nBand {}:", index);
                if let (Some(min), Some(max)) = (stats.min, stats.max) {
                    println!("  Range: {:.4} .. {:.4}", min, max);
                }
                println!(
                    "  Valid cells: {} ({:.1}%)",
                    stats.valid_count,
                    100.0 * stats.valid_count as f64 / first.len().max(1) as f64
                );
            }
        }

        // ── Classify ─────────────────────────────────────────────────
        Commands::Classify {
            input,
            output,
            classes,
            band,
        } => {
            let (_, raster) = read_band(&input, parse_band(&band)?)?;
            let start = Instant::now();
            let range = band_range(&raster).context("Failed to compute value range")?;
            let breaks =
                classify(range.min, range.max, classes).context("Failed to compute breaks")?;
            let result = reclassify(&raster, &breaks).context("Failed to reclassify")?;
            let elapsed = start.elapsed();

            println!("Range: {:.4} .. {:.4} ({} valid cells)", range.min, range.max, range.valid_count);
            if breaks.is_degenerate() {
                println!("Constant band: range widened before classifying");
            }
            for (class, lower, upper) in breaks.intervals() {
                println!("  Class {}: {:.4} .. {:.4}", class, lower, upper);
            }

            let pb = spinner("Writing output...");
            write_geotiff(&result, &output).context("Failed to write output")?;
            pb.finish_and_clear();
            done("Classes", &output, elapsed);
        }

        // ── Vectorize ────────────────────────────────────────────────
        Commands::Vectorize {
            input,
            output,
            eight_connected,
            dissolve: merge,
        } => {
            let pb = spinner("Reading raster...");
            let classes: Raster<i32> = read_geotiff(&input, None).context("Failed to read raster")?;
            pb.finish_and_clear();

            let start = Instant::now();
            let params = PolygonizeParams {
                connectivity: if eight_connected {
                    Connectivity::Eight
                } else {
                    Connectivity::Four
                },
            };
            let mut regions = vectorize(&classes, &params);
            if merge {
                regions = dissolve(&regions);
            }
            let name = output
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "regions".to_string());
            let features = regions_to_features(&regions, &name, classes.crs())?;
            let elapsed = start.elapsed();

            println!("Regions: {}", regions.len());
            write_geojson(&features, &output).context("Failed to write output")?;
            done("Polygons", &output, elapsed);
        }

        // ── Label ────────────────────────────────────────────────────
        Commands::Label {
            input,
            output,
            period,
            field,
            prefix,
        } => {
            let layer = read_geojson(&input).context("Failed to read layer")?;
            let start = Instant::now();
            let params = LabelParams {
                class_field: field,
                field_prefix: prefix,
            };
            let labelled = label_period(&layer, Period(period), &params)?;
            let elapsed = start.elapsed();

            println!(
                "Field {}: {} regions, {:.4} ha",
                labelled.field,
                labelled.len(),
                labelled.total_area_ha()
            );
            write_geojson(&labelled.to_features()?, &output).context("Failed to write output")?;
            done("Labelled layer", &output, elapsed);
        }

        // ── Transitions ──────────────────────────────────────────────
        Commands::Transitions {
            config,
            workers,
            output,
        } => {
            let mut run = RunConfig::load(&config)
                .with_context(|| format!("Failed to load {}", config.display()))?;
            if workers.is_some() {
                run.workers = workers;
            }
            if let Some(output) = output {
                run.output_dir = output;
            }

            let pb = spinner(&format!("Processing {} datasets...", run.datasets.len()));
            let start = Instant::now();
            let summary = Pipeline::new(run).run().context("Run failed")?;
            pb.finish_and_clear();

            for dataset in &summary.datasets {
                match dataset.status {
                    DatasetStatus::Completed => println!(
                        "{}: {} histories, {:.4} ha",
                        dataset.name, dataset.histories, dataset.total_area_ha
                    ),
                    _ => println!(
                        "{}: {:?} ({})",
                        dataset.name,
                        dataset.status,
                        dataset.error.as_deref().unwrap_or("no detail")
                    ),
                }
            }
            if summary.failed() > 0 {
                warn!("{} of {} datasets failed", summary.failed(), summary.datasets.len());
            }
            done("Transition tables", &summary.output_dir, start.elapsed());
        }

        // ── Discover ─────────────────────────────────────────────────
        Commands::Discover {
            dir,
            sector,
            output,
        } => {
            let datasets = discover_datasets(&dir, &sector)
                .with_context(|| format!("Failed to scan {}", dir.display()))?;
            let mut config = RunConfig::new(output);
            config.datasets = datasets;
            print!(
                "{}",
                toml::to_string(&config).context("Failed to format configuration")?
            );
        }
    }

    Ok(())
}
