use std::path::{Path, PathBuf};

use anyhow::bail;
use clap::{Parser, Subcommand};
use env_logger::{Env, TimestampPrecision};
use geo::raster::RasterReadWrite;
use hotspots::{
    AggregationOptions, DelineationSettings, HotspotConfig, HotspotMask, HotspotOutcome, MinimumArea,
    job::{self, coverage_label},
    richness::{self, DEFAULT_BATCH_SIZE},
};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use indicatif_log_bridge::LogWrapper;

use crate::options::{ConnectivitySelection, NodataSelection};

pub type Result<T> = anyhow::Result<T>;

mod options;

#[derive(Parser, Debug)]
#[command(name = "hotspotcli")]
#[command(about = "Species richness and biodiversity hotspot rasters")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "Sum the species habitat rasters of a directory into a richness raster")]
    Richness {
        #[arg(short = 'i', long = "input", help = "Directory containing the species habitat rasters")]
        input: PathBuf,
        #[arg(short = 'o', long = "output", help = "Output richness raster")]
        output: PathBuf,
        #[arg(long = "batch-size", default_value_t = DEFAULT_BATCH_SIZE)]
        batch_size: usize,
        #[arg(long = "nodata-policy", value_name = "data|zero|propagate")]
        nodata_policy: Option<NodataSelection>,
        #[arg(long = "parallel", help = "Sum the batches concurrently")]
        parallel: bool,
        #[arg(long = "manifest", help = "Write the list of included species next to the output")]
        manifest: bool,
    },
    #[command(about = "Run all the hotspot jobs of a configuration file")]
    Hotspots {
        #[arg(short = 'c', long = "config", help = "JSON configuration file")]
        config: PathBuf,
        #[arg(long = "noprogress")]
        no_progress: bool,
    },
    #[command(about = "Delineate the hotspots of a single richness raster")]
    Delineate {
        #[arg(short = 'i', long = "input", help = "Richness raster")]
        input: PathBuf,
        #[arg(short = 'o', long = "output", help = "Output hotspot raster")]
        output: PathBuf,
        #[arg(long = "coverage", help = "Target fraction of the land area, e.g. 0.05")]
        coverage: f64,
        #[arg(long = "min-area-km2", default_value_t = 10.0)]
        min_area_km2: f64,
        #[arg(long = "connectivity", value_name = "four|eight")]
        connectivity: Option<ConnectivitySelection>,
        #[arg(long = "cell-area-km2", help = "Cell area, required for grids in geographic coordinates")]
        cell_area_km2: Option<f64>,
    },
}

fn create_richness(input: &Path, output: &Path, options: AggregationOptions, manifest: bool) -> Result<()> {
    let paths = richness::discover_species_rasters(input)?;
    if paths.is_empty() {
        bail!("No species rasters found in {}", input.display());
    }

    let summary = richness::create_richness_raster(&paths, output, &options)?;
    if manifest {
        let manifest_path = output.with_extension("txt");
        richness::write_manifest(&manifest_path, &summary)?;
        log::info!("Species manifest written to {}", manifest_path.display());
    }

    println!(
        "{} species in {} batches, maximum richness: {}",
        summary.species.len(),
        summary.batches,
        summary.max_richness.map_or_else(|| "-".to_string(), |v| v.to_string())
    );

    Ok(())
}

fn print_outcome(outcome: &HotspotOutcome) {
    println!(
        "{:<20} {:>6}% threshold {:>5} coverage {:>8.4}% {:<14} regions {:>4}/{:<4} -> {}",
        outcome.job.group,
        coverage_label(outcome.job.coverage),
        outcome.search.threshold,
        outcome.search.coverage * 100.0,
        if outcome.search.converged { "" } else { "(not converged)" },
        outcome.contiguity.clusters - outcome.contiguity.removed_clusters,
        outcome.contiguity.clusters,
        outcome.job.output.display()
    );
}

fn run_hotspots(config_path: &Path, multi: &MultiProgress, show_progress: bool) -> Result<()> {
    let config = HotspotConfig::from_file(config_path)?;

    let job_count = job::plan_jobs(&config).len() as u64;
    let progress = if show_progress {
        multi.add(ProgressBar::new(job_count))
    } else {
        ProgressBar::hidden()
    };
    progress.set_style(ProgressStyle::with_template("{bar:40} {pos}/{len} {msg}")?);

    let outcomes = job::run_jobs_with_progress(&config, |outcome| {
        progress.set_message(format!("{} {}%", outcome.job.group, coverage_label(outcome.job.coverage)));
        progress.inc(1);
    })?;
    progress.finish_with_message("done");

    outcomes.iter().for_each(print_outcome);
    Ok(())
}

fn delineate(input: &Path, output: &Path, coverage: f64, settings: &DelineationSettings) -> Result<()> {
    let richness = richness::read_richness(input)?;
    let (mask, search, contiguity): (HotspotMask, _, _) = hotspots::delineate(&richness, coverage, settings)?;
    mask.write(output)?;

    println!(
        "threshold {} (initial {}) coverage {:.4}%{} regions {}/{} -> {}",
        search.threshold,
        search.initial_threshold,
        search.coverage * 100.0,
        if search.converged { "" } else { " (not converged)" },
        contiguity.clusters - contiguity.removed_clusters,
        contiguity.clusters,
        output.display()
    );

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let logger = env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp(Some(TimestampPrecision::Millis))
        .build();

    let multi = MultiProgress::new();
    let level = logger.filter();
    LogWrapper::new(multi.clone(), logger).try_init()?;
    log::set_max_level(level);

    match cli.command {
        Commands::Richness {
            input,
            output,
            batch_size,
            nodata_policy,
            parallel,
            manifest,
        } => {
            let options = AggregationOptions {
                batch_size,
                nodata: nodata_policy.map(Into::into).unwrap_or_default(),
                parallel,
            };

            create_richness(&input, &output, options, manifest)?;
        }
        Commands::Hotspots { config, no_progress } => {
            run_hotspots(&config, &multi, !no_progress)?;
        }
        Commands::Delineate {
            input,
            output,
            coverage,
            min_area_km2,
            connectivity,
            cell_area_km2,
        } => {
            let settings = DelineationSettings {
                minimum_area: MinimumArea::SquareKilometers(min_area_km2),
                connectivity: connectivity.map(Into::into).unwrap_or_default(),
                cell_area_km2,
                ..Default::default()
            };

            delineate(&input, &output, coverage, &settings)?;
        }
    }

    Ok(())
}
