//! Hotspot jobs: one hotspot mask for every combination of species group and target coverage.

use std::path::PathBuf;

use geo::{
    Array,
    raster::{RasterReadWrite, algo},
};
use rayon::prelude::*;

use crate::{
    ContiguityFilter, ContiguityReport, DelineationSettings, Error, HotspotConfig, Result, ThresholdSearch,
    config::validate_coverage,
    richness::read_richness,
    threshold::find_threshold,
};

/// Coverage as a percentage without trailing zeros: 0.025 -> "2.5", 0.1 -> "10"
pub fn coverage_label(coverage: f64) -> String {
    let percentage = format!("{:.6}", coverage * 100.0);
    percentage.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// File name of the hotspot mask of a group and coverage
pub fn hotspot_file_name(group: &str, coverage: f64) -> String {
    format!("hotspots_{group}_{}.tif", coverage_label(coverage))
}

#[derive(Debug, Clone, PartialEq)]
pub struct HotspotJob {
    pub group: String,
    pub richness: PathBuf,
    pub coverage: f64,
    pub output: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HotspotOutcome {
    pub job: HotspotJob,
    pub search: ThresholdSearch,
    pub contiguity: ContiguityReport,
}

/// Every coverage for every group, in configuration order
pub fn plan_jobs(config: &HotspotConfig) -> Vec<HotspotJob> {
    config
        .groups
        .iter()
        .flat_map(|group| {
            config.coverages.iter().map(|&coverage| HotspotJob {
                group: group.name.clone(),
                richness: group.richness.clone(),
                coverage,
                output: config.output_dir.join(hotspot_file_name(&group.name, coverage)),
            })
        })
        .collect()
}

/// Computes the hotspot mask of a richness raster: threshold search followed by the contiguity filter.
/// Cells at or above the selected threshold that belong to a large enough region are set to 1.
pub fn delineate<R: Array>(
    richness: &R,
    coverage: f64,
    settings: &DelineationSettings,
) -> Result<(R::WithPixelType<u8>, ThresholdSearch, ContiguityReport)> {
    validate_coverage(coverage)?;
    settings.validate()?;

    let filter = ContiguityFilter::for_grid(richness.metadata(), settings)?;
    let search = find_threshold(richness, coverage, &settings.search, Some(&filter))?;

    let mut mask = algo::threshold_mask(richness, search.threshold as f64)?;
    let report = filter.apply(&mut mask)?;
    if report.is_empty() {
        log::warn!(
            "No hotspot regions remain after removing regions smaller than {} cells (threshold {})",
            filter.minimum_cells(),
            search.threshold
        );
    }

    Ok((mask, search, report))
}

impl HotspotJob {
    pub fn run(&self, settings: &DelineationSettings) -> Result<HotspotOutcome> {
        log::info!(
            "Delineate hotspots of group '{}' covering {}% of the land area",
            self.group,
            coverage_label(self.coverage)
        );

        let richness = read_richness(&self.richness)?;
        let (mask, search, contiguity) = delineate(&richness, self.coverage, settings)?;
        mask.write(&self.output)?;

        log::info!(
            "Group '{}' {}%: threshold {} (initial {}), coverage {:.3}% {}, {} of {} regions kept ({} cells) -> {}",
            self.group,
            coverage_label(self.coverage),
            search.threshold,
            search.initial_threshold,
            search.coverage * 100.0,
            settings.search.coverage_basis.describe(),
            contiguity.clusters - contiguity.removed_clusters,
            contiguity.clusters,
            contiguity.kept_cells,
            self.output.display()
        );

        Ok(HotspotOutcome {
            job: self.clone(),
            search,
            contiguity,
        })
    }
}

/// Checks the configuration and the headers of the richness rasters, nothing is computed or written
pub fn validate_inputs(config: &HotspotConfig) -> Result {
    config.validate()?;

    for group in &config.groups {
        if !group.richness.is_file() {
            return Err(Error::MissingInput(group.richness.clone()));
        }

        let meta = crate::RichnessRaster::read_georeference(&group.richness)?;
        ContiguityFilter::for_grid(&meta, &config.delineation)?;
    }

    Ok(())
}

/// Runs all the jobs of the configuration, the configuration is validated before any job starts
pub fn run_jobs(config: &HotspotConfig) -> Result<Vec<HotspotOutcome>> {
    run_jobs_with_progress(config, |_| {})
}

/// Like [`run_jobs`], `on_job_done` is called after every successful job.
/// In parallel mode it is called from the worker threads in completion order.
pub fn run_jobs_with_progress<F>(config: &HotspotConfig, on_job_done: F) -> Result<Vec<HotspotOutcome>>
where
    F: Fn(&HotspotOutcome) + Sync,
{
    validate_inputs(config)?;
    std::fs::create_dir_all(&config.output_dir)?;

    let jobs = plan_jobs(config);
    log::info!("Running {} hotspot jobs", jobs.len());

    let run = |job: &HotspotJob| -> Result<HotspotOutcome> {
        let outcome = job.run(&config.delineation)?;
        on_job_done(&outcome);
        Ok(outcome)
    };

    if config.parallel {
        jobs.par_iter().map(run).collect()
    } else {
        jobs.iter().map(run).collect()
    }
}
