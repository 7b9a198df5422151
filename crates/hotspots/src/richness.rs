//! Aggregation of species habitat masks into a species richness raster.

use std::path::{Path, PathBuf};

use geo::{
    Array, GeoReference,
    raster::{
        DenseRaster, RasterReadWrite,
        algo::{self, NodataHandling},
    },
};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{Error, HabitatMask, Result, RichnessRaster};

/// Number of masks summed per batch
pub const DEFAULT_BATCH_SIZE: usize = 150;

/// Richness counts are stored as u16, the largest value is the nodata value
const MAX_SPECIES: usize = u16::MAX as usize - 1;

/// How nodata cells of the habitat masks contribute to the richness
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodataPolicy {
    /// Nodata counts as absence, the richness is nodata where all the masks are nodata
    #[default]
    Data,
    /// Nodata counts as absence, the richness never contains nodata
    Zero,
    /// The richness is nodata where any of the masks is nodata
    Propagate,
}

impl From<NodataPolicy> for NodataHandling {
    fn from(policy: NodataPolicy) -> Self {
        match policy {
            NodataPolicy::Data => NodataHandling::IgnoreNodata,
            NodataPolicy::Zero => NodataHandling::NodataAsZero,
            NodataPolicy::Propagate => NodataHandling::PropagateNodata,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregationOptions {
    pub batch_size: usize,
    pub nodata: NodataPolicy,
    /// Sum the batches concurrently
    pub parallel: bool,
}

impl Default for AggregationOptions {
    fn default() -> Self {
        AggregationOptions {
            batch_size: DEFAULT_BATCH_SIZE,
            nodata: NodataPolicy::default(),
            parallel: false,
        }
    }
}

/// Describes an aggregated richness raster
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RichnessSummary {
    /// File names of the included species masks, in aggregation order
    pub species: Vec<String>,
    pub batches: usize,
    /// Highest richness value, `None` when the raster contains no data
    pub max_richness: Option<u16>,
    pub data_cells: usize,
}

impl RichnessSummary {
    /// Species listing, one file name per line
    pub fn manifest(&self) -> String {
        let mut manifest = self.species.join("\n");
        manifest.push('\n');
        manifest
    }
}

fn is_geotiff(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("tif") || ext.eq_ignore_ascii_case("tiff"))
}

/// Lists the GeoTIFF files of a directory sorted by file name
pub fn discover_species_rasters(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(Error::MissingInput(dir.to_path_buf()));
    }

    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && is_geotiff(&path) {
            paths.push(path);
        }
    }

    paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    log::info!("Found {} species rasters in {}", paths.len(), dir.display());
    Ok(paths)
}

fn describe_mismatch(meta: &GeoReference, reference: &GeoReference) -> String {
    if meta.raster_size() != reference.raster_size() {
        format!("size {} <-> {}", meta.raster_size(), reference.raster_size())
    } else if meta.projection() != reference.projection() {
        format!("projection '{}' <-> '{}'", meta.projection(), reference.projection())
    } else {
        format!("transform {:?} <-> {:?}", meta.geo_transform(), reference.geo_transform())
    }
}

/// Verifies that all the rasters exist and share the grid of the first raster.
/// Only the headers are read. Returns the georeference of the common grid.
pub fn check_alignment(paths: &[PathBuf]) -> Result<GeoReference> {
    let Some(reference_path) = paths.first() else {
        return Err(Error::InvalidArgument("No species rasters provided".into()));
    };

    if let Some(missing) = paths.iter().find(|path| !path.is_file()) {
        return Err(Error::MissingInput(missing.clone()));
    }

    let reference = HabitatMask::read_georeference(reference_path)?;
    for path in &paths[1..] {
        let meta = HabitatMask::read_georeference(path)?;
        if !meta.is_aligned_with(&reference) {
            return Err(Error::GridMismatch {
                path: path.clone(),
                reference: reference_path.clone(),
                details: describe_mismatch(&meta, &reference),
            });
        }
    }

    Ok(reference)
}

/// Verifies that a mask only contains presence (1), absence (0) or nodata
pub fn check_mask_values(mask: &HabitatMask, path: &Path) -> Result {
    match mask.iter_values().find(|&v| v > 1) {
        Some(value) => Err(Error::InvalidArgument(format!(
            "Species raster '{}' contains value {value}, only 0, 1 and nodata are allowed",
            path.display()
        ))),
        None => Ok(()),
    }
}

fn add_mask(richness: &mut Option<RichnessRaster>, mask: &HabitatMask, nodata: NodataPolicy) -> Result {
    let mask = algo::cast::<u16, _>(mask)?;
    match richness.as_mut() {
        Some(acc) => algo::sum_in_place(acc, &mask, nodata.into())?,
        None => *richness = algo::sum([&mask], nodata.into())?,
    }

    Ok(())
}

/// Cell wise sum of in memory habitat masks.
/// Returns `None` when no masks are provided.
pub fn sum_masks<'a, I>(masks: I, nodata: NodataPolicy) -> Result<Option<RichnessRaster>>
where
    I: IntoIterator<Item = &'a HabitatMask>,
{
    let mut richness = None;
    for mask in masks {
        add_mask(&mut richness, mask, nodata)?;
    }

    Ok(richness)
}

fn sum_batch(paths: &[PathBuf], nodata: NodataPolicy) -> Result<RichnessRaster> {
    let mut richness = None;
    for path in paths {
        let mask = HabitatMask::read(path)?;
        check_mask_values(&mask, path)?;
        log::debug!("Add {}", path.display());
        add_mask(&mut richness, &mask, nodata)?;
    }

    richness.ok_or_else(|| Error::InvalidArgument("Empty batch of species rasters".into()))
}

/// Sums the habitat masks in batches, the grids are checked before any pixel data is read
pub fn aggregate(paths: &[PathBuf], options: &AggregationOptions) -> Result<(RichnessRaster, RichnessSummary)> {
    if options.batch_size == 0 {
        return Err(Error::InvalidArgument("The batch size must be at least 1".into()));
    }

    if paths.len() > MAX_SPECIES {
        return Err(Error::InvalidArgument(format!(
            "At most {MAX_SPECIES} species rasters can be aggregated, got {}",
            paths.len()
        )));
    }

    check_alignment(paths)?;

    let batches: Vec<&[PathBuf]> = paths.chunks(options.batch_size).collect();
    log::info!(
        "Aggregate {} species rasters in {} batches ({:?} nodata policy)",
        paths.len(),
        batches.len(),
        options.nodata
    );

    let partial_sums = if options.parallel {
        batches
            .par_iter()
            .map(|batch| sum_batch(batch, options.nodata))
            .collect::<Result<Vec<_>>>()?
    } else {
        batches
            .iter()
            .enumerate()
            .map(|(index, batch)| {
                log::info!("Batch {}/{}", index + 1, batches.len());
                sum_batch(batch, options.nodata)
            })
            .collect::<Result<Vec<_>>>()?
    };

    let richness = algo::sum(&partial_sums, options.nodata.into())?
        .ok_or_else(|| Error::InvalidArgument("No species rasters provided".into()))?;

    let summary = RichnessSummary {
        species: paths
            .iter()
            .map(|path| path.file_name().unwrap_or(path.as_os_str()).to_string_lossy().into_owned())
            .collect(),
        batches: batches.len(),
        max_richness: algo::min_max(&richness).map(|range| *range.end()),
        data_cells: richness.data_count(),
    };

    Ok((richness, summary))
}

/// Aggregates the habitat masks and writes the richness raster
pub fn create_richness_raster(paths: &[PathBuf], output: &Path, options: &AggregationOptions) -> Result<RichnessSummary> {
    let (richness, summary) = aggregate(paths, options)?;
    richness.write(output)?;

    log::info!(
        "Richness raster written to {} (max richness: {})",
        output.display(),
        summary.max_richness.map_or_else(|| "nodata".to_string(), |v| v.to_string())
    );

    Ok(summary)
}

/// Writes the species listing of the summary
pub fn write_manifest(path: &Path, summary: &RichnessSummary) -> Result {
    std::fs::write(path, summary.manifest())?;
    Ok(())
}

/// Reads a richness raster from disk
pub fn read_richness(path: &Path) -> Result<RichnessRaster> {
    if !path.is_file() {
        return Err(Error::MissingInput(path.to_path_buf()));
    }

    Ok(DenseRaster::<u16>::read(path)?)
}
