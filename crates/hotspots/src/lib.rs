#![warn(clippy::unwrap_used)]

//! Species richness aggregation and hotspot delineation.
//!
//! Richness rasters are the cell wise sum of binary species habitat masks.
//! Hotspots are the richest cells covering a target fraction of the land area,
//! found with a threshold search and cleaned from small isolated patches by a contiguity filter.

pub type Result<T = ()> = std::result::Result<T, Error>;

mod config;
pub mod contiguity;
mod error;
pub mod job;
pub mod richness;
pub mod threshold;

#[cfg(test)]
mod testutils;

use geo::raster::DenseRaster;

pub use config::{Connectivity, DelineationSettings, GroupConfig, HotspotConfig, MinimumArea, SearchConfig};
pub use contiguity::{ContiguityFilter, ContiguityReport};
#[doc(inline)]
pub use error::Error;
pub use job::{HotspotJob, HotspotOutcome, delineate, plan_jobs, run_jobs, run_jobs_with_progress};
pub use richness::{AggregationOptions, NodataPolicy, RichnessSummary};
pub use threshold::{CoverageBasis, SearchStrategy, SelectionPolicy, ThresholdEvaluation, ThresholdSearch};

/// Binary presence raster of a single species: 1 = present, 0 = absent
pub type HabitatMask = DenseRaster<u8>;
/// Number of species present in each cell
pub type RichnessRaster = DenseRaster<u16>;
/// Binary hotspot raster: 1 = hotspot, 0 = no hotspot
pub type HotspotMask = DenseRaster<u8>;
