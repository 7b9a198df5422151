//! Algorithms for raster data processing (cell statistics, quantiles, reclassification, clustering, ...).

mod cast;
mod cellstatistics;
mod clusterid;
mod limits;
mod quantile;
mod threshold;

use crate::{Array, Error, Result};

pub use cast::cast;
pub use cellstatistics::{NodataHandling, sum, sum_in_place};
pub use clusterid::{ClusterDiagonals, cluster_id_where, cluster_sizes};
pub use limits::min_max;
pub use quantile::{QuantileInterpolation, quantiles_with_interpolation};
pub use threshold::{count_at_or_above, threshold_mask};

/// Verifies that both rasters have the same number of rows and columns
pub fn check_dimensions(r1: &impl Array, r2: &impl Array) -> Result {
    if r1.size() != r2.size() {
        return Err(Error::SizeMismatch {
            size1: (r1.height(), r1.width()),
            size2: (r2.height(), r2.width()),
        });
    }

    Ok(())
}
