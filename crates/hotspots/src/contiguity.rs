//! Removal of hotspot regions that are smaller than a minimum area.

use geo::{Array, GeoReference, raster::algo};

use crate::{Connectivity, DelineationSettings, Error, MinimumArea, Result};

const SQUARE_METERS_PER_SQUARE_KILOMETER: f64 = 1_000_000.0;

fn is_geographic(meta: &GeoReference) -> bool {
    meta.epsg().is_some_and(|code| (4000..5000).contains(&code))
}

/// Surface of a single raster cell in km².
/// Unless overridden the map units of the grid are assumed to be meters.
pub fn cell_area_km2(meta: &GeoReference, cell_area_override: Option<f64>) -> Result<f64> {
    if let Some(area) = cell_area_override {
        return Ok(area);
    }

    if is_geographic(meta) {
        return Err(Error::Config(format!(
            "The cell area can not be derived from a geographic grid ({}), configure 'cell_area_km2'",
            meta.projection()
        )));
    }

    let area = meta.cell_area() / SQUARE_METERS_PER_SQUARE_KILOMETER;
    if !(area.is_finite() && area > 0.0) {
        return Err(Error::Config(format!("Invalid raster cell size: {:?}", meta.cell_size())));
    }

    Ok(area)
}

/// Outcome of a contiguity filter pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ContiguityReport {
    /// Number of regions in the input mask
    pub clusters: usize,
    pub removed_clusters: usize,
    pub kept_cells: usize,
    pub removed_cells: usize,
}

impl ContiguityReport {
    pub fn is_empty(&self) -> bool {
        self.kept_cells == 0
    }
}

/// Sets the cells of regions that have less than the minimum number of cells to 0
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContiguityFilter {
    connectivity: Connectivity,
    minimum_cells: usize,
}

impl ContiguityFilter {
    pub fn new(connectivity: Connectivity, minimum_cells: usize) -> Self {
        ContiguityFilter {
            connectivity,
            minimum_cells,
        }
    }

    /// Creates the filter for a grid, the minimum area is converted to a number of cells of the grid
    pub fn for_grid(meta: &GeoReference, settings: &DelineationSettings) -> Result<Self> {
        let minimum_cells = match settings.minimum_area {
            MinimumArea::Cells(cells) => cells,
            area => area.minimum_cells(cell_area_km2(meta, settings.cell_area_km2)?)?,
        };

        log::debug!(
            "Regions smaller than {minimum_cells} cells are removed ({:?} connectivity)",
            settings.connectivity
        );

        Ok(Self::new(settings.connectivity, minimum_cells))
    }

    pub fn connectivity(&self) -> Connectivity {
        self.connectivity
    }

    pub fn minimum_cells(&self) -> usize {
        self.minimum_cells
    }

    /// Filters the mask in place, the mask can only contain 0, 1 or nodata values
    pub fn apply<R: Array<Pixel = u8>>(&self, mask: &mut R) -> Result<ContiguityReport> {
        if let Some(value) = mask.iter_values().find(|&v| v > 1) {
            return Err(Error::InvalidArgument(format!(
                "Hotspot masks can only contain 0 and 1 values, found {value}"
            )));
        }

        let clusters = algo::cluster_id_where(&*mask, self.connectivity.diagonals(), |v| v == 1)?;
        let sizes = algo::cluster_sizes(&clusters);

        let mut report = ContiguityReport {
            clusters: sizes.len().saturating_sub(1),
            removed_clusters: sizes.iter().skip(1).filter(|&&size| size < self.minimum_cells).count(),
            ..Default::default()
        };

        for (cell, &id) in mask.as_mut_slice().iter_mut().zip(clusters.as_slice()) {
            // 0: not part of a region, negative: nodata
            if id <= 0 {
                continue;
            }

            if sizes[id as usize] < self.minimum_cells {
                *cell = 0;
                report.removed_cells += 1;
            } else {
                report.kept_cells += 1;
            }
        }

        Ok(report)
    }

    /// Returns a filtered copy of the mask
    pub fn filtered<R: Array<Pixel = u8>>(&self, mask: &R) -> Result<(R, ContiguityReport)> {
        let mut result = mask.clone();
        let report = self.apply(&mut result)?;
        Ok((result, report))
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use geo::{CellSize, Point, RasterSize};
    use rand::{Rng, SeedableRng, rngs::StdRng};

    use crate::{HotspotMask, testutils::*};

    use super::*;

    #[test_log::test]
    fn small_region_is_removed() -> Result<()> {
        // 5 km² region on the left, 15 km² region on the right
        #[rustfmt::skip]
        let mut mask: HotspotMask = create_raster(4, 9, &[
            1.0, 1.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 1.0,
            1.0, 1.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 1.0,
            1.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 1.0,
            0.0, 0.0, NOD, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0,
        ]);

        let settings = DelineationSettings::default();
        let filter = ContiguityFilter::for_grid(mask.metadata(), &settings)?;
        assert_eq!(filter.minimum_cells(), 10);

        let report = filter.apply(&mut mask)?;
        assert_eq!(
            report,
            ContiguityReport {
                clusters: 2,
                removed_clusters: 1,
                kept_cells: 15,
                removed_cells: 5,
            }
        );

        #[rustfmt::skip]
        let expected: HotspotMask = create_raster(4, 9, &[
            0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 1.0,
            0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 1.0,
            0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 1.0,
            0.0, 0.0, NOD, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0,
        ]);

        assert_eq!(mask, expected);
        assert_eq!(mask.nodata_count(), 1);

        Ok(())
    }

    #[test]
    fn region_of_exactly_the_minimum_area_is_kept() -> Result<()> {
        let mut mask: HotspotMask = create_raster(2, 5, &[1.0; 10]);
        let filter = ContiguityFilter::for_grid(mask.metadata(), &DelineationSettings::default())?;
        let report = filter.apply(&mut mask)?;
        assert_eq!(report.kept_cells, 10);
        assert_eq!(report.removed_clusters, 0);
        Ok(())
    }

    #[test]
    fn connectivity_changes_the_regions() -> Result<()> {
        #[rustfmt::skip]
        let mask: HotspotMask = create_raster(3, 3, &[
            1.0, 0.0, 0.0,
            0.0, 1.0, 0.0,
            0.0, 0.0, 1.0,
        ]);

        let (eight, report) = ContiguityFilter::new(Connectivity::Eight, 3).filtered(&mask)?;
        assert_eq!(eight, mask);
        assert_eq!(report.clusters, 1);

        let (four, report) = ContiguityFilter::new(Connectivity::Four, 3).filtered(&mask)?;
        assert_eq!(report.clusters, 3);
        assert_eq!(report.removed_clusters, 3);
        assert!(report.is_empty());
        assert_eq!(four.iter_values().filter(|&v| v == 1).count(), 0);

        Ok(())
    }

    #[test]
    fn filter_is_idempotent_and_a_subset() -> Result<()> {
        let mut rng = StdRng::seed_from_u64(7);

        for connectivity in [Connectivity::Four, Connectivity::Eight] {
            for _ in 0..20 {
                let data: Vec<f64> = (0..40 * 30)
                    .map(|_| match rng.gen_range(0..10) {
                        0 => NOD,
                        1..=5 => 1.0,
                        _ => 0.0,
                    })
                    .collect();

                let mask: HotspotMask = create_raster(40, 30, &data);
                let filter = ContiguityFilter::new(connectivity, rng.gen_range(1..20));

                let (once, report) = filter.filtered(&mask)?;
                let (twice, second_report) = filter.filtered(&once)?;
                assert_eq!(once, twice);
                assert_eq!(second_report.removed_cells, 0);
                assert_eq!(second_report.kept_cells, report.kept_cells);

                for (before, after) in mask.iter_opt().zip(once.iter_opt()) {
                    match (before, after) {
                        (None, None) => {}
                        (Some(b), Some(a)) => assert!(a <= b),
                        _ => panic!("Nodata cells changed"),
                    }
                }
            }
        }

        Ok(())
    }

    #[test]
    fn invalid_mask_values() {
        let mut mask: HotspotMask = create_raster(1, 3, &[0.0, 1.0, 2.0]);
        assert!(matches!(
            ContiguityFilter::new(Connectivity::Eight, 2).apply(&mut mask),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn cell_area() -> Result<()> {
        let meta = test_georeference(2, 2);
        assert_relative_eq!(cell_area_km2(&meta, None)?, 1.0);
        assert_relative_eq!(cell_area_km2(&meta, Some(0.5))?, 0.5);

        let geographic = GeoReference::with_origin(
            "EPSG:4326",
            RasterSize::with_rows_cols(2, 2),
            Point::new(0.0, 0.0),
            CellSize::square(0.01),
            Option::<u8>::None,
        );
        assert!(matches!(cell_area_km2(&geographic, None), Err(Error::Config(_))));
        assert_relative_eq!(cell_area_km2(&geographic, Some(1.2))?, 1.2);

        // a cell count does not need the cell area
        let settings = DelineationSettings {
            minimum_area: MinimumArea::Cells(1000),
            ..Default::default()
        };
        assert_eq!(ContiguityFilter::for_grid(&geographic, &settings)?.minimum_cells(), 1000);

        Ok(())
    }
}
