use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};

use approx::relative_eq;
use geo::raster::algo::{ClusterDiagonals, QuantileInterpolation};
use serde::{Deserialize, Serialize};

use crate::{
    Error, Result,
    job::coverage_label,
    threshold::{CoverageBasis, SearchStrategy, SelectionPolicy},
};

/// Neighbourhood used to decide if two hotspot cells belong to the same region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Connectivity {
    /// Horizontal, vertical and diagonal neighbours
    #[default]
    Eight,
    /// Horizontal and vertical neighbours only
    Four,
}

impl Connectivity {
    pub fn diagonals(self) -> ClusterDiagonals {
        match self {
            Connectivity::Eight => ClusterDiagonals::Include,
            Connectivity::Four => ClusterDiagonals::Exclude,
        }
    }
}

/// Regions smaller than this minimum are removed from the hotspot mask
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MinimumArea {
    SquareKilometers(f64),
    Cells(usize),
}

impl Default for MinimumArea {
    fn default() -> Self {
        MinimumArea::SquareKilometers(10.0)
    }
}

impl MinimumArea {
    /// The smallest number of cells a region needs to be kept.
    /// A region covering exactly the minimum area is kept.
    pub fn minimum_cells(&self, cell_area_km2: f64) -> Result<usize> {
        match *self {
            MinimumArea::Cells(cells) => Ok(cells),
            MinimumArea::SquareKilometers(area) => {
                if !(cell_area_km2.is_finite() && cell_area_km2 > 0.0) {
                    return Err(Error::Config(format!("Invalid cell area: {cell_area_km2} km²")));
                }

                let cells = area / cell_area_km2;
                let rounded = cells.round();
                if relative_eq!(cells, rounded, epsilon = 1e-9, max_relative = 1e-9) {
                    Ok(rounded as usize)
                } else {
                    Ok(cells.ceil() as usize)
                }
            }
        }
    }

    fn validate(&self) -> Result {
        match *self {
            MinimumArea::SquareKilometers(area) if !(area.is_finite() && area >= 0.0) => {
                Err(Error::Config(format!("Minimum area must be a positive number of km², got {area}")))
            }
            _ => Ok(()),
        }
    }
}

/// Threshold search parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub strategy: SearchStrategy,
    /// Accepted absolute difference between the obtained and the target coverage fraction
    pub tolerance: f64,
    /// Maximum number of threshold evaluations
    pub max_iterations: usize,
    pub selection: SelectionPolicy,
    pub coverage_basis: CoverageBasis,
    pub quantile_interpolation: QuantileInterpolation,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            strategy: SearchStrategy::default(),
            tolerance: 0.005,
            max_iterations: 32,
            selection: SelectionPolicy::default(),
            coverage_basis: CoverageBasis::default(),
            quantile_interpolation: QuantileInterpolation::default(),
        }
    }
}

impl SearchConfig {
    pub fn validate(&self) -> Result {
        if !(self.tolerance.is_finite() && self.tolerance >= 0.0) {
            return Err(Error::Config(format!("Search tolerance must be a positive number, got {}", self.tolerance)));
        }

        if self.max_iterations == 0 {
            return Err(Error::Config("The maximum number of search iterations must be at least 1".into()));
        }

        Ok(())
    }
}

/// The parameters that turn a richness raster into a hotspot mask
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DelineationSettings {
    pub minimum_area: MinimumArea,
    pub connectivity: Connectivity,
    pub search: SearchConfig,
    /// Surface of a raster cell, derived from the cell size (in meter) when absent
    pub cell_area_km2: Option<f64>,
}

impl DelineationSettings {
    pub fn validate(&self) -> Result {
        self.minimum_area.validate()?;
        self.search.validate()?;

        if let Some(area) = self.cell_area_km2 {
            if !(area.is_finite() && area > 0.0) {
                return Err(Error::Config(format!("Cell area must be a positive number of km², got {area}")));
            }
        }

        Ok(())
    }
}

/// A species group and its richness raster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupConfig {
    pub name: String,
    pub richness: PathBuf,
}

fn default_coverages() -> Vec<f64> {
    vec![0.025, 0.05, 0.1]
}

/// Configuration of a hotspot run: every coverage is computed for every group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotspotConfig {
    pub output_dir: PathBuf,
    pub groups: Vec<GroupConfig>,
    /// Target fractions of the land area covered by the hotspots
    #[serde(default = "default_coverages")]
    pub coverages: Vec<f64>,
    #[serde(flatten)]
    pub delineation: DelineationSettings,
    /// Run the jobs concurrently
    #[serde(default)]
    pub parallel: bool,
}

impl HotspotConfig {
    pub fn new(output_dir: impl Into<PathBuf>, groups: Vec<GroupConfig>) -> Self {
        HotspotConfig {
            output_dir: output_dir.into(),
            groups,
            coverages: default_coverages(),
            delineation: DelineationSettings::default(),
            parallel: false,
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads the configuration file, relative paths are resolved against the directory of the file
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::Config(format!("Configuration file not found: {}", path.display())));
        }

        let mut config = Self::from_json(&std::fs::read_to_string(path)?)?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }

        Ok(config)
    }

    fn resolve_paths(&mut self, base: &Path) {
        if self.output_dir.is_relative() {
            self.output_dir = base.join(&self.output_dir);
        }

        for group in &mut self.groups {
            if group.richness.is_relative() {
                group.richness = base.join(&group.richness);
            }
        }
    }

    /// Checks the configuration values, the input rasters are not inspected
    pub fn validate(&self) -> Result {
        if self.groups.is_empty() {
            return Err(Error::Config("No species groups configured".into()));
        }

        let mut names = HashSet::new();
        for group in &self.groups {
            if group.name.trim().is_empty() {
                return Err(Error::Config("Species group names can not be empty".into()));
            }

            if group.name.contains(['/', '\\']) {
                return Err(Error::Config(format!("Species group names can not contain path separators: '{}'", group.name)));
            }

            if !names.insert(group.name.as_str()) {
                return Err(Error::Config(format!("Duplicate species group: '{}'", group.name)));
            }
        }

        if self.coverages.is_empty() {
            return Err(Error::Config("No target coverages configured".into()));
        }

        let mut labels = HashSet::new();
        for &coverage in &self.coverages {
            validate_coverage(coverage)?;

            // coverages with the same label would write the same output file
            let label = coverage_label(coverage);
            if !labels.insert(label.clone()) {
                return Err(Error::Config(format!("Duplicate target coverage: {label}% ({coverage})")));
            }
        }

        self.delineation.validate()
    }
}

/// A target coverage is a fraction of the land area in the open interval (0, 1)
pub(crate) fn validate_coverage(coverage: f64) -> Result {
    if !(coverage > 0.0 && coverage < 1.0) {
        return Err(Error::Config(format!("Coverage fraction must be in the range (0, 1), got {coverage}")));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_config() -> Result<()> {
        let config = HotspotConfig::from_json(
            r#"{
                "output_dir": "out",
                "groups": [ { "name": "all", "richness": "species_richness_all.tif" } ],
                "coverages": [0.025, 0.05, 0.1],
                "minimum_area": { "square_kilometers": 10.0 },
                "connectivity": "four",
                "search": {
                    "strategy": { "neighborhood_scan": { "radius": 3 } },
                    "tolerance": 0.01,
                    "max_iterations": 12,
                    "selection": "closest",
                    "coverage_basis": "filtered",
                    "quantile_interpolation": "linear"
                },
                "cell_area_km2": 0.7,
                "parallel": true
            }"#,
        )?;

        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert_eq!(config.groups[0].name, "all");
        assert_eq!(config.delineation.minimum_area, MinimumArea::SquareKilometers(10.0));
        assert_eq!(config.delineation.connectivity, Connectivity::Four);
        assert_eq!(config.delineation.search.strategy, SearchStrategy::NeighborhoodScan { radius: 3 });
        assert_eq!(config.delineation.search.selection, SelectionPolicy::Closest);
        assert_eq!(config.delineation.search.coverage_basis, CoverageBasis::Filtered);
        assert_eq!(config.delineation.search.quantile_interpolation, QuantileInterpolation::Linear);
        assert_eq!(config.delineation.search.max_iterations, 12);
        assert_eq!(config.delineation.cell_area_km2, Some(0.7));
        assert!(config.parallel);
        config.validate()
    }

    #[test]
    fn parse_minimal_config_uses_defaults() -> Result<()> {
        let config = HotspotConfig::from_json(r#"{ "output_dir": "out", "groups": [ { "name": "threatened", "richness": "r.tif" } ] }"#)?;

        assert_eq!(config.coverages, vec![0.025, 0.05, 0.1]);
        assert_eq!(config.delineation, DelineationSettings::default());
        assert_eq!(config.delineation.minimum_area, MinimumArea::SquareKilometers(10.0));
        assert_eq!(config.delineation.connectivity, Connectivity::Eight);
        assert_eq!(config.delineation.search.strategy, SearchStrategy::Bracketing);
        assert_eq!(config.delineation.search.selection, SelectionPolicy::AtLeastTarget);
        assert!(!config.parallel);
        config.validate()
    }

    #[test]
    fn scan_radius_defaults_to_five() -> Result<()> {
        let search: SearchConfig = serde_json::from_str(r#"{ "strategy": { "neighborhood_scan": {} } }"#)?;
        assert_eq!(search.strategy, SearchStrategy::NeighborhoodScan { radius: 5 });
        Ok(())
    }

    #[test]
    fn invalid_configurations() {
        let group = GroupConfig {
            name: "all".into(),
            richness: "r.tif".into(),
        };

        let mut config = HotspotConfig::new("out", vec![]);
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        config.groups = vec![group.clone(), group];
        assert!(matches!(config.validate(), Err(Error::Config(_))));
        config.groups.pop();
        assert!(config.validate().is_ok());

        for coverage in [0.0, 1.0, -0.1, 1.5, f64::NAN] {
            config.coverages = vec![coverage];
            assert!(matches!(config.validate(), Err(Error::Config(_))), "coverage {coverage} accepted");
        }
        config.coverages = vec![0.05];

        config.delineation.search.max_iterations = 0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
        config.delineation.search.max_iterations = 5;

        config.delineation.search.tolerance = -0.1;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
        config.delineation.search.tolerance = 0.0;

        config.delineation.minimum_area = MinimumArea::SquareKilometers(-1.0);
        assert!(matches!(config.validate(), Err(Error::Config(_))));
        config.delineation.minimum_area = MinimumArea::Cells(0);

        config.delineation.cell_area_km2 = Some(0.0);
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn coverages_with_the_same_output_are_rejected() {
        let mut config = HotspotConfig::new(
            "out",
            vec![GroupConfig {
                name: "all".into(),
                richness: "r.tif".into(),
            }],
        );

        config.coverages = vec![0.05, 0.05];
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        // both are written as hotspots_all_5.tif
        config.coverages = vec![0.05, 0.05 + 1e-10];
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        config.coverages = vec![0.05, 0.051, 0.1];
        assert!(config.validate().is_ok());
    }

    #[test]
    fn minimum_cells() -> Result<()> {
        assert_eq!(MinimumArea::SquareKilometers(10.0).minimum_cells(1.0)?, 10);
        assert_eq!(MinimumArea::SquareKilometers(10.0).minimum_cells(0.1)?, 100);
        assert_eq!(MinimumArea::SquareKilometers(10.0).minimum_cells(3.0)?, 4);
        assert_eq!(MinimumArea::SquareKilometers(10.0).minimum_cells(0.7 * 0.7)?, 21);
        assert_eq!(MinimumArea::Cells(1000).minimum_cells(0.0)?, 1000);
        assert!(MinimumArea::SquareKilometers(10.0).minimum_cells(0.0).is_err());
        Ok(())
    }

    #[test]
    fn config_paths_relative_to_file() -> Result<()> {
        let tmp = tempfile::tempdir()?;
        let path = tmp.path().join("hotspots.json");
        std::fs::write(
            &path,
            r#"{ "output_dir": "out", "groups": [ { "name": "all", "richness": "/data/richness.tif" }, { "name": "declining", "richness": "declining.tif" } ] }"#,
        )?;

        let config = HotspotConfig::from_file(&path)?;
        assert_eq!(config.output_dir, tmp.path().join("out"));
        assert_eq!(config.groups[0].richness, PathBuf::from("/data/richness.tif"));
        assert_eq!(config.groups[1].richness, tmp.path().join("declining.tif"));
        Ok(())
    }
}
