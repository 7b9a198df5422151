use approx::{AbsDiffEq, RelativeEq, relative_eq};
use num::ToPrimitive;

use crate::{GeoTransform, Point, RasterSize};

/// Pixel dimensions in map units, y is negative for north up rasters
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct CellSize {
    x: f64,
    y: f64,
}

impl AbsDiffEq for CellSize {
    type Epsilon = <f64 as AbsDiffEq>::Epsilon;

    fn default_epsilon() -> <f64 as AbsDiffEq>::Epsilon {
        f64::default_epsilon()
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: <f64 as AbsDiffEq>::Epsilon) -> bool {
        f64::abs_diff_eq(&self.x, &other.x, epsilon) && f64::abs_diff_eq(&self.y, &other.y, epsilon)
    }
}

impl RelativeEq for CellSize {
    fn default_max_relative() -> <f64 as AbsDiffEq>::Epsilon {
        f64::default_max_relative()
    }

    fn relative_eq(&self, other: &Self, epsilon: <f64 as AbsDiffEq>::Epsilon, max_relative: <f64 as AbsDiffEq>::Epsilon) -> bool {
        f64::relative_eq(&self.x, &other.x, epsilon, max_relative) && f64::relative_eq(&self.y, &other.y, epsilon, max_relative)
    }
}

impl CellSize {
    pub fn new(x: f64, y: f64) -> Self {
        CellSize { x, y }
    }

    pub fn square(size: f64) -> Self {
        CellSize::new(size, -size)
    }

    pub fn is_valid(&self) -> bool {
        self.x != 0.0 && self.y != 0.0
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }

    /// Surface of a single cell in squared map units
    pub fn area(&self) -> f64 {
        (self.x * self.y).abs()
    }
}

/// Represents the metadata associated with a raster so it can be georeferenced.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct GeoReference {
    /// The projection string (EPSG code or WKT), empty when unknown
    projection: String,
    /// The size of the image in pixels
    size: RasterSize,
    /// The affine transformation.
    geo_transform: GeoTransform,
    /// The nodata value.
    nodata: Option<f64>,
}

impl GeoReference {
    pub fn new<S: Into<String>>(projection: S, size: RasterSize, geo_transform: GeoTransform, nodata: Option<f64>) -> Self {
        GeoReference {
            projection: projection.into(),
            size,
            geo_transform,
            nodata,
        }
    }

    pub fn without_spatial_reference(size: RasterSize, nodata: Option<f64>) -> Self {
        GeoReference {
            size,
            nodata,
            geo_transform: GeoTransform::new([0.0, 1.0, 0.0, 0.0, 0.0, -1.0]),
            ..Default::default()
        }
    }

    pub fn with_origin<S: Into<String>, T: ToPrimitive>(
        projection: S,
        size: RasterSize,
        lower_left_coordinate: Point,
        cell_size: CellSize,
        nodata: Option<T>,
    ) -> Self {
        let geo_transform = GeoTransform::new([
            lower_left_coordinate.x(),
            cell_size.x(),
            0.0,
            lower_left_coordinate.y() - (cell_size.y() * size.rows as f64),
            0.0,
            cell_size.y(),
        ]);

        GeoReference {
            projection: projection.into(),
            size,
            geo_transform,
            nodata: nodata.and_then(|x| x.to_f64()),
        }
    }

    pub fn copy_with_nodata<T: ToPrimitive>(&self, nodata: Option<T>) -> Self {
        GeoReference {
            projection: self.projection.clone(),
            size: self.size,
            geo_transform: self.geo_transform,
            nodata: nodata.and_then(|x| x.to_f64()),
        }
    }

    pub fn raster_size(&self) -> RasterSize {
        self.size
    }

    pub fn rows(&self) -> usize {
        self.size.rows
    }

    pub fn columns(&self) -> usize {
        self.size.cols
    }

    pub fn cell_size(&self) -> CellSize {
        CellSize::new(self.geo_transform.cell_size_x(), self.geo_transform.cell_size_y())
    }

    /// Surface of a single cell in squared map units
    pub fn cell_area(&self) -> f64 {
        self.cell_size().area()
    }

    pub fn top_left(&self) -> Point {
        self.geo_transform.top_left()
    }

    pub fn geo_transform(&self) -> GeoTransform {
        self.geo_transform
    }

    pub fn projection(&self) -> &str {
        &self.projection
    }

    pub fn set_projection(&mut self, projection: String) {
        self.projection = projection;
    }

    pub fn nodata(&self) -> Option<f64> {
        self.nodata
    }

    pub fn set_nodata(&mut self, nodata: Option<f64>) {
        self.nodata = nodata;
    }

    /// The EPSG code if the projection is expressed as `EPSG:<code>`
    pub fn epsg(&self) -> Option<u32> {
        let code = self.projection.trim();
        let code = code.strip_prefix("EPSG:").or_else(|| code.strip_prefix("epsg:"))?;
        code.parse().ok()
    }

    /// Two georeferences are aligned when they describe the exact same grid: size, transform and projection.
    /// The nodata value is not considered.
    pub fn is_aligned_with(&self, other: &GeoReference) -> bool {
        self.size == other.size
            && self.projection == other.projection
            && relative_eq!(self.geo_transform, other.geo_transform, epsilon = 1e-9, max_relative = 1e-9)
    }
}

impl std::fmt::Display for GeoReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {:?} projection: '{}'", self.size, self.geo_transform, self.projection)
    }
}
