use approx::relative_eq;

use crate::{ArrayNum, CellSize, GeoReference, Point, RasterSize};

pub const NOD: f64 = 255.0;

/// North up georeference in a projected system with 1km cells
pub fn test_georeference(size: RasterSize) -> GeoReference {
    GeoReference::with_origin("EPSG:3857", size, Point::new(0.0, 0.0), CellSize::square(1000.0), Some(NOD))
}

pub fn create_vec<T: ArrayNum>(data: &[f64]) -> Vec<T> {
    data.iter()
        .map(|&v| {
            if relative_eq!(v, NOD) {
                T::NODATA
            } else {
                num::NumCast::from(v).expect("f64 could not be converted to the specified type")
            }
        })
        .collect()
}
