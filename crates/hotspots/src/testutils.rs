use geo::{Array, ArrayNum, CellSize, GeoReference, Point, RasterSize, raster::DenseRaster};

pub const NOD: f64 = 255.0;

/// North up georeference in a projected system with 1km² cells
pub fn test_georeference(rows: usize, cols: usize) -> GeoReference {
    GeoReference::with_origin(
        "EPSG:3857",
        RasterSize::with_rows_cols(rows, cols),
        Point::new(0.0, 0.0),
        CellSize::square(1000.0),
        Some(NOD),
    )
}

/// Creates a raster from the provided values, `NOD` values become nodata
pub fn create_raster<T: ArrayNum>(rows: usize, cols: usize, data: &[f64]) -> DenseRaster<T> {
    DenseRaster::from_iter(
        test_georeference(rows, cols),
        data.iter().map(|&v| if v == NOD { None } else { num_cast(v) }),
    )
    .expect("Invalid test raster")
}

fn num_cast<T: ArrayNum>(v: f64) -> Option<T> {
    Some(T::from(v).expect("Value does not fit in the raster type"))
}
