//! Single band GeoTIFF reading and writing using the pure Rust tiff crate.
//!
//! Only the subset of the GeoTIFF tags needed for north up grids is supported:
//! pixel scale, tie points, the model transformation (read only), the EPSG code of the
//! geo key directory and the GDAL nodata tag.

mod reader;
mod writer;

use tiff::tags::Tag;

pub use reader::{read_georeference, read_raster_band};
pub use writer::write_raster_band;

const GDAL_NODATA_TAG: u16 = 42113;

const GEO_KEY_MODEL_TYPE: u16 = 1024;
const GEO_KEY_RASTER_TYPE: u16 = 1025;
const GEO_KEY_GEOGRAPHIC_TYPE: u16 = 2048;
const GEO_KEY_PROJECTED_CS_TYPE: u16 = 3072;

const MODEL_TYPE_PROJECTED: u16 = 1;
const MODEL_TYPE_GEOGRAPHIC: u16 = 2;
const RASTER_PIXEL_IS_AREA: u16 = 1;

fn gdal_nodata_tag() -> Tag {
    Tag::from_u16_exhaustive(GDAL_NODATA_TAG)
}
