#![warn(clippy::unwrap_used)]

//! Raster primitives used by the richness and hotspot processing: dense nodata aware rasters,
//! georeferencing, GeoTIFF io and the raster algorithms (cell statistics, quantiles, reclassification, clustering).

pub type Result<T = ()> = std::result::Result<T, Error>;

mod array;
mod arraydatatype;
mod arraynum;
mod cell;
mod error;
mod georeference;
mod geotransform;
pub mod geotiff;
mod nodata;
pub mod raster;
mod rastersize;

#[cfg(test)]
mod testutils;

#[doc(inline)]
pub use array::Array;
#[doc(inline)]
pub use arraydatatype::ArrayDataType;
#[doc(inline)]
pub use arraynum::ArrayNum;
pub use cell::Cell;
#[doc(inline)]
pub use error::Error;
#[doc(inline)]
pub use georeference::CellSize;
#[doc(inline)]
pub use georeference::GeoReference;
#[doc(inline)]
pub use geotransform::GeoTransform;
#[doc(inline)]
pub use nodata::Nodata;
#[doc(inline)]
pub use rastersize::RasterSize;

pub type Point<T = f64> = geo_types::Point<T>;
