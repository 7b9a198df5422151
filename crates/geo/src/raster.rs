//! Dense raster type with its io and processing algorithms.

pub mod algo;
mod denseraster;
mod io;

#[doc(inline)]
pub use denseraster::DenseRaster;
pub use io::RasterReadWrite;
