//! Reading and writing of rasters from disk.
//! The format is derived from the file extension, only GeoTIFF is supported.

use std::path::Path;

use crate::{Array, ArrayNum, Error, GeoReference, Result, geotiff};

use super::DenseRaster;

fn check_extension(path: &Path) -> Result {
    match path.extension().and_then(|ext| ext.to_str()).map(|ext| ext.to_ascii_lowercase()) {
        Some(ext) if ext == "tif" || ext == "tiff" => Ok(()),
        _ => Err(Error::InvalidArgument(format!("Unsupported raster format: {}", path.display()))),
    }
}

/// Raster IO operations
pub trait RasterReadWrite: Sized {
    /// Reads the full raster from disk, nodata values of the file are converted to the nodata value of the pixel type.
    fn read(path: &Path) -> Result<Self>;

    /// Reads only the metadata of the raster.
    fn read_georeference(path: &Path) -> Result<GeoReference> {
        check_extension(path)?;
        geotiff::read_georeference(path)
    }

    /// Writes the raster to disk, parent directories are created when needed.
    fn write(&self, path: &Path) -> Result;
}

impl<T: ArrayNum> RasterReadWrite for DenseRaster<T> {
    fn read(path: &Path) -> Result<Self> {
        check_extension(path)?;
        let (meta, data) = geotiff::read_raster_band::<T>(path)?;
        log::debug!("Read raster {} ({})", path.display(), meta.raster_size());
        DenseRaster::new(meta, data)
    }

    fn write(&self, path: &Path) -> Result {
        check_extension(path)?;
        geotiff::write_raster_band(path, self.metadata(), self.as_slice())
    }
}
