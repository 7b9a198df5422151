use crate::{Array, ArrayNum, Error, GeoReference, Result};

/// Raster implementation using a dense data structure.
/// The nodata values are stored as the [`crate::Nodata::NODATA`] for the type T in the same array data structure
/// So no additional data is allocated for tracking nodata cells.
/// The nodata value of the metadata always reflects this value.
#[derive(Debug, Clone)]
pub struct DenseRaster<T: ArrayNum> {
    pub(super) meta: GeoReference,
    pub(super) data: Vec<T>,
}

impl<T: ArrayNum> DenseRaster<T> {
    /// Create a raster from data that uses the nodata value of the metadata to indicate missing data.
    /// The nodata values are converted to the internal nodata representation.
    pub fn new_init_nodata(meta: GeoReference, mut data: Vec<T>) -> Result<Self> {
        if let Some(nodata) = meta.nodata().and_then(|nod| num::NumCast::from(nod)) {
            data.iter_mut().for_each(|v: &mut T| v.init_nodata(nodata));
        }

        DenseRaster::new(meta, data)
    }
}

impl<T: ArrayNum> Array for DenseRaster<T> {
    type Pixel = T;
    type WithPixelType<U: ArrayNum> = DenseRaster<U>;

    fn new(meta: GeoReference, data: Vec<T>) -> Result<Self> {
        if data.len() != meta.raster_size().cell_count() {
            return Err(Error::InvalidArgument(format!(
                "Raster data length {} does not match the raster size {}",
                data.len(),
                meta.raster_size()
            )));
        }

        Ok(DenseRaster {
            meta: meta.copy_with_nodata(Some(T::NODATA)),
            data,
        })
    }

    fn from_iter<Iter>(meta: GeoReference, iter: Iter) -> Result<Self>
    where
        Iter: Iterator<Item = Option<T>>,
    {
        let mut data = Vec::with_capacity(meta.raster_size().cell_count());
        data.extend(iter.map(|val| val.unwrap_or(T::NODATA)));
        DenseRaster::new(meta, data)
    }

    fn filled_with(val: T, meta: GeoReference) -> Self {
        let data = vec![val; meta.raster_size().cell_count()];
        DenseRaster {
            meta: meta.copy_with_nodata(Some(T::NODATA)),
            data,
        }
    }

    fn filled_with_nodata(meta: GeoReference) -> Self {
        DenseRaster::filled_with(T::NODATA, meta)
    }

    fn metadata(&self) -> &GeoReference {
        &self.meta
    }

    fn width(&self) -> usize {
        self.meta.columns()
    }

    fn height(&self) -> usize {
        self.meta.rows()
    }

    fn len(&self) -> usize {
        self.data.len()
    }

    fn as_mut_slice(&mut self) -> &mut [T] {
        self.data.as_mut_slice()
    }

    fn as_slice(&self) -> &[T] {
        self.data.as_slice()
    }
}

impl<T: ArrayNum> PartialEq for DenseRaster<T> {
    fn eq(&self, other: &Self) -> bool {
        if self.meta.raster_size() != other.meta.raster_size() {
            return false;
        }

        self.data
            .iter()
            .zip(other.data.iter())
            .all(|(&a, &b)| match (a.is_nodata(), b.is_nodata()) {
                (true, true) => true,
                (false, false) => a == b,
                _ => false,
            })
    }
}

#[cfg(test)]
mod tests {
    use crate::{Cell, Nodata, RasterSize, testutils::*};

    use super::*;

    #[test]
    fn new_checks_data_length() {
        let meta = test_georeference(RasterSize::with_rows_cols(2, 2));
        assert!(DenseRaster::<u8>::new(meta.clone(), vec![1, 2, 3]).is_err());
        assert!(DenseRaster::<u8>::new(meta, vec![1, 2, 3, 4]).is_ok());
    }

    #[test]
    fn new_init_nodata() -> Result<()> {
        let mut meta = test_georeference(RasterSize::with_rows_cols(2, 2));
        meta.set_nodata(Some(-1.0));

        let ras = DenseRaster::<i32>::new_init_nodata(meta, vec![1, -1, 3, 4])?;
        assert_eq!(ras.value(1), None);
        assert_eq!(ras.value(2), Some(3));
        assert_eq!(ras.nodata_count(), 1);
        assert_eq!(ras.data_count(), 3);
        assert_eq!(ras.metadata().nodata(), Some(i32::NODATA as f64));

        Ok(())
    }

    #[test]
    fn cell_access() -> Result<()> {
        let meta = test_georeference(RasterSize::with_rows_cols(2, 3));
        let mut ras = DenseRaster::<u16>::zeros(meta);
        ras.set_cell_value(Cell::from_row_col(1, 2), Some(7));
        ras.set_cell_value(Cell::from_row_col(0, 1), None);

        assert_eq!(ras.as_slice(), &[0, u16::NODATA, 0, 0, 0, 7]);
        assert_eq!(ras.cell_value(Cell::from_row_col(1, 2)), Some(7));
        assert_eq!(ras.cell_value(Cell::from_row_col(0, 1)), None);
        assert_eq!(ras.iter_values().count(), 5);
        assert_eq!(ras.iter_values().max(), Some(7));

        Ok(())
    }

    #[test]
    fn nodata_aware_equality() -> Result<()> {
        let meta = test_georeference(RasterSize::with_rows_cols(1, 3));
        let r1 = DenseRaster::<f32>::new(meta.clone(), vec![1.0, f32::NAN, 3.0])?;
        let r2 = DenseRaster::<f32>::new(meta.clone(), vec![1.0, f32::NAN, 3.0])?;
        let r3 = DenseRaster::<f32>::new(meta, vec![1.0, 2.0, 3.0])?;

        assert_eq!(r1, r2);
        assert_ne!(r1, r3);

        Ok(())
    }
}
