use num::ToPrimitive;

use crate::{Array, Nodata, Result};

fn at_or_above<T: ToPrimitive>(value: T, threshold: f64) -> bool {
    value.to_f64().is_some_and(|v| v >= threshold)
}

/// Reclassifies the raster into a binary mask: `1` for values greater than or equal to the threshold, `0` for the other data values.
/// Nodata cells remain nodata in the mask.
pub fn threshold_mask<R>(ras: &R, threshold: f64) -> Result<R::WithPixelType<u8>>
where
    R: Array,
{
    let meta = ras.metadata().copy_with_nodata(Some(u8::NODATA));
    R::WithPixelType::<u8>::from_iter(
        meta,
        ras.iter_opt().map(|v| v.map(|v| u8::from(at_or_above(v, threshold)))),
    )
}

/// Number of data cells with a value greater than or equal to the threshold
pub fn count_at_or_above<R: Array>(ras: &R, threshold: f64) -> usize {
    ras.iter_values().filter(|&v| at_or_above(v, threshold)).count()
}

#[cfg(test)]
mod tests {
    use crate::{RasterSize, raster::DenseRaster, testutils::*};

    use super::*;

    #[test]
    fn threshold_mask_keeps_nodata() -> Result<()> {
        let meta = test_georeference(RasterSize::with_rows_cols(2, 3));

        #[rustfmt::skip]
        let raster = DenseRaster::<u16>::new(meta.clone(), create_vec(&[
            1.0, 5.0, NOD,
            7.0, 4.0, 5.0,
        ]))?;

        #[rustfmt::skip]
        let expected = DenseRaster::<u8>::new(meta, create_vec(&[
            0.0, 1.0, NOD,
            1.0, 0.0, 1.0,
        ]))?;

        assert_eq!(threshold_mask(&raster, 5.0)?, expected);
        assert_eq!(count_at_or_above(&raster, 5.0), 3);
        assert_eq!(count_at_or_above(&raster, 0.0), 5);
        assert_eq!(count_at_or_above(&raster, 8.0), 0);

        Ok(())
    }

    #[test]
    fn threshold_mask_fractional_threshold() -> Result<()> {
        let meta = test_georeference(RasterSize::with_rows_cols(1, 4));
        let raster = DenseRaster::<f32>::new(meta, vec![0.5, 1.0, 1.5, 2.0])?;

        let mask = threshold_mask(&raster, 1.25)?;
        assert_eq!(mask.as_slice(), &[0, 0, 1, 1]);
        assert_eq!(mask.metadata().nodata(), Some(255.0));

        Ok(())
    }
}
