use crate::{Array, ArrayNum, Result};

use super::check_dimensions;

/// Determines how nodata cells participate in cell statistics over multiple rasters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize), serde(rename_all = "snake_case"))]
pub enum NodataHandling {
    /// Nodata cells are ignored, the result is only nodata when all the inputs are nodata
    #[default]
    IgnoreNodata,
    /// The result is nodata as soon as one of the inputs is nodata
    PropagateNodata,
    /// Nodata cells count as zero, the result never contains nodata
    NodataAsZero,
}

fn zero_if_nodata<T: ArrayNum>(val: T) -> T {
    if val.is_nodata() { T::zero() } else { val }
}

/// Adds the cells of `other` to `acc`
pub fn sum_in_place<R: Array>(acc: &mut R, other: &R, nodata: NodataHandling) -> Result {
    check_dimensions(acc, other)?;

    let lhs = acc.as_mut_slice().iter_mut();
    let rhs = other.as_slice().iter();

    match nodata {
        NodataHandling::IgnoreNodata => lhs.zip(rhs).for_each(|(a, &b)| a.add_assign_inclusive_nodata_aware(b)),
        NodataHandling::PropagateNodata => lhs.zip(rhs).for_each(|(a, &b)| a.add_assign_nodata_aware(b)),
        NodataHandling::NodataAsZero => lhs
            .zip(rhs)
            .for_each(|(a, &b)| *a = zero_if_nodata(*a).add_nodata_aware(zero_if_nodata(b))),
    }

    Ok(())
}

/// Cell wise sum of all the provided rasters
/// Returns `None` when no rasters are provided
pub fn sum<'a, R, I>(rasters: I, nodata: NodataHandling) -> Result<Option<R>>
where
    R: Array + 'a,
    I: IntoIterator<Item = &'a R>,
{
    let mut rasters = rasters.into_iter();
    let Some(first) = rasters.next() else {
        return Ok(None);
    };

    let mut result = first.clone();
    if nodata == NodataHandling::NodataAsZero {
        result.as_mut_slice().iter_mut().for_each(|v| *v = zero_if_nodata(*v));
    }

    for ras in rasters {
        sum_in_place(&mut result, ras, nodata)?;
    }

    Ok(Some(result))
}

#[cfg(test)]
mod tests {
    use crate::{Error, Nodata, RasterSize, raster::DenseRaster, testutils::*};

    use super::*;

    fn create_rasters() -> Result<Vec<DenseRaster<u16>>> {
        let meta = test_georeference(RasterSize::with_rows_cols(2, 2));
        Ok(vec![
            DenseRaster::new(meta.clone(), create_vec(&[1.0, NOD, NOD, 1.0]))?,
            DenseRaster::new(meta.clone(), create_vec(&[1.0, NOD, 1.0, 0.0]))?,
            DenseRaster::new(meta, create_vec(&[0.0, NOD, 1.0, 1.0]))?,
        ])
    }

    #[test]
    fn sum_ignore_nodata() -> Result<()> {
        let rasters = create_rasters()?;
        let result = sum(&rasters, NodataHandling::IgnoreNodata)?.expect("rasters provided");
        assert_eq!(result.as_slice(), &[2, u16::NODATA, 2, 2]);
        Ok(())
    }

    #[test]
    fn sum_propagate_nodata() -> Result<()> {
        let rasters = create_rasters()?;
        let result = sum(&rasters, NodataHandling::PropagateNodata)?.expect("rasters provided");
        assert_eq!(result.as_slice(), &[2, u16::NODATA, u16::NODATA, 2]);
        Ok(())
    }

    #[test]
    fn sum_nodata_as_zero() -> Result<()> {
        let rasters = create_rasters()?;
        let result = sum(&rasters, NodataHandling::NodataAsZero)?.expect("rasters provided");
        assert_eq!(result.as_slice(), &[2, 0, 2, 2]);

        let single = sum(&rasters[..1], NodataHandling::NodataAsZero)?.expect("rasters provided");
        assert_eq!(single.as_slice(), &[1, 0, 0, 1]);
        Ok(())
    }

    #[test]
    fn sum_of_nothing() -> Result<()> {
        let rasters: Vec<DenseRaster<u16>> = Vec::new();
        assert!(sum(&rasters, NodataHandling::IgnoreNodata)?.is_none());
        Ok(())
    }

    #[test]
    fn sum_size_mismatch() -> Result<()> {
        let mut acc = DenseRaster::<u16>::zeros(test_georeference(RasterSize::with_rows_cols(2, 2)));
        let other = DenseRaster::<u16>::zeros(test_georeference(RasterSize::with_rows_cols(2, 3)));
        assert!(matches!(
            sum_in_place(&mut acc, &other, NodataHandling::IgnoreNodata),
            Err(Error::SizeMismatch { .. })
        ));
        Ok(())
    }
}
