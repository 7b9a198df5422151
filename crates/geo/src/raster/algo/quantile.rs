use std::cmp::Ordering;

use crate::{Array, ArrayNum, Error, Result};

/// Interpolation used when a quantile falls between two ranked values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize), serde(rename_all = "snake_case"))]
pub enum QuantileInterpolation {
    /// Linear interpolation between the two closest ranks
    Linear,
    /// Value of the closest rank
    Nearest,
    /// Nearest for integer rasters, linear for floating point rasters
    #[default]
    AutoDetect,
}

impl QuantileInterpolation {
    fn resolve<T: ArrayNum>(self) -> QuantileInterpolation {
        match self {
            QuantileInterpolation::AutoDetect if T::TYPE.is_integer() => QuantileInterpolation::Nearest,
            QuantileInterpolation::AutoDetect => QuantileInterpolation::Linear,
            _ => self,
        }
    }
}

fn to_f64<T>(value: T) -> Result<f64>
where
    T: ArrayNum,
{
    value
        .to_f64()
        .ok_or_else(|| Error::InvalidArgument(format!("Failed to convert raster value to f64: '{value:?}'")))
}

/// Quantiles of sorted data
pub(crate) fn array_quantiles<T>(data: &[T], quantile_vals: &[f64], interpolation: QuantileInterpolation) -> Result<Option<Vec<f64>>>
where
    T: ArrayNum,
{
    if data.is_empty() {
        return Ok(None);
    }

    let interpolation = interpolation.resolve::<T>();
    let mut results = Vec::with_capacity(quantile_vals.len());
    let len = data.len() as f64;

    for &q in quantile_vals {
        let pos = q * (len - 1.0);

        let value = match interpolation {
            QuantileInterpolation::Nearest => to_f64(data[pos.round() as usize])?,
            _ => {
                let lower = pos.floor() as usize;
                let upper = pos.ceil() as usize;

                if lower == upper {
                    to_f64(data[lower])?
                } else {
                    let lower_val = to_f64(data[lower])?;
                    let upper_val = to_f64(data[upper])?;
                    let weight = pos - lower as f64;
                    lower_val * (1.0 - weight) + upper_val * weight
                }
            }
        };

        results.push(value);
    }

    Ok(Some(results))
}

/// Computes quantiles for a raster with the requested interpolation, ignoring nodata values.
/// Returns `None` if the raster contains no data.
pub fn quantiles_with_interpolation<R: Array>(
    ras: &R,
    quantile_vals: &[f64],
    interpolation: QuantileInterpolation,
) -> Result<Option<Vec<f64>>> {
    if quantile_vals.iter().any(|&q| !(0.0..=1.0).contains(&q)) {
        return Err(Error::InvalidArgument("Quantile values must be between 0 and 1".to_string()));
    }

    let mut data: Vec<R::Pixel> = ras.iter_values().collect();
    if data.is_empty() {
        return Ok(None);
    }

    data.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    array_quantiles(&data, quantile_vals, interpolation)
}

#[cfg(test)]
mod tests {
    use crate::{RasterSize, raster::DenseRaster, testutils::*};

    use super::*;

    #[test]
    fn quantiles_all_nodata() -> Result<()> {
        let meta = test_georeference(RasterSize::with_rows_cols(3, 2));

        #[rustfmt::skip]
        let raster = DenseRaster::<f64>::new(meta, create_vec(&[
            NOD, NOD,
            NOD, NOD,
            NOD, NOD,
        ]))?;

        assert!(quantiles_with_interpolation(&raster, &[0.0, 0.25, 0.5, 0.75, 1.0], QuantileInterpolation::Linear)?.is_none());

        Ok(())
    }

    #[test]
    fn quantiles_linear() -> Result<()> {
        let meta = test_georeference(RasterSize::with_rows_cols(3, 2));

        {
            #[rustfmt::skip]
            let raster = DenseRaster::<f64>::new(meta.clone(), create_vec(&[
                3.0, 1.0,
                4.0, NOD,
                1.0, 2.0,
            ]))?;

            let quants = quantiles_with_interpolation(&raster, &[0.0, 0.25, 0.5, 0.75, 1.0], QuantileInterpolation::Linear)?
                .expect("Quantiles should have a value");
            assert_eq!(quants, vec![1.0, 1.0, 2.0, 3.0, 4.0]);
        }

        {
            #[rustfmt::skip]
            let raster = DenseRaster::<f64>::new(meta, create_vec(&[
                3.0, 1.0,
                4.0, 7.0,
                1.0, 2.0,
            ]))?;

            let quants = quantiles_with_interpolation(&raster, &[0.0, 0.25, 0.5, 0.75, 1.0], QuantileInterpolation::Linear)?
                .expect("Quantiles should have a value");
            assert_eq!(quants, vec![1.0, 1.25, 2.5, 3.75, 7.0]);
        }

        Ok(())
    }

    #[test]
    fn quantiles_nearest() -> Result<()> {
        let meta = test_georeference(RasterSize::with_rows_cols(3, 2));

        #[rustfmt::skip]
        let raster = DenseRaster::<u16>::new(meta, create_vec(&[
            3.0, 1.0,
            4.0, 7.0,
            1.0, 2.0,
        ]))?;

        let quants = quantiles_with_interpolation(&raster, &[0.0, 0.25, 0.5, 0.75, 1.0], QuantileInterpolation::Nearest)?
            .expect("Quantiles should have a value");
        assert_eq!(quants, vec![1.0, 1.0, 3.0, 4.0, 7.0]);

        // integer rasters resolve to the nearest rank
        let auto = quantiles_with_interpolation(&raster, &[0.0, 0.25, 0.5, 0.75, 1.0], QuantileInterpolation::AutoDetect)?;
        assert_eq!(auto, Some(quants));

        Ok(())
    }

    #[test]
    fn quantiles_invalid_argument() -> Result<()> {
        let meta = test_georeference(RasterSize::with_rows_cols(1, 2));
        let raster = DenseRaster::<u16>::new(meta, vec![1, 2])?;
        assert!(matches!(
            quantiles_with_interpolation(&raster, &[1.5], QuantileInterpolation::AutoDetect),
            Err(Error::InvalidArgument(_))
        ));
        Ok(())
    }
}
