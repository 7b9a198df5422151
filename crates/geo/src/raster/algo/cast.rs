use num::NumCast;

use crate::{Array, ArrayNum, Result};

/// Convert the raster to a different pixel type, values that cannot be represented in the destination type become nodata
pub fn cast<TDest, R>(src: &R) -> Result<R::WithPixelType<TDest>>
where
    TDest: ArrayNum,
    R: Array,
{
    <R::WithPixelType<TDest> as Array>::from_iter(
        src.metadata().clone(),
        src.iter_opt().map(|v| v.and_then(|v| NumCast::from(v))),
    )
}
