use std::ops::RangeInclusive;

use itertools::Itertools;
use itertools::MinMaxResult::{MinMax, NoElements, OneElement};

use crate::Array;

/// Smallest and largest data value of the raster, `None` when the raster contains no data
pub fn min_max<R: Array>(ras: &R) -> Option<RangeInclusive<R::Pixel>> {
    match ras.iter_values().minmax() {
        NoElements => None,
        OneElement(x) => Some(x..=x),
        MinMax(x, y) => Some(x..=y),
    }
}
