use crate::{ArrayNum, Cell, GeoReference, Nodata, RasterSize, Result};

/// A trait representing a raster.
/// A raster implementation provides access to the pixel data and the geographic metadata associated with the raster.
/// Nodata cells are stored as the [`crate::Nodata::NODATA`] value of the pixel type.
pub trait Array: PartialEq + Clone + std::fmt::Debug
where
    Self: Sized,
{
    type Pixel: ArrayNum;

    type WithPixelType<U: ArrayNum>: Array<Pixel = U>;

    //
    // Creation functions
    //

    /// Create a new raster with the given metadata and data buffer.
    /// Fails when the buffer length does not match the raster size of the metadata.
    fn new(meta: GeoReference, data: Vec<Self::Pixel>) -> Result<Self>;

    /// Create a new raster from an iterator, `None` values will become nodata.
    fn from_iter<Iter>(meta: GeoReference, iter: Iter) -> Result<Self>
    where
        Iter: Iterator<Item = Option<Self::Pixel>>;

    /// Create a new raster with the given metadata and filled with zeros.
    fn zeros(meta: GeoReference) -> Self {
        Self::filled_with(num::Zero::zero(), meta)
    }

    /// Create a new raster with the given metadata and filled with the provided value.
    fn filled_with(val: Self::Pixel, meta: GeoReference) -> Self;

    /// Create a new raster filled with nodata.
    fn filled_with_nodata(meta: GeoReference) -> Self;

    //
    // Trait methods
    //

    /// Returns the metadata reference.
    fn metadata(&self) -> &GeoReference;

    /// Returns the width of the raster.
    fn width(&self) -> usize;

    /// Returns the height of the raster.
    fn height(&self) -> usize;

    /// Returns the size data structure of the raster.
    fn size(&self) -> RasterSize {
        RasterSize {
            cols: self.width(),
            rows: self.height(),
        }
    }

    fn len(&self) -> usize {
        self.width() * self.height()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a mutable reference to the raster data.
    fn as_mut_slice(&mut self) -> &mut [Self::Pixel];

    /// Returns a reference to the raster data.
    fn as_slice(&self) -> &[Self::Pixel];

    /// Returns the number of nodata values in the raster
    fn nodata_count(&self) -> usize {
        self.as_slice().iter().filter(|v| v.is_nodata()).count()
    }

    /// Returns the number of cells containing valid data
    fn data_count(&self) -> usize {
        self.len() - self.nodata_count()
    }

    /// Return true if the cell at the given index contains valid data
    fn index_has_data(&self, index: usize) -> bool {
        !self.as_slice()[index].is_nodata()
    }

    /// Return true if the cell at the given index contains nodata
    fn index_is_nodata(&self, index: usize) -> bool {
        !self.index_has_data(index)
    }

    /// Return the value at the given index or None if the index contains nodata
    fn value(&self, index: usize) -> Option<Self::Pixel> {
        let val = self.as_slice()[index];
        if val.is_nodata() { None } else { Some(val) }
    }

    /// Return the value at the given cell or None if the cell contains nodata
    /// Use this for cases where a single cell value is needed not in a loop to
    /// to process the entire raster
    fn cell_value(&self, cell: Cell) -> Option<Self::Pixel> {
        self.value(cell.index_in_raster(self.size()))
    }

    /// Set the value at the given cell, if the value is None the cell will be set to nodata
    fn set_cell_value(&mut self, cell: Cell, val: Option<Self::Pixel>) {
        let index = cell.index_in_raster(self.size());
        self.as_mut_slice()[index] = val.unwrap_or(Self::Pixel::NODATA);
    }

    /// Return an iterator over the raster data, nodata values are represented as None
    fn iter_opt(&self) -> impl Iterator<Item = Option<Self::Pixel>> + '_ {
        self.as_slice().iter().map(|&v| if v.is_nodata() { None } else { Some(v) })
    }

    /// Return an iterator over the valid raster values, nodata values are skipped
    fn iter_values(&self) -> impl Iterator<Item = Self::Pixel> + '_ {
        self.as_slice().iter().copied().filter(|v| !v.is_nodata())
    }
}
