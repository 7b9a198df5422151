use crate::RasterSize;

/// Represents a point in the raster using row, col coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Cell {
    pub row: i32,
    pub col: i32,
}

impl Cell {
    pub const fn from_row_col(row: i32, col: i32) -> Self {
        Cell { row, col }
    }

    /// Cell corresponding with the row major index in a raster of the given size
    pub fn from_index(index: usize, size: RasterSize) -> Self {
        Cell::from_row_col((index / size.cols) as i32, (index % size.cols) as i32)
    }

    pub const fn is_valid(&self) -> bool {
        self.row >= 0 && self.col >= 0
    }

    pub fn left(&self) -> Cell {
        Cell::from_row_col(self.row, self.col - 1)
    }

    pub fn right(&self) -> Cell {
        Cell::from_row_col(self.row, self.col + 1)
    }

    pub fn above(&self) -> Cell {
        Cell::from_row_col(self.row - 1, self.col)
    }

    pub fn below(&self) -> Cell {
        Cell::from_row_col(self.row + 1, self.col)
    }

    pub fn above_left(&self) -> Cell {
        Cell::from_row_col(self.row - 1, self.col - 1)
    }

    pub fn above_right(&self) -> Cell {
        Cell::from_row_col(self.row - 1, self.col + 1)
    }

    pub fn below_left(&self) -> Cell {
        Cell::from_row_col(self.row + 1, self.col - 1)
    }

    pub fn below_right(&self) -> Cell {
        Cell::from_row_col(self.row + 1, self.col + 1)
    }

    pub fn is_on_map(&self, size: RasterSize) -> bool {
        self.is_valid() && (self.row as usize) < size.rows && (self.col as usize) < size.cols
    }

    /// Row major index of the cell, the cell must be on the map
    pub fn index_in_raster(&self, size: RasterSize) -> usize {
        debug_assert!(self.is_on_map(size));
        self.row as usize * size.cols + self.col as usize
    }
}

impl PartialOrd for Cell {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Cell {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.row.cmp(&other.row).then(self.col.cmp(&other.col))
    }
}
