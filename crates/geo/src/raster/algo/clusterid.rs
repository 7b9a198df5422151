use std::collections::VecDeque;

use crate::{Array, ArrayNum, Cell, Nodata, RasterSize, Result};

/// Controls whether diagonally adjacent cells are considered connected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize), serde(rename_all = "snake_case"))]
pub enum ClusterDiagonals {
    /// 8-connectivity
    #[default]
    Include,
    /// 4-connectivity
    Exclude,
}

fn neighbours(cell: Cell, diagonals: ClusterDiagonals) -> impl Iterator<Item = Cell> {
    let direct = [cell.above(), cell.left(), cell.right(), cell.below()];
    let diagonal = [cell.above_left(), cell.above_right(), cell.below_left(), cell.below_right()];
    let diagonal_count = match diagonals {
        ClusterDiagonals::Include => diagonal.len(),
        ClusterDiagonals::Exclude => 0,
    };

    direct.into_iter().chain(diagonal.into_iter().take(diagonal_count))
}

/// Flood fill labeling of the cells, cells for which `member` returns false get id 0.
fn label_clusters<T, M>(size: RasterSize, data: &[T], diagonals: ClusterDiagonals, member: M) -> Vec<i32>
where
    T: ArrayNum,
    M: Fn(T) -> bool,
{
    let mut ids: Vec<i32> = data.iter().map(|v| if v.is_nodata() { i32::NODATA } else { 0 }).collect();
    let mut next_id = 1;
    let mut queue = VecDeque::new();

    for start in 0..data.len() {
        if ids[start] != 0 || !member(data[start]) {
            continue;
        }

        ids[start] = next_id;
        queue.push_back(start);

        while let Some(index) = queue.pop_front() {
            for neighbour in neighbours(Cell::from_index(index, size), diagonals) {
                if !neighbour.is_on_map(size) {
                    continue;
                }

                let neighbour_index = neighbour.index_in_raster(size);
                if ids[neighbour_index] != 0 {
                    // already labeled or nodata
                    continue;
                }

                if member(data[neighbour_index]) {
                    ids[neighbour_index] = next_id;
                    queue.push_back(neighbour_index);
                }
            }
        }

        next_id += 1;
    }

    log::debug!("Labeled {} clusters", next_id - 1);
    ids
}

/// Assigns a unique id to every connected region of cells that match the predicate.
/// Cluster ids start at 1, cells that do not match the predicate get id 0, nodata cells remain nodata.
pub fn cluster_id_where<R, F>(ras: &R, diagonals: ClusterDiagonals, predicate: F) -> Result<R::WithPixelType<i32>>
where
    R: Array,
    F: Fn(R::Pixel) -> bool,
{
    let ids = label_clusters(ras.size(), ras.as_slice(), diagonals, predicate);
    <R::WithPixelType<i32> as Array>::new(ras.metadata().clone(), ids)
}

/// Number of cells in every cluster, indexed by cluster id.
/// Index 0 counts the cells that are not part of a cluster.
pub fn cluster_sizes<R: Array<Pixel = i32>>(clusters: &R) -> Vec<usize> {
    let mut sizes = Vec::new();
    for id in clusters.iter_values() {
        let id = id as usize;
        if id >= sizes.len() {
            sizes.resize(id + 1, 0);
        }

        sizes[id] += 1;
    }

    sizes
}

#[cfg(test)]
mod tests {
    use crate::{raster::DenseRaster, testutils::*};

    use super::*;

    #[test]
    fn cluster_id_where_skips_nodata() -> Result<()> {
        let meta = test_georeference(RasterSize::with_rows_cols(3, 4));

        #[rustfmt::skip]
        let ras = DenseRaster::<u8>::new(meta, create_vec(&[
            1.0, 0.0, 2.0, 2.0,
            1.0, NOD, 2.0, 1.0,
            0.0, 3.0, 0.0, 1.0,
        ]))?;

        // the nodata cell does not connect its neighbours
        let clusters = cluster_id_where(&ras, ClusterDiagonals::Exclude, |v| v != 0)?;

        #[rustfmt::skip]
        assert_eq!(clusters.as_slice(), &[
            1, 0, 2, 2,
            1, i32::NODATA, 2, 2,
            0, 3, 0, 2,
        ]);

        assert_eq!(cluster_sizes(&clusters), vec![3, 2, 5, 1]);

        Ok(())
    }

    #[test]
    fn cluster_id_where_diagonals() -> Result<()> {
        let meta = test_georeference(RasterSize::with_rows_cols(3, 3));

        #[rustfmt::skip]
        let ras = DenseRaster::<u8>::new(meta, vec![
            1, 0, 0,
            0, 1, 0,
            0, 0, 1,
        ])?;

        let with_diagonals = cluster_id_where(&ras, ClusterDiagonals::Include, |v| v == 1)?;
        #[rustfmt::skip]
        assert_eq!(with_diagonals.as_slice(), &[
            1, 0, 0,
            0, 1, 0,
            0, 0, 1,
        ]);
        assert_eq!(cluster_sizes(&with_diagonals), vec![6, 3]);

        let without_diagonals = cluster_id_where(&ras, ClusterDiagonals::Exclude, |v| v == 1)?;
        #[rustfmt::skip]
        assert_eq!(without_diagonals.as_slice(), &[
            1, 0, 0,
            0, 2, 0,
            0, 0, 3,
        ]);
        assert_eq!(cluster_sizes(&without_diagonals), vec![6, 1, 1, 1]);

        Ok(())
    }

    #[test]
    fn cluster_id_all_nodata() -> Result<()> {
        let meta = test_georeference(RasterSize::with_rows_cols(2, 2));
        let ras = DenseRaster::<u8>::filled_with_nodata(meta);

        let clusters = cluster_id_where(&ras, ClusterDiagonals::Include, |v| v == 1)?;
        assert_eq!(clusters.nodata_count(), 4);
        assert!(cluster_sizes(&clusters).is_empty());

        Ok(())
    }
}
