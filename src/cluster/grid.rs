//! Grid index registering clusters by the cell of their centroid
//!
//! Cells are defined by per-axis bin edges which need not be evenly spaced.
//! Bin `i` along an axis covers `[edges[i], edges[i + 1])`; the last bin also
//! includes its upper edge.

use std::collections::BTreeMap;

use super::error::{ClusterError, Result};
use super::point::{ClusterId, Point};

/// Cell coordinates (bin along x, bin along y)
pub type CellIndex = (usize, usize);

/// Spatial grid of cluster ids
#[derive(Debug, Clone)]
pub struct ClusteringGrid {
    edges_x: Vec<f64>,
    edges_y: Vec<f64>,
    cells: BTreeMap<CellIndex, Vec<ClusterId>>,
}

impl ClusteringGrid {
    /// Creates an empty grid from bin edges along x and y
    pub fn new(edges_x: Vec<f64>, edges_y: Vec<f64>) -> Result<Self> {
        check_edges('x', &edges_x)?;
        check_edges('y', &edges_y)?;

        Ok(ClusteringGrid {
            edges_x,
            edges_y,
            cells: BTreeMap::new(),
        })
    }

    pub fn edges_x(&self) -> &[f64] {
        &self.edges_x
    }

    pub fn edges_y(&self) -> &[f64] {
        &self.edges_y
    }

    /// Number of bins along x
    #[cfg(test)]
    pub fn bins_x(&self) -> usize {
        self.edges_x.len() - 1
    }

    /// Number of bins along y
    #[cfg(test)]
    pub fn bins_y(&self) -> usize {
        self.edges_y.len() - 1
    }

    /// Returns the cell containing `p`
    pub fn cell_of(&self, p: &Point) -> Result<CellIndex> {
        match (bin(&self.edges_x, p.x()), bin(&self.edges_y, p.y())) {
            (Some(i), Some(j)) => Ok((i, j)),
            _ => Err(ClusterError::OutsideGrid { x: p.x(), y: p.y() }),
        }
    }

    /// Registers `id` in `cell`; registering twice has no effect
    pub fn register(&mut self, cell: CellIndex, id: ClusterId) {
        let ids = self.cells.entry(cell).or_default();
        if !ids.contains(&id) {
            ids.push(id);
        }
    }

    /// Removes `id` from `cell`; removing an absent id has no effect
    pub fn unregister(&mut self, cell: CellIndex, id: ClusterId) {
        if let Some(ids) = self.cells.get_mut(&cell) {
            ids.retain(|&other| other != id);
            if ids.is_empty() {
                self.cells.remove(&cell);
            }
        }
    }

    pub fn is_nonempty(&self, cell: CellIndex) -> bool {
        self.cells.contains_key(&cell)
    }

    /// Cluster ids registered in `cell`
    pub fn clusters_at(&self, cell: CellIndex) -> &[ClusterId] {
        self.cells.get(&cell).map_or(&[], Vec::as_slice)
    }

    /// Non-empty cells in ascending (x, y) order
    pub fn occupied_cells(&self) -> impl Iterator<Item = (CellIndex, &[ClusterId])> {
        self.cells.iter().map(|(&cell, ids)| (cell, ids.as_slice()))
    }

    /// Cluster ids registered in `cell` and its eight neighbours
    ///
    /// Cells are visited with the x offset in the outer loop and the y offset
    /// in the inner loop, each from -1 to +1.
    pub fn neighbourhood(&self, cell: CellIndex) -> impl Iterator<Item = ClusterId> + '_ {
        let (i, j) = cell;
        (-1isize..=1)
            .flat_map(move |di| (-1isize..=1).map(move |dj| (di, dj)))
            .filter_map(move |(di, dj)| {
                Some((i.checked_add_signed(di)?, j.checked_add_signed(dj)?))
            })
            .flat_map(move |c| self.clusters_at(c).iter().copied())
    }

    /// Total number of registrations
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.cells.values().map(Vec::len).sum()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Upper limit on the number of bins `uniform_edges` builds along one axis
pub const MAX_BINS: usize = 1 << 24;

/// Evenly spaced edges from `min` covering `max`
///
/// A degenerate range gives a single bin of width `step`.
pub fn uniform_edges(min: f64, max: f64, step: f64) -> Result<Vec<f64>> {
    if !step.is_finite() || step <= 0.0 {
        return Err(ClusterError::InvalidStep(step));
    }
    if !min.is_finite() || !max.is_finite() || max < min {
        return Err(ClusterError::InvalidRange { min, max });
    }

    let bins = ((max - min) / step).ceil();
    if !bins.is_finite() || bins > MAX_BINS as f64 {
        return Err(ClusterError::TooManyBins {
            min,
            max,
            step,
            limit: MAX_BINS,
        });
    }
    let bins = (bins as usize).max(1);
    let mut edges: Vec<f64> = (0..=bins).map(|k| min + k as f64 * step).collect();
    // rounding in `min + k * step` may fall just short of `max`
    if let Some(last) = edges.last_mut() {
        if *last < max {
            *last = max;
        }
    }
    Ok(edges)
}

fn check_edges(axis: char, edges: &[f64]) -> Result<()> {
    if edges.len() < 2 {
        return Err(ClusterError::TooFewEdges {
            axis,
            len: edges.len(),
        });
    }
    for (index, edge) in edges.iter().enumerate() {
        if !edge.is_finite() || (index > 0 && *edge <= edges[index - 1]) {
            return Err(ClusterError::InvalidEdge { axis, index });
        }
    }
    Ok(())
}

/// Bin of `value` along an axis, or None outside the edges
fn bin(edges: &[f64], value: f64) -> Option<usize> {
    let first = *edges.first()?;
    let last = *edges.last()?;
    if !(first..=last).contains(&value) {
        return None;
    }
    let upper = edges.partition_point(|&edge| edge <= value);
    Some(upper.saturating_sub(1).min(edges.len() - 2))
}
