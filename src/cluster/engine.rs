//! Grid-accelerated hierarchical clustering
//!
//! Optimized for large data sets containing many small clusters, i.e. clusters
//! much smaller than the extent of the whole data set. The problem then falls
//! apart into many local problems, each solved on a cell and its neighbours of
//! a grid whose spacing reflects the typical cluster size.
//!
//! Each point can carry two properties A and B. All points in a cluster share
//! the same property A, and no two points in a cluster share a property B.
//!
//! Clustering outline:
//!
//! ```text
//! init
//!    one cluster per point, registered on the grid
//!    for each cluster C: find nearest legal neighbour in the 3x3 cells
//!       around C, queue (C, neighbour, distance) or finalize C
//!
//! cluster
//!    while active clusters remain
//!       pop the smallest (A, B, d), merge B into A
//!       drop B's record and every record pointing at A or B
//!       search again for A and for every cluster whose record was dropped
//! ```

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use log::{debug, trace};

use super::distance::Metric;
use super::error::{ClusterError, Result};
use super::grid::ClusteringGrid;
use super::point::{Cluster, ClusterId, Point, property};
use super::queue::{DistanceQueue, MinimumDistance};

/// Receives progress of a clustering run
///
/// `set` is called once per merge iteration with the number of clusters
/// that have left the active set.
pub trait ProgressSink {
    fn start(&mut self, total: usize);
    fn set(&mut self, done: usize);
    fn finish(&mut self);
}

/// Discards progress
impl ProgressSink for () {
    fn start(&mut self, _total: usize) {}
    fn set(&mut self, _done: usize) {}
    fn finish(&mut self) {}
}

/// 2D hierarchical clustering on a grid
pub struct GridClustering<M> {
    metric: M,
    grid: ClusteringGrid,
    /// clusters that may still merge
    clusters: BTreeMap<ClusterId, Cluster>,
    /// clusters without any legal neighbour
    clusters_final: BTreeMap<ClusterId, Cluster>,
    distances: DistanceQueue,
}

impl<M: Metric> GridClustering<M> {
    /// Sets up the clustering of points without properties
    ///
    /// # Arguments
    ///
    /// * `metric` - Distance between two points
    /// * `data_x`, `data_y` - Coordinates of the points
    /// * `grid_spacing_x`, `grid_spacing_y` - Bin edges of the grid
    pub fn new(
        metric: M,
        data_x: &[f64],
        data_y: &[f64],
        grid_spacing_x: Vec<f64>,
        grid_spacing_y: Vec<f64>,
    ) -> Result<Self> {
        let unset = vec![super::point::UNSET_PROPERTY; data_x.len()];
        Self::with_properties(
            metric,
            data_x,
            data_y,
            &unset,
            &unset,
            grid_spacing_x,
            grid_spacing_y,
        )
    }

    /// Sets up the clustering of points with properties A and B
    ///
    /// Properties equal to [`UNSET_PROPERTY`](super::point::UNSET_PROPERTY)
    /// impose no constraint.
    pub fn with_properties(
        metric: M,
        data_x: &[f64],
        data_y: &[f64],
        properties_a: &[i32],
        properties_b: &[i32],
        grid_spacing_x: Vec<f64>,
        grid_spacing_y: Vec<f64>,
    ) -> Result<Self> {
        let n = data_x.len();
        for (name, len) in [
            ("data_y", data_y.len()),
            ("properties_a", properties_a.len()),
            ("properties_b", properties_b.len()),
        ] {
            if len != n {
                return Err(ClusterError::LengthMismatch {
                    name,
                    expected: n,
                    actual: len,
                });
            }
        }

        let mut engine = GridClustering {
            metric,
            grid: ClusteringGrid::new(grid_spacing_x, grid_spacing_y)?,
            clusters: BTreeMap::new(),
            clusters_final: BTreeMap::new(),
            distances: DistanceQueue::new(),
        };
        engine.init(data_x, data_y, properties_a, properties_b)?;
        Ok(engine)
    }

    fn init(
        &mut self,
        data_x: &[f64],
        data_y: &[f64],
        properties_a: &[i32],
        properties_b: &[i32],
    ) -> Result<()> {
        for (i, (&x, &y)) in data_x.iter().zip(data_y).enumerate() {
            if !x.is_finite() || !y.is_finite() {
                return Err(ClusterError::NonFinitePoint { index: i, x, y });
            }
            let position = Point([x, y]);
            let cell = self.grid.cell_of(&position)?;

            let cluster = Cluster::singleton(
                i,
                position,
                property(properties_a[i]),
                property(properties_b[i]),
            );
            self.clusters.insert(i, cluster);
            self.grid.register(cell, i);
        }

        let ids: Vec<ClusterId> = self.clusters.keys().copied().collect();
        for id in ids {
            if self.find_nearest_neighbour(id)?.is_none() {
                self.finalize(id)?;
            }
        }

        debug!(
            "initialized {} points: {} active, {} without neighbours",
            data_x.len(),
            self.clusters.len(),
            self.clusters_final.len()
        );
        Ok(())
    }

    /// Merges clusters until none has a legal neighbour left
    pub fn cluster(&mut self) -> Result<()> {
        self.cluster_with_progress(&mut ())
    }

    /// Same as [`cluster`](Self::cluster), reporting progress to `progress`
    pub fn cluster_with_progress<P: ProgressSink + ?Sized>(
        &mut self,
        progress: &mut P,
    ) -> Result<()> {
        let clusters_start = self.clusters.len();
        progress.start(clusters_start);

        let mut merges = 0usize;
        while !self.clusters.is_empty() {
            progress.set(clusters_start - self.clusters.len());

            let closest = self
                .distances
                .pop()
                .ok_or(ClusterError::EmptyQueue(self.clusters.len()))?;
            self.merge(closest)?;
            merges += 1;
        }

        progress.set(clusters_start);
        progress.finish();
        debug!(
            "clustering done: {} merges, {} final clusters",
            merges,
            self.clusters_final.len()
        );
        Ok(())
    }

    /// Merges the neighbour of `closest` into its cluster and updates every
    /// record that became stale
    fn merge(&mut self, closest: MinimumDistance) -> Result<()> {
        let id1 = closest.cluster();
        let id2 = closest.nearest_neighbour();

        let cluster1 = self
            .clusters
            .remove(&id1)
            .ok_or(ClusterError::MissingCluster(id1))?;
        let cluster2 = self
            .clusters
            .remove(&id2)
            .ok_or(ClusterError::MissingCluster(id2))?;

        // The veto was checked when the record was queued.
        if let (Some(a), Some(b)) = (cluster1.property_a(), cluster2.property_a()) {
            if a != b {
                return Err(ClusterError::PropertyMismatch {
                    first: id1,
                    second: id2,
                    a,
                    b,
                });
            }
        }
        let merged = cluster1.merged(&cluster2);
        trace!(
            "merge {} into {} at distance {}: {} points",
            id2,
            id1,
            closest.distance(),
            merged.len()
        );

        let cell1 = self.grid.cell_of(cluster1.centroid())?;
        let cell2 = self.grid.cell_of(cluster2.centroid())?;
        let cell_new = self.grid.cell_of(merged.centroid())?;
        self.grid.unregister(cell1, id1);
        self.grid.unregister(cell2, id2);
        self.grid.register(cell_new, id1);

        self.clusters.insert(id1, merged);

        // cluster 2 no longer exists, its own record goes without replacement
        self.distances.remove_for_cluster(id2);

        let mut to_update = BTreeSet::from([id1]);
        for stale in self
            .distances
            .remove_pointing_at(id1)
            .into_iter()
            .chain(self.distances.remove_pointing_at(id2))
        {
            to_update.insert(stale.cluster());
        }

        for id in to_update {
            if self.find_nearest_neighbour(id)?.is_none() {
                self.finalize(id)?;
            }
        }
        Ok(())
    }

    /// Searches the cell of cluster `id` and its eight neighbours for the
    /// closest cluster it may merge with, and queues the result
    ///
    /// Returns the neighbour found, or None if no legal neighbour exists.
    fn find_nearest_neighbour(&mut self, id: ClusterId) -> Result<Option<ClusterId>> {
        let cluster = self
            .clusters
            .get(&id)
            .ok_or(ClusterError::MissingCluster(id))?;
        let centre = cluster.centroid();
        let cell = self.grid.cell_of(centre)?;

        let mut nearest: Option<(ClusterId, f64)> = None;
        for other_id in self.grid.neighbourhood(cell) {
            if other_id == id {
                continue;
            }
            let other = self
                .clusters
                .get(&other_id)
                .ok_or(ClusterError::MissingCluster(other_id))?;
            let distance = self.metric.distance(centre, other.centroid());

            let closer = nearest.is_none_or(|(_, min_dist)| distance < min_dist);
            // clusters that may not merge are no neighbours
            if closer && !cluster.merge_veto(other) {
                nearest = Some((other_id, distance));
            }
        }

        Ok(nearest.map(|(neighbour, distance)| {
            self.distances
                .insert(MinimumDistance::new(id, neighbour, distance));
            neighbour
        }))
    }

    /// Moves cluster `id` from the active set to the final results
    fn finalize(&mut self, id: ClusterId) -> Result<()> {
        let cluster = self
            .clusters
            .remove(&id)
            .ok_or(ClusterError::MissingCluster(id))?;
        self.grid.unregister(self.grid.cell_of(cluster.centroid())?, id);
        self.clusters_final.insert(id, cluster);
        Ok(())
    }

    /// Merges final clusters further in y-direction
    ///
    /// Final clusters are binned along x only. Within each bin the clusters are
    /// sorted by ascending centroid y, and each adjacent pair whose bounding
    /// boxes overlap in x is merged. Pairs are judged on the boxes as they were
    /// before the sweep, and the sweep runs once; properties are not checked.
    pub fn extend_clusters_y(&mut self) -> Result<()> {
        let edges_y = self.grid.edges_y();
        let single_row = vec![edges_y[0], edges_y[edges_y.len() - 1]];
        let mut grid_x_only = ClusteringGrid::new(self.grid.edges_x().to_vec(), single_row)?;

        for (&id, cluster) in &self.clusters_final {
            grid_x_only.register(grid_x_only.cell_of(cluster.centroid())?, id);
        }

        let columns: Vec<Vec<ClusterId>> = grid_x_only
            .occupied_cells()
            .map(|(_, ids)| ids.to_vec())
            .filter(|ids| ids.len() > 1)
            .collect();

        let mut merges = 0usize;
        for ids in columns {
            let mut column: Vec<(ClusterId, Cluster)> = ids
                .into_iter()
                .filter_map(|id| self.clusters_final.get(&id).map(|c| (id, c.clone())))
                .collect();
            column.sort_by(|(_, a), (_, b)| a.centroid().y().total_cmp(&b.centroid().y()));

            // id currently holding the lower cluster of each pair
            let Some(mut lower_id) = column.first().map(|(id, _)| *id) else {
                continue;
            };
            for pair in column.windows(2) {
                let (_, lower) = &pair[0];
                let (upper_id, upper) = &pair[1];
                let upper_id = *upper_id;
                // a box lying inside the other's x-extent counts as overlapping
                if !lower.bounding_box().overlaps_x(upper.bounding_box()) {
                    lower_id = upper_id;
                    continue;
                }

                let current = self
                    .clusters_final
                    .remove(&lower_id)
                    .ok_or(ClusterError::MissingCluster(lower_id))?;
                let above = self
                    .clusters_final
                    .remove(&upper_id)
                    .ok_or(ClusterError::MissingCluster(upper_id))?;

                let property_a = if above.property_a() == current.property_a() {
                    above.property_a()
                } else {
                    None
                };
                let merged = above.merged(&current).with_property_a(property_a);
                trace!("extend {} into {}: {} points", lower_id, upper_id, merged.len());

                self.clusters_final.insert(upper_id, merged);
                lower_id = upper_id;
                merges += 1;
            }
        }

        debug!(
            "extension in y: {} merges, {} final clusters",
            merges,
            self.clusters_final.len()
        );
        Ok(())
    }

    /// Removes final clusters whose bounding box height is below `threshold_y`
    ///
    /// A NaN threshold removes nothing.
    pub fn remove_small_clusters_y(&mut self, threshold_y: f64) {
        let before = self.clusters_final.len();
        self.clusters_final.retain(|_, cluster| {
            cluster.bounding_box().height().partial_cmp(&threshold_y) != Some(Ordering::Less)
        });
        debug!(
            "removed {} clusters lower than {}",
            before - self.clusters_final.len(),
            threshold_y
        );
    }

    /// Final clusters by id
    pub fn results(&self) -> BTreeMap<ClusterId, Cluster> {
        self.clusters_final.clone()
    }

    /// Number of clusters that may still merge
    pub fn active_len(&self) -> usize {
        self.clusters.len()
    }

    /// Number of final clusters
    pub fn final_len(&self) -> usize {
        self.clusters_final.len()
    }
}
