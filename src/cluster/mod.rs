//! Package cluster implements hierarchical clustering of 2D points on a grid
pub mod distance;
pub mod engine;
pub mod error;
pub mod grid;
pub mod point;
pub mod queue;

#[cfg(test)]
mod engine_test;

pub use distance::{EuclideanDistance, Metric, ScaledDistance, euclidean};
pub use engine::{GridClustering, ProgressSink};
pub use error::{ClusterError, Result};
pub use grid::{CellIndex, ClusteringGrid, MAX_BINS, uniform_edges};
pub use point::{Cluster, ClusterId, Point, Rectangle, UNSET_PROPERTY};
pub use queue::{DistanceQueue, MinimumDistance};
