//! Grid-accelerated hierarchical clustering of 2D points
//!
//! Points close to each other are merged greedily, closest pair first, while
//! the search for neighbours is restricted to adjacent cells of a grid.
pub mod cluster;

pub use cluster::{
    Cluster, ClusterError, ClusterId, EuclideanDistance, GridClustering, Metric, Point,
    ScaledDistance,
};
