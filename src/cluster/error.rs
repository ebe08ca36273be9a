use thiserror::Error;

use super::point::ClusterId;

/// Errors raised while configuring or running the clustering engine
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClusterError {
    /// A grid axis needs at least two edges to form one bin
    #[error("grid along {axis} needs at least two edges, got {len}")]
    TooFewEdges { axis: char, len: usize },

    /// Grid edges must be finite and strictly increasing
    #[error("grid edge {index} along {axis} is not finite or not strictly increasing")]
    InvalidEdge { axis: char, index: usize },

    /// Uniform edges need a finite, positive step
    #[error("grid step must be finite and positive, got {0}")]
    InvalidStep(f64),

    #[error("cannot build grid edges over [{min}, {max}]")]
    InvalidRange { min: f64, max: f64 },

    /// The step is too small to tile the range with at most `limit` bins
    #[error("grid step {step} over [{min}, {max}] needs more than {limit} bins")]
    TooManyBins {
        min: f64,
        max: f64,
        step: f64,
        limit: usize,
    },

    /// The grid does not cover this position
    #[error("position ({x}, {y}) lies outside the grid")]
    OutsideGrid { x: f64, y: f64 },

    #[error("point {index} has non-finite coordinates ({x}, {y})")]
    NonFinitePoint { index: usize, x: f64, y: f64 },

    /// Parallel input arrays must have one entry per point
    #[error("{name} has {actual} entries, expected {expected}")]
    LengthMismatch {
        name: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Two clusters passed the merge veto but disagree on property A
    #[error("clusters {first} and {second} disagree on property A ({a} vs {b})")]
    PropertyMismatch {
        first: ClusterId,
        second: ClusterId,
        a: i32,
        b: i32,
    },

    /// A distance record names a cluster that is no longer active
    #[error("cluster {0} is not active")]
    MissingCluster(ClusterId),

    /// Active clusters remain but no distance record is queued
    #[error("{0} active clusters have no queued nearest neighbour")]
    EmptyQueue(usize),
}

pub type Result<T> = std::result::Result<T, ClusterError>;
