use super::point::Point;

/// Metric measuring the distance between two points in the plane
///
/// Any `Fn(&Point, &Point) -> f64` closure is a metric. The engine only
/// compares distances, so the result needs to be non-negative and monotone
/// in the true distance, not normalized.
pub trait Metric {
    fn distance(&self, a: &Point, b: &Point) -> f64;
}

impl<F> Metric for F
where
    F: Fn(&Point, &Point) -> f64,
{
    fn distance(&self, a: &Point, b: &Point) -> f64 {
        self(a, b)
    }
}

/// Plain Euclidean distance
#[derive(Debug, Clone, Copy, Default)]
pub struct EuclideanDistance;

impl Metric for EuclideanDistance {
    fn distance(&self, a: &Point, b: &Point) -> f64 {
        euclidean(a, b)
    }
}

/// Euclidean distance after scaling each axis
///
/// Used when x and y carry different units, e.g. m/z against retention time.
#[derive(Debug, Clone, Copy)]
pub struct ScaledDistance {
    pub scale_x: f64,
    pub scale_y: f64,
}

impl ScaledDistance {
    pub fn new(scale_x: f64, scale_y: f64) -> Self {
        ScaledDistance { scale_x, scale_y }
    }
}

impl Default for ScaledDistance {
    fn default() -> Self {
        ScaledDistance::new(1.0, 1.0)
    }
}

impl Metric for ScaledDistance {
    fn distance(&self, a: &Point, b: &Point) -> f64 {
        let dx = (a.0[0] - b.0[0]) * self.scale_x;
        let dy = (a.0[1] - b.0[1]) * self.scale_y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Euclidean distance between two points
pub fn euclidean(a: &Point, b: &Point) -> f64 {
    let v1 = a.0[0] - b.0[0];
    let v2 = a.0[1] - b.0[1];

    (v1 * v1 + v2 * v2).sqrt()
}
