//! Points, bounding boxes and the cluster entity

/// Identifier of a cluster; singleton clusters take the index of their point
pub type ClusterId = usize;

/// Marker for an unset property in caller-supplied property arrays
pub const UNSET_PROPERTY: i32 = -1;

/// Point represents a 2D coordinate
///
/// The point is stored as [x, y] where:
/// - `[0]` is x
/// - `[1]` is y
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point(pub [f64; 2]);

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Point([x, y])
    }

    pub fn x(&self) -> f64 {
        self.0[0]
    }

    pub fn y(&self) -> f64 {
        self.0[1]
    }

    /// Checks if this point is less than or equal to another point
    /// (a <= b)
    pub fn less_eq(&self, b: &Point) -> bool {
        self.0[0] <= b.0[0] && self.0[1] <= b.0[1]
    }

    /// Checks if this point is greater than or equal to another point
    /// (a >= b)
    pub fn greater_eq(&self, b: &Point) -> bool {
        self.0[0] >= b.0[0] && self.0[1] >= b.0[1]
    }

    /// Component-wise clamp into `[min, max]`
    fn clamp(&self, min: &Point, max: &Point) -> Point {
        Point([
            self.0[0].clamp(min.0[0], max.0[0]),
            self.0[1].clamp(min.0[1], max.0[1]),
        ])
    }
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rectangle {
    min: Point,
    max: Point,
}

impl Rectangle {
    /// Box spanning two corners, given in any order
    pub fn new(a: Point, b: Point) -> Self {
        Rectangle {
            min: Point([a.0[0].min(b.0[0]), a.0[1].min(b.0[1])]),
            max: Point([a.0[0].max(b.0[0]), a.0[1].max(b.0[1])]),
        }
    }

    /// Degenerate box at a single point
    pub fn at(p: Point) -> Self {
        Rectangle { min: p, max: p }
    }

    pub fn min(&self) -> Point {
        self.min
    }

    pub fn max(&self) -> Point {
        self.max
    }

    #[cfg(test)]
    pub fn width(&self) -> f64 {
        self.max.0[0] - self.min.0[0]
    }

    pub fn height(&self) -> f64 {
        self.max.0[1] - self.min.0[1]
    }

    pub fn enlarge(&mut self, p: &Point) {
        for j in 0..2 {
            if p.0[j] < self.min.0[j] {
                self.min.0[j] = p.0[j];
            }
            if p.0[j] > self.max.0[j] {
                self.max.0[j] = p.0[j];
            }
        }
    }

    /// Smallest box containing both boxes
    pub fn union(&self, other: &Rectangle) -> Rectangle {
        let mut result = *self;
        result.enlarge(&other.min);
        result.enlarge(&other.max);
        result
    }

    pub fn contains(&self, p: &Point) -> bool {
        p.greater_eq(&self.min) && p.less_eq(&self.max)
    }

    /// Checks if `inner` lies entirely inside this box
    #[cfg(test)]
    pub fn contains_rect(&self, inner: &Rectangle) -> bool {
        inner.min.greater_eq(&self.min) && inner.max.less_eq(&self.max)
    }

    /// Closed-interval overlap of the x-extents
    pub fn overlaps_x(&self, other: &Rectangle) -> bool {
        self.min.0[0] <= other.max.0[0] && other.min.0[0] <= self.max.0[0]
    }
}

/// Cluster is a group of input points with a centroid and bounding box
///
/// Property A must be shared by all members, properties B (one entry per
/// member) must be pairwise different. `None` means unset.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    centroid: Point,
    bounding_box: Rectangle,
    points: Vec<usize>,
    property_a: Option<i32>,
    properties_b: Vec<Option<i32>>,
}

/// Converts a caller-supplied property into its optional form
pub fn property(value: i32) -> Option<i32> {
    if value == UNSET_PROPERTY {
        None
    } else {
        Some(value)
    }
}

impl Cluster {
    pub fn new(
        centroid: Point,
        bounding_box: Rectangle,
        points: Vec<usize>,
        property_a: Option<i32>,
        properties_b: Vec<Option<i32>>,
    ) -> Self {
        Cluster {
            centroid,
            bounding_box,
            points,
            property_a,
            properties_b,
        }
    }

    /// Cluster holding the single point `index` located at `position`
    pub fn singleton(
        index: usize,
        position: Point,
        property_a: Option<i32>,
        property_b: Option<i32>,
    ) -> Self {
        Cluster::new(
            position,
            Rectangle::at(position),
            vec![index],
            property_a,
            vec![property_b],
        )
    }

    pub fn centroid(&self) -> &Point {
        &self.centroid
    }

    pub fn bounding_box(&self) -> &Rectangle {
        &self.bounding_box
    }

    pub fn points(&self) -> &[usize] {
        &self.points
    }

    pub fn property_a(&self) -> Option<i32> {
        self.property_a
    }

    pub fn properties_b(&self) -> &[Option<i32>] {
        &self.properties_b
    }

    /// Number of member points
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Builds the cluster containing the members of both clusters
    ///
    /// The centroid is the point-count weighted mean of both centroids and the
    /// bounding box the union of both boxes. Property A is taken from `self`
    /// when set, otherwise from `other`; callers check for conflicts first.
    pub fn merged(&self, other: &Cluster) -> Cluster {
        let n1 = self.points.len() as f64;
        let n2 = other.points.len() as f64;
        let bounding_box = self.bounding_box.union(&other.bounding_box);

        let mut centroid = Point([0.0, 0.0]);
        for j in 0..2 {
            centroid.0[j] = (self.centroid.0[j] * n1 + other.centroid.0[j] * n2) / (n1 + n2);
        }
        // keep rounding from pushing the centroid out of the box
        let centroid = centroid.clamp(&bounding_box.min, &bounding_box.max);

        let mut points = Vec::with_capacity(self.points.len() + other.points.len());
        points.extend_from_slice(&self.points);
        points.extend_from_slice(&other.points);

        let mut properties_b =
            Vec::with_capacity(self.properties_b.len() + other.properties_b.len());
        properties_b.extend_from_slice(&self.properties_b);
        properties_b.extend_from_slice(&other.properties_b);

        Cluster {
            centroid,
            bounding_box,
            points,
            property_a: self.property_a.or(other.property_a),
            properties_b,
        }
    }

    /// Same cluster with property A replaced
    pub fn with_property_a(mut self, property_a: Option<i32>) -> Cluster {
        self.property_a = property_a;
        self
    }

    /// Checks whether merging with `other` would break the property rules
    ///
    /// Returns true (veto) if both properties A are set and differ, or if
    /// both clusters carry set properties B and share at least one value.
    pub fn merge_veto(&self, other: &Cluster) -> bool {
        if let (Some(a1), Some(a2)) = (self.property_a, other.property_a) {
            if a1 != a2 {
                return true;
            }
        }

        let mut b1: Vec<i32> = self.properties_b.iter().flatten().copied().collect();
        if b1.is_empty() {
            return false;
        }
        b1.sort_unstable();

        other
            .properties_b
            .iter()
            .flatten()
            .any(|b| b1.binary_search(b).is_ok())
    }
}
