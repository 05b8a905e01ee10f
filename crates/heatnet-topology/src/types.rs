//! Shared types for the heatnet topology synthesis pipeline.

use serde::{Deserialize, Serialize};

/// A 2D point in a planar projected coordinate system.
///
/// Coordinates are in the linear unit of the projection (meters in the
/// usual deployment). Points are plain values: they are compared by
/// coordinate equality or by a distance threshold, never by identity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Easting.
    pub x: f64,
    /// Northing.
    pub y: f64,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance to another point.
    ///
    /// Avoids the square root for comparison purposes.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx.mul_add(dx, dy * dy)
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        self.distance_squared(other).sqrt()
    }

    /// Returns `true` if both coordinates are finite.
    #[must_use]
    pub const fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// The point `distance` units from `self` in the direction of `towards`.
    ///
    /// Returns `self` when the two points coincide.
    #[must_use]
    pub fn step_towards(self, towards: Self, distance: f64) -> Self {
        let length = self.distance(towards);
        if length == 0.0 {
            return self;
        }
        let t = distance / length;
        Self::new(
            t.mul_add(towards.x - self.x, self.x),
            t.mul_add(towards.y - self.y, self.y),
        )
    }
}

/// One candidate pipe: a straight connection between two points.
///
/// Undirected for weight purposes; `start`/`end` orientation is kept
/// only so exports render segments the way they were produced.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// First endpoint.
    pub start: Point,
    /// Second endpoint.
    pub end: Point,
}

impl Segment {
    /// Create a new segment.
    #[must_use]
    pub const fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }

    /// Euclidean length of the segment.
    #[must_use]
    pub fn length(&self) -> f64 {
        self.start.distance(self.end)
    }

    /// The point halfway between `start` and `end`.
    #[must_use]
    pub fn midpoint(&self) -> Point {
        Point::new(
            (self.start.x + self.end.x) / 2.0,
            (self.start.y + self.end.y) / 2.0,
        )
    }
}

/// A sequence of connected points, e.g. one street centerline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polyline(Vec<Point>);

impl Polyline {
    /// Create a new polyline from a vector of points.
    #[must_use]
    pub const fn new(points: Vec<Point>) -> Self {
        Self(points)
    }

    /// Returns `true` if the polyline has no points.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of points in the polyline.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns a slice of all points.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.0
    }

    /// A polyline can be queried for distances only if it has at least
    /// one line piece and every coordinate is finite.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.0.len() < 2 || self.0.iter().any(|p| !p.is_finite())
    }
}

/// The read-only reference street layer.
///
/// Loaded once per run by the caller. The core only ever borrows it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreetLayer(Vec<Polyline>);

impl StreetLayer {
    /// Create a street layer from street centerlines.
    #[must_use]
    pub const fn new(streets: Vec<Polyline>) -> Self {
        Self(streets)
    }

    /// Returns `true` if the layer contains no streets.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of streets, including degenerate ones.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// All street centerlines in input order.
    #[must_use]
    pub fn streets(&self) -> &[Polyline] {
        &self.0
    }
}

impl From<Vec<Polyline>> for StreetLayer {
    fn from(streets: Vec<Polyline>) -> Self {
        Self::new(streets)
    }
}

/// An ordered sequence of segments forming a spanning tree over a point set.
///
/// This is the artifact the alignment loop rewrites on every pass and
/// the final output of [`synthesize`](crate::synthesize).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkTree(Vec<Segment>);

impl NetworkTree {
    /// Create a tree from segments.
    #[must_use]
    pub const fn new(segments: Vec<Segment>) -> Self {
        Self(segments)
    }

    /// Returns `true` if the tree has no segments.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of segments.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns a slice of all segments.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    /// Consumes the tree and returns the underlying segments.
    #[must_use]
    pub fn into_segments(self) -> Vec<Segment> {
        self.0
    }

    /// Sum of all segment lengths (the total pipe length).
    #[must_use]
    pub fn total_length(&self) -> f64 {
        self.0.iter().map(Segment::length).sum()
    }

    /// Every segment endpoint, `start` then `end`, in segment order.
    ///
    /// Shared endpoints appear once per segment that touches them.
    #[must_use]
    pub fn endpoints(&self) -> Vec<Point> {
        self.0.iter().flat_map(|s| [s.start, s.end]).collect()
    }
}

/// Configuration for the topology synthesis pipeline.
///
/// All distances share the linear unit of the input coordinates.
/// Defaults match the reference deployment, which works in meters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopologyConfig {
    /// Whether to run the snapping stage before building the first tree.
    pub snap: bool,

    /// Snap radius: points farther than this from every street are left
    /// unconnected.
    pub max_distance: f64,

    /// Spacing of the intermediate points inserted between a point and
    /// its projection onto the nearest street.
    pub point_interval: f64,

    /// Clustering radius: points closer than this are merged into their
    /// centroid.
    pub merge_threshold: f64,

    /// Maximum allowed distance between a segment midpoint and the
    /// street layer before the segment is split.
    pub alignment_threshold: f64,

    /// Hard cap on alignment passes.
    pub max_iterations: usize,

    /// Number of consecutive passes without residual improvement after
    /// which the alignment loop gives up.
    pub stall_iterations: usize,

    /// Largest point set snapping may produce and the MST may run on.
    pub max_points: usize,
}

impl TopologyConfig {
    /// Default for [`snap`](Self::snap).
    pub const DEFAULT_SNAP: bool = true;
    /// Default for [`max_distance`](Self::max_distance).
    pub const DEFAULT_MAX_DISTANCE: f64 = 200.0;
    /// Default for [`point_interval`](Self::point_interval).
    pub const DEFAULT_POINT_INTERVAL: f64 = 10.0;
    /// Default for [`merge_threshold`](Self::merge_threshold).
    pub const DEFAULT_MERGE_THRESHOLD: f64 = 10.0;
    /// Default for [`alignment_threshold`](Self::alignment_threshold).
    pub const DEFAULT_ALIGNMENT_THRESHOLD: f64 = 10.0;
    /// Default for [`max_iterations`](Self::max_iterations).
    pub const DEFAULT_MAX_ITERATIONS: usize = 100;
    /// Default for [`stall_iterations`](Self::stall_iterations).
    pub const DEFAULT_STALL_ITERATIONS: usize = 10;
    /// Default for [`max_points`](Self::max_points).
    pub const DEFAULT_MAX_POINTS: usize = 20_000;

    /// Check that every distance is finite and strictly positive and that
    /// the iteration limits are non-zero.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::InvalidConfig`] naming the first offending
    /// field.
    pub fn validate(&self) -> Result<(), TopologyError> {
        let distances = [
            ("max_distance", self.max_distance),
            ("point_interval", self.point_interval),
            ("merge_threshold", self.merge_threshold),
            ("alignment_threshold", self.alignment_threshold),
        ];
        for (name, value) in distances {
            if !value.is_finite() || value <= 0.0 {
                return Err(TopologyError::InvalidConfig(format!(
                    "{name} must be finite and positive, got {value}"
                )));
            }
        }
        if self.max_iterations == 0 {
            return Err(TopologyError::InvalidConfig(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        if self.stall_iterations == 0 {
            return Err(TopologyError::InvalidConfig(
                "stall_iterations must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            snap: Self::DEFAULT_SNAP,
            max_distance: Self::DEFAULT_MAX_DISTANCE,
            point_interval: Self::DEFAULT_POINT_INTERVAL,
            merge_threshold: Self::DEFAULT_MERGE_THRESHOLD,
            alignment_threshold: Self::DEFAULT_ALIGNMENT_THRESHOLD,
            max_iterations: Self::DEFAULT_MAX_ITERATIONS,
            stall_iterations: Self::DEFAULT_STALL_ITERATIONS,
            max_points: Self::DEFAULT_MAX_POINTS,
        }
    }
}

/// Result of running the full synthesis pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkResult {
    /// The synthesized network. When `converged` is `false` this is the
    /// best tree the alignment loop found.
    pub tree: NetworkTree,

    /// Whether every segment midpoint ended up within the alignment
    /// threshold of the street layer.
    pub converged: bool,

    /// Number of alignment passes run.
    pub iterations: usize,

    /// Sum of midpoint distances beyond the alignment threshold for the
    /// returned tree. Zero when converged.
    pub residual: f64,

    /// Input points that were farther than the snap radius from every
    /// street and were left unconnected to the street layer.
    pub unreachable: Vec<Point>,

    /// Input points dropped because of non-finite coordinates.
    pub skipped_points: usize,

    /// Streets ignored because they were empty or invalid.
    pub skipped_streets: usize,
}

/// Errors that abort a synthesis run.
///
/// Per-feature geometry problems never surface here: they are skipped,
/// logged, and counted in [`NetworkResult`].
#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize, Deserialize)]
pub enum TopologyError {
    /// Pipeline configuration is invalid.
    #[error("invalid topology configuration: {0}")]
    InvalidConfig(String),

    /// The point set would grow past [`TopologyConfig::max_points`].
    #[error("too many points for network synthesis: {count} (limit {limit})")]
    TooManyPoints {
        /// Planned point count after snapping, or the count after
        /// merging.
        count: usize,
        /// The configured [`TopologyConfig::max_points`].
        limit: usize,
    },
}
