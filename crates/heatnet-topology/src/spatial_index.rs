//! Nearest-street queries over the reference street layer.
//!
//! Every street centerline is broken into its line pieces, which are
//! bulk-loaded into an R\*-tree. A query walks the tree's
//! nearest-neighbor iterator, so cost is logarithmic in the number of
//! pieces instead of a full scan of the layer.
//!
//! Ties between equidistant streets resolve to the lowest
//! `(street, segment)` index, i.e. the first piece in input order.

use geo::{Closest, ClosestPoint, Line};
use rstar::{PointDistance, RTree};
use rstar::primitives::GeomWithData;

use crate::types::{Point, Segment, StreetLayer};

/// Convert a topology `Point` to a `geo::Coord`.
const fn point_to_coord(p: Point) -> geo::Coord<f64> {
    geo::Coord { x: p.x, y: p.y }
}

/// Convert a `geo::Coord` back to a topology `Point`.
const fn coord_to_point(c: geo::Coord<f64>) -> Point {
    Point::new(c.x, c.y)
}

/// Identifies one line piece of the street layer.
///
/// `(street, segment)`: the piece from vertex `segment` to
/// `segment + 1` of street `street`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct PieceId {
    street: usize,
    segment: usize,
}

/// A `geo::Line` tagged with its [`PieceId`].
type IndexedPiece = GeomWithData<Line<f64>, PieceId>;

/// The closest street to a query point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreetHit {
    /// Index of the street in the [`StreetLayer`].
    pub street: usize,
    /// Index of the line piece within that street.
    pub segment: usize,
    /// Closest point on the street.
    pub point: Point,
    /// Euclidean distance from the query to `point`.
    pub distance: f64,
}

/// Read-only nearest-feature index over a [`StreetLayer`].
///
/// Empty and invalid streets are left out of the index and counted in
/// [`skipped_streets`](Self::skipped_streets).
#[derive(Debug)]
pub struct StreetIndex {
    tree: RTree<IndexedPiece>,
    skipped_streets: usize,
}

impl StreetIndex {
    /// Build the index from a street layer.
    #[must_use]
    pub fn new(layer: &StreetLayer) -> Self {
        let mut skipped_streets = 0;
        let mut pieces = Vec::new();

        for (street, polyline) in layer.streets().iter().enumerate() {
            if polyline.is_degenerate() {
                log::warn!(
                    "skipping degenerate street {street} ({} points)",
                    polyline.len()
                );
                skipped_streets += 1;
                continue;
            }
            let pts = polyline.points();
            pieces.extend(pts.windows(2).enumerate().map(|(segment, pair)| {
                GeomWithData::new(
                    Line::new(point_to_coord(pair[0]), point_to_coord(pair[1])),
                    PieceId { street, segment },
                )
            }));
        }

        Self {
            tree: RTree::bulk_load(pieces),
            skipped_streets,
        }
    }

    /// Returns `true` if no usable street geometry was indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Number of indexed line pieces.
    #[must_use]
    pub fn piece_count(&self) -> usize {
        self.tree.size()
    }

    /// Number of streets left out because they were empty or invalid.
    #[must_use]
    pub const fn skipped_streets(&self) -> usize {
        self.skipped_streets
    }

    /// Find the street closest to `query`.
    ///
    /// Returns `None` only when the index is empty or the query itself
    /// has non-finite coordinates.
    #[must_use]
    pub fn nearest(&self, query: Point) -> Option<StreetHit> {
        if !query.is_finite() {
            return None;
        }
        let query_pt = geo::Point::from(point_to_coord(query));

        // The iterator yields pieces in non-decreasing distance order, so
        // every tie with the first hit follows it directly.
        let mut iter = self.tree.nearest_neighbor_iter(&query_pt);
        let mut best = iter.next()?;
        let best_d2 = best.distance_2(&query_pt);
        for candidate in iter {
            if candidate.distance_2(&query_pt) > best_d2 {
                break;
            }
            if candidate.data < best.data {
                best = candidate;
            }
        }

        let point = coord_to_point(closest_coord_on_line(best.geom(), &query_pt));
        Some(StreetHit {
            street: best.data.street,
            segment: best.data.segment,
            point,
            distance: query.distance(point),
        })
    }

    /// Find the street closest to the midpoint of `segment`.
    #[must_use]
    pub fn nearest_to_midpoint(&self, segment: &Segment) -> Option<StreetHit> {
        self.nearest(segment.midpoint())
    }
}

/// Find the closest point on a `geo::Line` to a query `geo::Point`.
fn closest_coord_on_line(line: &Line<f64>, query: &geo::Point<f64>) -> geo::Coord<f64> {
    match line.closest_point(query) {
        Closest::Intersection(p) | Closest::SinglePoint(p) => p.into(),
        Closest::Indeterminate => line.start,
    }
}
