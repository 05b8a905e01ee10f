//! Point snapping: pull free-floating points toward the street layer.
//!
//! For each input point the nearest street is looked up and, when it is
//! within the snap radius, a chain of evenly spaced intermediate points
//! is laid along the straight connector between the point and its
//! projection onto the street. The connector endpoints themselves are
//! not emitted; the following MST stage threads the tree through the
//! chain toward the street.
//!
//! This is the first stage of [`synthesize`](crate::synthesize), before
//! merging and MST construction.

use crate::spatial_index::StreetIndex;
use crate::types::{Point, TopologyError};

/// Output of [`snap_points`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapOutcome {
    /// Valid input points in input order, followed by the synthesized
    /// intermediate points.
    pub points: Vec<Point>,
    /// Input points farther than the snap radius from every street.
    ///
    /// These are still part of [`points`](Self::points); they are just not
    /// connected toward any street.
    pub unreachable: Vec<Point>,
    /// Number of input points dropped for having non-finite coordinates.
    pub skipped: usize,
    /// Number of intermediate points added by snapping.
    pub inserted: usize,
}

/// Insert intermediate points between each point and the nearest street.
///
/// Points within `max_distance` of a street get intermediate points at
/// `point_interval`, `2 * point_interval`, ... along the connector to
/// their projection, stopping before the projection itself. Points
/// already lying on a street get nothing. Points out of range are kept
/// as they are and reported in [`SnapOutcome::unreachable`].
///
/// With an empty street layer every point passes through unchanged.
///
/// # Errors
///
/// Returns [`TopologyError::TooManyPoints`] if the valid points plus
/// the planned intermediates would exceed `max_points`. The count is
/// taken before any intermediate point is created.
pub fn snap_points(
    points: &[Point],
    index: &StreetIndex,
    max_distance: f64,
    point_interval: f64,
    max_points: usize,
) -> Result<SnapOutcome, TopologyError> {
    let mut outcome = SnapOutcome::default();
    let mut connectors = Vec::new();

    if index.is_empty() && !points.is_empty() {
        log::debug!("street layer is empty; snapping passes points through");
    }

    for (i, &point) in points.iter().enumerate() {
        if !point.is_finite() {
            log::warn!("skipping point {i} with non-finite coordinates");
            outcome.skipped += 1;
            continue;
        }
        outcome.points.push(point);

        let Some(hit) = index.nearest(point) else {
            continue;
        };
        if hit.distance == 0.0 {
            continue;
        }
        if hit.distance > max_distance {
            log::warn!(
                "point {i} ({}, {}) is {:.2} from the nearest street, beyond the snap radius {max_distance}",
                point.x,
                point.y,
                hit.distance,
            );
            outcome.unreachable.push(point);
            continue;
        }

        let count = intermediate_count(hit.distance, point_interval);
        outcome.inserted = outcome.inserted.saturating_add(count);
        connectors.push((point, hit.point, count));
    }

    let planned = outcome.points.len().saturating_add(outcome.inserted);
    if planned > max_points {
        return Err(TopologyError::TooManyPoints {
            count: planned,
            limit: max_points,
        });
    }

    outcome.points.reserve(outcome.inserted);
    for (from, to, count) in connectors {
        outcome
            .points
            .extend(intermediate_points(from, to, point_interval, count));
    }
    Ok(outcome)
}

/// Pass points through without snapping, dropping non-finite ones.
///
/// Used when snapping is disabled; the outcome has the same shape as
/// [`snap_points`] with nothing inserted and nothing unreachable.
#[must_use = "returns the filtered point collection"]
pub fn pass_through(points: &[Point]) -> SnapOutcome {
    let mut outcome = SnapOutcome::default();
    for (i, &point) in points.iter().enumerate() {
        if point.is_finite() {
            outcome.points.push(point);
        } else {
            log::warn!("skipping point {i} with non-finite coordinates");
            outcome.skipped += 1;
        }
    }
    outcome
}

/// How many multiples of `interval` lie strictly inside `(0, length)`.
fn intermediate_count(length: f64, interval: f64) -> usize {
    let steps = (length / interval).floor();
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let count = steps as usize;
    // A multiple landing exactly on the projection is not interior.
    if steps * interval < length {
        count
    } else {
        count.saturating_sub(1)
    }
}

/// The first `count` points spaced `interval` apart from `from` toward
/// `to`, excluding `from` itself.
///
fn intermediate_points(
    from: Point,
    to: Point,
    interval: f64,
    count: usize,
) -> impl Iterator<Item = Point> {
    (1..=count).map(move |k| {
        #[allow(clippy::cast_precision_loss)]
        let along = interval * k as f64;
        from.step_towards(to, along)
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{Polyline, StreetLayer};

    fn single_street_index() -> StreetIndex {
        StreetIndex::new(&StreetLayer::new(vec![Polyline::new(vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
        ])]))
    }

    fn assert_close(a: Point, b: Point) {
        assert!(
            a.distance(b) < 1e-9,
            "expected ({}, {}), got ({}, {})",
            b.x,
            b.y,
            a.x,
            a.y
        );
    }

    #[test]
    fn inserts_chain_toward_projection() {
        let index = single_street_index();
        let outcome = snap_points(&[Point::new(5.0, 5.0)], &index, 10.0, 2.0, usize::MAX).unwrap();

        // floor(5 / 2) = 2 intermediate points at 2 and 4 along the connector.
        assert_eq!(outcome.points.len(), 3);
        assert_eq!(outcome.inserted, 2);
        assert_eq!(outcome.points[0], Point::new(5.0, 5.0));
        assert_close(outcome.points[1], Point::new(5.0, 3.0));
        assert_close(outcome.points[2], Point::new(5.0, 1.0));
        assert!(outcome.unreachable.is_empty());
    }

    #[test]
    fn exact_multiple_excludes_projection() {
        let index = single_street_index();
        // Distance 4, interval 2: only the point at 2 is strictly interior.
        let outcome = snap_points(&[Point::new(5.0, 4.0)], &index, 10.0, 2.0, usize::MAX).unwrap();
        assert_eq!(outcome.points.len(), 2);
        assert_close(outcome.points[1], Point::new(5.0, 2.0));
    }

    #[test]
    fn interval_longer_than_connector_inserts_nothing() {
        let index = single_street_index();
        let outcome = snap_points(&[Point::new(5.0, 1.5)], &index, 10.0, 2.0, usize::MAX).unwrap();
        assert_eq!(outcome.points, vec![Point::new(5.0, 1.5)]);
    }

    #[test]
    fn point_on_street_passes_through() {
        let index = single_street_index();
        let outcome = snap_points(&[Point::new(3.0, 0.0)], &index, 10.0, 0.5, usize::MAX).unwrap();
        assert_eq!(outcome.points, vec![Point::new(3.0, 0.0)]);
        assert!(outcome.unreachable.is_empty());
    }

    #[test]
    fn out_of_range_point_is_reported() {
        let index = single_street_index();
        let outcome = snap_points(
            &[Point::new(5.0, 50.0), Point::new(5.0, 3.0)],
            &index,
            10.0,
            1.0,
            usize::MAX,
        )
        .unwrap();
        assert_eq!(outcome.unreachable, vec![Point::new(5.0, 50.0)]);
        // Both originals plus two intermediates for the reachable point.
        assert_eq!(outcome.points.len(), 4);
        assert_eq!(outcome.points[0], Point::new(5.0, 50.0));
        assert_eq!(outcome.points[1], Point::new(5.0, 3.0));
    }

    #[test]
    fn distance_equal_to_radius_is_reachable() {
        let index = single_street_index();
        let outcome = snap_points(&[Point::new(5.0, 10.0)], &index, 10.0, 5.0, usize::MAX).unwrap();
        assert!(outcome.unreachable.is_empty());
        assert_eq!(outcome.points.len(), 2);
    }

    #[test]
    fn empty_layer_passes_points_through() {
        let index = StreetIndex::new(&StreetLayer::default());
        let pts = vec![Point::new(0.0, 0.0), Point::new(10.0, 10.0)];
        let outcome = snap_points(&pts, &index, 10.0, 1.0, usize::MAX).unwrap();
        assert_eq!(outcome.points, pts);
        assert!(outcome.unreachable.is_empty());
    }

    #[test]
    fn non_finite_points_are_skipped() {
        let index = single_street_index();
        let outcome = snap_points(
            &[Point::new(f64::NAN, 1.0), Point::new(5.0, 0.0)],
            &index,
            10.0,
            1.0,
            usize::MAX,
        )
        .unwrap();
        assert_eq!(outcome.skipped, 1);
        assert_eq!(outcome.points, vec![Point::new(5.0, 0.0)]);
    }

    #[test]
    fn pass_through_only_filters() {
        let outcome = pass_through(&[
            Point::new(5.0, 5.0),
            Point::new(f64::INFINITY, 0.0),
            Point::new(1.0, 2.0),
        ]);
        assert_eq!(outcome.points, vec![Point::new(5.0, 5.0), Point::new(1.0, 2.0)]);
        assert_eq!(outcome.skipped, 1);
        assert_eq!(outcome.inserted, 0);
        assert!(outcome.unreachable.is_empty());
    }

    #[test]
    fn point_limit_is_checked_before_inserting() {
        let index = single_street_index();
        // Five points 150 from the street at interval 1e-4 would plan
        // 7.5 million intermediates.
        let pts: Vec<Point> = (0..5).map(|i| Point::new(f64::from(i), 150.0)).collect();
        let err = snap_points(&pts, &index, 200.0, 1e-4, 10).unwrap_err();
        assert!(matches!(
            err,
            TopologyError::TooManyPoints { count, limit: 10 } if count > 7_000_000
        ));
    }

    #[test]
    fn point_limit_counts_originals_and_intermediates() {
        let index = single_street_index();
        // One original plus floor(5 / 2) = 2 intermediates.
        let pts = [Point::new(5.0, 5.0)];
        let outcome = snap_points(&pts, &index, 10.0, 2.0, 3).unwrap();
        assert_eq!(outcome.points.len(), 3);
        assert!(matches!(
            snap_points(&pts, &index, 10.0, 2.0, 2),
            Err(TopologyError::TooManyPoints { count: 3, limit: 2 })
        ));
    }

    #[test]
    fn intermediate_count_excludes_projection() {
        assert_eq!(intermediate_count(5.0, 2.0), 2);
        assert_eq!(intermediate_count(4.0, 2.0), 1);
        assert_eq!(intermediate_count(1.5, 2.0), 0);
        assert_eq!(intermediate_count(10.0, 5.0), 1);
    }

    #[test]
    fn empty_input() {
        let outcome = snap_points(&[], &single_street_index(), 10.0, 1.0, usize::MAX).unwrap();
        assert_eq!(outcome, SnapOutcome::default());
    }
}
