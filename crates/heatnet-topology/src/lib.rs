//! heatnet-topology: District heating network topology synthesis (sans-IO).
//!
//! Turns building and generator locations plus a street centerline
//! layer into a pipe network that follows the streets:
//! snap -> merge -> minimum spanning tree -> iterative street alignment.
//!
//! This crate has **no I/O dependencies**. It operates on in-memory
//! points and polylines and returns structured data. File formats live
//! in `heatnet-export`.

pub mod align;
pub mod diagnostics;
pub mod merge;
pub mod mst;
pub mod pipeline;
pub mod snap;
pub mod spatial_index;
pub mod types;

pub use align::{AlignOutcome, align};
pub use diagnostics::{Clock, NetworkDiagnostics, synthesize_with_diagnostics};
pub use merge::{merge_points, simplify};
pub use mst::build_mst;
pub use pipeline::Pipeline;
pub use snap::{SnapOutcome, snap_points};
pub use spatial_index::{StreetHit, StreetIndex};
pub use types::{
    NetworkResult, NetworkTree, Point, Polyline, Segment, StreetLayer, TopologyConfig,
    TopologyError,
};

/// Run the full topology synthesis pipeline.
///
/// # Pipeline steps
///
/// 1. Validate `config` and index the street layer
/// 2. Snap points toward the nearest street (optional)
/// 3. Merge near-coincident points
/// 4. Minimum spanning tree over the merged points
/// 5. Align the tree to the street layer
///
/// Empty `points` give an empty, converged tree. An empty street layer
/// skips snapping and alignment in effect: the result is the MST of the
/// merged input points.
///
/// # Errors
///
/// Returns [`TopologyError::InvalidConfig`] if `config` fails
/// [`TopologyConfig::validate`].
/// Returns [`TopologyError::TooManyPoints`] if snapping would grow the
/// point set, or the merged point set is, larger than
/// [`TopologyConfig::max_points`].
pub fn synthesize(
    points: &[Point],
    streets: &StreetLayer,
    config: &TopologyConfig,
) -> Result<NetworkResult, TopologyError> {
    let result = Pipeline::new(points.to_vec(), streets, config.clone())
        .index()?
        .snap()?
        .merge()?
        .span()
        .align()
        .into_result();
    Ok(result)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn street(points: &[(f64, f64)]) -> Polyline {
        Polyline::new(points.iter().map(|&(x, y)| Point::new(x, y)).collect())
    }

    #[test]
    fn empty_points_give_empty_converged_tree() {
        let streets = StreetLayer::new(vec![street(&[(0.0, 0.0), (10.0, 0.0)])]);
        let result = synthesize(&[], &streets, &TopologyConfig::default()).unwrap();
        assert!(result.tree.is_empty());
        assert!(result.converged);
        assert!(result.unreachable.is_empty());
    }

    #[test]
    fn collinear_points_without_streets() {
        let pts = [
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(20.0, 0.0),
        ];
        let config = TopologyConfig {
            merge_threshold: 1.0,
            ..TopologyConfig::default()
        };
        let result = synthesize(&pts, &StreetLayer::default(), &config).unwrap();
        assert_eq!(result.tree.len(), 2);
        assert!((result.tree.total_length() - 20.0).abs() < 1e-12);
        assert!(result.converged);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = TopologyConfig {
            point_interval: 0.0,
            ..TopologyConfig::default()
        };
        let result = synthesize(&[Point::new(0.0, 0.0)], &StreetLayer::default(), &config);
        assert!(matches!(result, Err(TopologyError::InvalidConfig(_))));
    }

    #[test]
    fn too_many_points_is_rejected() {
        let pts: Vec<Point> = (0..30).map(|i| Point::new(f64::from(i) * 50.0, 0.0)).collect();
        let config = TopologyConfig {
            max_points: 20,
            ..TopologyConfig::default()
        };
        let err = synthesize(&pts, &StreetLayer::default(), &config).unwrap_err();
        assert_eq!(
            err,
            TopologyError::TooManyPoints {
                count: 30,
                limit: 20
            }
        );
    }

    #[test]
    fn unreachable_points_are_reported_and_still_connected() {
        let streets = StreetLayer::new(vec![street(&[(0.0, 0.0), (100.0, 0.0)])]);
        let pts = [Point::new(50.0, 5.0), Point::new(50.0, 500.0)];
        let result = synthesize(&pts, &streets, &TopologyConfig::default()).unwrap();
        assert_eq!(result.unreachable, vec![Point::new(50.0, 500.0)]);
        assert!(result.tree.endpoints().contains(&Point::new(50.0, 500.0)));
    }

    #[test]
    fn skipped_inputs_are_counted() {
        let streets = StreetLayer::new(vec![
            street(&[(0.0, 0.0), (100.0, 0.0)]),
            street(&[(5.0, 5.0)]),
        ]);
        let pts = [
            Point::new(10.0, 3.0),
            Point::new(f64::NAN, 0.0),
            Point::new(90.0, 3.0),
        ];
        let result = synthesize(&pts, &streets, &TopologyConfig::default()).unwrap();
        assert_eq!(result.skipped_points, 1);
        assert_eq!(result.skipped_streets, 1);
        assert!(result.converged);
        assert_eq!(result.tree.len(), 1);
    }

    #[test]
    fn l_shaped_street_is_followed() {
        // Two buildings at the ends of an L. The direct connection cuts
        // the corner; the aligned network bends through it.
        let streets = StreetLayer::new(vec![street(&[(0.0, 0.0), (200.0, 0.0), (200.0, 200.0)])]);
        let pts = [Point::new(0.0, 5.0), Point::new(195.0, 200.0)];
        let config = TopologyConfig {
            merge_threshold: 5.0,
            alignment_threshold: 20.0,
            ..TopologyConfig::default()
        };
        let result = synthesize(&pts, &streets, &config).unwrap();
        assert!(result.converged);
        assert!(result.iterations > 1);
        let index = StreetIndex::new(&streets);
        for seg in result.tree.segments() {
            let hit = index.nearest_to_midpoint(seg).unwrap();
            assert!(hit.distance <= config.alignment_threshold);
        }
        let direct = pts[0].distance(pts[1]);
        assert!(result.tree.total_length() > direct);
    }

    #[test]
    fn synthesis_is_deterministic() {
        let streets = StreetLayer::new(vec![
            street(&[(0.0, 0.0), (300.0, 0.0)]),
            street(&[(150.0, 0.0), (150.0, 300.0)]),
        ]);
        let pts = [
            Point::new(20.0, 30.0),
            Point::new(280.0, 25.0),
            Point::new(170.0, 250.0),
            Point::new(120.0, 120.0),
        ];
        let config = TopologyConfig::default();
        let a = synthesize(&pts, &streets, &config).unwrap();
        let b = synthesize(&pts, &streets, &config).unwrap();
        assert_eq!(a, b);
    }
}
