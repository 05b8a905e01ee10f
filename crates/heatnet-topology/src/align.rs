//! Network alignment: pull a straight-line MST back onto the street layer.
//!
//! A Euclidean MST happily cuts across blocks. Each alignment pass
//! checks every segment's midpoint against the street layer and splits
//! the segments that stray too far, routing them through the nearest
//! street point. Splitting changes which tree is optimal, so after a
//! pass with splits the point set is re-merged and the MST rebuilt
//! before the next pass.
//!
//! # Termination
//!
//! Nothing guarantees that the loop reaches a fixed point: a point that
//! sits far from every street always has an incident segment whose
//! midpoint is off-street. The loop is therefore bounded three ways:
//!
//! - at most [`TopologyConfig::max_iterations`] passes;
//! - it stops once the residual (total midpoint excess beyond the
//!   threshold) has not improved on the best seen for
//!   [`TopologyConfig::stall_iterations`] consecutive passes;
//! - it stops if the rebuilt point set exceeds
//!   [`TopologyConfig::max_points`].
//!
//! In all three cases the lowest-residual tree is returned with
//! `converged == false`.

use crate::merge::merge_points;
use crate::mst::build_mst;
use crate::spatial_index::StreetIndex;
use crate::types::{NetworkTree, Point, Segment, TopologyConfig};

/// Result of [`align`].
#[derive(Debug, Clone, PartialEq)]
pub struct AlignOutcome {
    /// The aligned tree, or the best tree found if the loop gave up.
    pub tree: NetworkTree,
    /// `true` if a full pass found no segment to split.
    pub converged: bool,
    /// Number of passes run, including the final one.
    pub iterations: usize,
    /// Total midpoint distance beyond the threshold for `tree`.
    pub residual: f64,
}

/// Outcome of one split pass over a tree.
struct SplitPass {
    segments: Vec<Segment>,
    splits: usize,
    residual: f64,
}

/// Split every segment whose midpoint is farther than `threshold` from
/// the street layer.
fn split_pass(tree: &NetworkTree, index: &StreetIndex, threshold: f64) -> SplitPass {
    let mut pass = SplitPass {
        segments: Vec::with_capacity(tree.len()),
        splits: 0,
        residual: 0.0,
    };

    for segment in tree.segments() {
        match index.nearest_to_midpoint(segment) {
            Some(hit) if hit.distance > threshold => {
                pass.segments.push(Segment::new(segment.start, hit.point));
                pass.segments.push(Segment::new(hit.point, segment.end));
                pass.splits += 1;
                pass.residual += hit.distance - threshold;
            }
            _ => pass.segments.push(*segment),
        }
    }

    pass
}

/// Iteratively split, merge, and rebuild `tree` until every segment
/// midpoint lies within `config.alignment_threshold` of the street
/// layer.
///
/// `reference_points` (typically the building and generator locations)
/// are added to the candidate point set on every rebuild so the network
/// keeps serving them.
///
/// With an empty street layer there is nothing to align to and the input
/// tree is returned as converged.
#[must_use = "returns the aligned tree"]
pub fn align(
    tree: &NetworkTree,
    index: &StreetIndex,
    reference_points: &[Point],
    config: &TopologyConfig,
) -> AlignOutcome {
    let threshold = config.alignment_threshold;
    let mut current = tree.clone();
    let mut best: Option<(NetworkTree, f64)> = None;
    let mut stalled = 0;
    let mut iterations = 0;

    while iterations < config.max_iterations {
        iterations += 1;
        let pass = split_pass(&current, index, threshold);
        log::debug!(
            "alignment pass {iterations}: {} segments, {} splits, residual {:.3}",
            current.len(),
            pass.splits,
            pass.residual,
        );

        if pass.splits == 0 {
            return AlignOutcome {
                tree: current,
                converged: true,
                iterations,
                residual: 0.0,
            };
        }

        if best.as_ref().is_none_or(|(_, r)| pass.residual < *r) {
            best = Some((current.clone(), pass.residual));
            stalled = 0;
        } else {
            stalled += 1;
            if stalled >= config.stall_iterations {
                log::warn!(
                    "alignment stalled: no residual improvement in {stalled} passes"
                );
                break;
            }
        }

        let mut candidates: Vec<Point> = pass
            .segments
            .iter()
            .flat_map(|s| [s.start, s.end])
            .collect();
        candidates.extend_from_slice(reference_points);
        let merged = merge_points(&candidates, config.merge_threshold);
        if merged.len() > config.max_points {
            log::warn!(
                "alignment stopped: point set grew to {} (limit {})",
                merged.len(),
                config.max_points,
            );
            break;
        }
        current = build_mst(&merged);
    }

    let (tree, residual) = best.unwrap_or((current, 0.0));
    log::warn!(
        "alignment did not converge after {iterations} passes (best residual {residual:.3})"
    );
    AlignOutcome {
        tree,
        converged: false,
        iterations,
        residual,
    }
}
