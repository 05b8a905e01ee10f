//! Minimum spanning tree over a point set.
//!
//! The weighted graph is the complete graph on the points with
//! Euclidean edge weights. It is never materialized: dense Prim grows
//! the tree from point 0, keeping for every outside point only its
//! cheapest link into the tree. Weights are computed on the fly, so
//! cost is O(n²) time and O(n) memory.
//!
//! Ties are broken toward the lowest point index, both when picking the
//! next point to attach and when choosing which tree point it attaches
//! to, so the output is deterministic for a fixed input order.
//! [`synthesize`](crate::synthesize) bounds `n` through
//! [`TopologyConfig::max_points`](crate::TopologyConfig::max_points).

use crate::types::{NetworkTree, Point, Segment};

/// Cheapest known link from an outside point into the tree.
#[derive(Debug, Clone, Copy)]
struct Link {
    weight: f64,
    parent: usize,
}

/// Build the minimum spanning tree of `points`.
///
/// Returns `points.len() - 1` segments for a non-empty input and an
/// empty tree for zero or one point. Segments are listed in the order
/// their points join the tree, and each runs from the lower-indexed
/// point to the higher-indexed one.
#[must_use = "returns the spanning tree"]
pub fn build_mst(points: &[Point]) -> NetworkTree {
    let n = points.len();
    if n <= 1 {
        return NetworkTree::default();
    }

    // `None` once the point is in the tree.
    let mut links: Vec<Option<Link>> = points
        .iter()
        .map(|p| {
            Some(Link {
                weight: points[0].distance(*p),
                parent: 0,
            })
        })
        .collect();
    links[0] = None;

    let mut segments = Vec::with_capacity(n - 1);
    while segments.len() < n - 1 {
        let mut next: Option<(usize, Link)> = None;
        for (i, link) in links.iter().enumerate() {
            let Some(link) = *link else { continue };
            // Strictly less keeps the lowest index on ties.
            if next.is_none_or(|(_, best)| link.weight.total_cmp(&best.weight).is_lt()) {
                next = Some((i, link));
            }
        }
        let Some((v, link)) = next else {
            break;
        };

        links[v] = None;
        let (a, b) = (link.parent.min(v), link.parent.max(v));
        segments.push(Segment::new(points[a], points[b]));

        for (i, slot) in links.iter_mut().enumerate() {
            if let Some(link) = slot {
                let weight = points[v].distance(points[i]);
                if weight.total_cmp(&link.weight).is_lt() {
                    *link = Link { weight, parent: v };
                }
            }
        }
    }

    NetworkTree::new(segments)
}
