//! Point merging: collapse near-coincident nodes into single representatives.
//!
//! Clustering is single-linkage: two points closer than the merge
//! threshold belong to the same cluster, and the relation is closed
//! transitively, so a chain of points spaced just under the threshold
//! collapses into one node even when its ends are far apart. Each
//! cluster is replaced by the centroid of its (unique) members.
//!
//! Centroids of neighboring clusters can end up closer than the
//! threshold even though no pair of their members is. Clustering is
//! therefore repeated over the centroids until every pair of
//! representatives is at least the threshold apart; a merged cluster's
//! centroid is always the mean of all of its original members. Once that
//! holds, a second merge pass finds nothing to do, which makes merging
//! idempotent.
//!
//! Everything here is a pure function of its input: the point to
//! cluster assignment lives in a local union-find.

use std::collections::HashMap;

use petgraph::unionfind::UnionFind;
use rstar::{PointDistance, RTree};
use rstar::primitives::GeomWithData;

use crate::types::{NetworkTree, Point, Segment};

/// Bit-exact key for a point, used to collapse exact duplicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CoordKey {
    x_bits: u64,
    y_bits: u64,
}

impl CoordKey {
    const fn from_point(p: Point) -> Self {
        Self {
            x_bits: p.x.to_bits(),
            y_bits: p.y.to_bits(),
        }
    }
}

/// A centroid tagged with its cluster label, for R\*-tree neighbor queries.
type IndexedCentroid = GeomWithData<[f64; 2], usize>;

/// Unique points of an input, in first-occurrence order, with a lookup
/// from each point to its position.
struct UniquePoints {
    points: Vec<Point>,
    position: HashMap<CoordKey, usize>,
}

impl UniquePoints {
    fn collect(points: impl IntoIterator<Item = Point>) -> Self {
        let mut unique = Self {
            points: Vec::new(),
            position: HashMap::new(),
        };
        for p in points {
            unique
                .position
                .entry(CoordKey::from_point(p))
                .or_insert_with(|| {
                    unique.points.push(p);
                    unique.points.len() - 1
                });
        }
        unique
    }

    fn index_of(&self, p: Point) -> Option<usize> {
        self.position.get(&CoordKey::from_point(p)).copied()
    }
}

/// Cluster assignment for a set of unique points.
struct Clusters {
    /// Cluster label of each unique point.
    labels: Vec<usize>,
    /// Centroid of each cluster, indexed by label.
    centroids: Vec<Point>,
}

/// Label clusters by their lowest member index and compute centroids.
fn label_clusters(uf: &mut UnionFind<usize>, points: &[Point]) -> (Clusters, Vec<usize>) {
    let mut label_of_root: HashMap<usize, usize> = HashMap::new();
    let mut labels = Vec::with_capacity(points.len());
    // (sum_x, sum_y, count) per label, seeded with the first member so
    // singleton centroids reproduce the input bit for bit.
    let mut sums: Vec<(f64, f64, usize)> = Vec::new();
    let mut first_member = Vec::new();

    for (i, p) in points.iter().enumerate() {
        let root = uf.find_mut(i);
        if let Some(&label) = label_of_root.get(&root) {
            let sum = &mut sums[label];
            sum.0 += p.x;
            sum.1 += p.y;
            sum.2 += 1;
            labels.push(label);
        } else {
            let label = sums.len();
            label_of_root.insert(root, label);
            sums.push((p.x, p.y, 1));
            first_member.push(i);
            labels.push(label);
        }
    }

    #[allow(clippy::cast_precision_loss)]
    let centroids = sums
        .into_iter()
        .map(|(sx, sy, count)| {
            if count == 1 {
                Point::new(sx, sy)
            } else {
                Point::new(sx / count as f64, sy / count as f64)
            }
        })
        .collect();

    (Clusters { labels, centroids }, first_member)
}

/// Single-linkage clustering with centroid re-merging (see module docs).
fn cluster(points: &[Point], threshold: f64) -> Clusters {
    let mut uf = UnionFind::<usize>::new(points.len());
    let threshold_sq = threshold * threshold;

    loop {
        let (clusters, first_member) = label_clusters(&mut uf, points);

        let tree: RTree<IndexedCentroid> = RTree::bulk_load(
            clusters
                .centroids
                .iter()
                .enumerate()
                .map(|(label, c)| GeomWithData::new([c.x, c.y], label))
                .collect(),
        );

        let mut merged = false;
        for (label, c) in clusters.centroids.iter().enumerate() {
            let query = [c.x, c.y];
            for neighbor in tree
                .nearest_neighbor_iter(&query)
                .take_while(|n| n.distance_2(&query) < threshold_sq)
            {
                let other = neighbor.data;
                if other > label && c.distance(clusters.centroids[other]) < threshold {
                    merged |= uf.union(first_member[label], first_member[other]);
                }
            }
        }

        if !merged {
            return clusters;
        }
    }
}

/// Merge a point set so that no two remaining points are closer than
/// `threshold`.
///
/// Exact duplicates are collapsed first. Output points are ordered by
/// the first input occurrence of their cluster.
#[must_use = "returns the merged point set"]
pub fn merge_points(points: &[Point], threshold: f64) -> Vec<Point> {
    let unique = UniquePoints::collect(points.iter().copied());
    cluster(&unique.points, threshold).centroids
}

/// Merge near-coincident segment endpoints across a whole tree.
///
/// Every endpoint is replaced by the centroid of its cluster. The result
/// has the same number of segments as the input; a segment whose two
/// endpoints fall into one cluster becomes zero-length.
#[must_use = "returns the simplified tree"]
pub fn simplify(tree: &NetworkTree, threshold: f64) -> NetworkTree {
    let unique = UniquePoints::collect(tree.endpoints());
    let clusters = cluster(&unique.points, threshold);

    let remap = |p: Point| {
        unique
            .index_of(p)
            .map_or(p, |i| clusters.centroids[clusters.labels[i]])
    };

    NetworkTree::new(
        tree.segments()
            .iter()
            .map(|s| Segment::new(remap(s.start), remap(s.end)))
            .collect(),
    )
}
