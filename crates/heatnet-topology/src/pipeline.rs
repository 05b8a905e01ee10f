//! Incremental pipeline: advance stage-by-stage, inspecting each
//! intermediate result before continuing.
//!
//! [`crate::synthesize`] runs every stage in one call. [`Pipeline`] lets
//! the caller drive execution one step at a time:
//!
//! ```rust
//! # use heatnet_topology::{Pipeline, Point, StreetLayer, TopologyConfig, TopologyError};
//! # fn run(points: Vec<Point>, streets: &StreetLayer) -> Result<(), TopologyError> {
//! let aligned = Pipeline::new(points, streets, TopologyConfig::default())
//!     .index()?
//!     .snap()?
//!     .merge()?
//!     .span()
//!     .align();
//!
//! let result = aligned.into_result();
//! # Ok(())
//! # }
//! ```
//!
//! Each stage method consumes `self` and returns the next pipeline state
//! (or `Result` for fallible stages), carrying the intermediates later
//! stages and diagnostics need. The caller can inspect the current
//! stage's output via accessor methods at any point.
//!
//! The [`StreetIndex`] built in the first stage travels through every
//! later stage so the alignment loop can reuse it.

use crate::align::{AlignOutcome, align};
use crate::merge::merge_points;
use crate::mst::build_mst;
use crate::snap::{SnapOutcome, pass_through, snap_points};
use crate::spatial_index::StreetIndex;
use crate::types::{NetworkResult, NetworkTree, Point, StreetLayer, TopologyConfig, TopologyError};

// ───────────────────────── Stage 0: Pending ──────────────────────────

/// Pipeline state before any processing has occurred.
///
/// Call [`index`](Self::index) to advance to the next stage.
#[must_use = "pipeline stages are consumed by advancing; call .index() to continue"]
pub struct Pending<'a> {
    config: TopologyConfig,
    points: Vec<Point>,
    streets: &'a StreetLayer,
}

impl Pending<'_> {
    /// The raw input points.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Validate the configuration and index the street layer.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::InvalidConfig`] if any threshold is
    /// non-positive or non-finite, or an iteration limit is zero.
    pub fn index(self) -> Result<Indexed, TopologyError> {
        self.config.validate()?;
        let index = StreetIndex::new(self.streets);
        Ok(Indexed {
            config: self.config,
            points: self.points,
            street_count: self.streets.len(),
            index,
        })
    }
}

// ───────────────────────── Stage 1: Indexed ──────────────────────────

/// Pipeline state after building the street index.
///
/// Call [`snap`](Self::snap) to advance to the next stage.
#[must_use = "pipeline stages are consumed by advancing; call .snap() to continue"]
pub struct Indexed {
    config: TopologyConfig,
    points: Vec<Point>,
    street_count: usize,
    index: StreetIndex,
}

impl Indexed {
    /// The street index.
    #[must_use]
    pub const fn index(&self) -> &StreetIndex {
        &self.index
    }

    /// Number of streets in the input layer, degenerate ones included.
    #[must_use]
    pub const fn street_count(&self) -> usize {
        self.street_count
    }

    /// Insert intermediate points toward the street layer.
    ///
    /// With [`TopologyConfig::snap`] disabled, points only have their
    /// non-finite entries removed.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::TooManyPoints`] if snapping would grow
    /// the point set past [`TopologyConfig::max_points`]. Nothing is
    /// allocated for the intermediates in that case.
    pub fn snap(self) -> Result<Snapped, TopologyError> {
        let snap = if self.config.snap {
            snap_points(
                &self.points,
                &self.index,
                self.config.max_distance,
                self.config.point_interval,
                self.config.max_points,
            )?
        } else {
            pass_through(&self.points)
        };
        Ok(Snapped {
            config: self.config,
            input_len: self.points.len(),
            index: self.index,
            snap,
        })
    }
}

// ───────────────────────── Stage 2: Snapped ──────────────────────────

/// Pipeline state after snapping.
///
/// Call [`merge`](Self::merge) to advance to the next stage.
#[must_use = "pipeline stages are consumed by advancing; call .merge() to continue"]
pub struct Snapped {
    config: TopologyConfig,
    input_len: usize,
    index: StreetIndex,
    snap: SnapOutcome,
}

impl Snapped {
    /// The snapping outcome.
    #[must_use]
    pub const fn snap_outcome(&self) -> &SnapOutcome {
        &self.snap
    }

    /// The valid input points, without intermediates.
    #[must_use]
    pub fn valid_points(&self) -> &[Point] {
        &self.snap.points[..self.input_len - self.snap.skipped]
    }

    /// Merge near-coincident points.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::TooManyPoints`] if the merged set is
    /// larger than [`TopologyConfig::max_points`].
    pub fn merge(self) -> Result<Merged, TopologyError> {
        let merged = merge_points(&self.snap.points, self.config.merge_threshold);
        if merged.len() > self.config.max_points {
            return Err(TopologyError::TooManyPoints {
                count: merged.len(),
                limit: self.config.max_points,
            });
        }
        Ok(Merged {
            config: self.config,
            input_len: self.input_len,
            index: self.index,
            snap: self.snap,
            merged,
        })
    }
}

// ───────────────────────── Stage 3: Merged ───────────────────────────

/// Pipeline state after merging.
///
/// Call [`span`](Self::span) to advance to the next stage.
#[must_use = "pipeline stages are consumed by advancing; call .span() to continue"]
pub struct Merged {
    config: TopologyConfig,
    input_len: usize,
    index: StreetIndex,
    snap: SnapOutcome,
    merged: Vec<Point>,
}

impl Merged {
    /// The merged point set.
    #[must_use]
    pub fn merged(&self) -> &[Point] {
        &self.merged
    }

    /// Build the initial minimum spanning tree over the merged points.
    pub fn span(self) -> Spanned {
        let tree = build_mst(&self.merged);
        Spanned {
            config: self.config,
            input_len: self.input_len,
            index: self.index,
            snap: self.snap,
            tree,
        }
    }
}

// ───────────────────────── Stage 4: Spanned ──────────────────────────

/// Pipeline state after building the initial tree.
///
/// Call [`align`](Self::align) to advance to the final stage.
#[must_use = "pipeline stages are consumed by advancing; call .align() to continue"]
pub struct Spanned {
    config: TopologyConfig,
    input_len: usize,
    index: StreetIndex,
    snap: SnapOutcome,
    tree: NetworkTree,
}

impl Spanned {
    /// The initial, unaligned tree.
    #[must_use]
    pub const fn tree(&self) -> &NetworkTree {
        &self.tree
    }

    /// Run the alignment loop against the street layer.
    ///
    /// The valid input points are fed back into every rebuild so the
    /// final tree still reaches them.
    pub fn align(self) -> Aligned {
        let reference = &self.snap.points[..self.input_len - self.snap.skipped];
        let outcome = align(&self.tree, &self.index, reference, &self.config);
        Aligned {
            skipped_streets: self.index.skipped_streets(),
            initial: self.tree,
            snap: self.snap,
            outcome,
        }
    }
}

// ───────────────────────── Stage 5: Aligned ──────────────────────────

/// Terminal pipeline state.
///
/// Call [`into_result`](Self::into_result) to extract the
/// [`NetworkResult`].
#[must_use = "call .into_result() to extract the network"]
pub struct Aligned {
    skipped_streets: usize,
    initial: NetworkTree,
    snap: SnapOutcome,
    outcome: AlignOutcome,
}

impl Aligned {
    /// The tree before alignment.
    #[must_use]
    pub const fn initial_tree(&self) -> &NetworkTree {
        &self.initial
    }

    /// The alignment outcome.
    #[must_use]
    pub const fn outcome(&self) -> &AlignOutcome {
        &self.outcome
    }

    /// Consume the pipeline and return the final result.
    #[must_use]
    pub fn into_result(self) -> NetworkResult {
        NetworkResult {
            tree: self.outcome.tree,
            converged: self.outcome.converged,
            iterations: self.outcome.iterations,
            residual: self.outcome.residual,
            unreachable: self.snap.unreachable,
            skipped_points: self.snap.skipped,
            skipped_streets: self.skipped_streets,
        }
    }
}

// ───────────────────────── Entry point ───────────────────────────────

/// Entry point for the incremental pipeline.
pub struct Pipeline;

impl Pipeline {
    /// Create a new pipeline from input points, the street layer, and
    /// config.
    ///
    /// No processing is performed. Call [`.index()`](Pending::index) to
    /// begin.
    #[allow(clippy::new_ret_no_self)]
    pub const fn new(
        points: Vec<Point>,
        streets: &StreetLayer,
        config: TopologyConfig,
    ) -> Pending<'_> {
        Pending {
            config,
            points,
            streets,
        }
    }
}
