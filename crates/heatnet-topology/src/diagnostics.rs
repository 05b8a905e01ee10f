//! Pipeline diagnostics: timing, counts, and other metrics for each stage.
//!
//! These diagnostics are permanent instrumentation intended for
//! parameter tuning on real districts. [`synthesize_with_diagnostics`]
//! collects them alongside the pipeline result.
//!
//! This crate performs no I/O, so time is read through a caller-supplied
//! [`Clock`]. Duration measurements use [`std::time::Duration`].
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::pipeline::Pipeline;
use crate::types::{NetworkResult, Point, StreetLayer, TopologyConfig, TopologyError};

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// A monotonic time source.
///
/// Native callers wrap [`std::time::Instant`]; tests use a fake clock
/// that advances by a fixed step.
pub trait Clock {
    /// An opaque point in time.
    type Instant;

    /// The current time.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// Diagnostics collected from a single pipeline run.
///
/// Each field captures metrics for one logical stage of the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkDiagnostics {
    /// Stage 1: street indexing (includes config validation).
    pub index: StageDiagnostics,
    /// Stage 2: snapping (pass-through when disabled).
    pub snap: StageDiagnostics,
    /// Stage 3: point merging.
    pub merge: StageDiagnostics,
    /// Stage 4: initial spanning tree.
    pub mst: StageDiagnostics,
    /// Stage 5: alignment loop.
    pub align: StageDiagnostics,
    /// Total wall-clock duration of the entire pipeline (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Summary counts across all stages.
    pub summary: NetworkSummary,
}

/// Diagnostics for a single pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics (counts, sizes, etc.).
    pub metrics: StageMetrics,
}

/// Stage-specific metrics that vary by pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Street indexing metrics.
    Index {
        /// Streets in the input layer.
        street_count: usize,
        /// Line pieces loaded into the R\*-tree.
        piece_count: usize,
        /// Streets skipped as empty or invalid.
        skipped_streets: usize,
    },
    /// Snapping metrics.
    Snap {
        /// Whether snapping ran or points were only filtered.
        enabled: bool,
        /// Input points, valid or not.
        input_points: usize,
        /// Points after snapping (originals plus intermediates).
        output_points: usize,
        /// Intermediate points inserted.
        inserted_points: usize,
        /// Points beyond the snap radius.
        unreachable_points: usize,
        /// Points dropped for non-finite coordinates.
        skipped_points: usize,
    },
    /// Merge metrics.
    Merge {
        /// Clustering radius.
        threshold: f64,
        /// Points before merging.
        points_before: usize,
        /// Points after merging.
        points_after: usize,
    },
    /// Spanning tree metrics.
    Mst {
        /// Points spanned.
        point_count: usize,
        /// Segments in the tree.
        segment_count: usize,
        /// Total segment length.
        total_length: f64,
    },
    /// Alignment metrics.
    Align {
        /// Midpoint distance threshold.
        threshold: f64,
        /// Passes run.
        iterations: usize,
        /// Whether the loop converged.
        converged: bool,
        /// Segments before alignment.
        segments_before: usize,
        /// Segments after alignment.
        segments_after: usize,
        /// Total length before alignment.
        length_before: f64,
        /// Total length after alignment.
        length_after: f64,
        /// Residual midpoint excess of the returned tree.
        residual: f64,
    },
}

/// High-level summary counts for the entire pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkSummary {
    /// Input points, valid or not.
    pub input_points: usize,
    /// Streets in the input layer.
    pub street_count: usize,
    /// Segments in the final tree.
    pub final_segment_count: usize,
    /// Total pipe length of the final tree.
    pub final_length: f64,
    /// Whether alignment converged.
    pub converged: bool,
}

impl NetworkDiagnostics {
    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Network Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Input: {} points, {} streets",
            self.summary.input_points, self.summary.street_count,
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<24} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);

        let stages = [
            ("Index", &self.index),
            ("Snap", &self.snap),
            ("Merge", &self.merge),
            ("MST", &self.mst),
            ("Align", &self.align),
        ];

        for (name, diag) in &stages {
            let ms = duration_ms(diag.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&diag.metrics);
            lines.push(format!("{name:<24} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        lines.push(String::new());
        lines.push(format!(
            "Segments: {}  |  Length: {:.1}  |  Converged: {}",
            self.summary.final_segment_count,
            self.summary.final_length,
            if self.summary.converged { "yes" } else { "no" },
        ));

        lines.join("\n")
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Format stage metrics into a compact detail string.
fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Index {
            street_count,
            piece_count,
            skipped_streets,
        } => format!("{street_count} streets, {piece_count} pieces ({skipped_streets} skipped)"),
        StageMetrics::Snap {
            enabled: false,
            input_points,
            skipped_points,
            ..
        } => format!("disabled, {input_points} pts ({skipped_points} skipped)"),
        StageMetrics::Snap {
            input_points,
            output_points,
            inserted_points,
            unreachable_points,
            skipped_points,
            ..
        } => format!(
            "{input_points}->{output_points} pts (+{inserted_points}, {unreachable_points} unreachable, {skipped_points} skipped)",
        ),
        StageMetrics::Merge {
            threshold,
            points_before,
            points_after,
        } => format!("r={threshold:.2} {points_before}->{points_after} pts"),
        StageMetrics::Mst {
            point_count,
            segment_count,
            total_length,
        } => format!("{point_count} pts, {segment_count} segs, len={total_length:.1}"),
        StageMetrics::Align {
            threshold,
            iterations,
            converged,
            segments_before,
            segments_after,
            length_before,
            length_after,
            residual,
        } => {
            let state = if *converged {
                "converged".to_string()
            } else {
                format!("not converged (residual {residual:.2})")
            };
            format!(
                "t={threshold:.2} {iterations} passes, {state}, segs={segments_before}->{segments_after} len={length_before:.1}->{length_after:.1}",
            )
        }
    }
}

/// Run the synthesis pipeline and collect per-stage diagnostics.
///
/// Produces the same [`NetworkResult`] as [`crate::synthesize`].
///
/// # Errors
///
/// Same as [`crate::synthesize`].
pub fn synthesize_with_diagnostics<C: Clock>(
    points: &[Point],
    streets: &StreetLayer,
    config: &TopologyConfig,
    clock: &C,
) -> Result<(NetworkResult, NetworkDiagnostics), TopologyError> {
    let start = clock.now();

    let t = clock.now();
    let indexed = Pipeline::new(points.to_vec(), streets, config.clone()).index()?;
    let index = StageDiagnostics {
        duration: clock.elapsed(&t),
        metrics: StageMetrics::Index {
            street_count: indexed.street_count(),
            piece_count: indexed.index().piece_count(),
            skipped_streets: indexed.index().skipped_streets(),
        },
    };
    let street_count = indexed.street_count();

    let t = clock.now();
    let snapped = indexed.snap()?;
    let outcome = snapped.snap_outcome();
    let snap = StageDiagnostics {
        duration: clock.elapsed(&t),
        metrics: StageMetrics::Snap {
            enabled: config.snap,
            input_points: points.len(),
            output_points: outcome.points.len(),
            inserted_points: outcome.inserted,
            unreachable_points: outcome.unreachable.len(),
            skipped_points: outcome.skipped,
        },
    };
    let points_before = outcome.points.len();

    let t = clock.now();
    let merged = snapped.merge()?;
    let merge = StageDiagnostics {
        duration: clock.elapsed(&t),
        metrics: StageMetrics::Merge {
            threshold: config.merge_threshold,
            points_before,
            points_after: merged.merged().len(),
        },
    };
    let point_count = merged.merged().len();

    let t = clock.now();
    let spanned = merged.span();
    let mst = StageDiagnostics {
        duration: clock.elapsed(&t),
        metrics: StageMetrics::Mst {
            point_count,
            segment_count: spanned.tree().len(),
            total_length: spanned.tree().total_length(),
        },
    };

    let t = clock.now();
    let aligned = spanned.align();
    let align_duration = clock.elapsed(&t);
    let initial = aligned.initial_tree();
    let outcome = aligned.outcome();
    let align = StageDiagnostics {
        duration: align_duration,
        metrics: StageMetrics::Align {
            threshold: config.alignment_threshold,
            iterations: outcome.iterations,
            converged: outcome.converged,
            segments_before: initial.len(),
            segments_after: outcome.tree.len(),
            length_before: initial.total_length(),
            length_after: outcome.tree.total_length(),
            residual: outcome.residual,
        },
    };

    let result = aligned.into_result();
    let total_duration = clock.elapsed(&start);

    let summary = NetworkSummary {
        input_points: points.len(),
        street_count,
        final_segment_count: result.tree.len(),
        final_length: result.tree.total_length(),
        converged: result.converged,
    };

    Ok((
        result,
        NetworkDiagnostics {
            index,
            snap,
            merge,
            mst,
            align,
            total_duration,
            summary,
        },
    ))
}
