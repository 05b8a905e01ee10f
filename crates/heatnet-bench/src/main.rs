//! heatnet-bench: CLI tool for network synthesis parameter experimentation.
//!
//! Runs the topology synthesis pipeline on a building point layer and a
//! street layer (both GeoJSON) with configurable parameters, printing
//! detailed per-stage diagnostics. Useful for:
//!
//! - Tuning snap radius, point interval, and merge/alignment thresholds
//! - Measuring per-stage durations to find where large districts spend time
//! - Checking whether alignment converges for a given district
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin heatnet-bench -- [OPTIONS] <POINTS> <STREETS>
//! ```
//!
//! Log output (skipped features, unreachable points, non-convergence) is
//! controlled through `RUST_LOG`; the default level is `warn`.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::Parser;
use heatnet_export::LayerRead;
use heatnet_topology::TopologyConfig;
use heatnet_topology::diagnostics::{Clock, NetworkDiagnostics};

/// District heating network synthesis and diagnostics.
///
/// Builds a pipe network over the given points that follows the given
/// streets and prints detailed per-stage timing and count diagnostics.
#[derive(Parser)]
#[command(name = "heatnet-bench", version)]
struct Cli {
    /// GeoJSON FeatureCollection of building and generator points.
    points: PathBuf,

    /// GeoJSON FeatureCollection of street centerlines.
    streets: PathBuf,

    /// Snap radius: points farther than this from every street stay
    /// unconnected.
    #[arg(long, default_value_t = TopologyConfig::DEFAULT_MAX_DISTANCE)]
    max_distance: f64,

    /// Spacing of intermediate points between a point and its street.
    #[arg(long, default_value_t = TopologyConfig::DEFAULT_POINT_INTERVAL)]
    point_interval: f64,

    /// Points closer than this are merged.
    #[arg(long, default_value_t = TopologyConfig::DEFAULT_MERGE_THRESHOLD)]
    merge_threshold: f64,

    /// Largest allowed distance from a segment midpoint to the street layer.
    #[arg(long, default_value_t = TopologyConfig::DEFAULT_ALIGNMENT_THRESHOLD)]
    alignment_threshold: f64,

    /// Cap on alignment passes.
    #[arg(long, default_value_t = TopologyConfig::DEFAULT_MAX_ITERATIONS, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    max_iterations: usize,

    /// Passes without residual improvement before alignment gives up.
    #[arg(long, default_value_t = TopologyConfig::DEFAULT_STALL_ITERATIONS, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    stall_iterations: usize,

    /// Largest point set the spanning tree may be built over.
    #[arg(long, default_value_t = TopologyConfig::DEFAULT_MAX_POINTS)]
    max_points: usize,

    /// Skip the snapping stage.
    #[arg(long)]
    no_snap: bool,

    /// Write the network as GeoJSON to this file.
    #[arg(long)]
    geojson: Option<PathBuf>,

    /// Write an SVG preview to this file.
    #[arg(long)]
    svg: Option<PathBuf>,

    /// Number of runs for averaging.
    #[arg(long, default_value_t = 1, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    runs: usize,

    /// Output diagnostics as JSON instead of human-readable report.
    #[arg(long)]
    json: bool,

    /// Full topology config as a JSON string.
    ///
    /// When provided, all other config flags are ignored. Missing fields
    /// take their defaults.
    #[arg(long)]
    config_json: Option<String>,
}

/// Build a [`TopologyConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and all
/// individual parameter flags are ignored.
fn config_from_cli(cli: &Cli) -> Result<TopologyConfig, String> {
    if let Some(ref json) = cli.config_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"));
    }

    Ok(TopologyConfig {
        snap: !cli.no_snap,
        max_distance: cli.max_distance,
        point_interval: cli.point_interval,
        merge_threshold: cli.merge_threshold,
        alignment_threshold: cli.alignment_threshold,
        max_iterations: cli.max_iterations,
        stall_iterations: cli.stall_iterations,
        max_points: cli.max_points,
    })
}

/// Read and parse one GeoJSON input layer.
fn read_layer<T>(
    path: &Path,
    parse: fn(&str) -> Result<LayerRead<T>, heatnet_export::ExportError>,
) -> Result<LayerRead<T>, String> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("Error reading {}: {e}", path.display()))?;
    let layer = parse(&text).map_err(|e| format!("Error parsing {}: {e}", path.display()))?;
    if layer.skipped > 0 {
        eprintln!(
            "{}: skipped {} unusable features",
            path.display(),
            layer.skipped
        );
    }
    Ok(layer)
}

/// Write an output file, reporting the outcome on stderr.
fn write_output(path: &Path, kind: &str, contents: &str) -> Result<(), String> {
    std::fs::write(path, contents)
        .map_err(|e| format!("Error writing {kind} to {}: {e}", path.display()))?;
    eprintln!(
        "{kind} written to {} ({} bytes)",
        path.display(),
        contents.len()
    );
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    match run(&Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            eprintln!("{msg}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), String> {
    let config = config_from_cli(cli)?;
    let points = read_layer(&cli.points, heatnet_export::read_points)?;
    let streets = read_layer(&cli.streets, heatnet_export::read_street_layer)?;

    eprintln!(
        "Points: {} ({} points)",
        cli.points.display(),
        points.value.len()
    );
    eprintln!(
        "Streets: {} ({} streets)",
        cli.streets.display(),
        streets.value.len()
    );
    eprintln!("Config: {config:#?}");
    eprintln!("Runs: {}", cli.runs);
    eprintln!();

    let mut all_diagnostics = Vec::with_capacity(cli.runs);

    for run in 0..cli.runs {
        if cli.runs > 1 {
            eprintln!("--- Run {}/{} ---", run + 1, cli.runs);
        }

        let (result, diagnostics) = heatnet_topology::synthesize_with_diagnostics(
            &points.value,
            &streets.value,
            &config,
            &StdClock,
        )
        .map_err(|e| format!("Pipeline error: {e}"))?;

        if cli.json {
            let json = serde_json::to_string_pretty(&diagnostics)
                .map_err(|e| format!("Error serializing diagnostics: {e}"))?;
            println!("{json}");
        } else {
            println!("{}", diagnostics.report());
        }

        if !result.unreachable.is_empty() {
            eprintln!(
                "{} points are beyond the snap radius and were not connected toward a street",
                result.unreachable.len()
            );
        }

        // Write outputs on the first run only.
        if run == 0 {
            if let Some(ref path) = cli.geojson {
                let geojson = heatnet_export::to_geojson(&result.tree)
                    .map_err(|e| format!("Error serializing network: {e}"))?;
                write_output(path, "GeoJSON", &geojson)?;
            }
            if let Some(ref path) = cli.svg {
                let title = cli
                    .points
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("network");
                let config_json = serde_json::to_string(&config).ok();
                let metadata = heatnet_export::SvgMetadata {
                    title: Some(title),
                    description: None,
                    config_json: config_json.as_deref(),
                };
                let svg = heatnet_export::to_svg(&result.tree, &streets.value, &metadata);
                write_output(path, "SVG", &svg)?;
            }
        }

        all_diagnostics.push(diagnostics);

        if cli.runs > 1 {
            eprintln!();
        }
    }

    if cli.runs > 1 {
        print_multi_run_summary(&all_diagnostics);
    }

    Ok(())
}

/// [`Clock`] implementation backed by [`std::time::Instant`].
struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: &Instant) -> Duration {
        since.elapsed()
    }
}

/// Function pointer type for extracting a stage duration from diagnostics.
type StageExtractor = fn(&NetworkDiagnostics) -> Duration;

/// Print aggregated statistics across multiple runs.
#[allow(clippy::cast_precision_loss)]
fn print_multi_run_summary(all_diagnostics: &[NetworkDiagnostics]) {
    println!();
    println!(
        "Summary ({} runs)\n{}",
        all_diagnostics.len(),
        "=".repeat(60),
    );

    if all_diagnostics.is_empty() {
        println!("Warning: no diagnostics to summarize");
        return;
    }

    let durations: Vec<f64> = all_diagnostics
        .iter()
        .map(|d| d.total_duration.as_secs_f64() * 1000.0)
        .collect();

    let min = durations.iter().copied().reduce(f64::min).unwrap_or(0.0);
    let max = durations.iter().copied().reduce(f64::max).unwrap_or(0.0);
    let mean = durations.iter().sum::<f64>() / durations.len() as f64;

    println!("Total duration: min={min:.3}ms  mean={mean:.3}ms  max={max:.3}ms");

    println!();
    println!("{:<24} {:>12}", "Stage", "Mean (ms)");
    println!("{}", "-".repeat(40));

    let stage_extractors: &[(&str, StageExtractor)] = &[
        ("Index", |d| d.index.duration),
        ("Snap", |d| d.snap.duration),
        ("Merge", |d| d.merge.duration),
        ("MST", |d| d.mst.duration),
        ("Align", |d| d.align.duration),
    ];

    for (name, extractor) in stage_extractors {
        let stage_mean = all_diagnostics
            .iter()
            .map(|d| extractor(d).as_secs_f64() * 1000.0)
            .sum::<f64>()
            / all_diagnostics.len() as f64;
        println!("{name:<24} {stage_mean:>10.3}ms");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("heatnet-bench").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn defaults_match_topology_defaults() {
        let cli = parse(&["points.geojson", "streets.geojson"]);
        assert_eq!(config_from_cli(&cli).unwrap(), TopologyConfig::default());
    }

    #[test]
    fn flags_override_defaults() {
        let cli = parse(&[
            "p.geojson",
            "s.geojson",
            "--merge-threshold",
            "2.5",
            "--max-iterations",
            "7",
            "--no-snap",
        ]);
        let config = config_from_cli(&cli).unwrap();
        assert!(!config.snap);
        assert!((config.merge_threshold - 2.5).abs() < f64::EPSILON);
        assert_eq!(config.max_iterations, 7);
    }

    #[test]
    fn config_json_takes_precedence() {
        let cli = parse(&[
            "p.geojson",
            "s.geojson",
            "--merge-threshold",
            "2.5",
            "--config-json",
            r#"{"alignment_threshold": 4.0}"#,
        ]);
        let config = config_from_cli(&cli).unwrap();
        assert!((config.alignment_threshold - 4.0).abs() < f64::EPSILON);
        assert!(
            (config.merge_threshold - TopologyConfig::DEFAULT_MERGE_THRESHOLD).abs()
                < f64::EPSILON
        );
    }

    #[test]
    fn bad_config_json_is_reported() {
        let cli = parse(&["p.geojson", "s.geojson", "--config-json", "{"]);
        assert!(config_from_cli(&cli).is_err());
    }

    #[test]
    fn zero_runs_is_rejected() {
        let result = Cli::try_parse_from(["heatnet-bench", "p", "s", "--runs", "0"]);
        assert!(result.is_err());
    }
}
