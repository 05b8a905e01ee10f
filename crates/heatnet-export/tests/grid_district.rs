//! Integration test: read the grid district fixture, synthesize a network,
//! and export it to GeoJSON and SVG.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::HashSet;
use std::path::PathBuf;

use heatnet_topology::{StreetIndex, TopologyConfig};

fn read_fixture(name: &str) -> String {
    let workspace_root = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .to_path_buf();
    let path = workspace_root.join("assets/districts").join(name);
    assert!(path.exists(), "fixture not found at {path:?}");
    std::fs::read_to_string(&path).unwrap()
}

#[test]
fn grid_district_to_geojson_and_svg() {
    let points = heatnet_export::read_points(&read_fixture("grid_points.geojson")).unwrap();
    let streets = heatnet_export::read_street_layer(&read_fixture("grid_streets.geojson")).unwrap();

    // Ten buildings, two generators in one MultiPoint, one site polygon.
    assert_eq!(points.value.len(), 12);
    assert_eq!(points.skipped, 1);
    // Three LineStrings across, a two-part MultiLineString and one
    // LineString down, and one feature without geometry.
    assert_eq!(streets.value.len(), 6);
    assert_eq!(streets.skipped, 1);

    let config = TopologyConfig::default();
    let result = heatnet_topology::synthesize(&points.value, &streets.value, &config)
        .expect("synthesis should succeed");

    eprintln!(
        "Synthesized {} segments, length {:.1}, converged={} after {} passes",
        result.tree.len(),
        result.tree.total_length(),
        result.converged,
        result.iterations,
    );

    assert!(!result.tree.is_empty());
    assert!(result.unreachable.is_empty());
    assert_eq!(result.skipped_points, 0);
    assert_eq!(result.skipped_streets, 0);
    assert!(result.iterations <= config.max_iterations);

    // A spanning tree over k distinct nodes has k - 1 segments.
    let nodes: HashSet<(u64, u64)> = result
        .tree
        .endpoints()
        .iter()
        .map(|p| (p.x.to_bits(), p.y.to_bits()))
        .collect();
    assert_eq!(nodes.len(), result.tree.len() + 1);

    if result.converged {
        let index = StreetIndex::new(&streets.value);
        for seg in result.tree.segments() {
            let hit = index.nearest_to_midpoint(seg).unwrap();
            assert!(hit.distance <= config.alignment_threshold);
        }
    } else {
        assert!(result.residual > 0.0);
    }

    // GeoJSON: one LineString feature per segment.
    let geojson = heatnet_export::to_geojson(&result.tree).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&geojson).unwrap();
    assert_eq!(
        parsed["features"].as_array().unwrap().len(),
        result.tree.len()
    );

    // SVG: one path per segment and per street.
    let config_json = serde_json::to_string(&config).unwrap();
    let svg = heatnet_export::to_svg(
        &result.tree,
        &streets.value,
        &heatnet_export::SvgMetadata {
            title: Some("grid district"),
            description: None,
            config_json: Some(&config_json),
        },
    );
    assert!(svg.contains("<title>grid district</title>"));
    assert_eq!(
        svg.matches("<path").count(),
        result.tree.len() + streets.value.len()
    );
    assert_eq!(svg.matches("<circle").count(), nodes.len());
}
