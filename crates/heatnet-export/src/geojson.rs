//! GeoJSON reader and writer.
//!
//! Input layers are `FeatureCollection` documents: building and
//! generator locations as `Point`/`MultiPoint` features, street
//! centerlines as `LineString`/`MultiLineString` features. Features
//! with any other geometry, a null geometry, or malformed coordinates
//! are skipped, logged, and counted in [`LayerRead::skipped`]. Only a
//! document that is not JSON or not a `FeatureCollection` is an error.
//!
//! Properties are ignored on input. Extra position dimensions (e.g. a
//! `z` coordinate) are dropped.
//!
//! Output is a `FeatureCollection` with one `LineString` feature per
//! network segment.
//!
//! Pure functions with no I/O: they take and return `&str`/`String`.

use serde::{Deserialize, Serialize};

use heatnet_topology::{NetworkTree, Point, Polyline, StreetLayer};

/// Errors from reading or writing GeoJSON.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// The input is not valid JSON, or the output could not be serialized.
    #[error("GeoJSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    /// The document parsed but is not a `FeatureCollection`.
    #[error("expected a GeoJSON FeatureCollection")]
    NotFeatureCollection,
}

/// A layer read from GeoJSON together with the number of features that
/// could not be used.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerRead<T> {
    /// The usable geometry.
    pub value: T,
    /// Features skipped for an unsupported, null, or malformed geometry.
    pub skipped: usize,
}

// ───────────────────────── Input model ───────────────────────────────

#[derive(Deserialize)]
#[serde(tag = "type")]
enum InputDocument {
    FeatureCollection { features: Vec<InputFeature> },
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
struct InputFeature {
    #[serde(default)]
    geometry: Option<serde_json::Value>,
}

/// A GeoJSON position: `[x, y]` with optional extra dimensions.
type Position = Vec<f64>;

#[derive(Deserialize)]
#[serde(tag = "type")]
enum Geometry {
    Point { coordinates: Position },
    MultiPoint { coordinates: Vec<Position> },
    LineString { coordinates: Vec<Position> },
    MultiLineString { coordinates: Vec<Vec<Position>> },
    #[serde(other)]
    Unsupported,
}

fn to_point(position: &[f64]) -> Option<Point> {
    match position {
        [x, y, ..] => Some(Point::new(*x, *y)),
        _ => None,
    }
}

fn to_points(positions: &[Position]) -> Option<Vec<Point>> {
    positions.iter().map(|p| to_point(p)).collect()
}

/// Log a feature whose positions have fewer than two coordinates.
fn short_position<T>(feature: usize) -> Option<T> {
    log::warn!("skipping feature {feature}: position with fewer than two coordinates");
    None
}

/// Parse the document and return each feature's geometry, or `None`
/// (logged) where it is missing or malformed.
fn feature_geometries(geojson: &str) -> Result<Vec<Option<Geometry>>, ExportError> {
    let InputDocument::FeatureCollection { features } = serde_json::from_str(geojson)? else {
        return Err(ExportError::NotFeatureCollection);
    };

    Ok(features
        .into_iter()
        .enumerate()
        .map(|(i, feature)| {
            let value = feature.geometry.filter(|g| !g.is_null());
            let Some(value) = value else {
                log::warn!("skipping feature {i}: null geometry");
                return None;
            };
            match serde_json::from_value::<Geometry>(value) {
                Ok(geometry) => Some(geometry),
                Err(e) => {
                    log::warn!("skipping feature {i}: malformed geometry: {e}");
                    None
                }
            }
        })
        .collect())
}

/// Read building and generator locations from a GeoJSON
/// `FeatureCollection`.
///
/// `Point` features contribute one point and `MultiPoint` features one
/// point per member, in document order.
///
/// # Errors
///
/// Returns [`ExportError::Json`] if `geojson` is not valid JSON and
/// [`ExportError::NotFeatureCollection`] if it is not a
/// `FeatureCollection`.
pub fn read_points(geojson: &str) -> Result<LayerRead<Vec<Point>>, ExportError> {
    let mut read = LayerRead {
        value: Vec::new(),
        skipped: 0,
    };

    for (i, geometry) in feature_geometries(geojson)?.into_iter().enumerate() {
        let points = match geometry {
            Some(Geometry::Point { coordinates }) => to_point(&coordinates)
                .map(|p| vec![p])
                .or_else(|| short_position(i)),
            Some(Geometry::MultiPoint { coordinates }) => {
                to_points(&coordinates).or_else(|| short_position(i))
            }
            Some(_) => {
                log::warn!("skipping feature {i}: not a Point or MultiPoint");
                None
            }
            None => None,
        };
        match points {
            Some(points) => read.value.extend(points),
            None => read.skipped += 1,
        }
    }

    Ok(read)
}

/// Read a street centerline layer from a GeoJSON `FeatureCollection`.
///
/// `LineString` features become one street and `MultiLineString`
/// features one street per part, in document order. Streets too short to
/// form a line are kept; the street index skips them.
///
/// # Errors
///
/// Returns [`ExportError::Json`] if `geojson` is not valid JSON and
/// [`ExportError::NotFeatureCollection`] if it is not a
/// `FeatureCollection`.
pub fn read_street_layer(geojson: &str) -> Result<LayerRead<StreetLayer>, ExportError> {
    let mut streets = Vec::new();
    let mut skipped = 0;

    for (i, geometry) in feature_geometries(geojson)?.into_iter().enumerate() {
        let lines = match geometry {
            Some(Geometry::LineString { coordinates }) => to_points(&coordinates)
                .map(|p| vec![p])
                .or_else(|| short_position(i)),
            Some(Geometry::MultiLineString { coordinates }) => coordinates
                .iter()
                .map(|part| to_points(part))
                .collect::<Option<Vec<_>>>()
                .or_else(|| short_position(i)),
            Some(_) => {
                log::warn!("skipping feature {i}: not a LineString or MultiLineString");
                None
            }
            None => None,
        };
        match lines {
            Some(lines) => streets.extend(lines.into_iter().map(Polyline::new)),
            None => skipped += 1,
        }
    }

    Ok(LayerRead {
        value: StreetLayer::new(streets),
        skipped,
    })
}

// ───────────────────────── Output model ──────────────────────────────

#[derive(Serialize)]
struct OutputCollection {
    r#type: &'static str,
    features: Vec<OutputFeature>,
}

#[derive(Serialize)]
struct OutputFeature {
    r#type: &'static str,
    geometry: OutputLineString,
    properties: SegmentProperties,
}

#[derive(Serialize)]
struct OutputLineString {
    r#type: &'static str,
    coordinates: [[f64; 2]; 2],
}

#[derive(Serialize)]
struct SegmentProperties {
    length: f64,
}

/// Serialize a network tree as a GeoJSON `FeatureCollection`.
///
/// Each segment becomes a two-point `LineString` feature, in tree
/// order, with its Euclidean `length` as the only property.
///
/// JSON has no NaN or infinity; `serde_json` writes such coordinates
/// as `null`.
///
/// # Errors
///
/// Returns [`ExportError::Json`] if serialization fails.
pub fn to_geojson(tree: &NetworkTree) -> Result<String, ExportError> {
    let collection = OutputCollection {
        r#type: "FeatureCollection",
        features: tree
            .segments()
            .iter()
            .map(|s| OutputFeature {
                r#type: "Feature",
                geometry: OutputLineString {
                    r#type: "LineString",
                    coordinates: [[s.start.x, s.start.y], [s.end.x, s.end.y]],
                },
                properties: SegmentProperties { length: s.length() },
            })
            .collect(),
    };
    Ok(serde_json::to_string(&collection)?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use heatnet_topology::Segment;

    use super::*;

    #[test]
    fn reads_points_and_multipoints() {
        let read = read_points(
            r#"{
                "type": "FeatureCollection",
                "features": [
                    {"type": "Feature", "properties": {"id": 1},
                     "geometry": {"type": "Point", "coordinates": [1.0, 2.0]}},
                    {"type": "Feature", "properties": null,
                     "geometry": {"type": "MultiPoint", "coordinates": [[3, 4], [5, 6, 7]]}}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(
            read.value,
            vec![Point::new(1.0, 2.0), Point::new(3.0, 4.0), Point::new(5.0, 6.0)]
        );
        assert_eq!(read.skipped, 0);
    }

    #[test]
    fn unsupported_and_null_geometries_are_skipped() {
        let read = read_points(
            r#"{
                "type": "FeatureCollection",
                "features": [
                    {"type": "Feature", "geometry": null},
                    {"type": "Feature"},
                    {"type": "Feature", "geometry": {"type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,0]]]}},
                    {"type": "Feature", "geometry": {"type": "LineString", "coordinates": [[0,0],[1,1]]}},
                    {"type": "Feature", "geometry": {"type": "Point", "coordinates": [7]}},
                    {"type": "Feature", "geometry": {"type": "Point", "coordinates": [8, 9]}}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(read.value, vec![Point::new(8.0, 9.0)]);
        assert_eq!(read.skipped, 5);
    }

    #[test]
    fn reads_street_layer() {
        let read = read_street_layer(
            r#"{
                "type": "FeatureCollection",
                "features": [
                    {"type": "Feature", "geometry": {"type": "LineString", "coordinates": [[0,0],[10,0]]}},
                    {"type": "Feature", "geometry": {"type": "MultiLineString",
                     "coordinates": [[[0,5],[0,10]], [[20,0],[20,5],[25,5]]]}},
                    {"type": "Feature", "geometry": {"type": "Point", "coordinates": [1, 1]}}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(read.value.len(), 3);
        assert_eq!(read.value.streets()[2].len(), 3);
        assert_eq!(read.skipped, 1);
    }

    #[test]
    fn malformed_line_is_skipped_whole() {
        let read = read_street_layer(
            r#"{"type": "FeatureCollection", "features": [
                {"type": "Feature", "geometry": {"type": "MultiLineString",
                 "coordinates": [[[0,0],[1,1]], [[2]]]}}
            ]}"#,
        )
        .unwrap();
        assert!(read.value.is_empty());
        assert_eq!(read.skipped, 1);
    }

    #[test]
    fn invalid_json_is_an_error() {
        assert!(matches!(read_points("{"), Err(ExportError::Json(_))));
    }

    #[test]
    fn non_collection_is_an_error() {
        let result = read_points(r#"{"type": "Point", "coordinates": [0, 0]}"#);
        assert!(matches!(result, Err(ExportError::NotFeatureCollection)));
    }

    #[test]
    fn writes_segments_as_linestrings() {
        let tree = NetworkTree::new(vec![
            Segment::new(Point::new(0.0, 0.0), Point::new(3.0, 4.0)),
            Segment::new(Point::new(3.0, 4.0), Point::new(3.0, 10.0)),
        ]);
        let json: serde_json::Value = serde_json::from_str(&to_geojson(&tree).unwrap()).unwrap();
        assert_eq!(json["type"], "FeatureCollection");
        let features = json["features"].as_array().unwrap();
        assert_eq!(features.len(), 2);
        assert_eq!(features[0]["type"], "Feature");
        assert_eq!(features[0]["geometry"]["type"], "LineString");
        assert_eq!(
            features[0]["geometry"]["coordinates"],
            serde_json::json!([[0.0, 0.0], [3.0, 4.0]])
        );
        assert!((features[0]["properties"]["length"].as_f64().unwrap() - 5.0).abs() < 1e-12);
    }

    #[test]
    fn written_network_reads_back_as_streets() {
        let tree = NetworkTree::new(vec![Segment::new(
            Point::new(1.5, -2.0),
            Point::new(8.25, 4.0),
        )]);
        let read = read_street_layer(&to_geojson(&tree).unwrap()).unwrap();
        assert_eq!(read.value.len(), 1);
        assert_eq!(
            read.value.streets()[0].points(),
            &[Point::new(1.5, -2.0), Point::new(8.25, 4.0)]
        );
    }

    #[test]
    fn empty_tree_gives_empty_collection() {
        let json = to_geojson(&NetworkTree::default()).unwrap();
        assert_eq!(json, r#"{"type":"FeatureCollection","features":[]}"#);
    }
}
