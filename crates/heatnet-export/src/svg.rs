//! SVG preview of a synthesized network.
//!
//! Renders the street layer, the network segments, and the network
//! nodes into an SVG string using the [`svg`] crate for document
//! construction, XML escaping, and path data formatting.
//!
//! Input coordinates are projected map units with `y` pointing north.
//! SVG's `y` axis points down, so every coordinate is flipped and
//! shifted into a `viewBox` that frames all geometry with a small
//! margin.
//!
//! Optional [`SvgMetadata`] embeds `<title>`, `<desc>`, and a
//! `<metadata>` element carrying the run configuration.
//!
//! This is a pure function with no I/O -- it returns a `String`.

use std::collections::HashSet;

use svg::Document;
use svg::node::element::path::Data;
use svg::node::element::{Circle, Description, Element, Group, Path, Title};
use svg::node::{Node, Text, Value};

use heatnet_topology::{NetworkTree, Point, Polyline, StreetLayer};

/// Margin around the geometry, as a fraction of its larger extent.
const MARGIN_RATIO: f64 = 0.05;

/// Stroke width of network segments, as a fraction of the larger extent.
const NETWORK_STROKE_RATIO: f64 = 0.004;

/// Namespace for the embedded configuration element.
const CONFIG_NAMESPACE: &str = "urn:heatnet:config:1";

/// Metadata to embed in the SVG document.
///
/// All fields are optional. Text values are XML-escaped automatically by
/// the `svg` crate.
#[derive(Debug, Clone, Default)]
pub struct SvgMetadata<'a> {
    /// Document title, emitted as `<title>`.
    ///
    /// Typically the district or input file name.
    pub title: Option<&'a str>,

    /// Document description, emitted as `<desc>`.
    pub description: Option<&'a str>,

    /// Serialized `TopologyConfig` JSON, emitted inside
    /// `<metadata><heatnet:config>` so previews record the parameters
    /// that produced them.
    pub config_json: Option<&'a str>,
}

/// Mapping from map coordinates into the document's `viewBox`.
#[derive(Debug, Clone, Copy)]
struct Frame {
    min_x: f64,
    max_y: f64,
    margin: f64,
    width: f64,
    height: f64,
}

impl Frame {
    /// Fit a frame around every finite point. Falls back to a unit frame
    /// at the origin when there are none.
    fn fit(points: impl IntoIterator<Item = Point>) -> Self {
        let mut bounds: Option<(f64, f64, f64, f64)> = None;
        for p in points.into_iter().filter(|p| p.is_finite()) {
            bounds = Some(match bounds {
                None => (p.x, p.y, p.x, p.y),
                Some((x0, y0, x1, y1)) => (x0.min(p.x), y0.min(p.y), x1.max(p.x), y1.max(p.y)),
            });
        }
        let (min_x, min_y, max_x, max_y) = bounds.unwrap_or((0.0, 0.0, 0.0, 0.0));

        let extent = (max_x - min_x).max(max_y - min_y);
        let extent = if extent > 0.0 { extent } else { 1.0 };
        let margin = extent * MARGIN_RATIO;
        Self {
            min_x,
            max_y,
            margin,
            width: 2.0f64.mul_add(margin, max_x - min_x),
            height: 2.0f64.mul_add(margin, max_y - min_y),
        }
    }

    /// Larger side of the framed geometry, without margins.
    fn extent(&self) -> f64 {
        self.margin / MARGIN_RATIO
    }

    /// Map a point into document coordinates (y down).
    fn map(&self, p: Point) -> (f64, f64) {
        (p.x - self.min_x + self.margin, self.max_y - p.y + self.margin)
    }
}

/// Build an SVG path `d` attribute string from a run of points.
///
/// Returns an empty string for fewer than 2 points.
fn build_path_data(points: &[Point], frame: &Frame) -> String {
    let Some((first, rest)) = points.split_first() else {
        return String::new();
    };
    if rest.is_empty() {
        return String::new();
    }

    let mut data = Data::new().move_to(frame.map(*first));
    for p in rest {
        data = data.line_to(frame.map(*p));
    }
    String::from(Value::from(data))
}

/// Unique segment endpoints, in first-occurrence order.
fn network_nodes(tree: &NetworkTree) -> Vec<Point> {
    let mut seen = HashSet::new();
    tree.endpoints()
        .into_iter()
        .filter(|p| seen.insert((p.x.to_bits(), p.y.to_bits())))
        .collect()
}

/// Render a network preview as an SVG document string.
///
/// Layers, bottom to top: streets (grey, `id="streets"`), network
/// segments (red, `id="network"`), and network nodes (`id="nodes"`).
/// Streets with fewer than two points are not drawn.
#[must_use]
pub fn to_svg(tree: &NetworkTree, streets: &StreetLayer, metadata: &SvgMetadata<'_>) -> String {
    let frame = Frame::fit(
        streets
            .streets()
            .iter()
            .flat_map(|s| s.points().iter().copied())
            .chain(tree.endpoints()),
    );
    let stroke = frame.extent() * NETWORK_STROKE_RATIO;

    let mut doc = Document::new().set("viewBox", (0.0, 0.0, frame.width, frame.height));

    if let Some(title) = metadata.title {
        doc = doc.add(Title::new(title));
    }

    if let Some(description) = metadata.description {
        doc = doc.add(Description::new().add(Text::new(description)));
    }

    if let Some(config_json) = metadata.config_json {
        let mut config_el = Element::new("heatnet:config");
        config_el.assign("xmlns:heatnet", CONFIG_NAMESPACE);
        config_el.append(Text::new(config_json));
        let mut metadata_el = Element::new("metadata");
        metadata_el.append(config_el);
        doc = doc.add(metadata_el);
    }

    let mut street_group = Group::new()
        .set("id", "streets")
        .set("fill", "none")
        .set("stroke", "#9e9e9e")
        .set("stroke-width", stroke / 2.0);
    for street in streets.streets().iter().map(Polyline::points) {
        let d = build_path_data(street, &frame);
        if !d.is_empty() {
            street_group = street_group.add(Path::new().set("d", d));
        }
    }

    let mut network_group = Group::new()
        .set("id", "network")
        .set("fill", "none")
        .set("stroke", "#d32f2f")
        .set("stroke-width", stroke)
        .set("stroke-linecap", "round");
    for segment in tree.segments() {
        let d = build_path_data(&[segment.start, segment.end], &frame);
        network_group = network_group.add(Path::new().set("d", d));
    }

    let mut node_group = Group::new().set("id", "nodes").set("fill", "#212121");
    for node in network_nodes(tree) {
        let (cx, cy) = frame.map(node);
        node_group = node_group.add(
            Circle::new()
                .set("cx", cx)
                .set("cy", cy)
                .set("r", stroke * 1.5),
        );
    }

    doc = doc.add(street_group).add(network_group).add(node_group);

    // The svg crate omits the XML declaration, so we prepend it.
    format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{doc}\n")
}
