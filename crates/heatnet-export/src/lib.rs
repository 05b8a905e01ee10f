//! heatnet-export: Pure format (de)serializers (sans-IO)
//!
//! Reads GeoJSON input layers and writes synthesized networks as
//! GeoJSON or as an SVG preview.

pub mod geojson;
pub mod svg;

pub use geojson::{ExportError, LayerRead, read_points, read_street_layer, to_geojson};
pub use svg::{SvgMetadata, to_svg};
