//! Route path decoding.
//!
//! Paths arrive either as a GeoJSON-like `LineString` object or as WKT text
//! (`LINESTRING(lon lat, ...)`). Both store longitude first.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use crate::models::Position;

static LINESTRING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)^\s*LINESTRING\s*\((.+)\)\s*$").expect("LINESTRING pattern is valid")
});

#[derive(Deserialize)]
struct LineString {
    #[serde(rename = "type")]
    kind: String,
    coordinates: Vec<Vec<f64>>,
}

/// Decodes a route geometry into ordered map points.
///
/// Absent, empty or malformed input gives an empty path.
#[must_use]
pub fn parse_geometry(geometry: &Value) -> Vec<Position> {
    match geometry {
        Value::String(text) => parse_wkt(text),
        Value::Object(_) => parse_line_string(geometry),
        _ => Vec::new(),
    }
}

fn parse_line_string(geometry: &Value) -> Vec<Position> {
    let Ok(line) = LineString::deserialize(geometry) else {
        return Vec::new();
    };
    if !line.kind.eq_ignore_ascii_case("LineString") {
        return Vec::new();
    }

    let points: Option<Vec<Position>> = line
        .coordinates
        .iter()
        .map(|pair| match pair.as_slice() {
            [lng, lat, ..] => Some(Position::new(*lat, *lng)),
            _ => None,
        })
        .collect();
    points.unwrap_or_default()
}

/// Parses `LINESTRING(lon lat, lon lat, ...)`. One bad pair spoils the path.
fn parse_wkt(text: &str) -> Vec<Position> {
    let Some(body) = LINESTRING.captures(text).and_then(|caps| caps.get(1)) else {
        return Vec::new();
    };

    let points: Option<Vec<Position>> = body.as_str().split(',').map(parse_pair).collect();
    points.unwrap_or_default()
}

fn parse_pair(pair: &str) -> Option<Position> {
    let mut axes = pair.split_whitespace().map(str::parse::<f64>);
    let lng = axes.next()?.ok()?;
    let lat = axes.next()?.ok()?;
    if !lng.is_finite() || !lat.is_finite() {
        return None;
    }
    Some(Position::new(lat, lng))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn wkt_swaps_axes() {
        let points = parse_geometry(&json!("LINESTRING(-66.31 -17.38, -66.30 -17.37)"));
        assert_eq!(
            points,
            vec![Position::new(-17.38, -66.31), Position::new(-17.37, -66.30)]
        );
    }

    #[test]
    fn wkt_keyword_is_case_insensitive() {
        let points = parse_geometry(&json!("linestring (  -66.1   -17.1 ,-66.2 -17.2 )"));
        assert_eq!(points, vec![Position::new(-17.1, -66.1), Position::new(-17.2, -66.2)]);
    }

    #[test]
    fn typed_line_string() {
        let coordinates = vec![[-66.31, -17.38], [-66.305, -17.375], [-66.30, -17.37]];
        let points = parse_geometry(&json!({"type": "LineString", "coordinates": coordinates}));

        assert_eq!(points.len(), coordinates.len());
        for (point, pair) in points.iter().zip(&coordinates) {
            assert_eq!(point.latitude, pair[1]);
            assert_eq!(point.longitude, pair[0]);
        }
    }

    #[test]
    fn empty_or_malformed_is_empty() {
        for input in [
            Value::Null,
            json!(""),
            json!("POINT(-66.31 -17.38)"),
            json!("LINESTRING()"),
            json!("LINESTRING(-66.31 abc, -66.30 -17.37)"),
            json!("LINESTRING(-66.31)"),
            json!({"type": "Point", "coordinates": [-66.31, -17.38]}),
            json!({"type": "LineString", "coordinates": [[-66.31]]}),
            json!({"type": "LineString"}),
            json!(42),
            json!([[-66.31, -17.38]]),
        ] {
            assert!(parse_geometry(&input).is_empty(), "expected empty path for {input}");
        }
    }
}
