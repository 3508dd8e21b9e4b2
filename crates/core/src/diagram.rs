//! Damage markers placed on a cart diagram.
//!
//! A marker is a colored dot in canvas coordinates (600x400). The color
//! encodes the kind of damage; see [`PALETTE`].

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Canvas width in pixels.
pub const CANVAS_WIDTH: f64 = 600.0;

/// Canvas height in pixels.
pub const CANVAS_HEIGHT: f64 = 400.0;

/// Dot diameter used for newly drawn markers.
pub const POINT_SIZE: f64 = 12.0;

/// Dot diameter assumed for stored markers that carry no size.
pub const DEFAULT_STORED_SIZE: f64 = 8.0;

/// Largest accepted dot diameter.
pub const MAX_POINT_SIZE: f64 = 64.0;

/// Maximum number of markers on one diagram.
pub const MAX_POINTS: usize = 5000;

// ---------------------------------------------------------------------------
// Damage kinds
// ---------------------------------------------------------------------------

/// The kinds of damage a marker can denote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageKind {
    Scratches,
    MissingParts,
    DamageBumps,
}

impl DamageKind {
    /// Legend label shown next to the color swatch.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Scratches => "Scratches",
            Self::MissingParts => "Missing parts",
            Self::DamageBumps => "Damage/Bumps",
        }
    }

    /// Canonical marker color for this kind.
    pub fn color(&self) -> &'static str {
        match self {
            Self::Scratches => "red",
            Self::MissingParts => "#00FF7F",
            Self::DamageBumps => "#BF40BF",
        }
    }

    /// Map a marker color back to its damage kind (case-insensitive).
    pub fn from_color(color: &str) -> Option<Self> {
        PALETTE
            .iter()
            .copied()
            .find(|kind| kind.color().eq_ignore_ascii_case(color))
    }
}

/// Color reference, in legend order.
pub const PALETTE: [DamageKind; 3] = [
    DamageKind::Scratches,
    DamageKind::MissingParts,
    DamageKind::DamageBumps,
];

// ---------------------------------------------------------------------------
// Points
// ---------------------------------------------------------------------------

fn default_stored_size() -> f64 {
    DEFAULT_STORED_SIZE
}

/// A single colored dot on the diagram canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub color: String,
    #[serde(default = "default_stored_size")]
    pub size: f64,
}

impl Point {
    /// A marker of the given kind at the standard drawing size.
    pub fn marker(x: f64, y: f64, kind: DamageKind) -> Self {
        Self {
            x,
            y,
            color: kind.color().to_string(),
            size: POINT_SIZE,
        }
    }
}

/// The diagram payload stored on an inspection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagramData {
    #[serde(default)]
    pub points: Vec<Point>,
    #[serde(default = "default_width")]
    pub width: f64,
    #[serde(default = "default_height")]
    pub height: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagram_type: Option<String>,
    /// Leading points the inspection was created with. Annotation history
    /// never undoes past them.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub base_points: usize,
}

fn is_zero(n: &usize) -> bool {
    *n == 0
}

fn default_width() -> f64 {
    CANVAS_WIDTH
}

fn default_height() -> f64 {
    CANVAS_HEIGHT
}

impl DiagramData {
    /// Wrap points in a full-canvas payload.
    pub fn new(points: Vec<Point>, diagram_type: Option<String>) -> Self {
        Self {
            points,
            width: CANVAS_WIDTH,
            height: CANVAS_HEIGHT,
            diagram_type,
            base_points: 0,
        }
    }

    /// Mark the first `count` points as the non-undoable base, capped at
    /// the number of points.
    pub fn with_base_points(mut self, count: usize) -> Self {
        self.base_points = count.min(self.points.len());
        self
    }

    /// Parse a stored JSON value, treating `null` as an empty diagram.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, CoreError> {
        if value.is_null() {
            return Ok(Self::new(Vec::new(), None));
        }
        serde_json::from_value(value.clone())
            .map_err(|e| CoreError::Validation(format!("Invalid diagram data: {e}")))
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Strip a trailing `.jpg` or `.png` from a diagram filename.
pub fn normalize_diagram_name(name: &str) -> &str {
    name.strip_suffix(".jpg")
        .or_else(|| name.strip_suffix(".png"))
        .unwrap_or(name)
}

/// Validate a single marker.
pub fn validate_point(point: &Point) -> Result<(), CoreError> {
    if !point.x.is_finite() || !point.y.is_finite() {
        return Err(CoreError::Validation(
            "point coordinates must be finite numbers".to_string(),
        ));
    }
    if !(0.0..=CANVAS_WIDTH).contains(&point.x) || !(0.0..=CANVAS_HEIGHT).contains(&point.y) {
        return Err(CoreError::Validation(format!(
            "point ({}, {}) lies outside the {CANVAS_WIDTH}x{CANVAS_HEIGHT} canvas",
            point.x, point.y
        )));
    }
    if point.color.trim().is_empty() {
        return Err(CoreError::Validation("point color must not be empty".to_string()));
    }
    if !point.size.is_finite() || point.size <= 0.0 || point.size > MAX_POINT_SIZE {
        return Err(CoreError::Validation(format!(
            "point size must be in (0, {MAX_POINT_SIZE}], got {}",
            point.size
        )));
    }
    Ok(())
}

/// Validate a full marker set, including its size cap.
pub fn validate_points(points: &[Point]) -> Result<(), CoreError> {
    if points.len() > MAX_POINTS {
        return Err(CoreError::Validation(format!(
            "diagram has {} points, maximum is {MAX_POINTS}",
            points.len()
        )));
    }
    for (i, point) in points.iter().enumerate() {
        validate_point(point)
            .map_err(|e| CoreError::Validation(format!("points[{i}]: {e}")))?;
    }
    Ok(())
}

/// Remove markers sharing the same `(x, y, color)`.
///
/// The last occurrence wins and keeps its position relative to the other
/// survivors.
pub fn dedupe_points(points: Vec<Point>) -> Vec<Point> {
    let mut seen: HashSet<(u64, u64, String)> = HashSet::with_capacity(points.len());
    let mut kept: Vec<Point> = points
        .into_iter()
        .rev()
        .filter(|p| seen.insert((p.x.to_bits(), p.y.to_bits(), p.color.clone())))
        .collect();
    kept.reverse();
    kept
}

/// Marker counts per damage kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DamageSummary {
    pub scratches: usize,
    pub missing_parts: usize,
    pub damage_bumps: usize,
    /// Markers whose color is not in the palette.
    pub other: usize,
}

impl DamageSummary {
    pub fn total(&self) -> usize {
        self.scratches + self.missing_parts + self.damage_bumps + self.other
    }

    pub fn count(&self, kind: DamageKind) -> usize {
        match kind {
            DamageKind::Scratches => self.scratches,
            DamageKind::MissingParts => self.missing_parts,
            DamageKind::DamageBumps => self.damage_bumps,
        }
    }
}

/// Count markers per damage kind.
pub fn count_by_kind(points: &[Point]) -> DamageSummary {
    points
        .iter()
        .fold(DamageSummary::default(), |mut acc, p| {
            match DamageKind::from_color(&p.color) {
                Some(DamageKind::Scratches) => acc.scratches += 1,
                Some(DamageKind::MissingParts) => acc.missing_parts += 1,
                Some(DamageKind::DamageBumps) => acc.damage_bumps += 1,
                None => acc.other += 1,
            }
            acc
        })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pt(x: f64, y: f64, color: &str) -> Point {
        Point {
            x,
            y,
            color: color.to_string(),
            size: POINT_SIZE,
        }
    }

    #[test]
    fn normalize_strips_known_extensions_only() {
        assert_eq!(normalize_diagram_name("rental_150.jpg"), "rental_150");
        assert_eq!(normalize_diagram_name("rental_150.png"), "rental_150");
        assert_eq!(normalize_diagram_name("rental_150.gif"), "rental_150.gif");
        assert_eq!(normalize_diagram_name("rental_150"), "rental_150");
    }

    #[test]
    fn stored_point_without_size_gets_default() {
        let p: Point = serde_json::from_value(json!({"x": 10, "y": 20, "color": "red"})).unwrap();
        assert_eq!(p.size, DEFAULT_STORED_SIZE);
    }

    #[test]
    fn diagram_data_uses_camel_case_keys() {
        let data = DiagramData::new(vec![pt(1.0, 2.0, "red")], Some("rental_150.jpg".into()));
        let value = data.to_json();
        assert_eq!(value["diagramType"], "rental_150.jpg");
        assert_eq!(value["width"], 600.0);
        assert_eq!(DiagramData::from_json(&value).unwrap(), data);
    }

    #[test]
    fn base_points_are_capped_and_omitted_when_zero() {
        let data = DiagramData::new(vec![pt(1.0, 2.0, "red")], None).with_base_points(5);
        assert_eq!(data.base_points, 1);
        assert_eq!(data.to_json()["basePoints"], 1);

        let plain = DiagramData::new(Vec::new(), None).to_json();
        assert!(plain.get("basePoints").is_none());
        assert_eq!(DiagramData::from_json(&plain).unwrap().base_points, 0);
    }

    #[test]
    fn null_diagram_is_empty() {
        let data = DiagramData::from_json(&serde_json::Value::Null).unwrap();
        assert!(data.points.is_empty());
        assert_eq!(data.height, CANVAS_HEIGHT);
    }

    #[test]
    fn diagram_without_dimensions_gets_canvas_size() {
        let data = DiagramData::from_json(&json!({"points": []})).unwrap();
        assert_eq!(data.width, CANVAS_WIDTH);
        assert_eq!(data.height, CANVAS_HEIGHT);
    }

    #[test]
    fn validate_point_rejects_out_of_canvas() {
        assert!(validate_point(&pt(600.0, 400.0, "red")).is_ok());
        assert!(validate_point(&pt(600.5, 10.0, "red")).is_err());
        assert!(validate_point(&pt(-1.0, 10.0, "red")).is_err());
        assert!(validate_point(&pt(f64::NAN, 10.0, "red")).is_err());
    }

    #[test]
    fn validate_point_rejects_blank_color_and_bad_size() {
        assert!(validate_point(&pt(1.0, 1.0, "  ")).is_err());
        let mut p = pt(1.0, 1.0, "red");
        p.size = 0.0;
        assert!(validate_point(&p).is_err());
        p.size = MAX_POINT_SIZE + 1.0;
        assert!(validate_point(&p).is_err());
    }

    #[test]
    fn validate_points_reports_index() {
        let err = validate_points(&[pt(1.0, 1.0, "red"), pt(900.0, 1.0, "red")]).unwrap_err();
        assert!(err.to_string().contains("points[1]"));
    }

    #[test]
    fn dedupe_keeps_last_occurrence() {
        let mut later = pt(5.0, 5.0, "red");
        later.size = 20.0;
        let points = vec![
            pt(5.0, 5.0, "red"),
            pt(1.0, 1.0, "#00FF7F"),
            later.clone(),
            pt(5.0, 5.0, "#BF40BF"),
        ];
        let deduped = dedupe_points(points);
        assert_eq!(deduped.len(), 3);
        assert_eq!(deduped[0], pt(1.0, 1.0, "#00FF7F"));
        assert_eq!(deduped[1], later);
        assert_eq!(deduped[2].color, "#BF40BF");
    }

    #[test]
    fn dedupe_of_empty_is_empty() {
        assert!(dedupe_points(Vec::new()).is_empty());
    }

    #[test]
    fn damage_kind_color_lookup_is_case_insensitive() {
        assert_eq!(DamageKind::from_color("RED"), Some(DamageKind::Scratches));
        assert_eq!(DamageKind::from_color("#00ff7f"), Some(DamageKind::MissingParts));
        assert_eq!(DamageKind::from_color("blue"), None);
    }

    #[test]
    fn count_by_kind_buckets_unknown_colors() {
        let summary = count_by_kind(&[
            pt(1.0, 1.0, "red"),
            pt(2.0, 1.0, "red"),
            pt(3.0, 1.0, "#BF40BF"),
            pt(4.0, 1.0, "blue"),
        ]);
        assert_eq!(summary.scratches, 2);
        assert_eq!(summary.damage_bumps, 1);
        assert_eq!(summary.missing_parts, 0);
        assert_eq!(summary.other, 1);
        assert_eq!(summary.total(), 4);
        assert_eq!(summary.count(DamageKind::Scratches), 2);
    }
}
