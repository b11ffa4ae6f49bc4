//! Rectangle annotation shapes and identity matching.
//!
//! Shapes have no stable key in the rendering layer: a shape echoed back by
//! the renderer is "the same" annotation as a stored one iff all four corners
//! agree after rounding to [`SHAPE_PRECISION`] decimals and the line colors
//! are equal. The rounding absorbs float jitter introduced by the renderer,
//! not user intent. Shapes kept in the store additionally carry a stable
//! session-scoped `id`; when both sides of a comparison have one, the id
//! decides and the geometric predicate is only the fallback.

use serde::{Deserialize, Serialize};

/// Decimal places used when comparing shape corners.
pub const SHAPE_PRECISION: i32 = 2;

/// Round a coordinate to [`SHAPE_PRECISION`] decimals.
pub fn round_coord(v: f64) -> f64 {
    let factor = 10f64.powi(SHAPE_PRECISION);
    (v * factor).round() / factor
}

/// Geometric shape kind understood by the rendering layer.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub enum ShapeKind {
    #[default]
    #[serde(rename = "rect")]
    Rect,
}

/// Line style of a rendered shape. The color doubles as the label encoding.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LineStyle {
    pub color: String,
    pub width: f64,
    pub dash: String,
}

/// A rectangular annotation in pixel space, in render representation.
///
/// Carries geometry plus the style and editability flags the rendering layer
/// expects. Annotation metadata (label, annotator, timestamp, derived
/// geocoordinates) lives on the store side; the renderer rejects unknown
/// shape properties, so it never sees those fields.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RectShape {
    #[serde(rename = "type", default)]
    pub kind: ShapeKind,
    pub xref: String,
    pub yref: String,
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
    pub line: LineStyle,
    pub fillcolor: String,
    pub fillrule: String,
    pub opacity: f64,
    pub layer: String,
    pub editable: bool,
    /// Stable per-session identifier, assigned when the shape is first
    /// stored. Stripped before handing the shape to the renderer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
}

impl RectShape {
    /// Build a rectangle with the standard annotation style for `color`.
    pub fn rect(
        xref: impl Into<String>,
        yref: impl Into<String>,
        x0: f64,
        y0: f64,
        x1: f64,
        y1: f64,
        color: impl Into<String>,
    ) -> Self {
        Self {
            kind: ShapeKind::Rect,
            xref: xref.into(),
            yref: yref.into(),
            x0,
            y0,
            x1,
            y1,
            line: LineStyle {
                color: color.into(),
                width: 4.0,
                dash: "solid".to_string(),
            },
            fillcolor: "rgba(0, 0, 0, 0)".to_string(),
            fillrule: "evenodd".to_string(),
            opacity: 1.0,
            layer: "above".to_string(),
            editable: true,
            id: None,
        }
    }

    /// Center pixel of the rectangle.
    pub fn center(&self) -> (f64, f64) {
        ((self.x0 + self.x1) / 2.0, (self.y0 + self.y1) / 2.0)
    }

    /// Corner-and-color identity predicate (the documented fallback).
    pub fn same_geometry(&self, other: &Self) -> bool {
        round_coord(self.x0) == round_coord(other.x0)
            && round_coord(self.x1) == round_coord(other.x1)
            && round_coord(self.y0) == round_coord(other.y0)
            && round_coord(self.y1) == round_coord(other.y1)
            && self.line.color == other.line.color
    }

    /// Identity predicate: stable ids when both sides carry one, rounded
    /// corners plus color otherwise.
    pub fn same_annotation(&self, other: &Self) -> bool {
        if let (Some(a), Some(b)) = (self.id, other.id) {
            return a == b;
        }
        self.same_geometry(other)
    }
}

/// Index of the first shape in `shapes` matching `shape`, in list order.
///
/// Ties (several stored shapes matching) resolve to the first hit; the
/// predicate is a tolerance scheme, not a guaranteed-unique key.
pub fn index_of_match(shapes: &[RectShape], shape: &RectShape) -> Option<usize> {
    shapes.iter().position(|s| s.same_annotation(shape))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shape(x0: f64, y0: f64, x1: f64, y1: f64, color: &str) -> RectShape {
        RectShape::rect("x", "y", x0, y0, x1, y1, color)
    }

    #[test]
    fn jittered_corners_match_within_two_decimals() {
        let stored = shape(10.001, 5.00, 20.00, 15.00, "#111111");
        let incoming = shape(10.00, 5.002, 20.004, 14.999, "#111111");
        assert!(stored.same_annotation(&incoming));
    }

    #[test]
    fn color_must_match_exactly() {
        let stored = shape(10.0, 5.0, 20.0, 15.0, "#111111");
        let incoming = shape(10.0, 5.0, 20.0, 15.0, "#111112");
        assert!(!stored.same_annotation(&incoming));
    }

    #[test]
    fn corners_differing_in_second_decimal_do_not_match() {
        let stored = shape(10.00, 5.0, 20.0, 15.0, "#111111");
        let incoming = shape(10.006, 5.0, 20.0, 15.0, "#111111");
        assert!(!stored.same_annotation(&incoming));
    }

    #[test]
    fn ids_take_precedence_over_geometry() {
        let mut a = shape(0.0, 0.0, 1.0, 1.0, "#111111");
        let mut b = shape(50.0, 50.0, 60.0, 60.0, "#222222");
        a.id = Some(7);
        b.id = Some(7);
        assert!(a.same_annotation(&b));

        b.id = Some(8);
        let same_geom = a.clone();
        assert!(!a.same_annotation(&b));
        // one side without an id falls back to geometry
        assert!(a.same_annotation(&RectShape { id: None, ..same_geom }));
    }

    #[test]
    fn first_match_wins_on_ties() {
        let stored = vec![
            shape(0.0, 0.0, 1.0, 1.0, "#111111"),
            shape(0.001, 0.0, 1.0, 1.0, "#111111"),
        ];
        let incoming = shape(0.0, 0.0, 1.0, 1.0, "#111111");
        assert_eq!(index_of_match(&stored, &incoming), Some(0));
        assert_eq!(
            index_of_match(&stored, &shape(9.0, 9.0, 9.5, 9.5, "#111111")),
            None
        );
    }

    #[test]
    fn serializes_with_render_field_names() {
        let mut s = shape(1.0, 2.0, 3.0, 4.0, "#FD3216");
        s.id = None;
        let value = serde_json::to_value(&s).expect("serialize");
        assert_eq!(value["type"], "rect");
        assert_eq!(value["line"]["color"], "#FD3216");
        assert_eq!(value["line"]["width"], 4.0);
        assert_eq!(value["fillrule"], "evenodd");
        assert!(value.get("id").is_none());
    }
}
