//! Tabular view of annotations and the shape<->row conversions.
//!
//! The table carries annotation metadata and derived numeric fields only;
//! the render shape carries geometry, style and editability flags. The two
//! conversions are lossless for the fields they share: going table->shape
//! injects the style implied by the label, going shape->table derives the
//! center and the interpolated geocoordinates from the corners.

use serde::{Deserialize, Serialize};
use storm_label_core::{GeoLookup, LabelSet, RectShape};

use crate::store::Annotation;

#[derive(thiserror::Error, Debug)]
pub enum TableError {
    /// A rendered line color with no label behind it. Recoverable: the
    /// caller keeps its previous state.
    #[error("no label is mapped to line color {0:?}")]
    UnknownColor(String),

    #[error("unknown label {0:?}")]
    UnknownLabel(String),
}

/// One row of the annotation table. Serde names match the table column ids.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    pub label: String,
    pub annotator: String,
    #[serde(rename = "XREF")]
    pub xref: String,
    #[serde(rename = "YREF")]
    pub yref: String,
    #[serde(rename = "X0")]
    pub x0: f64,
    #[serde(rename = "Y0")]
    pub y0: f64,
    #[serde(rename = "X1")]
    pub x1: f64,
    #[serde(rename = "Y1")]
    pub y1: f64,
    #[serde(rename = "Xcenter")]
    pub x_center: f64,
    #[serde(rename = "Ycenter")]
    pub y_center: f64,
    pub lon0: f64,
    pub lat0: f64,
    pub lon1: f64,
    pub lat1: f64,
    pub lon_center: f64,
    pub lat_center: f64,
}

/// Build a table row from a rendered shape, recovering the label from the
/// line color and recomputing every derived field from the corners.
///
/// The geo lookups run for both corners and the center on every call, even
/// when only one corner changed; the redundancy is accepted for simplicity.
pub fn shape_to_row(
    shape: &RectShape,
    annotator: &str,
    labels: &LabelSet,
    geo: &GeoLookup,
) -> Result<TableRow, TableError> {
    let label = labels
        .label_for_color(&shape.line.color)
        .ok_or_else(|| TableError::UnknownColor(shape.line.color.clone()))?;
    let (x_center, y_center) = shape.center();

    // interpolators take (row, col) = (y, x)
    let g0 = geo.latlon(shape.y0, shape.x0);
    let g1 = geo.latlon(shape.y1, shape.x1);
    let gc = geo.latlon(y_center, x_center);

    Ok(TableRow {
        label: label.to_string(),
        annotator: annotator.to_string(),
        xref: shape.xref.clone(),
        yref: shape.yref.clone(),
        x0: shape.x0,
        y0: shape.y0,
        x1: shape.x1,
        y1: shape.y1,
        x_center,
        y_center,
        lon0: g0.lon,
        lat0: g0.lat,
        lon1: g1.lon,
        lat1: g1.lat,
        lon_center: gc.lon,
        lat_center: gc.lat,
    })
}

/// Build a full annotation from a table row, injecting the style implied by
/// the label and carrying the row's derived fields over unchanged.
///
/// The timestamp is bookkeeping owned by reconciliation and starts at zero.
pub fn row_to_annotation(
    row: &TableRow,
    labels: &LabelSet,
    projection: &str,
) -> Result<Annotation, TableError> {
    let color = labels
        .color_for(&row.label)
        .ok_or_else(|| TableError::UnknownLabel(row.label.clone()))?;
    let shape = RectShape::rect(&row.xref, &row.yref, row.x0, row.y0, row.x1, row.y1, color);

    Ok(Annotation {
        shape,
        label: row.label.clone(),
        annotator: row.annotator.clone(),
        timestamp: 0,
        x_center: row.x_center,
        y_center: row.y_center,
        lat0: row.lat0,
        lon0: row.lon0,
        lat1: row.lat1,
        lon1: row.lon1,
        lat_center: row.lat_center,
        lon_center: row.lon_center,
        projection: projection.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use storm_label_core::GeoGrid;

    fn linear_geo(rows: usize, cols: usize) -> GeoLookup {
        let lat: Vec<f64> = (0..rows)
            .flat_map(|r| (0..cols).map(move |_| 50.0 - r as f64 * 0.1))
            .collect();
        let lon: Vec<f64> = (0..rows)
            .flat_map(|_| (0..cols).map(|c| 14.0 + c as f64 * 0.1))
            .collect();
        GeoLookup::new(
            GeoGrid::new(rows, cols, lat).expect("lat"),
            GeoGrid::new(rows, cols, lon).expect("lon"),
        )
        .expect("lookup")
    }

    #[test]
    fn derives_center_and_geocoordinates() {
        let labels = LabelSet::default_phenomena();
        let geo = linear_geo(32, 32);
        let color = labels.color_for("Cold ring").expect("color");
        let shape = RectShape::rect("x", "y", 10.0, 4.0, 20.0, 8.0, color);

        let row = shape_to_row(&shape, "marta", &labels, &geo).expect("row");
        assert_eq!(row.label, "Cold ring");
        assert_eq!(row.annotator, "marta");
        assert_relative_eq!(row.x_center, 15.0);
        assert_relative_eq!(row.y_center, 6.0);
        assert_relative_eq!(row.lat0, 50.0 - 4.0 * 0.1, epsilon = 1e-12);
        assert_relative_eq!(row.lon0, 14.0 + 10.0 * 0.1, epsilon = 1e-12);
        assert_relative_eq!(row.lat_center, 50.0 - 6.0 * 0.1, epsilon = 1e-12);
        assert_relative_eq!(row.lon_center, 14.0 + 15.0 * 0.1, epsilon = 1e-12);
    }

    #[test]
    fn unknown_color_is_a_recoverable_lookup_failure() {
        let labels = LabelSet::default_phenomena();
        let geo = linear_geo(8, 8);
        let shape = RectShape::rect("x", "y", 1.0, 1.0, 2.0, 2.0, "#0BADC0");
        assert!(matches!(
            shape_to_row(&shape, "", &labels, &geo),
            Err(TableError::UnknownColor(_))
        ));
    }

    #[test]
    fn row_shape_row_round_trip_is_lossless() {
        let labels = LabelSet::default_phenomena();
        let geo = linear_geo(32, 32);
        let color = labels.color_for("Overshooting top").expect("color");
        let shape = RectShape::rect("x2", "y2", 3.5, 2.25, 17.0, 9.75, color);

        let row = shape_to_row(&shape, "jan", &labels, &geo).expect("row");
        let anno = row_to_annotation(&row, &labels, "geos").expect("annotation");
        assert_eq!(anno.shape.line.color, color);
        assert_eq!(anno.shape.xref, "x2");
        assert!(anno.shape.editable);

        let back = shape_to_row(&anno.shape, &row.annotator, &labels, &geo).expect("row back");
        assert_eq!(back, row);
    }

    #[test]
    fn unknown_label_in_row_is_rejected() {
        let labels = LabelSet::default_phenomena();
        let geo = linear_geo(8, 8);
        let color = labels.color_for("Cold U/V").expect("color");
        let shape = RectShape::rect("x", "y", 1.0, 1.0, 2.0, 2.0, color);
        let mut row = shape_to_row(&shape, "", &labels, &geo).expect("row");
        row.label = "Mesocyclone".to_string();
        assert!(matches!(
            row_to_annotation(&row, &labels, "geos"),
            Err(TableError::UnknownLabel(_))
        ));
    }
}
