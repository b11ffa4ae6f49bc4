//! Shape/table reconciliation.
//!
//! Two event kinds feed the reconciler: a full shape-list replace (a new
//! rectangle drawn, a shape erased, any non-incremental change) and a sparse
//! set of `shapes[N].<field>` deltas from dragging a corner handle. Both end
//! in the per-frame store being rewritten from the table; timestamps survive
//! through identity matching against the previously stored list.

use std::collections::BTreeMap;

use storm_label_core::{GeoLookup, LabelSet, RectShape};

use crate::store::Annotation;
use crate::table::{shape_to_row, TableError, TableRow};

#[derive(thiserror::Error, Debug)]
pub enum ReconcileError {
    /// A delta referenced a row the table does not have. Recoverable: the
    /// caller keeps its previous state.
    #[error("shape index {index} out of range (table has {len} rows)")]
    ShapeIndexOutOfRange { index: usize, len: usize },

    #[error("malformed shape property id {0:?}")]
    MalformedProperty(String),

    #[error(transparent)]
    Table(#[from] TableError),
}

/// Session-scoped allocator for stable annotation ids.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdAllocator {
    next: u64,
}

impl IdAllocator {
    pub fn next_id(&mut self) -> u64 {
        let id = self.next;
        self.next += 1;
        id
    }
}

/// Classify each incoming annotation as existing (identity match in the
/// stored list) or new. Existing annotations inherit the matched stored
/// annotation's timestamp and stable id; new ones get `elapsed` as their
/// timestamp and a fresh id. The returned list replaces the stored one.
pub fn reconcile(
    incoming: Vec<Annotation>,
    stored: &[Annotation],
    elapsed: u64,
    ids: &mut IdAllocator,
) -> Vec<Annotation> {
    let mut new_count = 0usize;
    let reconciled: Vec<Annotation> = incoming
        .into_iter()
        .map(|mut anno| {
            match index_of_stored_match(stored, &anno.shape) {
                Some(i) => {
                    anno.timestamp = stored[i].timestamp;
                    anno.shape.id = stored[i].shape.id;
                }
                None => {
                    anno.timestamp = elapsed;
                    anno.shape.id = Some(ids.next_id());
                    new_count += 1;
                }
            }
            anno
        })
        .collect();
    if new_count > 0 {
        log::debug!("reconciled {} shapes, {new_count} new", reconciled.len());
    }
    reconciled
}

/// First stored annotation matching `shape`, in list order.
pub fn index_of_stored_match(stored: &[Annotation], shape: &RectShape) -> Option<usize> {
    stored.iter().position(|a| a.shape.same_annotation(shape))
}

/// Corner field addressed by a resize delta.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CornerField {
    X0,
    Y0,
    X1,
    Y1,
}

impl CornerField {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "x0" => Some(Self::X0),
            "y0" => Some(Self::Y0),
            "x1" => Some(Self::X1),
            "y1" => Some(Self::Y1),
            _ => None,
        }
    }

    fn apply(self, shape: &mut RectShape, value: f64) {
        match self {
            Self::X0 => shape.x0 = value,
            Self::Y0 => shape.y0 = value,
            Self::X1 => shape.x1 = value,
            Self::Y1 => shape.y1 = value,
        }
    }
}

/// One field-level update from a corner drag.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShapeDelta {
    pub index: usize,
    pub field: CornerField,
    pub value: f64,
}

impl ShapeDelta {
    /// Parse a property id of the form `shapes[2].x0`.
    pub fn parse(prop: &str, value: f64) -> Result<Self, ReconcileError> {
        let malformed = || ReconcileError::MalformedProperty(prop.to_string());
        let rest = prop.strip_prefix("shapes[").ok_or_else(malformed)?;
        let (index, field) = rest.split_once("].").ok_or_else(malformed)?;
        let index = index.parse().map_err(|_| malformed())?;
        let field = CornerField::parse(field).ok_or_else(malformed)?;
        Ok(Self { index, field, value })
    }
}

/// Apply resize deltas on top of the current table rows.
///
/// Deltas are grouped per row; for each affected row the new corner values
/// are merged onto the row's current geometry and every derived field is
/// recomputed. Untouched rows are returned as-is. Any out-of-range index
/// fails the whole batch before any row is rebuilt.
pub fn apply_resize_deltas(
    rows: &[TableRow],
    deltas: &[ShapeDelta],
    labels: &LabelSet,
    geo: &GeoLookup,
) -> Result<Vec<TableRow>, ReconcileError> {
    let mut by_index: BTreeMap<usize, Vec<ShapeDelta>> = BTreeMap::new();
    for delta in deltas {
        if delta.index >= rows.len() {
            return Err(ReconcileError::ShapeIndexOutOfRange {
                index: delta.index,
                len: rows.len(),
            });
        }
        by_index.entry(delta.index).or_default().push(*delta);
    }

    let mut out = rows.to_vec();
    for (index, group) in by_index {
        let row = &rows[index];
        let color = labels
            .color_for(&row.label)
            .ok_or_else(|| TableError::UnknownLabel(row.label.clone()))?;
        let mut shape = RectShape::rect(&row.xref, &row.yref, row.x0, row.y0, row.x1, row.y1, color);
        for delta in group {
            delta.field.apply(&mut shape, delta.value);
        }
        out[index] = shape_to_row(&shape, &row.annotator, labels, geo)?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::row_to_annotation;
    use storm_label_core::{GeoGrid, LabelSet};

    fn linear_geo(n: usize) -> GeoLookup {
        let lat: Vec<f64> = (0..n).flat_map(|r| (0..n).map(move |_| r as f64)).collect();
        let lon: Vec<f64> = (0..n).flat_map(|_| (0..n).map(|c| c as f64)).collect();
        GeoLookup::new(
            GeoGrid::new(n, n, lat).expect("lat"),
            GeoGrid::new(n, n, lon).expect("lon"),
        )
        .expect("lookup")
    }

    fn annotation(
        labels: &LabelSet,
        geo: &GeoLookup,
        label: &str,
        corners: [f64; 4],
    ) -> Annotation {
        let color = labels.color_for(label).expect("color");
        let shape = RectShape::rect("x", "y", corners[0], corners[1], corners[2], corners[3], color);
        let row = shape_to_row(&shape, "eva", labels, geo).expect("row");
        row_to_annotation(&row, labels, "geos").expect("annotation")
    }

    #[test]
    fn existing_shapes_keep_their_timestamp_and_id() {
        let labels = LabelSet::default_phenomena();
        let geo = linear_geo(32);
        let mut ids = IdAllocator::default();

        let first = reconcile(
            vec![annotation(&labels, &geo, "Cold ring", [10.0, 5.0, 20.0, 15.0])],
            &[],
            7,
            &mut ids,
        );
        assert_eq!(first[0].timestamp, 7);
        assert_eq!(first[0].shape.id, Some(0));

        // the renderer echoes the shape back with sub-precision jitter and
        // without the stable id
        let jittered = annotation(&labels, &geo, "Cold ring", [10.001, 5.002, 20.004, 14.999]);
        let second = reconcile(vec![jittered], &first, 99, &mut ids);
        assert_eq!(second[0].timestamp, 7);
        assert_eq!(second[0].shape.id, Some(0));
    }

    #[test]
    fn new_shapes_get_elapsed_timestamps_and_fresh_ids() {
        let labels = LabelSet::default_phenomena();
        let geo = linear_geo(32);
        let mut ids = IdAllocator::default();

        let stored = reconcile(
            vec![annotation(&labels, &geo, "Cold ring", [1.0, 1.0, 2.0, 2.0])],
            &[],
            3,
            &mut ids,
        );
        let incoming = vec![
            stored[0].clone(),
            annotation(&labels, &geo, "Overshooting top", [5.0, 5.0, 8.0, 8.0]),
            annotation(&labels, &geo, "Cold U/V", [9.0, 9.0, 12.0, 12.0]),
        ];
        let reconciled = reconcile(incoming, &stored, 11, &mut ids);

        assert_eq!(reconciled[0].timestamp, 3);
        assert!(reconciled[1].timestamp > 0);
        assert_eq!(reconciled[1].timestamp, 11);
        assert!(reconciled[2].timestamp >= reconciled[1].timestamp);
        assert_eq!(reconciled[1].shape.id, Some(1));
        assert_eq!(reconciled[2].shape.id, Some(2));
    }

    #[test]
    fn same_label_different_geometry_is_a_new_shape() {
        let labels = LabelSet::default_phenomena();
        let geo = linear_geo(32);
        let mut ids = IdAllocator::default();

        let stored = reconcile(
            vec![annotation(&labels, &geo, "Cold ring", [1.0, 1.0, 2.0, 2.0])],
            &[],
            3,
            &mut ids,
        );
        // dragged by more than the rounding tolerance
        let moved = annotation(&labels, &geo, "Cold ring", [1.1, 1.0, 2.1, 2.0]);
        let reconciled = reconcile(vec![moved], &stored, 20, &mut ids);
        assert_eq!(reconciled[0].timestamp, 20);
        assert_ne!(reconciled[0].shape.id, stored[0].shape.id);
    }

    #[test]
    fn parses_shape_property_ids() {
        let delta = ShapeDelta::parse("shapes[2].x0", 12.5).expect("delta");
        assert_eq!(delta.index, 2);
        assert_eq!(delta.field, CornerField::X0);
        assert_eq!(delta.value, 12.5);

        for bad in ["shapes[2].width", "shape[2].x0", "shapes[two].x0", "x0"] {
            assert!(matches!(
                ShapeDelta::parse(bad, 0.0),
                Err(ReconcileError::MalformedProperty(_))
            ));
        }
    }

    #[test]
    fn deltas_merge_onto_the_addressed_row_only() {
        let labels = LabelSet::default_phenomena();
        let geo = linear_geo(32);
        let rows: Vec<TableRow> = [
            annotation(&labels, &geo, "Cold ring", [1.0, 1.0, 2.0, 2.0]),
            annotation(&labels, &geo, "Cold U/V", [5.0, 5.0, 8.0, 9.0]),
        ]
        .iter()
        .map(|a| shape_to_row(&a.shape, &a.annotator, &labels, &geo).expect("row"))
        .collect();

        let deltas = [
            ShapeDelta::parse("shapes[1].x1", 10.0).expect("delta"),
            ShapeDelta::parse("shapes[1].y1", 11.0).expect("delta"),
        ];
        let updated = apply_resize_deltas(&rows, &deltas, &labels, &geo).expect("apply");

        assert_eq!(updated[0], rows[0]);
        assert_eq!(updated[1].x1, 10.0);
        assert_eq!(updated[1].y1, 11.0);
        assert_eq!(updated[1].x0, 5.0);
        assert_eq!(updated[1].annotator, "eva");
        assert_eq!(updated[1].x_center, 7.5);
        assert_eq!(updated[1].lat1, 11.0);
        assert_eq!(updated[1].lon1, 10.0);
    }

    #[test]
    fn out_of_range_delta_fails_without_touching_rows() {
        let labels = LabelSet::default_phenomena();
        let geo = linear_geo(32);
        let rows = vec![
            shape_to_row(
                &annotation(&labels, &geo, "Cold ring", [1.0, 1.0, 2.0, 2.0]).shape,
                "eva",
                &labels,
                &geo,
            )
            .expect("row"),
        ];

        let deltas = [ShapeDelta::parse("shapes[4].x0", 1.5).expect("delta")];
        assert!(matches!(
            apply_resize_deltas(&rows, &deltas, &labels, &geo),
            Err(ReconcileError::ShapeIndexOutOfRange { index: 4, len: 1 })
        ));
    }
}
