//! The annotation session: explicit, synchronous event handlers over one
//! session-state structure.
//!
//! The hosting UI delivers one event at a time (shape list replaced, corner
//! dragged, previous/next clicked, label or annotator changed); each handler
//! is a pure transformation of the in-memory state. Handlers that fail leave
//! the prior state untouched.

use std::time::{SystemTime, UNIX_EPOCH};

use storm_label_core::{GeoLookup, LabelSet, RectShape};

use crate::frames::{wrap_index, FrameSource};
use crate::reconcile::{apply_resize_deltas, reconcile, IdAllocator, ReconcileError, ShapeDelta};
use crate::store::AnnotationStore;
use crate::table::{row_to_annotation, shape_to_row, TableError, TableRow};

#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    #[error("frame source has no frames")]
    NoFrames,

    #[error("frame index {0} is unknown to the frame source")]
    UnknownFrame(usize),

    #[error("unknown phenomenon label {0:?}")]
    UnknownLabel(String),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    #[error(transparent)]
    Export(#[from] serde_json::Error),
}

/// One browser session's full annotation state.
pub struct Session<F: FrameSource> {
    frames: F,
    labels: LabelSet,
    geo: GeoLookup,
    projection: String,
    store: AnnotationStore,
    rows: Vec<TableRow>,
    current: usize,
    annotator: String,
    annotation_type: String,
    ids: IdAllocator,
}

fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

impl<F: FrameSource> Session<F> {
    pub fn new(
        frames: F,
        geo: GeoLookup,
        labels: LabelSet,
        projection: impl Into<String>,
    ) -> Result<Self, SessionError> {
        if frames.is_empty() {
            return Err(SessionError::NoFrames);
        }
        let timestamps: Vec<String> = (0..frames.len()).filter_map(|i| frames.timestamp(i)).collect();
        let store = AnnotationStore::new(timestamps, epoch_secs());
        let annotation_type = labels.default_label().to_string();
        log::info!("session over {} frames", frames.len());
        Ok(Self {
            frames,
            labels,
            geo,
            projection: projection.into(),
            store,
            rows: Vec::new(),
            current: 0,
            annotator: String::new(),
            annotation_type,
            ids: IdAllocator::default(),
        })
    }

    fn elapsed(&self) -> u64 {
        epoch_secs().saturating_sub(self.store.start_time()).max(1)
    }

    pub fn current_frame(&self) -> usize {
        self.current
    }

    pub fn current_timestamp(&self) -> Result<String, SessionError> {
        self.frames
            .timestamp(self.current)
            .ok_or(SessionError::UnknownFrame(self.current))
    }

    /// Product names of the current frame, for the frame-description panel.
    pub fn current_products(&self) -> Vec<String> {
        self.frames.products(self.current).unwrap_or_default()
    }

    /// Rows of the annotation table for the current frame.
    pub fn table(&self) -> &[TableRow] {
        &self.rows
    }

    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    pub fn annotator(&self) -> &str {
        &self.annotator
    }

    pub fn set_annotator(&mut self, name: impl Into<String>) {
        self.annotator = name.into();
    }

    pub fn annotation_type(&self) -> &str {
        &self.annotation_type
    }

    /// Select the phenomenon type used for newly drawn shapes.
    pub fn set_annotation_type(&mut self, label: &str) -> Result<(), SessionError> {
        if !self.labels.contains(label) {
            return Err(SessionError::UnknownLabel(label.to_string()));
        }
        self.annotation_type = label.to_string();
        Ok(())
    }

    /// Line color for newly drawn shapes (encodes the selected label).
    pub fn annotation_color(&self) -> &str {
        // the selected type is validated against the label set
        self.labels
            .color_for(&self.annotation_type)
            .unwrap_or(storm_label_core::LIGHT24_PALETTE[0])
    }

    /// Shapes of the current frame as the rendering layer expects them.
    pub fn render_shapes(&self) -> Result<Vec<RectShape>, SessionError> {
        let timestamp = self.current_timestamp()?;
        Ok(self
            .store
            .annotations(&timestamp)
            .iter()
            .map(|a| a.render_shape())
            .collect())
    }

    /// Full shape-list replace: a new rectangle was drawn, a shape erased,
    /// or any other non-incremental change happened.
    pub fn shapes_replaced(&mut self, shapes: &[RectShape]) -> Result<(), SessionError> {
        let rows = shapes
            .iter()
            .map(|s| shape_to_row(s, &self.annotator, &self.labels, &self.geo))
            .collect::<Result<Vec<_>, _>>()?;
        self.rows = rows;
        self.sync_store()
    }

    /// Sparse resize deltas from dragging a shape's corner handle.
    pub fn shapes_resized(&mut self, deltas: &[ShapeDelta]) -> Result<(), SessionError> {
        let rows = apply_resize_deltas(&self.rows, deltas, &self.labels, &self.geo)?;
        self.rows = rows;
        self.sync_store()
    }

    /// A label was edited in the table's dropdown column.
    pub fn row_label_changed(&mut self, index: usize, label: &str) -> Result<(), SessionError> {
        if !self.labels.contains(label) {
            return Err(SessionError::UnknownLabel(label.to_string()));
        }
        let len = self.rows.len();
        let row = self
            .rows
            .get_mut(index)
            .ok_or(ReconcileError::ShapeIndexOutOfRange { index, len })?;
        row.label = label.to_string();
        self.sync_store()
    }

    /// Rewrite the current frame's stored list from the table, preserving
    /// timestamps of shapes that identity-match a stored one.
    fn sync_store(&mut self) -> Result<(), SessionError> {
        let timestamp = self.current_timestamp()?;
        let incoming = self
            .rows
            .iter()
            .map(|row| row_to_annotation(row, &self.labels, &self.projection))
            .collect::<Result<Vec<_>, _>>()?;
        let reconciled = reconcile(
            incoming,
            self.store.annotations(&timestamp),
            self.elapsed(),
            &mut self.ids,
        );
        self.store.replace(&timestamp, reconciled);
        Ok(())
    }

    pub fn next_frame(&mut self) -> Result<String, SessionError> {
        self.step_frame(1)
    }

    pub fn previous_frame(&mut self) -> Result<String, SessionError> {
        self.step_frame(-1)
    }

    fn step_frame(&mut self, step: i64) -> Result<String, SessionError> {
        let target = wrap_index(self.current, step, self.frames.len());
        let timestamp = self
            .frames
            .timestamp(target)
            .ok_or(SessionError::UnknownFrame(target))?;
        let rows = self
            .store
            .annotations(&timestamp)
            .iter()
            .map(|a| shape_to_row(&a.shape, &self.annotator, &self.labels, &self.geo))
            .collect::<Result<Vec<_>, _>>()?;
        self.current = target;
        self.rows = rows;
        log::debug!("frame {} ({timestamp})", self.current);
        Ok(timestamp)
    }

    pub fn store(&self) -> &AnnotationStore {
        &self.store
    }

    /// Serialized export of the whole store (the download contract).
    pub fn export_json(&self) -> Result<String, SessionError> {
        Ok(self.store.download_json()?)
    }
}
