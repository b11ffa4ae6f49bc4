//! Per-frame annotation store and the download/export format.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use storm_label_core::RectShape;

/// A stored annotation: render shape plus annotation metadata and the
/// derived pixel/geo fields.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    #[serde(flatten)]
    pub shape: RectShape,
    pub label: String,
    pub annotator: String,
    /// Elapsed seconds since session start at creation time.
    pub timestamp: u64,
    pub x_center: f64,
    pub y_center: f64,
    pub lat0: f64,
    pub lon0: f64,
    pub lat1: f64,
    pub lon1: f64,
    pub lat_center: f64,
    pub lon_center: f64,
    pub projection: String,
}

impl Annotation {
    /// Shape as handed to the rendering layer: geometry and style only.
    ///
    /// The renderer rejects unknown shape properties, so the stable id is
    /// stripped along with the metadata.
    pub fn render_shape(&self) -> RectShape {
        RectShape {
            id: None,
            ..self.shape.clone()
        }
    }
}

/// One exported annotation record. This field set is the durable contract
/// for downstream consumers; style and editability fields never leak here.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DownloadRecord {
    pub annotator: String,
    pub label: String,
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
    pub lat0: f64,
    pub lat1: f64,
    pub lon0: f64,
    pub lon1: f64,
    pub x_center: f64,
    pub y_center: f64,
    pub lat_center: f64,
    pub lon_center: f64,
}

impl From<&Annotation> for DownloadRecord {
    fn from(anno: &Annotation) -> Self {
        Self {
            annotator: anno.annotator.clone(),
            label: anno.label.clone(),
            x0: anno.shape.x0,
            y0: anno.shape.y0,
            x1: anno.shape.x1,
            y1: anno.shape.y1,
            lat0: anno.lat0,
            lat1: anno.lat1,
            lon0: anno.lon0,
            lon1: anno.lon1,
            x_center: anno.x_center,
            y_center: anno.y_center,
            lat_center: anno.lat_center,
            lon_center: anno.lon_center,
        }
    }
}

/// All annotations of the session, keyed by frame timestamp, plus the
/// session start time (epoch seconds).
///
/// Every frame known to the frame source gets an (initially empty) entry at
/// construction.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnnotationStore {
    start_time: u64,
    frames: BTreeMap<String, Vec<Annotation>>,
}

impl AnnotationStore {
    pub fn new(frame_timestamps: impl IntoIterator<Item = String>, start_time: u64) -> Self {
        Self {
            start_time,
            frames: frame_timestamps
                .into_iter()
                .map(|ts| (ts, Vec::new()))
                .collect(),
        }
    }

    pub fn start_time(&self) -> u64 {
        self.start_time
    }

    /// Stored annotations of a frame; empty for frames never annotated and
    /// for unknown timestamps (a missing entry is not a fault).
    pub fn annotations(&self, timestamp: &str) -> &[Annotation] {
        self.frames.get(timestamp).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Replace a frame's annotation list wholesale.
    pub fn replace(&mut self, timestamp: &str, annotations: Vec<Annotation>) {
        self.frames.insert(timestamp.to_string(), annotations);
    }

    pub fn frame_timestamps(&self) -> impl Iterator<Item = &str> {
        self.frames.keys().map(String::as_str)
    }

    /// Total number of annotations across all frames.
    pub fn total_annotations(&self) -> usize {
        self.frames.values().map(Vec::len).sum()
    }

    /// Export view: every frame key mapped to its download records. An empty
    /// store yields an empty, well-formed object.
    pub fn download(&self) -> BTreeMap<String, Vec<DownloadRecord>> {
        self.frames
            .iter()
            .map(|(ts, annos)| (ts.clone(), annos.iter().map(DownloadRecord::from).collect()))
            .collect()
    }

    pub fn download_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.download())
    }
}
