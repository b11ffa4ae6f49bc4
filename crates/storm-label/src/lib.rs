//! Annotation session engine for satellite imagery.
//!
//! Users page through time-ordered multi-channel image frames, draw
//! rectangles over phenomena, and export the annotated geocoordinates. This
//! crate owns everything between the rendering layer and the exported JSON:
//! the per-frame annotation store, shape/table reconciliation with
//! rounded-coordinate identity matching, pixel-to-lat/lon lookup, cyclic
//! frame navigation and the stable download format. Core geometric types
//! live in `storm-label-core`.
//!
//! ## Quickstart
//!
//! ```
//! use storm_label::{GeoGrid, GeoLookup, LabelSet, MemoryFrameSource, RectShape, Session};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let lat = GeoGrid::new(2, 2, vec![50.0, 50.0, 49.9, 49.9])?;
//! let lon = GeoGrid::new(2, 2, vec![14.0, 14.1, 14.0, 14.1])?;
//! let geo = GeoLookup::new(lat, lon)?;
//!
//! let frames = MemoryFrameSource::new([(
//!     "2019-11-27 11:30".to_string(),
//!     vec!["hrv".to_string(), "wv".to_string()],
//! )]);
//! let mut session = Session::new(frames, geo, LabelSet::default_phenomena(), "geos")?;
//!
//! session.set_annotator("marta");
//! let color = session.annotation_color().to_string();
//! session.shapes_replaced(&[RectShape::rect("x", "y", 0.0, 0.0, 1.0, 1.0, color.as_str())])?;
//!
//! println!("{}", session.export_json()?);
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - [`Session`]: per-event handlers (shape replace, resize deltas,
//!   previous/next, label/annotator changes) and export.
//! - [`AnnotationStore`] / [`DownloadRecord`]: persisted state and the
//!   durable export contract.
//! - [`FrameSource`] / [`FolderFrameSource`]: the image-source seam.
//! - [`storm_label_core`]: shapes, labels, geo grids (re-exported as
//!   [`core`]).

pub use storm_label_core as core;

mod config;
mod frames;
mod reconcile;
mod session;
mod store;
mod table;

pub use config::{
    ConfigError, GeoRef, GeoRefFile, SessionConfig, DEFAULT_FILE_MASK, ENV_DATA_PATH,
    ENV_FILE_MASK, ENV_GEO_PATH,
};
pub use frames::{
    wrap_index, FileMask, FolderFrameSource, Frame, FrameScanError, FrameSource, MaskError,
    MemoryFrameSource, ParsedName, ProductFile, TIMESTAMP_FORMAT,
};
pub use reconcile::{
    apply_resize_deltas, reconcile, CornerField, IdAllocator, ReconcileError, ShapeDelta,
};
pub use session::{Session, SessionError};
pub use store::{Annotation, AnnotationStore, DownloadRecord};
pub use table::{row_to_annotation, shape_to_row, TableError, TableRow};

pub use storm_label_core::{GeoGrid, GeoLookup, GeoPoint, LabelSet, RectShape, SHAPE_PRECISION};
