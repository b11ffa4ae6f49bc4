//! Core types for satellite storm-phenomenon annotation.
//!
//! This crate is intentionally small and purely typed/geometric: rectangle
//! annotation shapes with their identity-matching rules, phenomenon label
//! sets with a bijective label<->color mapping, and static lat/lon grids
//! with bilinear pixel lookup. It knows nothing about sessions, stores or
//! frame sources.

mod geo;
mod label;
mod logger;
mod shape;

pub use geo::{GeoGrid, GeoGridError, GeoLookup, GeoPoint};
pub use label::{LabelError, LabelSet, DEFAULT_PHENOMENA, LIGHT24_PALETTE};
pub use shape::{index_of_match, round_coord, LineStyle, RectShape, ShapeKind, SHAPE_PRECISION};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::init_with_level;
