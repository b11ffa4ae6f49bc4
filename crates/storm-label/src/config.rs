//! Session configuration: data/geo-reference paths, file mask, labels.
//!
//! Paths are validated at construction; running against absent imagery is a
//! startup error, not something to discover later. Environment variables can
//! override the compiled-in defaults.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use storm_label_core::{GeoGrid, GeoGridError, GeoLookup, LabelSet};

/// Default file-name mask of the product images.
pub const DEFAULT_FILE_MASK: &str = "{projection}-{resolution}.{product}.{datetime:%Y%m%d.%H%M}.0.jpg";

pub const ENV_DATA_PATH: &str = "STORM_LABEL_DATA_PATH";
pub const ENV_GEO_PATH: &str = "STORM_LABEL_GEO_PATH";
pub const ENV_FILE_MASK: &str = "STORM_LABEL_DATA_FILENAME_MASK";

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("data path {0} does not exist")]
    MissingDataPath(PathBuf),

    #[error("geo-reference path {0} does not exist")]
    MissingGeoPath(PathBuf),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Grid(#[from] GeoGridError),
}

/// Immutable per-session configuration, built once at startup.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub data_path: PathBuf,
    pub geo_path: PathBuf,
    pub file_mask: String,
    pub labels: LabelSet,
}

impl SessionConfig {
    /// Validate paths and build a config with the default label set and
    /// file mask.
    pub fn new(data_path: impl Into<PathBuf>, geo_path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let data_path = data_path.into();
        let geo_path = geo_path.into();
        if !data_path.exists() {
            return Err(ConfigError::MissingDataPath(data_path));
        }
        if !geo_path.exists() {
            return Err(ConfigError::MissingGeoPath(geo_path));
        }
        Ok(Self {
            data_path,
            geo_path,
            file_mask: DEFAULT_FILE_MASK.to_string(),
            labels: LabelSet::default_phenomena(),
        })
    }

    /// Build a config from `default_*` paths with `STORM_LABEL_*` env
    /// overrides applied first.
    pub fn from_env(
        default_data: impl Into<PathBuf>,
        default_geo: impl Into<PathBuf>,
    ) -> Result<Self, ConfigError> {
        let data_path = env::var_os(ENV_DATA_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|| default_data.into());
        let geo_path = env::var_os(ENV_GEO_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|| default_geo.into());
        let mut config = Self::new(data_path, geo_path)?;
        if let Some(mask) = env::var_os(ENV_FILE_MASK).and_then(|m| m.into_string().ok()) {
            config.file_mask = mask;
        }
        Ok(config)
    }

    /// Load the geo-reference grids from `geo_path`.
    pub fn load_georef(&self) -> Result<GeoRef, ConfigError> {
        GeoRefFile::load_json(&self.geo_path)?.into_georef()
    }
}

/// Geo-reference ready for lookups: the interpolation grids plus the
/// projection tag carried into stored annotations.
#[derive(Clone, Debug)]
pub struct GeoRef {
    pub lookup: GeoLookup,
    pub projection: String,
}

/// On-disk geo-reference: row-major lat/lon grids of a common shape.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GeoRefFile {
    #[serde(default)]
    pub projection: String,
    pub rows: usize,
    pub cols: usize,
    pub lat: Vec<f64>,
    pub lon: Vec<f64>,
}

impl GeoRefFile {
    /// Load a JSON geo-reference from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this geo-reference to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn into_georef(self) -> Result<GeoRef, ConfigError> {
        let lat = GeoGrid::new(self.rows, self.cols, self.lat)?;
        let lon = GeoGrid::new(self.rows, self.cols, self.lon)?;
        Ok(GeoRef {
            lookup: GeoLookup::new(lat, lon)?,
            projection: self.projection,
        })
    }
}
