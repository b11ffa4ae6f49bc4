//! Static geographic grids and bilinear pixel->lat/lon lookup.
//!
//! The latitude/longitude grids are established once at startup and shared
//! by all frames. Lookups interpolate the two grids independently; queries
//! outside the grid are clamped to the border (annotations live inside the
//! image, so the clamp only guards degenerate input).

#[derive(thiserror::Error, Debug)]
pub enum GeoGridError {
    #[error("grid dimensions {rows}x{cols} do not match data length {len}")]
    DimensionMismatch { rows: usize, cols: usize, len: usize },

    #[error("grid must have at least one row and one column")]
    Empty,

    #[error("latitude grid is {lat_rows}x{lat_cols} but longitude grid is {lon_rows}x{lon_cols}")]
    GridShapeMismatch {
        lat_rows: usize,
        lat_cols: usize,
        lon_rows: usize,
        lon_cols: usize,
    },
}

/// Row-major 2-D scalar grid.
#[derive(Clone, Debug)]
pub struct GeoGrid {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl GeoGrid {
    pub fn new(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self, GeoGridError> {
        if rows == 0 || cols == 0 {
            return Err(GeoGridError::Empty);
        }
        if data.len() != rows * cols {
            return Err(GeoGridError::DimensionMismatch {
                rows,
                cols,
                len: data.len(),
            });
        }
        Ok(Self { rows, cols, data })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    fn at(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.cols + col]
    }

    /// Bilinear sample at fractional `(row, col)`, clamped to the border.
    pub fn sample(&self, row: f64, col: f64) -> f64 {
        let r = row.clamp(0.0, (self.rows - 1) as f64);
        let c = col.clamp(0.0, (self.cols - 1) as f64);

        let r0 = r.floor() as usize;
        let c0 = c.floor() as usize;
        let r1 = (r0 + 1).min(self.rows - 1);
        let c1 = (c0 + 1).min(self.cols - 1);
        let fr = r - r0 as f64;
        let fc = c - c0 as f64;

        let p00 = self.at(r0, c0);
        let p01 = self.at(r0, c1);
        let p10 = self.at(r1, c0);
        let p11 = self.at(r1, c1);

        let top = p00 + fc * (p01 - p00);
        let bottom = p10 + fc * (p11 - p10);
        top + fr * (bottom - top)
    }
}

/// Interpolated geographic coordinates of a pixel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

/// Paired latitude/longitude grids with a shared shape.
#[derive(Clone, Debug)]
pub struct GeoLookup {
    lat: GeoGrid,
    lon: GeoGrid,
}

impl GeoLookup {
    pub fn new(lat: GeoGrid, lon: GeoGrid) -> Result<Self, GeoGridError> {
        if lat.rows != lon.rows || lat.cols != lon.cols {
            return Err(GeoGridError::GridShapeMismatch {
                lat_rows: lat.rows,
                lat_cols: lat.cols,
                lon_rows: lon.rows,
                lon_cols: lon.cols,
            });
        }
        Ok(Self { lat, lon })
    }

    pub fn rows(&self) -> usize {
        self.lat.rows
    }

    pub fn cols(&self) -> usize {
        self.lat.cols
    }

    /// Lat/lon at fractional pixel `(row, col)`, i.e. `(y, x)`.
    pub fn latlon(&self, row: f64, col: f64) -> GeoPoint {
        GeoPoint {
            lat: self.lat.sample(row, col),
            lon: self.lon.sample(row, col),
        }
    }
}
