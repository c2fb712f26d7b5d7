//! Error types for LandShift

use thiserror::Error;

/// Main error type for LandShift operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TIFF error: {0}")]
    Tiff(String),

    #[error("GeoJSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Index out of bounds: ({row}, {col}) in raster of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Band {band} out of range (raster has {count} band(s))")]
    BandOutOfRange { band: usize, count: usize },

    #[error("Statistics unavailable: {0}")]
    StatisticsUnavailable(String),

    #[error("Missing field '{field}' in layer '{layer}'")]
    MissingField { field: String, layer: String },

    #[error("Invalid value for field '{field}' in feature {index}: {reason}")]
    InvalidAttribute {
        field: String,
        index: usize,
        reason: String,
    },

    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Field '{0}' appears more than once in the overlay chain")]
    DuplicateField(String),

    #[error("Overlay chain needs at least one period layer")]
    EmptyChain,

    #[error("CRS mismatch: {0} vs {1}")]
    CrsMismatch(String, String),

    #[error("Unsupported data type: {0}")]
    UnsupportedDataType(String),

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("{0}")]
    Other(String),
}

impl From<tiff::TiffError> for Error {
    fn from(e: tiff::TiffError) -> Self {
        Error::Tiff(e.to_string())
    }
}

/// Result type alias for LandShift operations
pub type Result<T> = std::result::Result<T, Error>;
