//! # LandShift Core
//!
//! Core types and I/O for the LandShift land-cover transition toolkit.
//!
//! This crate provides:
//! - `Raster<T>`: georeferenced single-band grid, and `RasterBands` for
//!   multi-band measurement files
//! - `GeoTransform` and `CRS` georeferencing metadata
//! - `Feature` / `FeatureCollection` with a resolved `LayerSchema`
//! - I/O for GeoTIFF rasters, GeoJSON polygon layers and transition tables

pub mod crs;
pub mod error;
pub mod io;
pub mod raster;
pub mod vector;

pub use crs::CRS;
pub use error::{Error, Result};
pub use raster::{GeoTransform, Raster, RasterBands, RasterElement};

/// Square metres per hectare.
pub const M2_PER_HECTARE: f64 = 10_000.0;

/// Convert an area in native (metric) units squared to hectares.
pub fn to_hectares(area_m2: f64) -> f64 {
    area_m2 / M2_PER_HECTARE
}

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::crs::CRS;
    pub use crate::error::{Error, Result};
    pub use crate::raster::{GeoTransform, Raster, RasterBands, RasterElement};
    pub use crate::vector::{AttributeValue, ClassValue, Feature, FeatureCollection, LayerSchema};
    pub use crate::to_hectares;
}
