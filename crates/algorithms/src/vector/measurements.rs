//! Areal measurements
//!
//! Areas are planar: for a geographic CRS the result is in square degrees
//! and the hectare conversion is meaningless. Project to a metric CRS first.

use geo::{Area, MultiPolygon};
use landshift_core::to_hectares;

/// Area of a multipolygon in hectares, assuming metre units
pub fn area_ha(geom: &MultiPolygon<f64>) -> f64 {
    to_hectares(geom.unsigned_area())
}
