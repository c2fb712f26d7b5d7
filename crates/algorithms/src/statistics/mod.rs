//! Statistical queries over measurement rasters
//!
//! - **probe**: minimum/maximum of the valid cells of a band

mod probe;

pub use probe::{band_range, ValueRange};
