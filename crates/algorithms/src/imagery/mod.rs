//! Raster preparation before vectorization
//!
//! - Reclassify: measurement values → integer class ids
//! - Mask: blank out cells outside an area of interest

mod mask;
mod reclassify;

pub use mask::mask_outside;
pub use reclassify::{reclassify, CLASS_NODATA};
