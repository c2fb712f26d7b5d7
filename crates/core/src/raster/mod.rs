//! Raster data structures and operations

mod bands;
mod element;
mod geotransform;
mod grid;
mod neighborhood;

pub use bands::{BandSelection, RasterBands};
pub use element::RasterElement;
pub use geotransform::GeoTransform;
pub use grid::{Raster, RasterStatistics};
pub use neighborhood::Neighborhood;
