//! I/O operations for reading and writing geospatial data
//!
//! - GeoTIFF rasters through the pure-Rust `tiff` crate
//! - GeoJSON polygon layers through `serde_json`
//! - transition tables as CSV

mod geojson;
mod geotiff;
mod table;

pub use geojson::{
    feature_collection_from_json, feature_collection_to_json, read_geojson, write_geojson,
};
pub use geotiff::{
    read_geotiff, read_geotiff_bands, read_geotiff_from_buffer, write_geotiff,
    write_geotiff_to_buffer,
};
pub use table::{read_transition_csv, write_transition_csv, TransitionRow, AREA_COLUMN};
