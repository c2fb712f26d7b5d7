//! Mask clipping
//!
//! A cell is kept when its centre intersects the mask polygon (boundary
//! included); every other cell is set to no-data.

use crate::maybe_rayon::*;
use geo::{BoundingRect, Intersects, MultiPolygon, Point};
use landshift_core::raster::{Raster, RasterElement};
use landshift_core::{Error, Result};
use ndarray::Array2;

/// Set cells whose centre lies outside `mask` to no-data.
///
/// The raster's own no-data marker is used; if it has none, the type's
/// default marker (NaN for floats, -9999 for `i32`) is installed.
pub fn mask_outside<T: RasterElement>(raster: &Raster<T>, mask: &MultiPolygon<f64>) -> Result<Raster<T>> {
    let (rows, cols) = raster.shape();
    let nodata = raster.nodata().unwrap_or_else(T::default_nodata);
    let transform = *raster.transform();
    let view = raster.view();
    let envelope = mask.bounding_rect();

    let data: Vec<T> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            view.row(row)
                .iter()
                .enumerate()
                .map(|(col, &v)| {
                    let (x, y) = transform.pixel_to_geo(col, row);
                    let inside = envelope.is_some_and(|r| {
                        x >= r.min().x && x <= r.max().x && y >= r.min().y && y <= r.max().y
                    }) && mask.intersects(&Point::new(x, y));
                    if inside {
                        v
                    } else {
                        nodata
                    }
                })
                .collect::<Vec<_>>()
        })
        .collect();

    let array =
        Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;
    let mut output = raster.with_same_meta(array)?;
    output.set_nodata(Some(nodata));
    Ok(output)
}
