//! Measurement raster → class raster
//!
//! Applies a [`ClassBreaks`] set to every valid cell. The output is an `i32`
//! raster carrying the input's georeferencing.

use crate::classification::{ClassBreaks, ClassId};
use crate::maybe_rayon::*;
use landshift_core::raster::Raster;
use landshift_core::{Error, Result};
use ndarray::Array2;

/// No-data marker of class rasters
pub const CLASS_NODATA: ClassId = -9999;

/// Classify every cell of a measurement raster.
///
/// No-data and NaN cells become [`CLASS_NODATA`]; all other cells get the
/// class of their value, values outside the break range clamping to the
/// first or last class.
///
/// # Example
/// ```ignore
/// let range = band_range(&ndvi)?;
/// let breaks = classify(range.min, range.max, 5)?;
/// let classes = reclassify(&ndvi, &breaks)?;
/// ```
pub fn reclassify(raster: &Raster<f64>, breaks: &ClassBreaks) -> Result<Raster<ClassId>> {
    let (rows, cols) = raster.shape();
    let view = raster.view();

    let data: Vec<ClassId> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            view.row(row)
                .iter()
                .map(|&v| {
                    if raster.is_nodata(v) {
                        CLASS_NODATA
                    } else {
                        breaks.class_of(v).unwrap_or(CLASS_NODATA)
                    }
                })
                .collect::<Vec<_>>()
        })
        .collect();

    let array =
        Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;
    let mut output = raster.with_same_meta(array)?;
    output.set_nodata(Some(CLASS_NODATA));
    Ok(output)
}
