//! Band value range
//!
//! The range drives equal-interval classification, so it is computed over
//! valid cells only: no-data and non-finite values never widen it.

use landshift_core::raster::{Raster, RasterElement};
use landshift_core::{Error, Result};
use tracing::debug;

/// Minimum and maximum over the valid cells of a band
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
    /// Number of cells that contributed
    pub valid_count: usize,
}

impl ValueRange {
    /// Whether the range collapses to a single value
    pub fn is_degenerate(&self) -> bool {
        self.min == self.max
    }

    pub fn width(&self) -> f64 {
        self.max - self.min
    }
}

/// Compute the value range of a raster band.
///
/// # Errors
/// `StatisticsUnavailable` when the raster has no cells or every cell is
/// no-data.
pub fn band_range<T: RasterElement>(raster: &Raster<T>) -> Result<ValueRange> {
    if raster.is_empty() {
        return Err(Error::StatisticsUnavailable("raster has no cells".into()));
    }

    let stats = raster.statistics();
    match (stats.min, stats.max) {
        (Some(min), Some(max)) => {
            debug!(min, max, valid = stats.valid_count, "band range");
            Ok(ValueRange {
                min,
                max,
                valid_count: stats.valid_count,
            })
        }
        _ => Err(Error::StatisticsUnavailable(format!(
            "all {} cells are no-data",
            raster.len()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_ignores_nodata() {
        let mut raster =
            Raster::from_vec(vec![0.2, -9999.0, 0.8, 0.5, f64::NAN, 0.1], 2, 3).unwrap();
        raster.set_nodata(Some(-9999.0));

        let range = band_range(&raster).unwrap();
        assert_eq!(range.min, 0.1);
        assert_eq!(range.max, 0.8);
        assert_eq!(range.valid_count, 4);
        assert!(!range.is_degenerate());
    }

    #[test]
    fn test_constant_band_is_degenerate() {
        let raster: Raster<f64> = Raster::filled(4, 4, 0.3);
        let range = band_range(&raster).unwrap();
        assert!(range.is_degenerate());
        assert_eq!(range.width(), 0.0);
    }

    #[test]
    fn test_all_nodata_fails() {
        let mut raster: Raster<f64> = Raster::filled(3, 3, -9999.0);
        raster.set_nodata(Some(-9999.0));
        assert!(matches!(
            band_range(&raster),
            Err(Error::StatisticsUnavailable(_))
        ));
    }

    #[test]
    fn test_empty_raster_fails() {
        let raster: Raster<f64> = Raster::new(0, 0);
        assert!(band_range(&raster).is_err());
    }
}
