//! Multi-band measurement rasters and band selection

use crate::error::{Error, Result};
use crate::raster::Raster;
use serde::{Deserialize, Serialize};

/// How to pick the measurement band out of a multi-band file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BandSelection {
    /// Band 3 when the file has at least three bands (the NDVI band of the
    /// usual R-G-NDVI composites), otherwise band 1
    #[default]
    Auto,
    /// A fixed 1-based band number
    #[serde(untagged)]
    Index(usize),
}

impl BandSelection {
    /// Resolve to a 1-based band number for a file with `count` bands
    pub fn resolve(&self, count: usize) -> Result<usize> {
        let band = match *self {
            BandSelection::Auto if count >= 3 => 3,
            BandSelection::Auto => 1,
            BandSelection::Index(n) => n,
        };
        if band == 0 || band > count {
            return Err(Error::BandOutOfRange { band, count });
        }
        Ok(band)
    }
}

/// All bands of a measurement raster, sharing one georeferencing
#[derive(Debug, Clone)]
pub struct RasterBands {
    bands: Vec<Raster<f64>>,
}

impl RasterBands {
    /// Wrap a list of equally-shaped bands
    pub fn new(bands: Vec<Raster<f64>>) -> Result<Self> {
        let Some(first) = bands.first() else {
            return Err(Error::InvalidDimensions { width: 0, height: 0 });
        };
        let shape = first.shape();
        if let Some(bad) = bands.iter().find(|b| b.shape() != shape) {
            return Err(Error::InvalidDimensions {
                width: bad.cols(),
                height: bad.rows(),
            });
        }
        Ok(Self { bands })
    }

    /// Number of bands
    pub fn count(&self) -> usize {
        self.bands.len()
    }

    /// 1-based band access
    pub fn band(&self, band: usize) -> Result<&Raster<f64>> {
        band.checked_sub(1)
            .and_then(|i| self.bands.get(i))
            .ok_or(Error::BandOutOfRange {
                band,
                count: self.count(),
            })
    }

    /// Apply a selection policy and return the chosen band
    pub fn select(&self, selection: BandSelection) -> Result<&Raster<f64>> {
        self.band(selection.resolve(self.count())?)
    }

    /// Take ownership of the chosen band
    pub fn into_band(mut self, selection: BandSelection) -> Result<Raster<f64>> {
        let band = selection.resolve(self.count())?;
        Ok(self.bands.swap_remove(band - 1))
    }
}
