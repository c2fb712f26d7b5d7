//! Coordinate Reference System handling
//!
//! Only EPSG codes are tracked. Areas are reported in hectares, which is only
//! meaningful for projected (metric) systems; `is_geographic` lets callers
//! warn when a layer is in degrees.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coordinate Reference System identified by its EPSG code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CRS {
    epsg: u32,
}

impl CRS {
    /// Create a CRS from an EPSG code
    pub fn from_epsg(code: u32) -> Self {
        Self { epsg: code }
    }

    /// Get the EPSG code
    pub fn epsg(&self) -> u32 {
        self.epsg
    }

    /// Whether coordinates are angular (degrees) rather than linear.
    ///
    /// Recognises the common geographic codes (WGS84, SIRGAS 2000, NAD83,
    /// ETRS89, GDA94/2020).
    pub fn is_geographic(&self) -> bool {
        matches!(self.epsg, 4326 | 4674 | 4269 | 4258 | 4283 | 7844 | 4019)
    }

    /// Parse an `EPSG:<code>` or OGC URN (`urn:ogc:def:crs:EPSG::<code>`) string
    pub fn parse(s: &str) -> Option<Self> {
        let code = s.rsplit(':').next()?.trim();
        if !s.to_ascii_uppercase().contains("EPSG") {
            return None;
        }
        code.parse().ok().map(Self::from_epsg)
    }

    /// OGC URN used in GeoJSON `crs` members
    pub fn urn(&self) -> String {
        format!("urn:ogc:def:crs:EPSG::{}", self.epsg)
    }
}

impl fmt::Display for CRS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crs_epsg() {
        let crs = CRS::from_epsg(31983);
        assert_eq!(crs.epsg(), 31983);
        assert_eq!(crs.to_string(), "EPSG:31983");
        assert!(!crs.is_geographic());
        assert!(CRS::from_epsg(4326).is_geographic());
    }

    #[test]
    fn test_crs_parse() {
        assert_eq!(CRS::parse("EPSG:31983"), Some(CRS::from_epsg(31983)));
        assert_eq!(
            CRS::parse("urn:ogc:def:crs:EPSG::4674"),
            Some(CRS::from_epsg(4674))
        );
        assert_eq!(CRS::parse("OGC:CRS84"), None);
        assert_eq!(CRS::parse(&CRS::from_epsg(32723).urn()), Some(CRS::from_epsg(32723)));
    }
}
