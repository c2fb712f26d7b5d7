//! Raster element trait for generic cell values

use num_traits::{NumCast, Zero};
use std::fmt::Debug;

/// Trait for types that can be stored in a raster cell.
///
/// Measurement rasters use `f64`; classified rasters use `i32` class ids.
pub trait RasterElement:
    Copy + Debug + PartialOrd + PartialEq + NumCast + Zero + Send + Sync + 'static
{
    /// Default no-data value for this type
    fn default_nodata() -> Self;

    /// Check if this value represents no-data
    fn is_nodata(&self, nodata: Option<Self>) -> bool;

    /// Convert self to f64
    fn to_f64(self) -> Option<f64> {
        NumCast::from(self)
    }

    /// Convert from f64, `None` when out of range or not representable
    fn from_f64(value: f64) -> Option<Self> {
        NumCast::from(value)
    }
}

macro_rules! impl_integer_element {
    ($($t:ty => $nodata:expr),* $(,)?) => {
        $(
            impl RasterElement for $t {
                fn default_nodata() -> Self {
                    $nodata
                }

                fn is_nodata(&self, nodata: Option<Self>) -> bool {
                    nodata.map_or(false, |nd| *self == nd)
                }
            }
        )*
    };
}

macro_rules! impl_float_element {
    ($($t:ty),*) => {
        $(
            impl RasterElement for $t {
                fn default_nodata() -> Self {
                    <$t>::NAN
                }

                fn is_nodata(&self, nodata: Option<Self>) -> bool {
                    if self.is_nan() {
                        return true;
                    }
                    match nodata {
                        Some(nd) if nd.is_nan() => false,
                        Some(nd) => (self - nd).abs() <= <$t>::EPSILON * nd.abs().max(1.0),
                        None => false,
                    }
                }
            }
        )*
    };
}

// -9999 is the conventional GIS fill value for signed class rasters.
impl_integer_element!(
    u8 => u8::MAX,
    u16 => u16::MAX,
    i16 => -9999,
    i32 => -9999,
);
impl_float_element!(f32, f64);
