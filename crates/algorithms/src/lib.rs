//! # LandShift Algorithms
//!
//! The classification and transition pipeline stages.
//!
//! ## Algorithm Categories
//!
//! - **statistics**: band value range probe
//! - **classification**: equal-interval breakpoints and value→class mapping
//! - **imagery**: class raster reclassification, mask clipping
//! - **vector**: polygonization, dissolve, period labeling, geometry repair,
//!   spatial index and the multi-period overlay chain
//! - **history**: aggregation of fragments into a transition table

pub mod classification;
pub mod history;
pub mod imagery;
pub(crate) mod maybe_rayon;
pub mod statistics;
pub mod vector;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::classification::{class_of, classify, ClassBreaks, ClassId};
    pub use crate::history::{aggregate, TransitionTable};
    pub use crate::imagery::{mask_outside, reclassify, CLASS_NODATA};
    pub use crate::statistics::{band_range, ValueRange};
    pub use crate::vector::{
        chain_intersect, chain_intersect_with, dissolve, label_period, regions_to_features,
        vectorize, ChainOutput, ClassifiedRegion, Connectivity, Fragment, FragmentSet,
        LabelParams, OverlayParams, Period, PeriodLayer, PolygonizeParams, SkippedRegion,
    };
    pub use landshift_core::prelude::*;
}
