//! Vector stages of the transition pipeline
//!
//! - Polygonize: class raster → connected regions with area
//! - Dissolve: one multipolygon per class
//! - Labeling: bind a layer to a period field
//! - Repair: validity fixes before overlay
//! - Spatial index: bulk-loaded R-tree for candidate pairs
//! - Overlay: chained intersection of period layers
//! - Measurements: planar area

mod dissolve;
mod labeling;
mod measurements;
mod overlay;
mod polygonize;
mod repair;
mod spatial_index;

pub use dissolve::dissolve;
pub use labeling::{label_period, LabelParams, Period, PeriodLayer, PeriodRegion};
pub use measurements::area_ha;
pub use overlay::{
    chain_intersect, chain_intersect_with, intersect_step, ChainOutput, Fragment, FragmentSet,
    OverlayParams, SkippedRegion,
};
pub use polygonize::{
    regions_to_features, vectorize, ClassifiedRegion, Connectivity, PolygonizeParams,
    GENERIC_CLASS_FIELD,
};
pub use repair::repair;
pub use spatial_index::{BoundingBox, SpatialIndex, NODE_CAPACITY};
