//! Classification of continuous measurements into discrete classes
//!
//! - **Equal interval**: N classes of identical width over a value range

mod equal_interval;

pub use equal_interval::{class_of, classify, ClassBreaks, ClassId, DEGENERATE_WIDENING};
