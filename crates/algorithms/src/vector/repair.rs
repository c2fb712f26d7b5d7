//! Polygon validity repair before overlay
//!
//! Repair is attempted in increasing order of cost: repeated-point removal,
//! then a union with the empty set, which rebuilds the rings and resolves
//! self-intersections. A geometry that is still invalid, or empty, is
//! rejected with `InvalidGeometry` carrying the validation message.

use super::dissolve::union_all;
use geo::{Area, BooleanOps, MultiPolygon, RemoveRepeatedPoints, Validation};
use landshift_core::{Error, Result};

/// Return a valid, non-empty version of `geometry`.
///
/// # Errors
/// `InvalidGeometry` with the reason when no usable geometry remains.
pub fn repair(geometry: &MultiPolygon<f64>) -> Result<MultiPolygon<f64>> {
    if geometry.is_valid() {
        return non_empty(geometry.clone());
    }

    let deduped = geometry.remove_repeated_points();
    if deduped.is_valid() {
        return non_empty(deduped);
    }

    let rebuilt = union_all(deduped.0.iter().map(|p| MultiPolygon::new(vec![p.clone()])).collect())
        .union(&MultiPolygon::new(vec![]));
    match rebuilt.check_validation() {
        Ok(()) => non_empty(rebuilt),
        Err(reason) => Err(Error::InvalidGeometry(reason.to_string())),
    }
}

fn non_empty(geometry: MultiPolygon<f64>) -> Result<MultiPolygon<f64>> {
    if geometry.0.is_empty() || geometry.unsigned_area() <= 0.0 {
        Err(Error::InvalidGeometry("empty geometry".into()))
    } else {
        Ok(geometry)
    }
}
