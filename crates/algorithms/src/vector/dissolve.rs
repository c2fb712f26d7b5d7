//! Dissolve regions by class
//!
//! All regions of one class are merged into a single multipolygon. Unions
//! are reduced pairwise in a balanced tree so each geometry takes part in
//! `log2(n)` unions instead of `n`.

use super::polygonize::ClassifiedRegion;
use crate::classification::ClassId;
use crate::maybe_rayon::*;
use geo::{Area, BooleanOps, MultiPolygon};
use landshift_core::to_hectares;
use std::collections::BTreeMap;

/// Merge regions sharing a class id.
///
/// Output is ordered by class id. Cell counts are summed; the area is
/// recomputed from the merged geometry.
pub fn dissolve(regions: &[ClassifiedRegion]) -> Vec<ClassifiedRegion> {
    let mut groups: BTreeMap<ClassId, Vec<&ClassifiedRegion>> = BTreeMap::new();
    for region in regions {
        groups.entry(region.class_id).or_default().push(region);
    }

    groups
        .into_iter()
        .collect::<Vec<_>>()
        .into_par_iter()
        .map(|(class_id, members)| {
            let cell_count = members.iter().map(|r| r.cell_count).sum();
            let geometry = union_all(members.iter().map(|r| r.geometry.clone()).collect());
            let area_ha = to_hectares(geometry.unsigned_area());
            ClassifiedRegion {
                class_id,
                geometry,
                area_ha,
                cell_count,
            }
        })
        .collect()
}

/// Union of a set of multipolygons
pub(crate) fn union_all(mut parts: Vec<MultiPolygon<f64>>) -> MultiPolygon<f64> {
    while parts.len() > 1 {
        parts = parts
            .chunks(2)
            .map(|pair| match pair {
                [a, b] => a.union(b),
                [a] => a.clone(),
                _ => MultiPolygon::new(vec![]),
            })
            .collect();
    }
    parts.pop().unwrap_or_else(|| MultiPolygon::new(vec![]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imagery::CLASS_NODATA;
    use crate::vector::{vectorize, PolygonizeParams};
    use approx::assert_relative_eq;
    use landshift_core::{GeoTransform, Raster};

    fn classes(values: Vec<ClassId>, rows: usize, cols: usize) -> Raster<ClassId> {
        let mut r = Raster::from_vec(values, rows, cols).unwrap();
        r.set_transform(GeoTransform::new(0.0, rows as f64 * 10.0, 10.0, -10.0));
        r.set_nodata(Some(CLASS_NODATA));
        r
    }

    #[test]
    fn test_one_region_per_class() {
        #[rustfmt::skip]
        let raster = classes(vec![
            2, 1, 2,
            1, 1, 1,
            2, 1, 2,
        ], 3, 3);
        let regions = vectorize(&raster, &PolygonizeParams::default());
        assert_eq!(regions.len(), 5);

        let dissolved = dissolve(&regions);
        assert_eq!(dissolved.len(), 2);
        assert_eq!(dissolved[0].class_id, 1);
        assert_eq!(dissolved[0].cell_count, 5);
        assert_eq!(dissolved[1].class_id, 2);
        assert_eq!(dissolved[1].cell_count, 4);
        assert_relative_eq!(dissolved[1].area_ha, 0.04, epsilon = 1e-9);
        // corners stay apart
        assert_eq!(dissolved[1].geometry.0.len(), 4);
    }

    #[test]
    fn test_separate_pieces_share_one_feature() {
        #[rustfmt::skip]
        let raster = classes(vec![
            1, 2, 1,
            1, 2, 1,
        ], 2, 3);
        let dissolved = dissolve(&vectorize(&raster, &PolygonizeParams::default()));
        let ones = &dissolved[0];
        assert_eq!(ones.geometry.0.len(), 2);
        assert_relative_eq!(ones.area_ha, 0.04, epsilon = 1e-9);
    }

    #[test]
    fn test_diagonal_pieces_keep_their_area() {
        let raster = classes(vec![1, 2, 2, 1], 2, 2);
        let dissolved = dissolve(&vectorize(&raster, &PolygonizeParams::default()));
        assert_eq!(dissolved.len(), 2);
        assert_relative_eq!(dissolved[0].geometry.unsigned_area(), 200.0, epsilon = 1e-9);
    }

    #[test]
    fn test_union_all_empty() {
        assert!(union_all(Vec::new()).0.is_empty());
    }
}
