//! Multi-period overlay chain
//!
//! Folds chronologically ordered period layers into fragments: the first
//! layer's regions become the initial fragments, and every following layer
//! is intersected with the running set. A fragment produced after `k`
//! layers carries `k` class values, one per period field.

use super::labeling::PeriodLayer;
use super::repair::repair;
use super::spatial_index::{BoundingBox, SpatialIndex};
use crate::maybe_rayon::*;
use geo::{Area, BooleanOps, MultiPolygon};
use landshift_core::io::AREA_COLUMN;
use landshift_core::vector::{AttributeValue, ClassValue, Feature, FeatureCollection, LayerSchema};
use landshift_core::{to_hectares, Error, Result, CRS};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Parameters for the overlay chain
#[derive(Debug, Clone)]
pub struct OverlayParams {
    /// Intersections smaller than this, in CRS units squared, are dropped
    pub min_area: f64,
}

impl Default for OverlayParams {
    fn default() -> Self {
        Self { min_area: 1e-9 }
    }
}

/// Polygon piece with one class value per period processed so far
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    pub geometry: MultiPolygon<f64>,
    pub classes: Vec<ClassValue>,
    pub area_ha: f64,
}

/// Fragments sharing the same ordered period fields
#[derive(Debug, Clone, Default)]
pub struct FragmentSet {
    fields: Vec<String>,
    fragments: Vec<Fragment>,
}

impl FragmentSet {
    /// Build a set, checking that every fragment has one class per field
    pub fn new(fields: Vec<String>, fragments: Vec<Fragment>) -> Result<Self> {
        if let Some(bad) = fragments.iter().find(|f| f.classes.len() != fields.len()) {
            return Err(Error::InvalidParameter {
                name: "fragment",
                value: bad.classes.len().to_string(),
                reason: format!("expected {} class value(s)", fields.len()),
            });
        }
        Ok(Self { fields, fragments })
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn total_area_ha(&self) -> f64 {
        self.fragments.iter().map(|f| f.area_ha).sum()
    }

    /// Fragments as features with one column per period field plus `area_ha`
    pub fn to_features(&self, name: &str, crs: Option<CRS>) -> Result<FeatureCollection> {
        let schema = LayerSchema::new(
            self.fields
                .iter()
                .map(String::as_str)
                .chain(std::iter::once(AREA_COLUMN)),
        );
        let mut collection = FeatureCollection::new(name, schema);
        collection.crs = crs;
        for fragment in &self.fragments {
            let mut attributes: Vec<AttributeValue> =
                fragment.classes.iter().map(|c| (*c).into()).collect();
            attributes.push(AttributeValue::Float(fragment.area_ha));
            collection.push(Feature::new(fragment.geometry.clone().into(), attributes))?;
        }
        Ok(collection)
    }
}

/// A region left out of the overlay because its geometry could not be used
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedRegion {
    /// Source layer name
    pub layer: String,
    /// Period field of the layer
    pub field: String,
    /// Region index within the layer
    pub index: usize,
    pub reason: String,
}

/// Result of an overlay chain
#[derive(Debug, Clone, Default)]
pub struct ChainOutput {
    pub fragments: FragmentSet,
    pub skipped: Vec<SkippedRegion>,
}

struct Prepared {
    geometry: MultiPolygon<f64>,
    bbox: BoundingBox,
    class: ClassValue,
}

/// Intersect period layers in order with default parameters
pub fn chain_intersect(layers: &[PeriodLayer]) -> Result<ChainOutput> {
    chain_intersect_with(layers, &OverlayParams::default())
}

/// Intersect period layers in order.
///
/// # Errors
/// - `EmptyChain` if `layers` is empty
/// - `DuplicateField` if two layers share a period field
/// - `CrsMismatch` if two layers declare different CRSs
pub fn chain_intersect_with(layers: &[PeriodLayer], params: &OverlayParams) -> Result<ChainOutput> {
    let (first, rest) = layers.split_first().ok_or(Error::EmptyChain)?;

    let mut seen = HashSet::new();
    for layer in layers {
        if !seen.insert(layer.field.as_str()) {
            return Err(Error::DuplicateField(layer.field.clone()));
        }
        if let (Some(a), Some(b)) = (first.crs, layer.crs) {
            if a != b {
                return Err(Error::CrsMismatch(a.to_string(), b.to_string()));
            }
        }
    }

    let (prepared, mut skipped) = prepare(first);
    let initial = prepared
        .into_iter()
        .map(|p| Fragment {
            area_ha: to_hectares(p.geometry.unsigned_area()),
            geometry: p.geometry,
            classes: vec![p.class],
        })
        .collect();
    let mut fragments = FragmentSet::new(vec![first.field.clone()], initial)?;
    debug!(field = %first.field, fragments = fragments.len(), "overlay seed");

    for layer in rest {
        let step = intersect_step(&fragments, layer, params)?;
        skipped.extend(step.skipped);
        fragments = step.fragments;
    }

    Ok(ChainOutput { fragments, skipped })
}

/// One fold step: intersect `current` with the regions of `layer`.
///
/// Empty intersections and slivers below `params.min_area` produce no
/// fragment. Output order follows the input fragments, then region order
/// within the layer.
pub fn intersect_step(
    current: &FragmentSet,
    layer: &PeriodLayer,
    params: &OverlayParams,
) -> Result<ChainOutput> {
    if current.fields.iter().any(|f| *f == layer.field) {
        return Err(Error::DuplicateField(layer.field.clone()));
    }

    let (regions, skipped) = prepare(layer);
    let index = SpatialIndex::build(regions.iter().enumerate().map(|(i, r)| (r.bbox, i)));
    let min_area = params.min_area;

    let produced: Vec<Vec<Fragment>> = current
        .fragments
        .par_iter()
        .map(|fragment| {
            let Some(bbox) = BoundingBox::of(&fragment.geometry) else {
                return Vec::new();
            };
            index
                .query(&bbox)
                .into_iter()
                .filter_map(|candidate| {
                    let region = &regions[candidate];
                    let piece = fragment.geometry.intersection(&region.geometry);
                    let area = piece.unsigned_area();
                    if area <= min_area {
                        return None;
                    }
                    let mut classes = Vec::with_capacity(fragment.classes.len() + 1);
                    classes.extend_from_slice(&fragment.classes);
                    classes.push(region.class);
                    Some(Fragment {
                        geometry: piece,
                        classes,
                        area_ha: to_hectares(area),
                    })
                })
                .collect()
        })
        .collect();

    let mut fields = current.fields.clone();
    fields.push(layer.field.clone());
    let fragments = FragmentSet {
        fields,
        fragments: produced.into_iter().flatten().collect(),
    };
    debug!(
        field = %layer.field,
        input = current.len(),
        regions = regions.len(),
        output = fragments.len(),
        "overlay step"
    );

    Ok(ChainOutput { fragments, skipped })
}

/// Repair every region of a layer, recording the ones that cannot be used
fn prepare(layer: &PeriodLayer) -> (Vec<Prepared>, Vec<SkippedRegion>) {
    let outcomes: Vec<Result<Prepared>> = layer
        .regions
        .par_iter()
        .map(|region| -> Result<Prepared> {
            let geometry = repair(&region.geometry)?;
            let bbox = BoundingBox::of(&geometry)
                .ok_or_else(|| Error::InvalidGeometry("empty geometry".into()))?;
            Ok(Prepared {
                geometry,
                bbox,
                class: region.class,
            })
        })
        .collect();

    let mut prepared = Vec::with_capacity(outcomes.len());
    let mut skipped = Vec::new();
    for (index, outcome) in outcomes.into_iter().enumerate() {
        match outcome {
            Ok(p) => prepared.push(p),
            Err(e) => {
                let reason = e.to_string();
                warn!(layer = %layer.name, index, %reason, "region skipped");
                skipped.push(SkippedRegion {
                    layer: layer.name.clone(),
                    field: layer.field.clone(),
                    index,
                    reason,
                });
            }
        }
    }
    (prepared, skipped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::{Period, PeriodRegion};
    use approx::assert_relative_eq;
    use geo::{polygon, LineString, Polygon};

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> MultiPolygon<f64> {
        MultiPolygon::new(vec![polygon![
            (x: x0, y: y0), (x: x1, y: y0), (x: x1, y: y1), (x: x0, y: y1),
        ]])
    }

    fn region(geometry: MultiPolygon<f64>, class: i64) -> PeriodRegion {
        PeriodRegion {
            area_ha: to_hectares(geometry.unsigned_area()),
            geometry,
            class: ClassValue::Class(class),
        }
    }

    fn layer(year: i32, regions: Vec<PeriodRegion>) -> PeriodLayer {
        PeriodLayer {
            name: format!("Leste_{}", year),
            period: Period(year),
            field: format!("Class{}", year),
            crs: Some(CRS::from_epsg(31983)),
            regions,
        }
    }

    #[test]
    fn test_single_layer_passes_through() {
        let out = chain_intersect(&[layer(2010, vec![region(rect(0.0, 0.0, 100.0, 100.0), 1)])])
            .unwrap();
        assert_eq!(out.fragments.fields(), &["Class2010".to_string()]);
        assert_eq!(out.fragments.len(), 1);
        assert_relative_eq!(out.fragments.total_area_ha(), 1.0);
    }

    #[test]
    fn test_two_periods_carry_both_classes() {
        // class 1 on the left 100 ha, class 2 on the right 50 ha
        let a = layer(
            2010,
            vec![
                region(rect(0.0, 0.0, 1000.0, 1000.0), 1),
                region(rect(1000.0, 0.0, 1500.0, 1000.0), 2),
            ],
        );
        let b = layer(2015, vec![region(rect(0.0, 0.0, 1500.0, 1000.0), 2)]);

        let out = chain_intersect(&[a, b]).unwrap();
        let fragments = out.fragments.fragments();
        assert_eq!(out.fragments.fields().len(), 2);
        assert_eq!(fragments.len(), 2);
        assert_eq!(fragments[0].classes, vec![ClassValue::Class(1), ClassValue::Class(2)]);
        assert_relative_eq!(fragments[0].area_ha, 100.0, epsilon = 1e-9);
        assert_eq!(fragments[1].classes, vec![ClassValue::Class(2), ClassValue::Class(2)]);
        assert_relative_eq!(fragments[1].area_ha, 50.0, epsilon = 1e-9);
    }

    #[test]
    fn test_area_outside_later_layer_is_dropped() {
        let a = layer(2010, vec![region(rect(0.0, 0.0, 200.0, 100.0), 3)]);
        let b = layer(2015, vec![region(rect(100.0, 0.0, 300.0, 100.0), 4)]);

        let out = chain_intersect(&[a, b]).unwrap();
        assert_eq!(out.fragments.len(), 1);
        assert_relative_eq!(out.fragments.total_area_ha(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_touching_regions_make_no_fragment() {
        let a = layer(2010, vec![region(rect(0.0, 0.0, 10.0, 10.0), 1)]);
        let b = layer(2015, vec![region(rect(10.0, 0.0, 20.0, 10.0), 1)]);
        let out = chain_intersect(&[a, b]).unwrap();
        assert!(out.fragments.is_empty());
        assert!(out.skipped.is_empty());
    }

    #[test]
    fn test_three_periods() {
        let a = layer(2005, vec![region(rect(0.0, 0.0, 100.0, 100.0), 1)]);
        let b = layer(
            2010,
            vec![
                region(rect(0.0, 0.0, 50.0, 100.0), 2),
                region(rect(50.0, 0.0, 100.0, 100.0), 3),
            ],
        );
        let c = layer(2015, vec![region(rect(0.0, 0.0, 100.0, 50.0), 5)]);

        let out = chain_intersect(&[a, b, c]).unwrap();
        assert_eq!(out.fragments.fields().len(), 3);
        assert_eq!(out.fragments.len(), 2);
        assert!(out.fragments.fragments().iter().all(|f| f.classes.len() == 3));
        assert_relative_eq!(out.fragments.total_area_ha(), 0.5, epsilon = 1e-9);
    }

    #[test]
    fn test_null_class_is_kept() {
        let mut r = region(rect(0.0, 0.0, 100.0, 100.0), 0);
        r.class = ClassValue::Null;
        let a = layer(2010, vec![r]);
        let b = layer(2015, vec![region(rect(0.0, 0.0, 100.0, 100.0), 2)]);

        let out = chain_intersect(&[a, b]).unwrap();
        assert_eq!(
            out.fragments.fragments()[0].classes,
            vec![ClassValue::Null, ClassValue::Class(2)]
        );
    }

    #[test]
    fn test_unusable_region_is_reported() {
        let flat = MultiPolygon::new(vec![Polygon::new(
            LineString::from(vec![(0.0, 0.0), (5.0, 0.0), (10.0, 0.0), (0.0, 0.0)]),
            vec![],
        )]);
        let a = layer(
            2010,
            vec![region(rect(0.0, 0.0, 10.0, 10.0), 1), region(flat, 2)],
        );
        let b = layer(2015, vec![region(rect(0.0, 0.0, 10.0, 10.0), 1)]);

        let out = chain_intersect(&[a, b]).unwrap();
        assert_eq!(out.fragments.len(), 1);
        assert_eq!(out.skipped.len(), 1);
        assert_eq!(out.skipped[0].index, 1);
        assert_eq!(out.skipped[0].field, "Class2010");
        assert!(out.skipped[0].reason.starts_with("Invalid geometry"));
    }

    #[test]
    fn test_chain_errors() {
        assert!(matches!(chain_intersect(&[]), Err(Error::EmptyChain)));

        let a = layer(2010, vec![region(rect(0.0, 0.0, 1.0, 1.0), 1)]);
        assert!(matches!(
            chain_intersect(&[a.clone(), a.clone()]),
            Err(Error::DuplicateField(ref f)) if f == "Class2010"
        ));

        let mut b = layer(2015, vec![region(rect(0.0, 0.0, 1.0, 1.0), 1)]);
        b.crs = Some(CRS::from_epsg(4326));
        assert!(matches!(chain_intersect(&[a, b]), Err(Error::CrsMismatch(_, _))));
    }

    #[test]
    fn test_fragments_to_features() {
        let a = layer(2010, vec![region(rect(0.0, 0.0, 100.0, 100.0), 1)]);
        let b = layer(2015, vec![region(rect(0.0, 0.0, 100.0, 100.0), 2)]);
        let out = chain_intersect(&[a, b]).unwrap();

        let fc = out.fragments.to_features("fragments_Leste", None).unwrap();
        assert_eq!(fc.schema().len(), 3);
        assert_eq!(fc.features()[0].attributes[1], AttributeValue::Int(2));
    }
}
