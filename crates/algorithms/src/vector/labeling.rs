//! Period labeling
//!
//! Binds a vectorized layer to a time period: the generic class attribute
//! is renamed to a period-qualified field such as `Class2010`. Class values
//! are carried over unchanged.

use super::measurements::area_ha;
use super::polygonize::GENERIC_CLASS_FIELD;
use landshift_core::io::AREA_COLUMN;
use landshift_core::vector::{AttributeValue, ClassValue, Feature, FeatureCollection, LayerSchema};
use landshift_core::{Error, Result, CRS};
use geo::MultiPolygon;
use std::fmt;
use tracing::{debug, warn};

/// A time period, usually a year
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period(pub i32);

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Parameters for [`label_period`]
#[derive(Debug, Clone)]
pub struct LabelParams {
    /// Attribute holding the class id in the input layer
    pub class_field: String,
    /// Prefix of the period-qualified field
    pub field_prefix: String,
}

impl Default for LabelParams {
    fn default() -> Self {
        Self {
            class_field: GENERIC_CLASS_FIELD.to_string(),
            field_prefix: "Class".to_string(),
        }
    }
}

impl LabelParams {
    /// Field name for a period, e.g. `Class2010`
    pub fn field_name(&self, period: Period) -> String {
        format!("{}{}", self.field_prefix, period)
    }
}

/// A region of one period layer
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodRegion {
    pub geometry: MultiPolygon<f64>,
    pub class: ClassValue,
    pub area_ha: f64,
}

/// Regions of one period with their class under a period-qualified field
#[derive(Debug, Clone)]
pub struct PeriodLayer {
    /// Source layer name
    pub name: String,
    pub period: Period,
    /// Period-qualified class field
    pub field: String,
    pub crs: Option<CRS>,
    pub regions: Vec<PeriodRegion>,
}

impl PeriodLayer {
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Total region area in hectares
    pub fn total_area_ha(&self) -> f64 {
        self.regions.iter().map(|r| r.area_ha).sum()
    }

    /// Layer as features with fields `<field>` and `area_ha`
    pub fn to_features(&self) -> Result<FeatureCollection> {
        let mut collection =
            FeatureCollection::new(self.name.as_str(), LayerSchema::new([self.field.as_str(), AREA_COLUMN]));
        collection.crs = self.crs;
        for region in &self.regions {
            collection.push(Feature::new(
                region.geometry.clone().into(),
                vec![region.class.into(), AttributeValue::Float(region.area_ha)],
            ))?;
        }
        Ok(collection)
    }
}

/// Label a polygon layer with a period.
///
/// The class attribute is resolved once through the layer schema. Null or
/// missing values become [`ClassValue::Null`]; features without an areal
/// geometry are skipped.
///
/// # Errors
/// - `MissingField` if the layer has no `params.class_field` attribute
/// - `InvalidAttribute` if a class value is not an integer
pub fn label_period(
    features: &FeatureCollection,
    period: Period,
    params: &LabelParams,
) -> Result<PeriodLayer> {
    let column = features
        .schema()
        .require(&params.class_field, &features.name)?;
    let field = params.field_name(period);

    let mut regions = Vec::with_capacity(features.len());
    let mut skipped = 0;
    for (index, feature) in features.iter().enumerate() {
        let class = ClassValue::from_attribute(feature.attribute(column)).map_err(|reason| {
            Error::InvalidAttribute {
                field: params.class_field.clone(),
                index,
                reason,
            }
        })?;
        let Some(geometry) = feature.polygonal() else {
            skipped += 1;
            continue;
        };
        let area_ha = area_ha(&geometry);
        regions.push(PeriodRegion {
            geometry,
            class,
            area_ha,
        });
    }

    if skipped > 0 {
        warn!(layer = %features.name, skipped, "features without polygon geometry ignored");
    }
    debug!(layer = %features.name, %field, regions = regions.len(), "labelled period");

    Ok(PeriodLayer {
        name: features.name.clone(),
        period,
        field,
        crs: features.crs,
        regions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use geo::polygon;
    use geo::Geometry;

    fn square(x: f64, size: f64) -> Geometry<f64> {
        polygon![
            (x: x, y: 0.0), (x: x + size, y: 0.0), (x: x + size, y: size), (x: x, y: size),
        ]
        .into()
    }

    fn layer() -> FeatureCollection {
        let mut fc = FeatureCollection::new("Oeste_2015", LayerSchema::new(["DN", "area_ha"]));
        fc.crs = Some(CRS::from_epsg(31983));
        fc.push(Feature::new(square(0.0, 100.0), vec![1i64.into(), 1.0.into()])).unwrap();
        fc.push(Feature::new(square(100.0, 100.0), vec![AttributeValue::Null, 1.0.into()]))
            .unwrap();
        fc.push(Feature {
            geometry: None,
            attributes: vec![2i64.into(), 0.0.into()],
        })
        .unwrap();
        fc
    }

    #[test]
    fn test_field_is_renamed_values_kept() {
        let labelled = label_period(&layer(), Period(2015), &LabelParams::default()).unwrap();

        assert_eq!(labelled.field, "Class2015");
        assert_eq!(labelled.period, Period(2015));
        assert_eq!(labelled.crs, Some(CRS::from_epsg(31983)));
        assert_eq!(labelled.len(), 2);
        assert_eq!(labelled.regions[0].class, ClassValue::Class(1));
        assert_eq!(labelled.regions[1].class, ClassValue::Null);
        assert_relative_eq!(labelled.regions[0].area_ha, 1.0);
    }

    #[test]
    fn test_custom_prefix() {
        let params = LabelParams {
            field_prefix: "NDVI_".into(),
            ..LabelParams::default()
        };
        let labelled = label_period(&layer(), Period(2010), &params).unwrap();
        assert_eq!(labelled.field, "NDVI_2010");
    }

    #[test]
    fn test_missing_class_field() {
        let fc = FeatureCollection::new("bare", LayerSchema::new(["id"]));
        let err = label_period(&fc, Period(2010), &LabelParams::default()).unwrap_err();
        assert!(matches!(err, Error::MissingField { ref field, .. } if field == "DN"));
    }

    #[test]
    fn test_non_integer_class_rejected() {
        let mut fc = FeatureCollection::new("bad", LayerSchema::new(["DN"]));
        fc.push(Feature::new(square(0.0, 1.0), vec!["forest".into()])).unwrap();
        let err = label_period(&fc, Period(2010), &LabelParams::default()).unwrap_err();
        assert!(matches!(err, Error::InvalidAttribute { index: 0, .. }));
    }

    #[test]
    fn test_to_features_uses_period_field() {
        let labelled = label_period(&layer(), Period(2015), &LabelParams::default()).unwrap();
        let fc = labelled.to_features().unwrap();
        assert_eq!(fc.schema().fields(), &["Class2015".to_string(), "area_ha".to_string()]);
        assert_eq!(fc.features()[1].attributes[0], AttributeValue::Null);
    }
}
