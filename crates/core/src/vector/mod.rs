//! Vector data structures
//!
//! Layers are stored column-aligned: a [`LayerSchema`] names the attribute
//! columns once, and every [`Feature`] holds one [`AttributeValue`] per column.
//! Field names are resolved to column indices when a layer is loaded, so
//! per-feature access never goes through string lookups.

use crate::crs::CRS;
use crate::error::{Error, Result};
use geo_types::{Geometry, MultiPolygon};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Attribute value types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl From<i64> for AttributeValue {
    fn from(v: i64) -> Self {
        AttributeValue::Int(v)
    }
}

impl From<f64> for AttributeValue {
    fn from(v: f64) -> Self {
        AttributeValue::Float(v)
    }
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        AttributeValue::String(v.to_string())
    }
}

/// A categorical class value carried by a region or fragment.
///
/// `Null` stands for a missing or null attribute. It is kept as a class of its
/// own so that area with an unknown class is never dropped from a history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ClassValue {
    Null,
    Class(i64),
}

impl ClassValue {
    /// Interpret an attribute as a class id.
    ///
    /// Integers, integral floats and integer strings are accepted; anything
    /// else is an error message describing the offending value.
    pub fn from_attribute(value: &AttributeValue) -> std::result::Result<Self, String> {
        match value {
            AttributeValue::Null => Ok(ClassValue::Null),
            AttributeValue::Int(v) => Ok(ClassValue::Class(*v)),
            AttributeValue::Float(v) if v.is_finite() && v.fract() == 0.0 => {
                Ok(ClassValue::Class(*v as i64))
            }
            AttributeValue::String(s) => s
                .trim()
                .parse::<i64>()
                .map(ClassValue::Class)
                .map_err(|_| format!("'{}' is not an integer class id", s)),
            other => Err(format!("{:?} is not an integer class id", other)),
        }
    }

    /// The class id, if not null
    pub fn id(&self) -> Option<i64> {
        match self {
            ClassValue::Null => None,
            ClassValue::Class(id) => Some(*id),
        }
    }
}

impl From<ClassValue> for AttributeValue {
    fn from(v: ClassValue) -> Self {
        match v {
            ClassValue::Null => AttributeValue::Null,
            ClassValue::Class(id) => AttributeValue::Int(id),
        }
    }
}

impl fmt::Display for ClassValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassValue::Null => write!(f, "NULL"),
            ClassValue::Class(id) => write!(f, "{}", id),
        }
    }
}

/// Ordered attribute column names of a layer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayerSchema {
    fields: Vec<String>,
}

impl LayerSchema {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Column index of a field
    pub fn index_of(&self, field: &str) -> Option<usize> {
        self.fields.iter().position(|f| f == field)
    }

    /// Column index of a field, or `MissingField` naming the layer
    pub fn require(&self, field: &str, layer: &str) -> Result<usize> {
        self.index_of(field).ok_or_else(|| Error::MissingField {
            field: field.to_string(),
            layer: layer.to_string(),
        })
    }

    /// Append a column, returning its index (existing index if already present)
    pub fn add_field(&mut self, field: impl Into<String>) -> usize {
        let field = field.into();
        match self.index_of(&field) {
            Some(idx) => idx,
            None => {
                self.fields.push(field);
                self.fields.len() - 1
            }
        }
    }
}

/// A geographic feature: geometry plus schema-aligned attributes
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    /// Feature geometry
    pub geometry: Option<Geometry<f64>>,
    /// One value per schema column
    pub attributes: Vec<AttributeValue>,
}

impl Feature {
    pub fn new(geometry: Geometry<f64>, attributes: Vec<AttributeValue>) -> Self {
        Self {
            geometry: Some(geometry),
            attributes,
        }
    }

    /// Attribute by resolved column index
    pub fn attribute(&self, column: usize) -> &AttributeValue {
        static NULL: AttributeValue = AttributeValue::Null;
        self.attributes.get(column).unwrap_or(&NULL)
    }

    /// Geometry as a multipolygon, `None` for non-areal or missing geometry
    pub fn polygonal(&self) -> Option<MultiPolygon<f64>> {
        match self.geometry.as_ref()? {
            Geometry::Polygon(p) => Some(MultiPolygon::new(vec![p.clone()])),
            Geometry::MultiPolygon(mp) => Some(mp.clone()),
            Geometry::Rect(r) => Some(MultiPolygon::new(vec![r.to_polygon()])),
            _ => None,
        }
    }
}

/// A named collection of features sharing one schema
#[derive(Debug, Clone, Default)]
pub struct FeatureCollection {
    pub name: String,
    pub crs: Option<CRS>,
    schema: LayerSchema,
    features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new(name: impl Into<String>, schema: LayerSchema) -> Self {
        Self {
            name: name.into(),
            crs: None,
            schema,
            features: Vec::new(),
        }
    }

    pub fn schema(&self) -> &LayerSchema {
        &self.schema
    }

    /// Add a feature; its attribute count must match the schema
    pub fn push(&mut self, feature: Feature) -> Result<()> {
        if feature.attributes.len() != self.schema.len() {
            return Err(Error::InvalidParameter {
                name: "attributes",
                value: feature.attributes.len().to_string(),
                reason: format!("layer '{}' has {} field(s)", self.name, self.schema.len()),
            });
        }
        self.features.push(feature);
        Ok(())
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Feature> {
        self.features.iter()
    }
}

impl IntoIterator for FeatureCollection {
    type Item = Feature;
    type IntoIter = std::vec::IntoIter<Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.into_iter()
    }
}
