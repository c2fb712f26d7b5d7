//! GeoJSON polygon layers
//!
//! Only Polygon and MultiPolygon geometries are read; features with a null
//! geometry are kept with `geometry: None`. The layer schema is the union of
//! property names in first-seen order, missing properties become `Null`.

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::vector::{AttributeValue, Feature, FeatureCollection, LayerSchema};
use geo_types::{Coord, Geometry, LineString, MultiPolygon, Polygon};
use serde_json::{json, Map, Value};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Read a GeoJSON FeatureCollection file
pub fn read_geojson<P: AsRef<Path>>(path: P) -> Result<FeatureCollection> {
    let path = path.as_ref();
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let value: Value = serde_json::from_reader(BufReader::new(File::open(path)?))?;
    parse_collection(&value, name)
}

/// Parse a GeoJSON FeatureCollection document
pub fn feature_collection_from_json(text: &str, name: &str) -> Result<FeatureCollection> {
    let value: Value = serde_json::from_str(text)?;
    parse_collection(&value, name.to_string())
}

/// Write a FeatureCollection as GeoJSON
pub fn write_geojson<P: AsRef<Path>>(collection: &FeatureCollection, path: P) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(&mut writer, &feature_collection_to_json(collection))?;
    writer.flush()?;
    Ok(())
}

/// Serialize a FeatureCollection to a GeoJSON value
pub fn feature_collection_to_json(collection: &FeatureCollection) -> Value {
    let fields = collection.schema().fields();
    let features: Vec<Value> = collection
        .iter()
        .map(|feature| {
            let properties: Map<String, Value> = fields
                .iter()
                .zip(&feature.attributes)
                .map(|(name, value)| (name.clone(), attribute_to_json(value)))
                .collect();
            json!({
                "type": "Feature",
                "geometry": feature.geometry.as_ref().map_or(Value::Null, geometry_to_json),
                "properties": properties,
            })
        })
        .collect();

    let mut doc = json!({
        "type": "FeatureCollection",
        "name": collection.name,
        "features": features,
    });
    if let Some(crs) = collection.crs {
        doc["crs"] = json!({ "type": "name", "properties": { "name": crs.urn() } });
    }
    doc
}

fn format_error(msg: impl Into<String>) -> Error {
    Error::UnsupportedDataType(format!("GeoJSON: {}", msg.into()))
}

fn parse_collection(value: &Value, name: String) -> Result<FeatureCollection> {
    if value.get("type").and_then(Value::as_str) != Some("FeatureCollection") {
        return Err(format_error("expected a FeatureCollection"));
    }
    let raw_features = value
        .get("features")
        .and_then(Value::as_array)
        .ok_or_else(|| format_error("missing 'features' array"))?;

    let mut schema = LayerSchema::default();
    for feature in raw_features {
        if let Some(props) = feature.get("properties").and_then(Value::as_object) {
            for key in props.keys() {
                schema.add_field(key.as_str());
            }
        }
    }

    let crs = value
        .pointer("/crs/properties/name")
        .and_then(Value::as_str)
        .and_then(CRS::parse);

    let mut collection = FeatureCollection::new(name, schema.clone());
    collection.crs = crs;

    for (index, raw) in raw_features.iter().enumerate() {
        let geometry = match raw.get("geometry") {
            None | Some(Value::Null) => None,
            Some(g) => Some(parse_geometry(g).map_err(|e| {
                format_error(format!("feature {}: {}", index, e))
            })?),
        };
        let props = raw.get("properties").and_then(Value::as_object);
        let attributes = schema
            .fields()
            .iter()
            .map(|field| {
                props
                    .and_then(|p| p.get(field))
                    .map_or(AttributeValue::Null, attribute_from_json)
            })
            .collect();
        collection.push(Feature { geometry, attributes })?;
    }

    Ok(collection)
}

fn attribute_from_json(value: &Value) -> AttributeValue {
    match value {
        Value::Null => AttributeValue::Null,
        Value::Bool(b) => AttributeValue::Bool(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => AttributeValue::Int(i),
            None => AttributeValue::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(s) => AttributeValue::String(s.clone()),
        other => AttributeValue::String(other.to_string()),
    }
}

fn attribute_to_json(value: &AttributeValue) -> Value {
    match value {
        AttributeValue::Null => Value::Null,
        AttributeValue::Bool(b) => json!(b),
        AttributeValue::Int(i) => json!(i),
        AttributeValue::Float(f) if f.is_finite() => json!(f),
        AttributeValue::Float(_) => Value::Null,
        AttributeValue::String(s) => json!(s),
    }
}

fn parse_geometry(value: &Value) -> std::result::Result<Geometry<f64>, String> {
    let kind = value.get("type").and_then(Value::as_str).unwrap_or_default();
    let coords = value
        .get("coordinates")
        .ok_or_else(|| format!("{} without coordinates", kind))?;
    match kind {
        "Polygon" => parse_polygon(coords).map(Geometry::Polygon),
        "MultiPolygon" => coords
            .as_array()
            .ok_or("MultiPolygon coordinates must be an array")?
            .iter()
            .map(parse_polygon)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map(|polys| Geometry::MultiPolygon(MultiPolygon::new(polys))),
        other => Err(format!("unsupported geometry type '{}'", other)),
    }
}

fn parse_polygon(value: &Value) -> std::result::Result<Polygon<f64>, String> {
    let mut rings = value
        .as_array()
        .ok_or("polygon coordinates must be an array of rings")?
        .iter()
        .map(parse_ring);
    let exterior = rings.next().ok_or("polygon without exterior ring")??;
    let interiors = rings.collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(Polygon::new(exterior, interiors))
}

fn parse_ring(value: &Value) -> std::result::Result<LineString<f64>, String> {
    value
        .as_array()
        .ok_or("ring must be an array of positions")?
        .iter()
        .map(|pos| match pos.as_array().map(Vec::as_slice) {
            Some([x, y, ..]) => match (x.as_f64(), y.as_f64()) {
                (Some(x), Some(y)) => Ok(Coord { x, y }),
                _ => Err(format!("non-numeric position {}", pos)),
            },
            _ => Err(format!("invalid position {}", pos)),
        })
        .collect::<std::result::Result<Vec<_>, _>>()
        .map(LineString::new)
}

fn ring_to_json(ring: &LineString<f64>) -> Value {
    Value::Array(ring.coords().map(|c| json!([c.x, c.y])).collect())
}

fn polygon_to_json(polygon: &Polygon<f64>) -> Value {
    Value::Array(
        std::iter::once(polygon.exterior())
            .chain(polygon.interiors())
            .map(ring_to_json)
            .collect(),
    )
}

fn geometry_to_json(geometry: &Geometry<f64>) -> Value {
    match geometry {
        Geometry::Polygon(p) => json!({ "type": "Polygon", "coordinates": polygon_to_json(p) }),
        Geometry::MultiPolygon(mp) => json!({
            "type": "MultiPolygon",
            "coordinates": mp.iter().map(polygon_to_json).collect::<Vec<_>>(),
        }),
        Geometry::Rect(r) => json!({ "type": "Polygon", "coordinates": polygon_to_json(&r.to_polygon()) }),
        _ => Value::Null,
    }
}
