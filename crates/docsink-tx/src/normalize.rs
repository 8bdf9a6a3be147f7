//! Record value → store document.
//!
//! Dispatch is on the declared [`SchemaKind`] first and the actual value
//! second. `MAP` and `PRIMITIVE` records are passed through as they are;
//! `STRUCT` and `BYTES` records must be readable under their schema or the
//! record fails with [`SinkError::Serialization`].

use base64::prelude::BASE64_STANDARD;
use base64::Engine;
use docsink_core::{
    Document, FieldKind, InboundRecord, InboundValue, Scalar, SchemaKind, SinkError, StructValue,
};
use serde_json::{Map, Number, Value};

/// Converts one record's value into the document written to the store.
///
/// Pure: no I/O, and identical records always produce identical documents.
pub fn normalize(record: &InboundRecord) -> Result<Document, SinkError> {
    let document = match (record.value_schema, &record.value) {
        (SchemaKind::Map | SchemaKind::Primitive, value) => passthrough(value),
        (SchemaKind::Struct, InboundValue::Structured(value)) => struct_to_document(value),
        (SchemaKind::Bytes, InboundValue::Bytes(bytes)) => parse_document(bytes),
        (kind, value) => Err(format!(
            "{} value cannot be read under declared schema {kind}",
            value.shape()
        )),
    };

    document.map_err(|reason| SinkError::Serialization {
        topic: record.topic.clone(),
        partition: record.partition,
        offset: record.offset,
        reason,
    })
}

// Mappings and scalars go to the store verbatim, no envelope.
fn passthrough(value: &InboundValue) -> Result<Value, String> {
    match value {
        InboundValue::Null => Ok(Value::Null),
        InboundValue::Primitive(scalar) => scalar_to_value(scalar),
        InboundValue::Mapping(map) => Ok(Value::Object(map.clone())),
        InboundValue::Array(items) => items
            .iter()
            .map(passthrough)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        InboundValue::Structured(value) => struct_to_document(value),
        InboundValue::Bytes(_) => Err("raw bytes are only readable under a BYTES schema".to_string()),
    }
}

fn scalar_to_value(scalar: &Scalar) -> Result<Value, String> {
    match scalar {
        Scalar::Boolean(b) => Ok(Value::Bool(*b)),
        Scalar::Int(i) => Ok(Value::Number((*i).into())),
        Scalar::UInt(u) => Ok(Value::Number((*u).into())),
        Scalar::Float(f) => Number::from_f64(*f)
            .map(Value::Number)
            .ok_or_else(|| format!("non-finite float {f} has no document representation")),
        Scalar::String(s) => Ok(Value::String(s.clone())),
    }
}

fn struct_to_document(value: &StructValue) -> Result<Value, String> {
    let fields = &value.schema.fields;
    if fields.len() != value.values.len() {
        return Err(format!(
            "struct {} declares {} fields but carries {} values",
            value.schema.name.as_deref().unwrap_or("<anonymous>"),
            fields.len(),
            value.values.len()
        ));
    }

    let mut document = Map::with_capacity(fields.len());
    for (field, field_value) in fields.iter().zip(&value.values) {
        let converted = match field_value {
            InboundValue::Null if field.optional => Value::Null,
            InboundValue::Null => return Err(format!("required field '{}' is null", field.name)),
            v => convert_field(&field.kind, v).map_err(|e| format!("field '{}': {e}", field.name))?,
        };
        document.insert(field.name.clone(), converted);
    }
    Ok(Value::Object(document))
}

fn convert_field(kind: &FieldKind, value: &InboundValue) -> Result<Value, String> {
    match (kind, value) {
        (FieldKind::Boolean, InboundValue::Primitive(s @ Scalar::Boolean(_)))
        | (FieldKind::Int, InboundValue::Primitive(s @ (Scalar::Int(_) | Scalar::UInt(_))))
        | (FieldKind::Float, InboundValue::Primitive(s @ Scalar::Float(_)))
        | (FieldKind::String, InboundValue::Primitive(s @ Scalar::String(_))) => scalar_to_value(s),
        (FieldKind::Bytes, InboundValue::Bytes(bytes)) => Ok(Value::String(BASE64_STANDARD.encode(bytes))),
        (FieldKind::Map, InboundValue::Mapping(map)) => Ok(Value::Object(map.clone())),
        (FieldKind::Array, InboundValue::Array(_)) => passthrough(value),
        (FieldKind::Struct(schema), InboundValue::Structured(nested)) => {
            if nested.schema != *schema {
                return Err(format!(
                    "nested struct does not match declared schema {}",
                    schema.name.as_deref().unwrap_or("<anonymous>")
                ));
            }
            struct_to_document(nested)
        }
        (kind, value) => Err(format!("expected {kind}, got {}", value.shape())),
    }
}

fn parse_document(bytes: &[u8]) -> Result<Value, String> {
    serde_json::from_slice(bytes).map_err(|e| format!("malformed document bytes: {e}"))
}
