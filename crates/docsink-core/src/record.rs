//! Inbound record model delivered by the host runtime.

use serde_json::{Map, Value};

/// Store-ready payload handed to a [`StoreClient`](crate::StoreClient).
pub type Document = Value;

/// Schema kind declared for a record's value.
///
/// The declared kind drives normalization. It is not guaranteed to agree
/// with the actual shape of [`InboundValue`]: a producer may declare `Map`
/// and still ship a plain string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaKind {
    /// String, number or boolean.
    Primitive,
    /// Schemaless key/value mapping.
    Map,
    /// Record with a declared field layout.
    Struct,
    /// Opaque encoded bytes.
    Bytes,
}

impl std::fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Primitive => write!(f, "PRIMITIVE"),
            Self::Map => write!(f, "MAP"),
            Self::Struct => write!(f, "STRUCT"),
            Self::Bytes => write!(f, "BYTES"),
        }
    }
}

/// A single scalar value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Boolean(bool),
    Int(i64),
    /// Integer above `i64::MAX`.
    UInt(u64),
    Float(f64),
    String(String),
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::String(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Scalar::String(s)
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Scalar::Int(v)
    }
}

impl From<u64> for Scalar {
    fn from(v: u64) -> Self {
        match i64::try_from(v) {
            Ok(i) => Scalar::Int(i),
            Err(_) => Scalar::UInt(v),
        }
    }
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Scalar::Boolean(v)
    }
}

/// Value carried by an inbound record.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundValue {
    /// Absent value (tombstone).
    Null,
    Primitive(Scalar),
    /// Mapping passed to the store verbatim.
    Mapping(Map<String, Value>),
    Array(Vec<InboundValue>),
    Structured(StructValue),
    Bytes(Vec<u8>),
}

impl InboundValue {
    /// Short name of the value's shape, used in error messages.
    pub fn shape(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Primitive(Scalar::Boolean(_)) => "boolean",
            Self::Primitive(Scalar::Int(_) | Scalar::UInt(_)) => "int",
            Self::Primitive(Scalar::Float(_)) => "float",
            Self::Primitive(Scalar::String(_)) => "string",
            Self::Mapping(_) => "map",
            Self::Array(_) => "array",
            Self::Structured(_) => "struct",
            Self::Bytes(_) => "bytes",
        }
    }
}

/// Declared layout of a structured value.
#[derive(Debug, Clone, PartialEq)]
pub struct StructSchema {
    pub name: Option<String>,
    pub fields: Vec<FieldSchema>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldSchema {
    pub name: String,
    pub kind: FieldKind,
    /// Optional fields accept [`InboundValue::Null`].
    pub optional: bool,
}

impl FieldSchema {
    pub fn required(name: &str, kind: FieldKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            optional: false,
        }
    }

    pub fn optional(name: &str, kind: FieldKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            optional: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Boolean,
    Int,
    Float,
    String,
    Bytes,
    Map,
    Array,
    Struct(StructSchema),
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Boolean => write!(f, "boolean"),
            Self::Int => write!(f, "int"),
            Self::Float => write!(f, "float"),
            Self::String => write!(f, "string"),
            Self::Bytes => write!(f, "bytes"),
            Self::Map => write!(f, "map"),
            Self::Array => write!(f, "array"),
            Self::Struct(s) => write!(f, "struct {}", s.name.as_deref().unwrap_or("<anonymous>")),
        }
    }
}

/// Field values in declaration order of `schema.fields`.
#[derive(Debug, Clone, PartialEq)]
pub struct StructValue {
    pub schema: StructSchema,
    pub values: Vec<InboundValue>,
}

/// One change record as delivered by the streaming platform.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundRecord {
    pub topic: String,
    pub partition: i32,
    pub key: Option<Vec<u8>>,
    pub value_schema: SchemaKind,
    pub value: InboundValue,
    pub offset: i64,
}

impl InboundRecord {
    pub fn new(topic: &str, partition: i32, offset: i64, value_schema: SchemaKind, value: InboundValue) -> Self {
        Self {
            topic: topic.to_string(),
            partition,
            key: None,
            value_schema,
            value,
            offset,
        }
    }

    pub fn with_key(mut self, key: Vec<u8>) -> Self {
        self.key = Some(key);
        self
    }
}

impl std::fmt::Display for InboundRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}[{}]@{}", self.topic, self.partition, self.offset)
    }
}
