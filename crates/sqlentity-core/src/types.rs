//! Field kinds and their mapping from Rust types.

use std::fmt;
use std::str::FromStr;

use crate::value::Value;

/// Semantic type of an entity field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    /// Free text
    Text,
    /// Any numeric value (integer or floating point)
    Number,
    /// Integral numeric value
    Integer,
    /// true / false
    Boolean,
    /// Date or timestamp
    Date,
    /// Raw bytes
    Binary,
    /// Arbitrary JSON document
    Object,
    /// Integer identifier generated by the driver on insert
    Serial,
    /// Text restricted to a fixed set of values
    Enum(Vec<String>),
}

impl FieldKind {
    /// The configuration name of this kind (`"text"`, `"number"`, ...).
    pub fn name(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Number => "number",
            FieldKind::Integer => "integer",
            FieldKind::Boolean => "boolean",
            FieldKind::Date => "date",
            FieldKind::Binary => "binary",
            FieldKind::Object => "object",
            FieldKind::Serial => "serial",
            FieldKind::Enum(_) => "enum",
        }
    }

    /// Whether values of this kind are produced by the driver on insert.
    pub const fn is_generated(&self) -> bool {
        matches!(self, FieldKind::Serial)
    }

    /// Check whether `value` is storable in a field of this kind.
    ///
    /// `Null` is accepted by every kind; requiredness is checked separately.
    pub fn accepts(&self, value: &Value) -> bool {
        if value.is_null() {
            return true;
        }
        match self {
            FieldKind::Text => matches!(value, Value::Text(_)),
            FieldKind::Number => matches!(value, Value::BigInt(_) | Value::Double(_)),
            FieldKind::Integer | FieldKind::Serial => matches!(value, Value::BigInt(_)),
            FieldKind::Boolean => matches!(value, Value::Bool(_)),
            FieldKind::Date => matches!(
                value,
                Value::Date(_) | Value::Timestamp(_) | Value::Text(_)
            ),
            FieldKind::Binary => matches!(value, Value::Bytes(_)),
            FieldKind::Object => true,
            FieldKind::Enum(allowed) => match value {
                Value::Text(s) => allowed.iter().any(|a| a == s),
                _ => false,
            },
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Enum(values) => write!(f, "enum({})", values.join("|")),
            other => f.write_str(other.name()),
        }
    }
}

impl FromStr for FieldKind {
    type Err = String;

    /// Parse a kind name (case-insensitive). `enum` needs its values and is
    /// therefore not parseable from a bare name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "string" => Ok(FieldKind::Text),
            "number" => Ok(FieldKind::Number),
            "integer" | "int" => Ok(FieldKind::Integer),
            "boolean" | "bool" => Ok(FieldKind::Boolean),
            "date" => Ok(FieldKind::Date),
            "binary" => Ok(FieldKind::Binary),
            "object" => Ok(FieldKind::Object),
            "serial" => Ok(FieldKind::Serial),
            other => Err(format!("unknown field type '{other}'")),
        }
    }
}

/// Trait for Rust types usable as a field shorthand.
///
/// `FieldSpec::of::<String>()` is the Rust spelling of declaring a field by
/// its bare primitive type.
pub trait Primitive {
    /// The field kind inferred for this type.
    const KIND: FieldKind;
}

impl Primitive for String {
    const KIND: FieldKind = FieldKind::Text;
}

impl Primitive for &str {
    const KIND: FieldKind = FieldKind::Text;
}

impl Primitive for i32 {
    const KIND: FieldKind = FieldKind::Integer;
}

impl Primitive for i64 {
    const KIND: FieldKind = FieldKind::Integer;
}

impl Primitive for f64 {
    const KIND: FieldKind = FieldKind::Number;
}

impl Primitive for bool {
    const KIND: FieldKind = FieldKind::Boolean;
}

impl Primitive for Vec<u8> {
    const KIND: FieldKind = FieldKind::Binary;
}

impl Primitive for serde_json::Value {
    const KIND: FieldKind = FieldKind::Object;
}
