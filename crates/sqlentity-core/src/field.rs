//! Field declarations.
//!
//! A field is declared as a [`FieldSpec`] (builder form) or a [`FieldConfig`]
//! (serde form) and compiled by the registry into a [`FieldInfo`].

use std::fmt;
use std::sync::Arc;

use regex::Regex;
use serde::Deserialize;

use crate::error::{Error, Result, SchemaErrorKind};
use crate::types::{FieldKind, Primitive};
use crate::value::Value;

/// Zero-argument value producer used as a dynamic default.
pub type Producer = Arc<dyn Fn() -> Value + Send + Sync>;

/// Default value of a field, applied on insert only.
#[derive(Clone)]
pub enum DefaultValue {
    /// A fixed value, cloned for every insert
    Literal(Value),
    /// Invoked once per insert
    Producer(Producer),
}

impl DefaultValue {
    /// Produce the value to store.
    pub fn produce(&self) -> Value {
        match self {
            DefaultValue::Literal(v) => v.clone(),
            DefaultValue::Producer(f) => f(),
        }
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::Literal(v) => f.debug_tuple("Literal").field(v).finish(),
            DefaultValue::Producer(_) => f.write_str("Producer(..)"),
        }
    }
}

/// Declaration of a single field.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    /// Semantic kind
    pub kind: FieldKind,
    /// Insert-time default
    pub default: Option<DefaultValue>,
    /// Null/absent values are rejected before persistence
    pub required: bool,
    /// Part of the entity identifier
    pub key: bool,
    /// Regex text values must match
    pub pattern: Option<String>,
}

impl FieldSpec {
    /// A field of the given kind with no default and no constraints.
    pub fn new(kind: FieldKind) -> Self {
        Self {
            kind,
            default: None,
            required: false,
            key: false,
            pattern: None,
        }
    }

    /// Shorthand declaration: the kind is inferred from a Rust type.
    pub fn of<T: Primitive>() -> Self {
        Self::new(T::KIND)
    }

    /// Text field.
    pub fn text() -> Self {
        Self::new(FieldKind::Text)
    }

    /// Number field.
    pub fn number() -> Self {
        Self::new(FieldKind::Number)
    }

    /// Enum field restricted to `values`.
    pub fn one_of<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(FieldKind::Enum(values.into_iter().map(Into::into).collect()))
    }

    /// Set a literal default.
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(DefaultValue::Literal(value.into()));
        self
    }

    /// Set a producer default, evaluated on every insert.
    pub fn default_with<F>(mut self, producer: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.default = Some(DefaultValue::Producer(Arc::new(producer)));
        self
    }

    /// Mark the field as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Mark the field as (part of) the identifier.
    pub fn key(mut self) -> Self {
        self.key = true;
        self
    }

    /// Constrain text values to a regex.
    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }
}

impl From<FieldKind> for FieldSpec {
    fn from(kind: FieldKind) -> Self {
        Self::new(kind)
    }
}

/// Serde form of a field declaration.
///
/// Either a bare type name or a full object:
///
/// ```json
/// { "name": { "type": "text", "defaultValue": "Mutt" }, "age": "number" }
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FieldConfig {
    /// `"text"`
    Shorthand(String),
    /// `{ "type": "text", ... }`
    Full(FieldObject),
}

/// Object form of [`FieldConfig`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldObject {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub default_value: Option<serde_json::Value>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub key: bool,
    #[serde(default)]
    pub values: Option<Vec<String>>,
    #[serde(default)]
    pub pattern: Option<String>,
}

impl FieldConfig {
    /// Convert into a [`FieldSpec`], reporting problems against `entity`.
    pub fn into_spec(self, entity: &str, field: &str) -> Result<FieldSpec> {
        let parse_kind = |name: &str, values: Option<Vec<String>>| -> Result<FieldKind> {
            if name.eq_ignore_ascii_case("enum") {
                return match values {
                    Some(values) if !values.is_empty() => Ok(FieldKind::Enum(values)),
                    _ => Err(Error::schema(
                        SchemaErrorKind::UnknownType,
                        entity,
                        format!("enum field '{field}' declares no values"),
                    )),
                };
            }
            name.parse::<FieldKind>().map_err(|msg| {
                Error::schema(
                    SchemaErrorKind::UnknownType,
                    entity,
                    format!("field '{field}': {msg}"),
                )
            })
        };

        match self {
            FieldConfig::Shorthand(name) => Ok(FieldSpec::new(parse_kind(&name, None)?)),
            FieldConfig::Full(obj) => {
                let mut spec = FieldSpec::new(parse_kind(&obj.kind, obj.values)?);
                if let Some(default) = obj.default_value {
                    spec.default = Some(DefaultValue::Literal(Value::from_json(default)));
                }
                spec.required = obj.required;
                spec.key = obj.key;
                spec.pattern = obj.pattern;
                Ok(spec)
            }
        }
    }
}

/// A compiled field of a registered entity.
#[derive(Debug, Clone)]
pub struct FieldInfo {
    /// Field (and column) name
    pub name: String,
    /// Semantic kind
    pub kind: FieldKind,
    /// Insert-time default
    pub default: Option<DefaultValue>,
    /// Whether null/absent values are rejected
    pub required: bool,
    /// Whether the field is part of the identifier
    pub key: bool,
    /// Compiled pattern constraint
    pub pattern: Option<Regex>,
}

impl FieldInfo {
    /// Compile a spec for `entity`.
    pub(crate) fn compile(entity: &str, name: &str, spec: FieldSpec) -> Result<Self> {
        if let Some(DefaultValue::Literal(value)) = &spec.default {
            if !spec.kind.accepts(value) {
                return Err(Error::schema(
                    SchemaErrorKind::InvalidDefault,
                    entity,
                    format!(
                        "default for '{name}' is {} but the field is {}",
                        value.type_name(),
                        spec.kind
                    ),
                ));
            }
        }

        let pattern = match spec.pattern {
            Some(source) => Some(Regex::new(&source).map_err(|e| {
                Error::schema(
                    SchemaErrorKind::InvalidPattern,
                    entity,
                    format!("pattern for '{name}' does not compile: {e}"),
                )
            })?),
            None => None,
        };

        Ok(Self {
            name: name.to_string(),
            kind: spec.kind,
            default: spec.default,
            required: spec.required,
            key: spec.key,
            pattern,
        })
    }

    /// Whether the driver generates this field's value on insert.
    pub fn is_generated(&self) -> bool {
        self.kind.is_generated()
    }
}
