//! In-memory entity instances.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::row::{FromValue, Row};
use crate::schema::EntitySchema;
use crate::value::Value;

/// A materialized entity.
///
/// A field missing from the value map is absent, which is not the same as a
/// field holding `Value::Null`. `saved` flips to true after a successful
/// insert or update and back to false on any later mutation.
#[derive(Debug, Clone)]
pub struct Instance {
    schema: Arc<EntitySchema>,
    values: BTreeMap<String, Value>,
    related: BTreeMap<String, Vec<Instance>>,
    persisted: bool,
    saved: bool,
}

impl Instance {
    /// Create a blank, unsaved instance.
    pub fn new(schema: Arc<EntitySchema>) -> Self {
        Self {
            schema,
            values: BTreeMap::new(),
            related: BTreeMap::new(),
            persisted: false,
            saved: false,
        }
    }

    /// Build a persisted instance from a driver row.
    ///
    /// Every column of the row is kept, declared or not, so link columns
    /// survive a round trip.
    pub fn from_row(schema: Arc<EntitySchema>, row: &Row) -> Self {
        let values = row
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect();
        Self {
            schema,
            values,
            related: BTreeMap::new(),
            persisted: true,
            saved: true,
        }
    }

    /// The entity schema.
    pub fn schema(&self) -> &Arc<EntitySchema> {
        &self.schema
    }

    /// Entity name.
    pub fn entity(&self) -> &str {
        self.schema.name()
    }

    /// Value of `name`; `None` when absent.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Typed value of `name`. An absent field decodes like `NULL`.
    pub fn get_as<T: FromValue>(&self, name: &str) -> Result<T> {
        let decoded = match self.values.get(name) {
            Some(value) => T::from_value(value),
            None => T::from_value(&Value::Null),
        };
        decoded.map_err(|e| match e {
            Error::Type(mut te) => {
                te.column = Some(name.to_string());
                Error::Type(te)
            }
            e => e,
        })
    }

    /// Whether `name` holds a value (`NULL` included).
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Set a field value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(name.into(), value.into());
        self.saved = false;
    }

    /// Make a field absent.
    pub fn unset(&mut self, name: &str) {
        self.values.remove(name);
        self.saved = false;
    }

    /// All present values.
    pub fn values(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Whether the last insert/update succeeded and nothing changed since.
    pub fn saved(&self) -> bool {
        self.saved
    }

    /// Whether a row for this instance exists in the database.
    pub fn is_persisted(&self) -> bool {
        self.persisted
    }

    /// Identifier values in identifier order, or `None` if any is absent or
    /// `NULL`.
    pub fn identifier(&self) -> Option<Vec<Value>> {
        self.schema
            .identifiers()
            .iter()
            .map(|id| self.values.get(id).filter(|v| !v.is_null()).cloned())
            .collect()
    }

    /// Persisted related instances of relation `name`, in input order.
    pub fn related(&self, name: &str) -> &[Instance] {
        self.related.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    /// Names of relations with attached instances.
    pub fn relation_names(&self) -> impl Iterator<Item = &str> {
        self.related.keys().map(String::as_str)
    }

    /// Render values and related instances as a JSON object.
    pub fn to_json(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        for (name, value) in &self.values {
            map.insert(name.clone(), value.to_json());
        }
        for (name, instances) in &self.related {
            map.insert(
                name.clone(),
                serde_json::Value::Array(instances.iter().map(Instance::to_json).collect()),
            );
        }
        serde_json::Value::Object(map)
    }

    /// Point the foreign-key columns at an owner's identifier values.
    pub fn link(&mut self, foreign_key: &[String], owner_identifier: &[Value]) {
        for (column, value) in foreign_key.iter().zip(owner_identifier) {
            self.set(column.clone(), value.clone());
        }
    }

    /// Fill absent fields from a row returned by the driver.
    ///
    /// Fields already holding a value keep it.
    pub fn backfill(&mut self, row: &Row) {
        for (name, value) in row.iter() {
            if !self.values.contains_key(name) {
                self.values.insert(name.to_string(), value.clone());
            }
        }
    }

    /// Record a successful insert or update.
    pub fn mark_saved(&mut self) {
        self.persisted = true;
        self.saved = true;
    }

    /// Attach persisted related instances.
    pub fn set_related(&mut self, name: impl Into<String>, instances: Vec<Instance>) {
        self.related.insert(name.into(), instances);
    }
}
