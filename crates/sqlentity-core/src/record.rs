//! Caller-supplied data bags.
//!
//! A [`Record`] keeps the distinction between a key that is missing, a key
//! explicitly set to undefined, and a key set to `NULL`. Association keys
//! carry a sequence of [`Item`]s, each either more data or an existing
//! instance.

use crate::error::{Error, Result, ValidationError, ValidationErrorKind};
use crate::instance::Instance;
use crate::value::Value;

/// Value slot of a record entry.
#[derive(Debug, Clone)]
pub enum Entry {
    /// A concrete value (`Null` included)
    Value(Value),
    /// Present but undefined; treated as not supplied
    Undefined,
    /// Association payload
    Many(Vec<Item>),
}

/// One element of a create payload or association sequence.
#[derive(Debug, Clone)]
pub enum Item {
    /// Raw data to materialize
    Data(Record),
    /// An instance built earlier
    Instance(Instance),
}

impl From<Record> for Item {
    fn from(record: Record) -> Self {
        Item::Data(record)
    }
}

impl From<Instance> for Item {
    fn from(instance: Instance) -> Self {
        Item::Instance(instance)
    }
}

/// Ordered mapping of keys to entries.
#[derive(Debug, Clone, Default)]
pub struct Record {
    entries: Vec<(String, Entry)>,
}

impl Record {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Record::set`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    /// Builder form of [`Record::set_undefined`].
    pub fn with_undefined(mut self, key: impl Into<String>) -> Self {
        self.set_undefined(key);
        self
    }

    /// Builder form of [`Record::set_many`].
    pub fn with_many<I, T>(mut self, key: impl Into<String>, items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Item>,
    {
        self.set_many(key, items);
        self
    }

    /// Set `key` to a value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.put(key.into(), Entry::Value(value.into()));
    }

    /// Mark `key` as explicitly undefined.
    pub fn set_undefined(&mut self, key: impl Into<String>) {
        self.put(key.into(), Entry::Undefined);
    }

    /// Set `key` to a sequence of association items.
    pub fn set_many<I, T>(&mut self, key: impl Into<String>, items: I)
    where
        I: IntoIterator<Item = T>,
        T: Into<Item>,
    {
        self.put(
            key.into(),
            Entry::Many(items.into_iter().map(Into::into).collect()),
        );
    }

    fn put(&mut self, key: String, entry: Entry) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = entry,
            None => self.entries.push((key, entry)),
        }
    }

    /// Entry for `key`, if present.
    pub fn get(&self, key: &str) -> Option<&Entry> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, e)| e)
    }

    /// Whether `key` is present (undefined included).
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Remove and return the entry for `key`.
    pub fn take(&mut self, key: &str) -> Option<Entry> {
        let pos = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(pos).1)
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Entry)> {
        self.entries.iter().map(|(k, e)| (k.as_str(), e))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the record has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Build a record from a JSON object.
    ///
    /// Non-empty arrays whose elements are all objects become association
    /// sequences; every other value becomes a field value.
    pub fn from_json(json: serde_json::Value) -> Result<Self> {
        let serde_json::Value::Object(map) = json else {
            return Err(Error::Validation(ValidationError::single(
                "__model__",
                ValidationErrorKind::Type,
                format!("expected a JSON object, got {}", json_kind(&json)),
            )));
        };
        let mut record = Record::new();
        for (key, value) in map {
            match value {
                serde_json::Value::Array(items)
                    if !items.is_empty() && items.iter().all(serde_json::Value::is_object) =>
                {
                    let items = items
                        .into_iter()
                        .map(|item| Record::from_json(item).map(Item::Data))
                        .collect::<Result<Vec<_>>>()?;
                    record.put(key, Entry::Many(items));
                }
                other => record.put(key, Entry::Value(Value::from_json(other))),
            }
        }
        Ok(record)
    }
}

fn json_kind(json: &serde_json::Value) -> &'static str {
    match json {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
