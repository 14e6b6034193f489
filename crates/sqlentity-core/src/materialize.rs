//! Turning payload items into instances.
//!
//! Materialization is pure: it resolves insert defaults and sets association
//! payloads aside, but never talks to a driver.

use std::sync::Arc;

use crate::defaults::{Operation, resolve};
use crate::error::{Error, Result, ValidationError, ValidationErrorKind};
use crate::instance::Instance;
use crate::record::{Entry, Item, Record};
use crate::schema::{Association, EntitySchema, SchemaRegistry};
use crate::value::Value;

/// Association items waiting for their owner to be persisted.
#[derive(Debug, Clone)]
pub struct Pending {
    /// The relation the items belong to
    pub association: Association,
    /// Items in input order
    pub items: Vec<Item>,
}

/// Result of [`materialize`].
#[derive(Debug, Clone)]
pub struct Materialized {
    /// The unsaved instance
    pub instance: Instance,
    /// Association payloads pulled out of the data bag
    pub pending: Vec<Pending>,
}

/// Build an instance of `schema` from a payload item.
///
/// Data bags go through insert-time default resolution. Instances of the
/// same entity are taken as they are.
pub fn materialize(
    registry: &SchemaRegistry,
    schema: &Arc<EntitySchema>,
    item: Item,
) -> Result<Materialized> {
    match item {
        Item::Instance(instance) => {
            if instance.entity() != schema.name() {
                return Err(Error::Validation(ValidationError::single(
                    "__model__",
                    ValidationErrorKind::Model,
                    format!(
                        "expected a '{}' instance, got '{}'",
                        schema.name(),
                        instance.entity()
                    ),
                )));
            }
            Ok(Materialized {
                instance,
                pending: Vec::new(),
            })
        }
        Item::Data(record) => from_record(registry, schema, record),
    }
}

fn from_record(
    registry: &SchemaRegistry,
    schema: &Arc<EntitySchema>,
    mut record: Record,
) -> Result<Materialized> {
    let mut instance = Instance::new(Arc::clone(schema));
    let mut errors = ValidationError::new();

    for field in schema.fields() {
        match record.take(&field.name) {
            Some(Entry::Value(value)) => instance.set(field.name.clone(), value),
            Some(Entry::Many(_)) => errors.add(
                field.name.clone(),
                ValidationErrorKind::Type,
                format!("expected {}, got a sequence of items", field.kind),
            ),
            Some(Entry::Undefined) | None => {
                if let Some(value) = resolve(field, Operation::Insert) {
                    instance.set(field.name.clone(), value);
                }
            }
        }
    }

    let mut pending = Vec::new();
    for association in registry.associations(schema.name()) {
        let Some(entry) = record.take(&association.name) else {
            continue;
        };
        match association_items(entry) {
            Ok(items) if items.is_empty() => {}
            Ok(items) => pending.push(Pending {
                association: association.clone(),
                items,
            }),
            Err(message) => {
                errors.add(
                    association.name.clone(),
                    ValidationErrorKind::Association,
                    message,
                );
            }
        }
    }

    if schema.is_strict() {
        for key in record.keys() {
            errors.add(
                key,
                ValidationErrorKind::Unknown,
                format!("'{key}' is not a field of '{}'", schema.name()),
            );
        }
    } else if !record.is_empty() {
        tracing::trace!(
            entity = schema.name(),
            ignored = ?record.keys().collect::<Vec<_>>(),
            "Ignoring undeclared keys"
        );
    }

    errors.into_result()?;
    Ok(Materialized { instance, pending })
}

fn association_items(entry: Entry) -> std::result::Result<Vec<Item>, String> {
    match entry {
        Entry::Many(items) => Ok(items),
        Entry::Undefined | Entry::Value(Value::Null) => Ok(Vec::new()),
        Entry::Value(Value::Json(serde_json::Value::Array(elements))) => elements
            .into_iter()
            .map(|element| {
                Record::from_json(element)
                    .map(Item::Data)
                    .map_err(|_| "association items must be objects".to_string())
            })
            .collect(),
        Entry::Value(other) => Err(format!(
            "expected a sequence of items, got {}",
            other.type_name()
        )),
    }
}
