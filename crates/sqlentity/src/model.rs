//! Per-entity handle.

use std::sync::Arc;

use sqlentity_core::{
    Connection, Cx, EntitySchema, Error, Instance, Item, Outcome, Record, Result,
    ValidationError, ValidationErrorKind, Value, materialize,
};
use sqlentity_session::{Created, Payload};

use crate::database::Database;

/// Operations on one registered entity.
///
/// Obtained from [`Database::model`]; borrows the database for its lifetime.
#[derive(Debug)]
pub struct Model<'db, C: Connection> {
    db: &'db Database<C>,
    schema: Arc<EntitySchema>,
}

impl<'db, C: Connection> Model<'db, C> {
    pub(crate) fn new(db: &'db Database<C>, schema: Arc<EntitySchema>) -> Self {
        Self { db, schema }
    }

    /// The entity schema.
    pub fn schema(&self) -> &Arc<EntitySchema> {
        &self.schema
    }

    /// Entity name.
    pub fn name(&self) -> &str {
        self.schema.name()
    }

    /// Create one item or an ordered batch.
    ///
    /// Nested association data is persisted after its owner. A batch stops
    /// at the first failing item and returns that item's error; items
    /// created before it are not rolled back.
    pub async fn create(&self, cx: &Cx, payload: impl Into<Payload>) -> Outcome<Created, Error> {
        self.db
            .session()
            .create(cx, &self.schema, payload.into())
            .await
    }

    /// Create a single record or instance.
    pub async fn create_one(&self, cx: &Cx, item: impl Into<Item>) -> Outcome<Instance, Error> {
        self.db
            .session()
            .create_item(cx, &self.schema, item.into())
            .await
    }

    /// Create a batch, returning instances in input order.
    pub async fn create_many<I, T>(&self, cx: &Cx, items: I) -> Outcome<Vec<Instance>, Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<Item>,
    {
        let payload = Payload::Batch(items.into_iter().map(Into::into).collect());
        self.create(cx, payload).await.map(Created::into_batch)
    }

    /// Fetch by a single identifier value.
    pub async fn get(&self, cx: &Cx, id: impl Into<Value>) -> Outcome<Instance, Error> {
        self.get_by_key(cx, &[id.into()]).await
    }

    /// Fetch by the full identifier, one value per identifier field.
    pub async fn get_by_key(&self, cx: &Cx, key: &[Value]) -> Outcome<Instance, Error> {
        self.db.session().get(cx, &self.schema, key).await
    }

    /// Insert an unsaved instance or update a persisted one.
    ///
    /// Updates write every declared field; a field without a value is
    /// written as `NULL`.
    pub async fn save(&self, cx: &Cx, instance: &mut Instance) -> Outcome<(), Error> {
        if instance.entity() != self.schema.name() {
            return Outcome::Err(self.foreign_instance(instance));
        }
        self.db.session().save(cx, instance).await
    }

    /// Build an unsaved instance from `record`, applying insert defaults.
    ///
    /// Association data is not accepted here; pass it to [`Model::create`].
    pub fn new_instance(&self, record: Record) -> Result<Instance> {
        let materialized = materialize(self.db.registry(), &self.schema, Item::Data(record))?;
        if let Some(pending) = materialized.pending.first() {
            return Err(Error::Validation(ValidationError::single(
                pending.association.name.clone(),
                ValidationErrorKind::Association,
                "related data can only be persisted through create",
            )));
        }
        Ok(materialized.instance)
    }

    fn foreign_instance(&self, instance: &Instance) -> Error {
        Error::Validation(ValidationError::single(
            "__model__",
            ValidationErrorKind::Model,
            format!(
                "'{}' instance passed to '{}' model",
                instance.entity(),
                self.schema.name()
            ),
        ))
    }
}
