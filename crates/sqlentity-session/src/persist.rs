//! Single-instance insert, update and fetch.

use std::sync::Arc;

use sqlentity_core::{
    Connection, Cx, EntitySchema, Error, InsertStatement, Instance, Operation, Outcome,
    QueryErrorKind, SelectStatement, UpdateStatement, ValidationError, ValidationErrorKind, Value,
    resolve, validate_instance,
};
use sqlentity_query::{InsertBuilder, SelectBuilder, UpdateBuilder};

use crate::Session;

impl<C: Connection> Session<'_, C> {
    /// Persist one instance without touching its associations.
    ///
    /// An instance that was never persisted is inserted; otherwise its row is
    /// updated.
    pub async fn save(&self, cx: &Cx, instance: &mut Instance) -> Outcome<(), Error> {
        if instance.is_persisted() {
            self.update(cx, instance).await
        } else {
            self.insert(cx, instance).await
        }
    }

    #[tracing::instrument(level = "debug", skip(self, cx, instance), fields(entity = instance.entity()))]
    async fn insert(&self, cx: &Cx, instance: &mut Instance) -> Outcome<(), Error> {
        if let Err(e) = self.check(instance) {
            return Outcome::Err(e);
        }
        let schema = Arc::clone(instance.schema());

        let generated_key = schema
            .generated_identifier()
            .filter(|f| instance.get(&f.name).is_none_or(Value::is_null))
            .map(|f| f.name.clone());
        // Holds even with validation off: without a key the row could not
        // be addressed afterwards.
        if let Some(missing) = schema.identifiers().iter().find(|id| {
            generated_key.as_deref() != Some(id.as_str())
                && instance.get(id).is_none_or(Value::is_null)
        }) {
            return Outcome::Err(Error::Validation(ValidationError::single(
                missing.clone(),
                ValidationErrorKind::Required,
                "identifier must be supplied before insert",
            )));
        }

        let (columns, values): (Vec<String>, Vec<Value>) = instance
            .values()
            .filter(|(name, _)| generated_key.as_deref() != Some(*name))
            .map(|(name, value)| (name.to_string(), value.clone()))
            .unzip();

        let stmt = InsertStatement {
            table: schema.table().to_string(),
            columns,
            values,
            generated_key,
            key_columns: schema.identifiers().to_vec(),
        };
        tracing::trace!(
            sql = %InsertBuilder::new(&stmt).build_with_dialect(self.conn.dialect()).0,
            "Insert"
        );

        let result = match self.conn.insert(cx, &stmt).await {
            Outcome::Ok(result) => result,
            Outcome::Err(e) => return Outcome::Err(e),
            Outcome::Cancelled(r) => return Outcome::Cancelled(r),
            Outcome::Panicked(p) => return Outcome::Panicked(p),
        };

        if let (Some(column), Some(id)) = (&stmt.generated_key, result.generated_id) {
            instance.set(column.clone(), id);
        }
        if let Some(row) = &result.row {
            instance.backfill(row);
        }
        if instance.identifier().is_none() {
            return Outcome::Err(Error::query(
                QueryErrorKind::Database,
                format!(
                    "driver did not report the identifier of the new '{}' row",
                    schema.name()
                ),
            ));
        }

        instance.mark_saved();
        tracing::debug!(id = ?instance.identifier(), "Inserted");
        Outcome::Ok(())
    }

    #[tracing::instrument(level = "debug", skip(self, cx, instance), fields(entity = instance.entity()))]
    async fn update(&self, cx: &Cx, instance: &mut Instance) -> Outcome<(), Error> {
        let schema = Arc::clone(instance.schema());
        let Some(key_values) = instance.identifier() else {
            return Outcome::Err(Error::Validation(ValidationError::single(
                schema.identifiers().join(","),
                ValidationErrorKind::Required,
                "a persisted instance needs its identifier to be updated",
            )));
        };
        if let Err(e) = self.check(instance) {
            return Outcome::Err(e);
        }

        let mut assignments: Vec<(String, Value)> = schema
            .fields()
            .iter()
            .filter(|f| !schema.is_identifier(&f.name))
            .map(|f| {
                let value = instance
                    .get(&f.name)
                    .cloned()
                    .or_else(|| resolve(f, Operation::Update))
                    .unwrap_or(Value::Null);
                (f.name.clone(), value)
            })
            .collect();
        // Link columns are not declared fields but still belong to the row.
        assignments.extend(
            instance
                .values()
                .filter(|(name, _)| !schema.has_field(name))
                .map(|(name, value)| (name.to_string(), value.clone())),
        );

        if assignments.is_empty() {
            instance.mark_saved();
            return Outcome::Ok(());
        }

        let stmt = UpdateStatement {
            table: schema.table().to_string(),
            assignments,
            key: schema.identifiers().iter().cloned().zip(key_values).collect(),
        };
        tracing::trace!(
            sql = %UpdateBuilder::new(&stmt).build_with_dialect(self.conn.dialect()).0,
            "Update"
        );

        let affected = match self.conn.update(cx, &stmt).await {
            Outcome::Ok(n) => n,
            Outcome::Err(e) => return Outcome::Err(e),
            Outcome::Cancelled(r) => return Outcome::Cancelled(r),
            Outcome::Panicked(p) => return Outcome::Panicked(p),
        };
        if affected == 0 {
            tracing::warn!(key = ?stmt.key, "Update matched no rows");
        }

        instance.mark_saved();
        Outcome::Ok(())
    }

    /// Fetch an instance by its identifier values.
    ///
    /// Fails with a `NotFound` query error when no row matches.
    #[tracing::instrument(level = "debug", skip(self, cx, schema), fields(entity = schema.name()))]
    pub async fn get(
        &self,
        cx: &Cx,
        schema: &Arc<EntitySchema>,
        key: &[Value],
    ) -> Outcome<Instance, Error> {
        if key.len() != schema.identifiers().len() {
            return Outcome::Err(Error::Validation(ValidationError::single(
                "__model__",
                ValidationErrorKind::Model,
                format!(
                    "'{}' is identified by {} value(s), got {}",
                    schema.name(),
                    schema.identifiers().len(),
                    key.len()
                ),
            )));
        }

        let stmt = SelectStatement {
            table: schema.table().to_string(),
            key: schema
                .identifiers()
                .iter()
                .cloned()
                .zip(key.iter().cloned())
                .collect(),
        };
        tracing::trace!(
            sql = %SelectBuilder::new(&stmt).build_with_dialect(self.conn.dialect()).0,
            "Find"
        );

        match self.conn.find(cx, &stmt).await {
            Outcome::Ok(Some(row)) => Outcome::Ok(Instance::from_row(Arc::clone(schema), &row)),
            Outcome::Ok(None) => Outcome::Err(Error::query(
                QueryErrorKind::NotFound,
                format!("no '{}' row with identifier {:?}", schema.name(), key),
            )),
            Outcome::Err(e) => Outcome::Err(e),
            Outcome::Cancelled(r) => Outcome::Cancelled(r),
            Outcome::Panicked(p) => Outcome::Panicked(p),
        }
    }

    fn check(&self, instance: &Instance) -> Result<(), Error> {
        if self.config.validate {
            validate_instance(instance).map_err(Error::Validation)?;
        }
        Ok(())
    }
}
