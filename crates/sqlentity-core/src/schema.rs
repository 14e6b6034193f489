//! Entity schemas and the registry that owns them.
//!
//! The registry is populated during setup through `&mut` methods and then
//! shared read-only (typically behind an `Arc`) with every pipeline call.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::{Error, Result, SchemaErrorKind};
use crate::field::{FieldConfig, FieldInfo, FieldSpec};
use crate::identifiers::default_foreign_key;
use crate::types::FieldKind;

/// Field names that collide with instance accessors.
pub const RESERVED_NAMES: &[&str] = &[
    "save",
    "saved",
    "remove",
    "validate",
    "model",
    "is_persisted",
    "is_instance",
];

/// Name of the identifier field added when none is declared.
pub const AUTO_IDENTIFIER: &str = "id";

/// Options for [`SchemaRegistry::define_with`].
#[derive(Debug, Clone, Default)]
pub struct SchemaOptions {
    /// Table name (defaults to the entity name)
    pub table: Option<String>,
    /// Identifier field names (defaults to fields flagged `key`, else `id`)
    pub identifiers: Vec<String>,
    /// Reject undeclared keys in data bags
    pub strict: bool,
}

impl SchemaOptions {
    /// Create default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store rows in `table`.
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Use the given fields as the identifier.
    pub fn identifiers<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.identifiers = names.into_iter().map(Into::into).collect();
        self
    }

    /// Reject undeclared keys.
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }
}

/// A registered entity.
#[derive(Debug, Clone)]
pub struct EntitySchema {
    name: String,
    table: String,
    fields: Vec<FieldInfo>,
    identifiers: Vec<String>,
    strict: bool,
}

impl EntitySchema {
    /// Entity name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Backing table name.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Declared fields in declaration order (auto identifier first).
    pub fn fields(&self) -> &[FieldInfo] {
        &self.fields
    }

    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldInfo> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Whether `name` is a declared field.
    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    /// Identifier field names.
    pub fn identifiers(&self) -> &[String] {
        &self.identifiers
    }

    /// Whether `name` is one of the identifier fields.
    pub fn is_identifier(&self, name: &str) -> bool {
        self.identifiers.iter().any(|id| id == name)
    }

    /// The driver-generated identifier field, if the identifier is a single
    /// `serial` field.
    pub fn generated_identifier(&self) -> Option<&FieldInfo> {
        match self.identifiers.as_slice() {
            [only] => self.field(only).filter(|f| f.is_generated()),
            _ => None,
        }
    }

    /// Whether undeclared keys are rejected.
    pub fn is_strict(&self) -> bool {
        self.strict
    }
}

/// One-to-many relation from an owner entity to a related entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Association {
    /// Relation name (the key used in data bags)
    pub name: String,
    /// Owning entity name
    pub owner: String,
    /// Related entity name
    pub related: String,
    /// Columns on the related table, one per owner identifier field
    pub foreign_key: Vec<String>,
}

/// Registry of entity schemas and their associations.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    entities: BTreeMap<String, Arc<EntitySchema>>,
    associations: BTreeMap<String, Vec<Association>>,
}

impl SchemaRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Define an entity with default options.
    pub fn define<I, S>(&mut self, name: &str, fields: I) -> Result<Arc<EntitySchema>>
    where
        I: IntoIterator<Item = (S, FieldSpec)>,
        S: Into<String>,
    {
        self.define_with(name, fields, SchemaOptions::default())
    }

    /// Define an entity.
    #[tracing::instrument(level = "debug", skip(self, fields, options))]
    pub fn define_with<I, S>(
        &mut self,
        name: &str,
        fields: I,
        options: SchemaOptions,
    ) -> Result<Arc<EntitySchema>>
    where
        I: IntoIterator<Item = (S, FieldSpec)>,
        S: Into<String>,
    {
        if name.is_empty() {
            return Err(Error::schema(
                SchemaErrorKind::Invalid,
                name,
                "entity name must not be empty",
            ));
        }
        if self.entities.contains_key(name) {
            return Err(Error::schema(
                SchemaErrorKind::DuplicateEntity,
                name,
                "entity is already defined",
            ));
        }

        let mut compiled: Vec<FieldInfo> = Vec::new();
        for (field_name, spec) in fields {
            let field_name = field_name.into();
            if field_name.is_empty() {
                return Err(Error::schema(
                    SchemaErrorKind::Invalid,
                    name,
                    "field name must not be empty",
                ));
            }
            if RESERVED_NAMES.contains(&field_name.as_str()) {
                return Err(Error::schema(
                    SchemaErrorKind::ReservedName,
                    name,
                    format!("field name '{field_name}' is reserved"),
                ));
            }
            if compiled.iter().any(|f| f.name == field_name) {
                return Err(Error::schema(
                    SchemaErrorKind::DuplicateField,
                    name,
                    format!("field '{field_name}' is declared twice"),
                ));
            }
            compiled.push(FieldInfo::compile(name, &field_name, spec)?);
        }

        let identifiers = resolve_identifiers(name, &mut compiled, options.identifiers)?;
        for field in &mut compiled {
            if identifiers.contains(&field.name) {
                field.key = true;
            }
        }

        let schema = Arc::new(EntitySchema {
            name: name.to_string(),
            table: options.table.unwrap_or_else(|| name.to_string()),
            fields: compiled,
            identifiers,
            strict: options.strict,
        });
        tracing::debug!(
            entity = name,
            table = schema.table(),
            fields = schema.fields().len(),
            "Defined entity"
        );
        self.entities.insert(name.to_string(), Arc::clone(&schema));
        Ok(schema)
    }

    /// Define an entity from a JSON object of field configurations.
    ///
    /// ```
    /// use sqlentity_core::SchemaRegistry;
    ///
    /// let mut registry = SchemaRegistry::new();
    /// let pet = registry
    ///     .define_from_json("pet", serde_json::json!({
    ///         "name": { "type": "text", "defaultValue": "Mutt" },
    ///         "age": "number"
    ///     }))
    ///     .unwrap();
    /// assert!(pet.has_field("name"));
    /// ```
    pub fn define_from_json(
        &mut self,
        name: &str,
        config: serde_json::Value,
    ) -> Result<Arc<EntitySchema>> {
        let serde_json::Value::Object(map) = config else {
            return Err(Error::schema(
                SchemaErrorKind::Invalid,
                name,
                "field configuration must be a JSON object",
            ));
        };
        let mut specs = Vec::with_capacity(map.len());
        for (field, raw) in map {
            let cfg: FieldConfig = serde_json::from_value(raw).map_err(|e| {
                Error::schema(
                    SchemaErrorKind::Invalid,
                    name,
                    format!("field '{field}' is malformed: {e}"),
                )
            })?;
            let spec = cfg.into_spec(name, &field)?;
            specs.push((field, spec));
        }
        self.define(name, specs)
    }

    /// Declare a one-to-many relation with the conventional foreign key.
    pub fn has_many(&mut self, owner: &str, relation: &str, related: &str) -> Result<()> {
        let owner_schema = self.require(owner)?;
        let foreign_key = owner_schema
            .identifiers()
            .iter()
            .map(|id| default_foreign_key(owner, id))
            .collect();
        self.has_many_with(owner, relation, related, foreign_key)
    }

    /// Declare a one-to-many relation with explicit foreign-key columns.
    pub fn has_many_with(
        &mut self,
        owner: &str,
        relation: &str,
        related: &str,
        foreign_key: Vec<String>,
    ) -> Result<()> {
        let owner_schema = self.require(owner)?;
        let related_schema = self.require(related)?;

        if owner_schema.has_field(relation) {
            return Err(Error::schema(
                SchemaErrorKind::DuplicateRelation,
                owner,
                format!("relation '{relation}' collides with a field"),
            ));
        }
        if self.association(owner, relation).is_some() {
            return Err(Error::schema(
                SchemaErrorKind::DuplicateRelation,
                owner,
                format!("relation '{relation}' is already declared"),
            ));
        }
        if foreign_key.len() != owner_schema.identifiers().len() {
            return Err(Error::schema(
                SchemaErrorKind::Invalid,
                owner,
                format!(
                    "relation '{relation}' needs {} foreign key column(s), got {}",
                    owner_schema.identifiers().len(),
                    foreign_key.len()
                ),
            ));
        }
        if let Some(clash) = foreign_key
            .iter()
            .find(|fk| related_schema.is_identifier(fk))
        {
            return Err(Error::schema(
                SchemaErrorKind::Invalid,
                related,
                format!("foreign key '{clash}' cannot be an identifier of '{related}'"),
            ));
        }

        tracing::debug!(owner, relation, related, ?foreign_key, "Declared has-many");
        self.associations
            .entry(owner.to_string())
            .or_default()
            .push(Association {
                name: relation.to_string(),
                owner: owner.to_string(),
                related: related.to_string(),
                foreign_key,
            });
        Ok(())
    }

    /// Look up an entity.
    pub fn get(&self, name: &str) -> Option<&Arc<EntitySchema>> {
        self.entities.get(name)
    }

    /// Look up an entity, failing with `UnknownEntity`.
    pub fn require(&self, name: &str) -> Result<Arc<EntitySchema>> {
        self.entities.get(name).cloned().ok_or_else(|| {
            Error::schema(
                SchemaErrorKind::UnknownEntity,
                name,
                "entity is not registered",
            )
        })
    }

    /// Relations owned by `owner`, in declaration order.
    pub fn associations(&self, owner: &str) -> &[Association] {
        self.associations
            .get(owner)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Look up a single relation.
    pub fn association(&self, owner: &str, relation: &str) -> Option<&Association> {
        self.associations(owner).iter().find(|a| a.name == relation)
    }

    /// Registered entity names.
    pub fn entity_names(&self) -> impl Iterator<Item = &str> {
        self.entities.keys().map(String::as_str)
    }
}

fn resolve_identifiers(
    entity: &str,
    fields: &mut Vec<FieldInfo>,
    explicit: Vec<String>,
) -> Result<Vec<String>> {
    let mut identifiers = if explicit.is_empty() {
        fields
            .iter()
            .filter(|f| f.key)
            .map(|f| f.name.clone())
            .collect::<Vec<_>>()
    } else {
        explicit
    };
    if identifiers.is_empty() {
        identifiers.push(AUTO_IDENTIFIER.to_string());
    }

    for id in &identifiers {
        if fields.iter().any(|f| &f.name == id) {
            continue;
        }
        if id == AUTO_IDENTIFIER {
            let auto = FieldInfo::compile(entity, AUTO_IDENTIFIER, FieldSpec::new(FieldKind::Serial))?;
            fields.insert(0, auto);
        } else {
            return Err(Error::schema(
                SchemaErrorKind::Invalid,
                entity,
                format!("identifier '{id}' is not a declared field"),
            ));
        }
    }
    Ok(identifiers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn registry() -> SchemaRegistry {
        let mut registry = SchemaRegistry::new();
        registry
            .define("person", [("name", FieldSpec::of::<String>())])
            .unwrap();
        registry
            .define(
                "pet",
                [
                    ("name", FieldSpec::text().default_value("Mutt")),
                    ("age", FieldSpec::number()),
                ],
            )
            .unwrap();
        registry
    }

    fn schema_kind(err: Error) -> SchemaErrorKind {
        match err {
            Error::Schema(e) => e.kind,
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn test_auto_identifier() {
        let registry = registry();
        let pet = registry.get("pet").unwrap();
        assert_eq!(pet.identifiers(), ["id".to_string()]);
        assert_eq!(pet.fields()[0].name, "id");
        assert_eq!(pet.fields()[0].kind, FieldKind::Serial);
        assert!(pet.fields()[0].key);
        assert_eq!(pet.generated_identifier().map(|f| f.name.as_str()), Some("id"));
        assert_eq!(pet.table(), "pet");
    }

    #[test]
    fn test_explicit_key_field() {
        let mut registry = SchemaRegistry::new();
        let tag = registry
            .define_with(
                "tag",
                [("code", FieldSpec::text().key()), ("label", FieldSpec::text())],
                SchemaOptions::new().table("tags").strict(),
            )
            .unwrap();
        assert_eq!(tag.identifiers(), ["code".to_string()]);
        assert!(tag.generated_identifier().is_none());
        assert!(!tag.has_field("id"));
        assert_eq!(tag.table(), "tags");
        assert!(tag.is_strict());
    }

    #[test]
    fn test_identifier_must_be_declared() {
        let mut registry = SchemaRegistry::new();
        let err = registry
            .define_with(
                "tag",
                [("label", FieldSpec::text())],
                SchemaOptions::new().identifiers(["code"]),
            )
            .unwrap_err();
        assert_eq!(schema_kind(err), SchemaErrorKind::Invalid);
    }

    #[test]
    fn test_reserved_and_duplicate_names() {
        let mut registry = SchemaRegistry::new();
        let err = registry
            .define("pen", [("save", FieldSpec::text())])
            .unwrap_err();
        assert_eq!(schema_kind(err), SchemaErrorKind::ReservedName);

        let err = registry
            .define("pen", [("colour", FieldSpec::text()), ("colour", FieldSpec::text())])
            .unwrap_err();
        assert_eq!(schema_kind(err), SchemaErrorKind::DuplicateField);

        registry.define("pen", [("colour", FieldSpec::text())]).unwrap();
        let err = registry.define("pen", [("ink", FieldSpec::text())]).unwrap_err();
        assert_eq!(schema_kind(err), SchemaErrorKind::DuplicateEntity);
    }

    #[test]
    fn test_has_many_default_foreign_key() {
        let mut registry = registry();
        registry.has_many("person", "pets", "pet").unwrap();
        let assoc = registry.association("person", "pets").unwrap();
        assert_eq!(assoc.related, "pet");
        assert_eq!(assoc.foreign_key, vec!["person_id".to_string()]);
        assert_eq!(registry.associations("pet").len(), 0);
    }

    #[test]
    fn test_has_many_errors() {
        let mut registry = registry();
        let err = registry.has_many("person", "pets", "dragon").unwrap_err();
        assert_eq!(schema_kind(err), SchemaErrorKind::UnknownEntity);

        let err = registry.has_many("person", "name", "pet").unwrap_err();
        assert_eq!(schema_kind(err), SchemaErrorKind::DuplicateRelation);

        registry.has_many("person", "pets", "pet").unwrap();
        let err = registry.has_many("person", "pets", "pet").unwrap_err();
        assert_eq!(schema_kind(err), SchemaErrorKind::DuplicateRelation);

        let err = registry
            .has_many_with("person", "others", "pet", vec!["a".into(), "b".into()])
            .unwrap_err();
        assert_eq!(schema_kind(err), SchemaErrorKind::Invalid);
    }

    #[test]
    fn test_define_from_json() {
        let mut registry = SchemaRegistry::new();
        let pet = registry
            .define_from_json(
                "pet",
                serde_json::json!({
                    "name": { "type": "text", "defaultValue": "Mutt" },
                    "age": { "type": "number" }
                }),
            )
            .unwrap();
        let name = pet.field("name").unwrap();
        assert_eq!(
            name.default.as_ref().map(|d| d.produce()),
            Some(Value::Text("Mutt".into()))
        );
        assert_eq!(pet.field("age").unwrap().kind, FieldKind::Number);

        let err = registry
            .define_from_json("pen", serde_json::json!(["colour"]))
            .unwrap_err();
        assert_eq!(schema_kind(err), SchemaErrorKind::Invalid);

        let err = registry
            .define_from_json("pen", serde_json::json!({"colour": {"kind": "text"}}))
            .unwrap_err();
        assert_eq!(schema_kind(err), SchemaErrorKind::Invalid);
    }
}
