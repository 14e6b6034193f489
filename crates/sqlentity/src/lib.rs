//! sqlentity - schema-driven entity persistence for Rust.
//!
//! Entities are declared at runtime in a [`SchemaRegistry`], then created,
//! saved and fetched through a driver implementing [`Connection`]:
//!
//! - Insert-time defaults (literals or producers) for omitted fields
//! - Nested `has_many` data persisted after its owner, with foreign keys
//!   pointing back at the owner
//! - Single items and ordered batches with fail-fast semantics
//! - Dialect-aware SQL rendering and `?`/`??` statement templates
//!
//! # Quick Start
//!
//! ```ignore
//! use sqlentity::prelude::*;
//!
//! async fn main_example(cx: &Cx, conn: impl Connection) -> Result<()> {
//!     let mut registry = SchemaRegistry::new();
//!     registry.define("person", [("name", FieldSpec::text())])?;
//!     registry.define("pet", [("name", FieldSpec::text().default_value("Mutt"))])?;
//!     registry.has_many("person", "pets", "pet")?;
//!
//!     let db = Database::new(conn, registry);
//!     let people = db.model("person")?;
//!
//!     let john = people
//!         .create_one(
//!             cx,
//!             Record::new()
//!                 .with("name", "John Doe")
//!                 .with_many("pets", [Record::new().with("name", "Deco")]),
//!         )
//!         .await;
//!     Ok(())
//! }
//! ```
//!
//! Nothing is rolled back when a batch or a cascade fails part way; rows
//! written before the failing item stay in the database.

pub mod database;
pub mod model;

pub use database::{Database, DatabaseBuilder};
pub use model::Model;

pub use sqlentity_core::{
    Association, Connection, ConnectionError, ConnectionErrorKind, Cx, DefaultValue, Dialect,
    EntitySchema, Entry, Error, FieldConfig, FieldInfo, FieldKind, FieldSpec, FieldValidationError, Instance, Item, Outcome, QueryError,
    QueryErrorKind, Record, Result, Row, SchemaError, SchemaErrorKind, SchemaOptions,
    SchemaRegistry, ValidationError, ValidationErrorKind, Value,
};
pub use sqlentity_query::{escape_literal, format_query};
pub use sqlentity_session::{Created, DEFAULT_MAX_CASCADE_DEPTH, Payload, SessionConfig};

/// Prelude for common imports.
///
/// ```ignore
/// use sqlentity::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        Connection, Created, Cx, Database, Error, FieldKind, FieldSpec, Instance, Item, Model,
        Outcome, Payload, Record, Result, Row, SchemaOptions, SchemaRegistry, SessionConfig,
        Value,
    };
}
