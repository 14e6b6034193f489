//! Core types and traits for sqlentity.
//!
//! This crate holds everything the persistence pipeline works on:
//!
//! - `SchemaRegistry` with entity schemas and has-many associations
//! - `Record`/`Item` payloads and the `materialize` step that turns them
//!   into `Instance`s
//! - insert/update default resolution and field validation
//! - the `Connection` trait drivers implement
//! - `Outcome` and `Cx` re-exported from asupersync

// Re-export asupersync primitives for structured concurrency
pub use asupersync::{Cx, Outcome};

pub mod connection;
pub mod defaults;
pub mod error;
pub mod field;
pub mod identifiers;
pub mod instance;
pub mod materialize;
pub mod record;
pub mod row;
pub mod schema;
pub mod types;
pub mod validate;
pub mod value;

pub use connection::{
    Connection, Dialect, InsertResult, InsertStatement, SelectStatement, UpdateStatement,
};
pub use defaults::{Operation, resolve};
pub use error::{
    ConfigError, ConnectionError, ConnectionErrorKind, Error, FieldValidationError, QueryError,
    QueryErrorKind, Result, SchemaError, SchemaErrorKind, TypeError, ValidationError,
    ValidationErrorKind,
};
pub use field::{DefaultValue, FieldConfig, FieldInfo, FieldSpec, Producer};
pub use identifiers::{default_foreign_key, quote_ident, quote_ident_mysql, sanitize_identifier};
pub use instance::Instance;
pub use materialize::{Materialized, Pending, materialize};
pub use record::{Entry, Item, Record};
pub use row::{FromValue, Row};
pub use schema::{Association, EntitySchema, SchemaOptions, SchemaRegistry};
pub use types::{FieldKind, Primitive};
pub use validate::validate_instance;
pub use value::Value;
