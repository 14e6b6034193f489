//! Driver contract.
//!
//! The persistence pipeline never builds SQL itself. It hands structured
//! statements to a [`Connection`], and the driver decides how to execute
//! them. All operations take a `Cx` and return an `Outcome` so drivers
//! integrate with asupersync cancellation.

use crate::row::Row;
use crate::value::Value;
use asupersync::{Cx, Outcome};

/// SQL dialect of a driver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Dialect {
    /// PostgreSQL (uses $1, $2 placeholders)
    #[default]
    Postgres,
    /// SQLite (uses ?1, ?2 placeholders)
    Sqlite,
    /// MySQL (uses ? placeholders)
    Mysql,
}

impl Dialect {
    /// Placeholder for the given parameter index (1-based).
    pub fn placeholder(self, index: usize) -> String {
        match self {
            Dialect::Postgres => format!("${index}"),
            Dialect::Sqlite => format!("?{index}"),
            Dialect::Mysql => "?".to_string(),
        }
    }

    /// Quote an identifier for this dialect.
    pub fn quote_identifier(self, name: &str) -> String {
        match self {
            Dialect::Postgres | Dialect::Sqlite => crate::identifiers::quote_ident(name),
            Dialect::Mysql => crate::identifiers::quote_ident_mysql(name),
        }
    }

    /// Whether `INSERT ... RETURNING *` is available.
    pub const fn supports_returning(self) -> bool {
        matches!(self, Dialect::Postgres | Dialect::Sqlite)
    }
}

/// Insert of a single row.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement {
    /// Target table
    pub table: String,
    /// Columns in statement order
    pub columns: Vec<String>,
    /// One value per column
    pub values: Vec<Value>,
    /// Column the driver must generate a value for, if any
    pub generated_key: Option<String>,
    /// Identifier columns of the row, unique across the table
    pub key_columns: Vec<String>,
}

/// Update of a single row addressed by its identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateStatement {
    /// Target table
    pub table: String,
    /// `SET` assignments
    pub assignments: Vec<(String, Value)>,
    /// Identifier columns and their values
    pub key: Vec<(String, Value)>,
}

/// Lookup of a single row by identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectStatement {
    /// Source table
    pub table: String,
    /// Identifier columns and their values
    pub key: Vec<(String, Value)>,
}

/// What a driver reports back for an insert.
#[derive(Debug, Clone, Default)]
pub struct InsertResult {
    /// Value assigned to the generated key column
    pub generated_id: Option<Value>,
    /// The stored row, when the driver can return it
    pub row: Option<Row>,
}

/// A database connection the persistence pipeline drives.
///
/// Implementations must be `Send + Sync`; errors they return are passed
/// through the pipeline unchanged.
pub trait Connection: Send + Sync {
    /// Dialect used to render statements for this driver.
    fn dialect(&self) -> Dialect;

    /// Insert one row.
    fn insert(
        &self,
        cx: &Cx,
        stmt: &InsertStatement,
    ) -> impl Future<Output = Outcome<InsertResult, crate::Error>> + Send;

    /// Update one row, returning the number of rows affected.
    fn update(
        &self,
        cx: &Cx,
        stmt: &UpdateStatement,
    ) -> impl Future<Output = Outcome<u64, crate::Error>> + Send;

    /// Fetch one row by identifier.
    fn find(
        &self,
        cx: &Cx,
        stmt: &SelectStatement,
    ) -> impl Future<Output = Outcome<Option<Row>, crate::Error>> + Send;

    /// Run a raw statement template.
    ///
    /// `??` placeholders take identifiers and `?` placeholders take values.
    fn exec_query(
        &self,
        cx: &Cx,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Outcome<Vec<Row>, crate::Error>> + Send;
}
