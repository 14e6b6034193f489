//! SQL rendering for driver statements.
//!
//! Each builder wraps one statement and produces `(sql, params)` for a
//! dialect. Drivers that speak SQL use these directly; the memory driver
//! uses them for its statement log.

use sqlentity_core::{Dialect, InsertStatement, SelectStatement, UpdateStatement, Value};

/// INSERT rendering.
#[derive(Debug)]
pub struct InsertBuilder<'a> {
    stmt: &'a InsertStatement,
    returning: bool,
}

impl<'a> InsertBuilder<'a> {
    /// Create a new INSERT builder for the given statement.
    pub fn new(stmt: &'a InsertStatement) -> Self {
        Self {
            stmt,
            returning: true,
        }
    }

    /// Do not append `RETURNING *` even when the dialect supports it.
    pub fn without_returning(mut self) -> Self {
        self.returning = false;
        self
    }

    /// Build the INSERT SQL and parameters with default dialect (Postgres).
    pub fn build(&self) -> (String, Vec<Value>) {
        self.build_with_dialect(Dialect::default())
    }

    /// Build the INSERT SQL and parameters with specific dialect.
    pub fn build_with_dialect(&self, dialect: Dialect) -> (String, Vec<Value>) {
        let table = dialect.quote_identifier(&self.stmt.table);
        let mut sql = if self.stmt.columns.is_empty() {
            match dialect {
                Dialect::Mysql => format!("INSERT INTO {table} () VALUES ()"),
                Dialect::Postgres | Dialect::Sqlite => {
                    format!("INSERT INTO {table} DEFAULT VALUES")
                }
            }
        } else {
            let columns: Vec<_> = self
                .stmt
                .columns
                .iter()
                .map(|c| dialect.quote_identifier(c))
                .collect();
            let placeholders: Vec<_> = (1..=self.stmt.values.len())
                .map(|i| dialect.placeholder(i))
                .collect();
            format!(
                "INSERT INTO {} ({}) VALUES ({})",
                table,
                columns.join(", "),
                placeholders.join(", ")
            )
        };

        if self.returning && dialect.supports_returning() {
            sql.push_str(" RETURNING *");
        }
        (sql, self.stmt.values.clone())
    }
}

/// UPDATE rendering.
#[derive(Debug)]
pub struct UpdateBuilder<'a> {
    stmt: &'a UpdateStatement,
}

impl<'a> UpdateBuilder<'a> {
    /// Create a new UPDATE builder for the given statement.
    pub fn new(stmt: &'a UpdateStatement) -> Self {
        Self { stmt }
    }

    /// Build the UPDATE SQL and parameters with default dialect (Postgres).
    pub fn build(&self) -> (String, Vec<Value>) {
        self.build_with_dialect(Dialect::default())
    }

    /// Build the UPDATE SQL and parameters with specific dialect.
    pub fn build_with_dialect(&self, dialect: Dialect) -> (String, Vec<Value>) {
        let mut params = Vec::with_capacity(self.stmt.assignments.len() + self.stmt.key.len());
        let mut set_clauses = Vec::with_capacity(self.stmt.assignments.len());

        for (name, value) in &self.stmt.assignments {
            params.push(value.clone());
            set_clauses.push(format!(
                "{} = {}",
                dialect.quote_identifier(name),
                dialect.placeholder(params.len())
            ));
        }

        let mut sql = format!(
            "UPDATE {} SET {}",
            dialect.quote_identifier(&self.stmt.table),
            set_clauses.join(", ")
        );
        push_key_filter(&mut sql, &mut params, &self.stmt.key, dialect);
        (sql, params)
    }
}

/// Single-row SELECT rendering.
#[derive(Debug)]
pub struct SelectBuilder<'a> {
    stmt: &'a SelectStatement,
}

impl<'a> SelectBuilder<'a> {
    /// Create a new SELECT builder for the given statement.
    pub fn new(stmt: &'a SelectStatement) -> Self {
        Self { stmt }
    }

    /// Build the SELECT SQL and parameters with default dialect (Postgres).
    pub fn build(&self) -> (String, Vec<Value>) {
        self.build_with_dialect(Dialect::default())
    }

    /// Build the SELECT SQL and parameters with specific dialect.
    pub fn build_with_dialect(&self, dialect: Dialect) -> (String, Vec<Value>) {
        let mut params = Vec::with_capacity(self.stmt.key.len());
        let mut sql = format!(
            "SELECT * FROM {}",
            dialect.quote_identifier(&self.stmt.table)
        );
        push_key_filter(&mut sql, &mut params, &self.stmt.key, dialect);
        sql.push_str(" LIMIT 1");
        (sql, params)
    }
}

fn push_key_filter(
    sql: &mut String,
    params: &mut Vec<Value>,
    key: &[(String, Value)],
    dialect: Dialect,
) {
    if key.is_empty() {
        return;
    }
    let mut conditions = Vec::with_capacity(key.len());
    for (name, value) in key {
        params.push(value.clone());
        conditions.push(format!(
            "{} = {}",
            dialect.quote_identifier(name),
            dialect.placeholder(params.len())
        ));
    }
    sql.push_str(" WHERE ");
    sql.push_str(&conditions.join(" AND "));
}
