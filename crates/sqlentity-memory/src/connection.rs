//! In-memory connection.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

use sqlentity_core::{
    Connection, ConnectionError, ConnectionErrorKind, Cx, Dialect, Error, InsertResult,
    InsertStatement, Outcome, QueryErrorKind, Row, SelectStatement, UpdateStatement, Value,
};
use sqlentity_query::{InsertBuilder, SelectBuilder, UpdateBuilder, format_query, normalize};

use crate::table::Table;

const ALTER_SET_DEFAULT: &str = "ALTER TABLE ?? ALTER COLUMN ?? SET DEFAULT ?";
const ALTER_DROP_DEFAULT: &str = "ALTER TABLE ?? ALTER COLUMN ?? DROP DEFAULT";
const DELETE_ALL: &str = "DELETE FROM ??";
const SELECT_ALL: &str = "SELECT * FROM ??";

/// A statement the connection executed, rendered for its dialect.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggedStatement {
    /// SQL text with placeholders (or inlined literals for raw templates)
    pub sql: String,
    /// Bound parameters
    pub params: Vec<Value>,
}

#[derive(Debug, Default)]
struct MemoryState {
    tables: BTreeMap<String, Table>,
    log: Vec<LoggedStatement>,
    fail_next_insert: BTreeSet<String>,
    closed: bool,
}

impl MemoryState {
    fn open(&mut self) -> Result<&mut Self, Error> {
        if self.closed {
            return Err(Error::Connection(ConnectionError {
                kind: ConnectionErrorKind::Disconnected,
                message: "memory database is closed".to_string(),
                source: None,
            }));
        }
        Ok(self)
    }
}

/// Driver keeping every table in process memory.
///
/// Tables appear on first insert, which also fixes their identifier
/// columns. Inserting a row whose identifier values are all present and
/// already stored fails with SQLSTATE `23505`, whether the values came
/// from the caller or from the auto-increment sequence. Column defaults
/// are managed through `exec_query` with the usual `ALTER TABLE`
/// statements.
#[derive(Debug, Default)]
pub struct MemoryConnection {
    inner: Mutex<MemoryState>,
    dialect: Dialect,
}

impl MemoryConnection {
    /// Create an empty database rendering statements as Postgres.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty database rendering statements for `dialect`.
    pub fn with_dialect(dialect: Dialect) -> Self {
        Self {
            inner: Mutex::new(MemoryState::default()),
            dialect,
        }
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        // A poisoned lock only means a test panicked mid-statement.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Make the next insert into `table` fail with a database error.
    pub fn fail_next_insert(&self, table: &str) {
        self.state().fail_next_insert.insert(table.to_string());
    }

    /// All rows of `table`, in insertion order.
    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.state()
            .tables
            .get(table)
            .map(Table::all_rows)
            .unwrap_or_default()
    }

    /// Names of tables that exist.
    pub fn table_names(&self) -> Vec<String> {
        self.state().tables.keys().cloned().collect()
    }

    /// Executed statements, oldest first.
    pub fn statements(&self) -> Vec<LoggedStatement> {
        self.state().log.clone()
    }

    /// Executed SQL texts, oldest first.
    pub fn statement_sql(&self) -> Vec<String> {
        self.state().log.iter().map(|s| s.sql.clone()).collect()
    }

    /// Forget the statement log.
    pub fn clear_log(&self) {
        self.state().log.clear();
    }

    /// Close the database. Every later statement fails as disconnected;
    /// stored rows stay readable through [`rows`](Self::rows).
    pub fn close(&self) {
        self.state().closed = true;
    }

    /// Whether [`close`](Self::close) was called.
    pub fn is_closed(&self) -> bool {
        self.state().closed
    }

    fn insert_sync(&self, stmt: &InsertStatement) -> Result<InsertResult, Error> {
        let (sql, params) = InsertBuilder::new(stmt).build_with_dialect(self.dialect);
        tracing::trace!(sql = %sql, "memory insert");

        let mut guard = self.state();
        let state = guard.open()?;
        if state.fail_next_insert.remove(&stmt.table) {
            return Err(with_sql(
                Error::query(
                    QueryErrorKind::Database,
                    format!("injected failure on insert into '{}'", stmt.table),
                ),
                &sql,
            ));
        }
        let (generated_id, row) = state
            .tables
            .entry(stmt.table.clone())
            .or_default()
            .insert(stmt)
            .map_err(|e| with_sql(e, &sql))?;
        state.log.push(LoggedStatement { sql, params });
        Ok(InsertResult {
            generated_id,
            row: Some(row),
        })
    }

    fn update_sync(&self, stmt: &UpdateStatement) -> Result<u64, Error> {
        let (sql, params) = UpdateBuilder::new(stmt).build_with_dialect(self.dialect);
        tracing::trace!(sql = %sql, "memory update");

        let mut guard = self.state();
        let state = guard.open()?;
        let affected = state
            .tables
            .get_mut(&stmt.table)
            .map_or(0, |t| t.update(&stmt.assignments, &stmt.key));
        state.log.push(LoggedStatement { sql, params });
        Ok(affected)
    }

    fn find_sync(&self, stmt: &SelectStatement) -> Result<Option<Row>, Error> {
        let (sql, params) = SelectBuilder::new(stmt).build_with_dialect(self.dialect);
        tracing::trace!(sql = %sql, "memory find");

        let mut guard = self.state();
        let state = guard.open()?;
        let row = state.tables.get(&stmt.table).and_then(|t| t.find(&stmt.key));
        state.log.push(LoggedStatement { sql, params });
        Ok(row)
    }

    fn exec_sync(&self, template: &str, params: &[Value]) -> Result<Vec<Row>, Error> {
        let sql = format_query(template, params, self.dialect)?;
        tracing::trace!(sql = %sql, "memory exec");

        let ident = |i: usize| params.get(i).and_then(Value::as_str).unwrap_or_default();
        let mut guard = self.state();
        let state = guard.open()?;
        let rows = match normalize(template).as_str() {
            ALTER_SET_DEFAULT => {
                let value = params.get(2).cloned().unwrap_or(Value::Null);
                state
                    .tables
                    .entry(ident(0).to_string())
                    .or_default()
                    .set_default(ident(1), value);
                Vec::new()
            }
            ALTER_DROP_DEFAULT => {
                if let Some(table) = state.tables.get_mut(ident(0)) {
                    table.drop_default(ident(1));
                }
                Vec::new()
            }
            DELETE_ALL => {
                if let Some(table) = state.tables.get_mut(ident(0)) {
                    table.clear();
                }
                Vec::new()
            }
            SELECT_ALL => match state.tables.get(ident(0)) {
                Some(table) => table.all_rows(),
                None => {
                    return Err(with_sql(
                        Error::query(
                            QueryErrorKind::NotFound,
                            format!("table '{}' does not exist", ident(0)),
                        ),
                        &sql,
                    ));
                }
            },
            _ => {
                return Err(with_sql(
                    Error::query(QueryErrorKind::Syntax, "statement not supported by memory driver"),
                    &sql,
                ));
            }
        };
        state.log.push(LoggedStatement {
            sql,
            params: Vec::new(),
        });
        Ok(rows)
    }
}

fn with_sql(err: Error, sql: &str) -> Error {
    match err {
        Error::Query(mut q) => {
            q.sql = Some(sql.to_string());
            Error::Query(q)
        }
        other => other,
    }
}

impl Connection for MemoryConnection {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn insert(
        &self,
        _cx: &Cx,
        stmt: &InsertStatement,
    ) -> impl Future<Output = Outcome<InsertResult, Error>> + Send {
        let result = self.insert_sync(stmt);
        async move { result.map_or_else(Outcome::Err, Outcome::Ok) }
    }

    fn update(
        &self,
        _cx: &Cx,
        stmt: &UpdateStatement,
    ) -> impl Future<Output = Outcome<u64, Error>> + Send {
        let result = self.update_sync(stmt);
        async move { result.map_or_else(Outcome::Err, Outcome::Ok) }
    }

    fn find(
        &self,
        _cx: &Cx,
        stmt: &SelectStatement,
    ) -> impl Future<Output = Outcome<Option<Row>, Error>> + Send {
        let result = self.find_sync(stmt);
        async move { result.map_or_else(Outcome::Err, Outcome::Ok) }
    }

    fn exec_query(
        &self,
        _cx: &Cx,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Outcome<Vec<Row>, Error>> + Send {
        let result = self.exec_sync(sql, params);
        async move { result.map_or_else(Outcome::Err, Outcome::Ok) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use asupersync::runtime::RuntimeBuilder;

    fn unwrap_outcome<T>(outcome: Outcome<T, Error>) -> T {
        match outcome {
            Outcome::Ok(v) => v,
            Outcome::Err(e) => panic!("unexpected error: {e}"),
            Outcome::Cancelled(r) => panic!("cancelled: {r:?}"),
            Outcome::Panicked(p) => panic!("panicked: {p:?}"),
        }
    }

    fn is_disconnected<T>(outcome: Outcome<T, Error>) -> bool {
        matches!(
            outcome,
            Outcome::Err(Error::Connection(e)) if e.kind == ConnectionErrorKind::Disconnected
        )
    }

    fn pen_insert() -> InsertStatement {
        InsertStatement {
            table: "pen".to_string(),
            columns: vec![],
            values: vec![],
            generated_key: Some("id".to_string()),
            key_columns: vec!["id".to_string()],
        }
    }

    #[test]
    fn column_default_via_exec_query() {
        let rt = RuntimeBuilder::current_thread()
            .build()
            .expect("create asupersync runtime");
        let cx = Cx::for_testing();
        let conn = MemoryConnection::new();

        rt.block_on(async {
            unwrap_outcome(
                conn.exec_query(
                    &cx,
                    "ALTER TABLE ?? ALTER COLUMN ?? SET DEFAULT ?",
                    &[Value::from("pen"), Value::from("colour"), Value::from("blue")],
                )
                .await,
            );
            let result = unwrap_outcome(conn.insert(&cx, &pen_insert()).await);
            assert_eq!(result.generated_id, Some(Value::BigInt(1)));
            let row = result.row.unwrap();
            assert_eq!(row.get_by_name("colour"), Some(&Value::from("blue")));
        });

        assert_eq!(
            conn.statement_sql(),
            vec![
                "ALTER TABLE \"pen\" ALTER COLUMN \"colour\" SET DEFAULT 'blue'".to_string(),
                "INSERT INTO \"pen\" DEFAULT VALUES RETURNING *".to_string(),
            ]
        );
    }

    #[test]
    fn select_and_delete_all() {
        let rt = RuntimeBuilder::current_thread()
            .build()
            .expect("create asupersync runtime");
        let cx = Cx::for_testing();
        let conn = MemoryConnection::with_dialect(Dialect::Mysql);

        rt.block_on(async {
            unwrap_outcome(conn.insert(&cx, &pen_insert()).await);
            unwrap_outcome(conn.insert(&cx, &pen_insert()).await);
            let rows = unwrap_outcome(
                conn.exec_query(&cx, "SELECT * FROM ??", &[Value::from("pen")]).await,
            );
            assert_eq!(rows.len(), 2);
            unwrap_outcome(conn.exec_query(&cx, "DELETE FROM ??", &[Value::from("pen")]).await);
        });
        assert!(conn.rows("pen").is_empty());
        assert_eq!(conn.statement_sql()[0], "INSERT INTO `pen` () VALUES ()");
    }

    #[test]
    fn unsupported_and_malformed_templates() {
        let rt = RuntimeBuilder::current_thread()
            .build()
            .expect("create asupersync runtime");
        let cx = Cx::for_testing();
        let conn = MemoryConnection::new();

        rt.block_on(async {
            match conn.exec_query(&cx, "DROP TABLE ??", &[Value::from("pen")]).await {
                Outcome::Err(Error::Query(q)) => {
                    assert_eq!(q.kind, QueryErrorKind::Syntax);
                    assert_eq!(q.sql.as_deref(), Some("DROP TABLE \"pen\""));
                }
                _ => panic!("expected syntax error"),
            }
            match conn.exec_query(&cx, "SELECT * FROM ??", &[]).await {
                Outcome::Err(Error::Query(q)) => assert_eq!(q.kind, QueryErrorKind::Syntax),
                _ => panic!("expected parameter error"),
            }
            match conn.exec_query(&cx, "SELECT * FROM ??", &[Value::from("nope")]).await {
                Outcome::Err(Error::Query(q)) => assert_eq!(q.kind, QueryErrorKind::NotFound),
                _ => panic!("expected missing table"),
            }
        });
        assert!(conn.statements().is_empty());
    }

    #[test]
    fn injected_failure_is_one_shot() {
        let rt = RuntimeBuilder::current_thread()
            .build()
            .expect("create asupersync runtime");
        let cx = Cx::for_testing();
        let conn = MemoryConnection::new();
        conn.fail_next_insert("pen");

        rt.block_on(async {
            assert!(matches!(
                conn.insert(&cx, &pen_insert()).await,
                Outcome::Err(Error::Query(_))
            ));
            unwrap_outcome(conn.insert(&cx, &pen_insert()).await);
        });
        assert_eq!(conn.rows("pen").len(), 1);
        assert_eq!(conn.table_names(), vec!["pen".to_string()]);
    }

    #[test]
    fn update_and_find_are_logged() {
        let rt = RuntimeBuilder::current_thread()
            .build()
            .expect("create asupersync runtime");
        let cx = Cx::for_testing();
        let conn = MemoryConnection::with_dialect(Dialect::Sqlite);

        rt.block_on(async {
            unwrap_outcome(conn.insert(&cx, &pen_insert()).await);
            conn.clear_log();
            let key = vec![("id".to_string(), Value::BigInt(1))];
            let n = unwrap_outcome(
                conn.update(
                    &cx,
                    &UpdateStatement {
                        table: "pen".to_string(),
                        assignments: vec![("colour".to_string(), Value::from("red"))],
                        key: key.clone(),
                    },
                )
                .await,
            );
            assert_eq!(n, 1);
            let row = unwrap_outcome(
                conn.find(
                    &cx,
                    &SelectStatement {
                        table: "pen".to_string(),
                        key,
                    },
                )
                .await,
            )
            .unwrap();
            assert_eq!(row.get_by_name("colour"), Some(&Value::from("red")));
        });

        assert_eq!(
            conn.statement_sql(),
            vec![
                "UPDATE \"pen\" SET \"colour\" = ?1 WHERE \"id\" = ?2".to_string(),
                "SELECT * FROM \"pen\" WHERE \"id\" = ?1 LIMIT 1".to_string(),
            ]
        );
    }

    #[test]
    fn closed_database_reports_disconnected() {
        let rt = RuntimeBuilder::current_thread()
            .build()
            .expect("create asupersync runtime");
        let cx = Cx::for_testing();
        let conn = MemoryConnection::new();

        rt.block_on(async {
            unwrap_outcome(conn.insert(&cx, &pen_insert()).await);
            conn.close();
            assert!(conn.is_closed());
            assert!(is_disconnected(conn.insert(&cx, &pen_insert()).await));
            let key = vec![("id".to_string(), Value::BigInt(1))];
            let select = SelectStatement {
                table: "pen".to_string(),
                key: key.clone(),
            };
            assert!(is_disconnected(conn.find(&cx, &select).await));
            let update = UpdateStatement {
                table: "pen".to_string(),
                assignments: vec![("colour".to_string(), Value::from("red"))],
                key,
            };
            assert!(is_disconnected(conn.update(&cx, &update).await));
            assert!(is_disconnected(
                conn.exec_query(&cx, "SELECT * FROM ??", &[Value::from("pen")])
                    .await
            ));
        });

        assert_eq!(conn.rows("pen").len(), 1);
        assert_eq!(conn.statements().len(), 1);
    }
}
