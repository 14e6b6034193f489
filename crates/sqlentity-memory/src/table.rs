//! Table storage for the memory driver.

use std::collections::BTreeMap;

use sqlentity_core::{Error, InsertStatement, QueryError, QueryErrorKind, Row, Value};

/// One stored row, keyed by column name.
pub(crate) type StoredRow = BTreeMap<String, Value>;

/// A table created on first use.
#[derive(Debug, Default)]
pub(crate) struct Table {
    /// Columns in order of first appearance
    columns: Vec<String>,
    rows: Vec<StoredRow>,
    defaults: BTreeMap<String, Value>,
    /// Identifier columns, learned from the first insert that names them
    key_columns: Vec<String>,
    last_id: i64,
}

impl Table {
    fn touch_column(&mut self, name: &str) {
        if !self.columns.iter().any(|c| c == name) {
            self.columns.push(name.to_string());
        }
    }

    /// Render a stored row with every known column, `NULL` for gaps.
    pub(crate) fn to_row(&self, stored: &StoredRow) -> Row {
        Row::from_pairs(self.columns.iter().map(|c| {
            (
                c.clone(),
                stored.get(c).cloned().unwrap_or(Value::Null),
            )
        }))
    }

    pub(crate) fn set_default(&mut self, column: &str, value: Value) {
        self.touch_column(column);
        self.defaults.insert(column.to_string(), value);
    }

    pub(crate) fn drop_default(&mut self, column: &str) {
        self.defaults.remove(column);
    }

    /// Insert a row, returning the generated id (if any) and the stored row.
    pub(crate) fn insert(&mut self, stmt: &InsertStatement) -> Result<(Option<Value>, Row), Error> {
        if stmt.columns.len() != stmt.values.len() {
            return Err(Error::query(
                QueryErrorKind::Syntax,
                format!(
                    "{} column(s) but {} value(s) for '{}'",
                    stmt.columns.len(),
                    stmt.values.len(),
                    stmt.table
                ),
            ));
        }
        if self.key_columns.is_empty() {
            self.key_columns.clone_from(&stmt.key_columns);
        }

        let mut stored: StoredRow = stmt
            .columns
            .iter()
            .cloned()
            .zip(stmt.values.iter().cloned())
            .collect();
        for (column, value) in &self.defaults {
            stored
                .entry(column.clone())
                .or_insert_with(|| value.clone());
        }

        let mut generated = None;
        if let Some(key) = &stmt.generated_key {
            let id = Value::BigInt(self.last_id + 1);
            stored.insert(key.clone(), id.clone());
            generated = Some(id);
        }

        let key: Vec<&Value> = self
            .key_columns
            .iter()
            .filter_map(|c| stored.get(c).filter(|v| !v.is_null()))
            .collect();
        if !key.is_empty() && key.len() == self.key_columns.len() {
            let taken = self.rows.iter().any(|row| {
                self.key_columns
                    .iter()
                    .zip(&key)
                    .all(|(column, value)| row.get(column) == Some(*value))
            });
            if taken {
                return Err(Error::Query(QueryError {
                    kind: QueryErrorKind::Constraint,
                    sql: None,
                    sqlstate: Some("23505".to_string()),
                    message: format!(
                        "duplicate key value violates unique constraint on {}({})",
                        stmt.table,
                        self.key_columns.join(", ")
                    ),
                    source: None,
                }));
            }
            if let [value] = key.as_slice() {
                if let Some(n) = value.as_i64() {
                    self.last_id = self.last_id.max(n);
                }
            }
        }
        if let Some(Value::BigInt(n)) = &generated {
            self.last_id = self.last_id.max(*n);
        }

        for column in stored.keys() {
            if !self.columns.iter().any(|c| c == column) {
                self.columns.push(column.clone());
            }
        }
        let row = self.to_row(&stored);
        self.rows.push(stored);
        Ok((generated, row))
    }

    /// Apply assignments to every row matching `key`.
    pub(crate) fn update(&mut self, assignments: &[(String, Value)], key: &[(String, Value)]) -> u64 {
        for (column, _) in assignments {
            self.touch_column(column);
        }
        let mut affected = 0;
        for row in self.rows.iter_mut().filter(|r| matches_key(r, key)) {
            for (column, value) in assignments {
                row.insert(column.clone(), value.clone());
            }
            affected += 1;
        }
        affected
    }

    pub(crate) fn find(&self, key: &[(String, Value)]) -> Option<Row> {
        self.rows
            .iter()
            .find(|r| matches_key(r, key))
            .map(|r| self.to_row(r))
    }

    pub(crate) fn all_rows(&self) -> Vec<Row> {
        self.rows.iter().map(|r| self.to_row(r)).collect()
    }

    pub(crate) fn clear(&mut self) -> u64 {
        let n = self.rows.len() as u64;
        self.rows.clear();
        n
    }
}

fn matches_key(row: &StoredRow, key: &[(String, Value)]) -> bool {
    key.iter().all(|(column, value)| row.get(column) == Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn insert(columns: &[&str], values: Vec<Value>, generated: bool) -> InsertStatement {
        InsertStatement {
            table: "pet".to_string(),
            columns: columns.iter().map(|s| (*s).to_string()).collect(),
            values,
            generated_key: generated.then(|| "id".to_string()),
            key_columns: vec!["id".to_string()],
        }
    }

    #[test]
    fn test_generated_ids_increase() {
        let mut table = Table::default();
        let (id1, _) = table
            .insert(&insert(&["name"], vec![Value::from("Deco")], true))
            .unwrap();
        let (id2, row) = table
            .insert(&insert(&["name"], vec![Value::from("Mutt")], true))
            .unwrap();
        assert_eq!(id1, Some(Value::BigInt(1)));
        assert_eq!(id2, Some(Value::BigInt(2)));
        assert_eq!(row.get_by_name("id"), Some(&Value::BigInt(2)));
    }

    #[test]
    fn test_explicit_id_advances_sequence_and_rejects_duplicates() {
        let mut table = Table::default();
        table
            .insert(&insert(&["name"], vec![Value::from("Deco")], true))
            .unwrap();
        table
            .insert(&insert(
                &["id", "name"],
                vec![Value::BigInt(10), Value::from("Rex")],
                false,
            ))
            .unwrap();
        let (id, _) = table.insert(&insert(&[], vec![], true)).unwrap();
        assert_eq!(id, Some(Value::BigInt(11)));

        let err = table
            .insert(&insert(&["id"], vec![Value::BigInt(10)], false))
            .unwrap_err();
        assert_eq!(err.sqlstate(), Some("23505"));
        assert_eq!(table.all_rows().len(), 3);
    }

    #[test]
    fn test_client_keys_are_unique_from_the_first_insert() {
        let mut table = Table::default();
        let tag = |code: &str| InsertStatement {
            table: "tag".to_string(),
            columns: vec!["code".to_string()],
            values: vec![Value::from(code)],
            generated_key: None,
            key_columns: vec!["code".to_string()],
        };
        table.insert(&tag("rust")).unwrap();
        table.insert(&tag("sql")).unwrap();
        let err = table.insert(&tag("rust")).unwrap_err();
        assert_eq!(err.sqlstate(), Some("23505"));
        assert_eq!(table.all_rows().len(), 2);
    }

    #[test]
    fn test_composite_key_checks_every_column() {
        let mut table = Table::default();
        let account = |region: &str, number: i64| InsertStatement {
            table: "account".to_string(),
            columns: vec!["number".to_string(), "region".to_string()],
            values: vec![Value::BigInt(number), Value::from(region)],
            generated_key: None,
            key_columns: vec!["region".to_string(), "number".to_string()],
        };
        table.insert(&account("eu", 1)).unwrap();
        table.insert(&account("us", 1)).unwrap();
        table.insert(&account("eu", 2)).unwrap();
        assert!(table.insert(&account("us", 1)).is_err());
        let key = vec![
            ("region".to_string(), Value::from("eu")),
            ("number".to_string(), Value::BigInt(2)),
        ];
        assert!(table.find(&key).is_some());
    }

    #[test]
    fn test_defaults_fill_omitted_columns() {
        let mut table = Table::default();
        table.set_default("colour", Value::from("blue"));
        let (_, row) = table.insert(&insert(&[], vec![], true)).unwrap();
        assert_eq!(row.get_by_name("colour"), Some(&Value::from("blue")));

        let (_, row) = table
            .insert(&insert(&["colour"], vec![Value::Null], true))
            .unwrap();
        assert_eq!(row.get_by_name("colour"), Some(&Value::Null));

        table.drop_default("colour");
        let (_, row) = table.insert(&insert(&[], vec![], true)).unwrap();
        assert_eq!(row.get_by_name("colour"), Some(&Value::Null));
    }

    #[test]
    fn test_update_and_find() {
        let mut table = Table::default();
        table
            .insert(&insert(&["name"], vec![Value::from("Ruffy")], true))
            .unwrap();
        let key = vec![("id".to_string(), Value::BigInt(1))];
        let n = table.update(&[("name".to_string(), Value::Null)], &key);
        assert_eq!(n, 1);
        let row = table.find(&key).unwrap();
        assert_eq!(row.get_by_name("name"), Some(&Value::Null));
        assert_eq!(
            table.update(&[], &[("id".to_string(), Value::BigInt(9))]),
            0
        );
        assert_eq!(table.clear(), 1);
        assert!(table.all_rows().is_empty());
    }
}
