use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use async_trait::async_trait;
use nlq_schema::{Catalog, Column, ColumnType, Relationship, Table};
use nlq_types::{ResultSet, SqlValue, Statement};
use rusqlite::types::{Value, ValueRef};
use rusqlite::{params_from_iter, Connection};

use crate::{CatalogLoader, QueryEngine, StoreError};

/// SQLite-backed engine. The connection sits behind a mutex and is only
/// touched from blocking worker threads.
#[derive(Clone)]
pub struct SqliteEngine {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteEngine {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path.as_ref())?;
        Ok(Self::from_connection(conn))
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Ok(Self::from_connection(Connection::open_in_memory()?))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Run a batch of DDL/DML, e.g. [`crate::DEMO_SEED_SQL`]. Not reachable
    /// through [`QueryEngine::execute`].
    pub fn seed(&self, sql: &str) -> Result<(), StoreError> {
        self.lock().execute_batch(sql)?;
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn with_connection<T, F>(&self, work: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            work(&guard)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

#[async_trait]
impl QueryEngine for SqliteEngine {
    async fn execute(&self, statement: &Statement) -> Result<ResultSet, StoreError> {
        let text = statement.text.clone();
        let params = statement.params.clone();
        let started = Instant::now();
        let result = self
            .with_connection(move |conn| run_statement(conn, &text, &params))
            .await;
        match &result {
            Ok(rows) => tracing::debug!(
                rows = rows.row_count(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "statement executed"
            ),
            Err(err) => tracing::warn!(error = %err, "statement failed"),
        }
        result
    }

    fn name(&self) -> &'static str {
        "sqlite"
    }
}

#[async_trait]
impl CatalogLoader for SqliteEngine {
    async fn load_catalog(&self) -> Result<Catalog, StoreError> {
        let catalog = self.with_connection(introspect).await?;
        tracing::info!(
            tables = catalog.tables().len(),
            relationships = catalog.relationships().len(),
            "catalog loaded from sqlite"
        );
        Ok(catalog)
    }
}

fn run_statement(
    conn: &Connection,
    text: &str,
    params: &[SqlValue],
) -> Result<ResultSet, StoreError> {
    let mut stmt = conn.prepare(text)?;
    if !stmt.readonly() {
        return Err(StoreError::Rejected(
            "only read-only statements are executed".into(),
        ));
    }
    let expected = stmt.parameter_count();
    if expected != params.len() {
        return Err(StoreError::ParamMismatch {
            expected,
            given: params.len(),
        });
    }

    let columns: Vec<String> = stmt
        .column_names()
        .into_iter()
        .map(str::to_string)
        .collect();
    let width = columns.len();

    let mut cursor = stmt.query(params_from_iter(params.iter().map(bind_value)))?;
    let mut rows = Vec::new();
    while let Some(row) = cursor.next()? {
        let mut values = Vec::with_capacity(width);
        for idx in 0..width {
            values.push(read_value(row.get_ref(idx)?));
        }
        rows.push(values);
    }
    Ok(ResultSet { columns, rows })
}

fn bind_value(value: &SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::Null,
        SqlValue::Bool(b) => Value::Integer(i64::from(*b)),
        SqlValue::Integer(i) => Value::Integer(*i),
        SqlValue::Real(f) => Value::Real(*f),
        SqlValue::Text(s) => Value::Text(s.clone()),
    }
}

fn read_value(value: ValueRef<'_>) -> SqlValue {
    match value {
        ValueRef::Null => SqlValue::Null,
        ValueRef::Integer(i) => SqlValue::Integer(i),
        ValueRef::Real(f) => SqlValue::Real(f),
        ValueRef::Text(bytes) => SqlValue::Text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => SqlValue::Text(format!("<blob {} bytes>", bytes.len())),
    }
}

/// Catalog type for a declared SQLite column type.
pub fn column_type_for(declared: &str) -> ColumnType {
    let upper = declared.to_ascii_uppercase();
    if upper.contains("BOOL") {
        ColumnType::Boolean
    } else if upper.contains("DATE") || upper.contains("TIME") {
        ColumnType::Date
    } else if ["INT", "REAL", "FLOA", "DOUB", "NUM", "DEC"]
        .iter()
        .any(|k| upper.contains(k))
    {
        ColumnType::Number
    } else {
        ColumnType::String
    }
}

struct ForeignKey {
    from_table: String,
    from_column: String,
    to_table: String,
    to_column: Option<String>,
}

fn introspect(conn: &Connection) -> Result<Catalog, StoreError> {
    let names: Vec<String> = {
        let mut stmt = conn.prepare(
            "SELECT name FROM sqlite_master \
             WHERE type IN ('table', 'view') AND name NOT LIKE 'sqlite_%' \
             ORDER BY rowid",
        )?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        rows.collect::<Result<_, _>>()?
    };

    let mut tables = Vec::with_capacity(names.len());
    let mut foreign_keys = Vec::new();
    for name in &names {
        let mut stmt = conn.prepare(
            "SELECT name, type, \"notnull\", pk FROM pragma_table_info(?1) ORDER BY cid",
        )?;
        let columns = stmt
            .query_map([name], |row| {
                let column_name: String = row.get(0)?;
                let declared: Option<String> = row.get(1)?;
                let not_null: bool = row.get(2)?;
                let pk: i64 = row.get(3)?;
                let mut column =
                    Column::new(column_name, column_type_for(declared.as_deref().unwrap_or("")));
                if pk > 0 {
                    column = column.primary_key();
                } else if !not_null {
                    column = column.nullable();
                }
                Ok(column)
            })?
            .collect::<Result<Vec<_>, _>>()?;
        tables.push(Table {
            name: name.clone(),
            columns,
            aliases: Vec::new(),
        });

        let mut stmt =
            conn.prepare("SELECT \"from\", \"table\", \"to\" FROM pragma_foreign_key_list(?1)")?;
        let keys = stmt.query_map([name], |row| {
            Ok(ForeignKey {
                from_table: name.clone(),
                from_column: row.get(0)?,
                to_table: row.get(1)?,
                to_column: row.get(2)?,
            })
        })?;
        let mut keys = keys.collect::<Result<Vec<_>, _>>()?;
        keys.sort_by_key(|fk| {
            columns_of(&tables, name)
                .iter()
                .position(|c| c.name == fk.from_column)
        });
        foreign_keys.extend(keys);
    }

    let relationships = foreign_keys
        .into_iter()
        .filter_map(|fk| relationship_for(&tables, fk))
        .collect();
    Ok(Catalog::new(tables, relationships)?)
}

fn columns_of<'t>(tables: &'t [Table], name: &str) -> &'t [Column] {
    tables
        .iter()
        .find(|t| t.name == name)
        .map(|t| t.columns.as_slice())
        .unwrap_or(&[])
}

/// Keeps only references that land on a primary key of a loaded table; a
/// missing target column means the target's own primary key.
fn relationship_for(tables: &[Table], fk: ForeignKey) -> Option<Relationship> {
    let Some(target) = tables
        .iter()
        .find(|t| t.name.eq_ignore_ascii_case(&fk.to_table))
    else {
        tracing::warn!(table = %fk.from_table, target = %fk.to_table, "foreign key target not loaded; skipped");
        return None;
    };
    let column = match &fk.to_column {
        Some(name) => target
            .columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name)),
        None => {
            let mut keys = target.columns.iter().filter(|c| c.primary_key);
            match (keys.next(), keys.next()) {
                (Some(only), None) => Some(only),
                _ => None,
            }
        }
    };
    match column {
        Some(column) if column.primary_key => Some(Relationship::new(
            fk.from_table,
            fk.from_column,
            target.name.clone(),
            column.name.clone(),
        )),
        _ => {
            tracing::warn!(
                table = %fk.from_table,
                column = %fk.from_column,
                target = %target.name,
                "foreign key does not reference a primary key; skipped"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declared_types_map_to_catalog_types() {
        assert_eq!(column_type_for("INTEGER"), ColumnType::Number);
        assert_eq!(column_type_for("decimal(10,2)"), ColumnType::Number);
        assert_eq!(column_type_for("DOUBLE PRECISION"), ColumnType::Number);
        assert_eq!(column_type_for("BOOLEAN"), ColumnType::Boolean);
        assert_eq!(column_type_for("DATETIME"), ColumnType::Date);
        assert_eq!(column_type_for("timestamp"), ColumnType::Date);
        assert_eq!(column_type_for("VARCHAR(40)"), ColumnType::String);
        assert_eq!(column_type_for(""), ColumnType::String);
    }

    #[test]
    fn blobs_are_summarised() {
        assert_eq!(
            read_value(ValueRef::Blob(&[1, 2, 3])),
            SqlValue::Text("<blob 3 bytes>".into())
        );
        assert_eq!(bind_value(&SqlValue::Bool(true)), Value::Integer(1));
    }
}
