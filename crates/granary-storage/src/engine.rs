// SPDX-FileCopyrightText: 2026 Granary Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! CRUD orchestration over the schema compiler, query compiler, and
//! connection registry.
//!
//! Every operation routes on a `(file path, schema)` pair. A table moves
//! through Uninitialized -> TableEnsured within a process: `insert`/`find`
//! before `create_table` is a caller bug surfaced as `TableNotReady`.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;

use granary_core::error::GranaryError;
use granary_core::schema::ModelSchema;
use granary_core::traits::{HealthStatus, StorageAdapter};
use granary_core::value::{Row, Value};

use crate::config::StorageConfig;
use crate::ddl;
use crate::query;
use crate::registry::{self, ConnectionRegistry};

/// Async storage engine: the only CRUD surface agent code talks to.
///
/// Share one engine per process (wrap in `Arc` to call from spawned tasks);
/// the registry inside guarantees one serialized connection per file no
/// matter how many cooperative callers issue operations concurrently.
pub struct StorageEngine {
    registry: ConnectionRegistry,
    // (normalized path, table name) pairs whose DDL ran in this process.
    ready: Mutex<HashSet<(PathBuf, String)>>,
}

impl Default for StorageEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageEngine {
    pub fn new() -> Self {
        Self::with_config(StorageConfig::default())
    }

    pub fn with_config(config: StorageConfig) -> Self {
        Self {
            registry: ConnectionRegistry::new(config),
            ready: Mutex::new(HashSet::new()),
        }
    }

    /// Idempotently apply the schema's DDL (table plus auto-update triggers)
    /// to the database at `path`, opening it if needed.
    pub async fn create_table(
        &self,
        path: impl AsRef<Path>,
        schema: &ModelSchema,
    ) -> Result<(), GranaryError> {
        let path = path.as_ref();
        let mut script = String::new();
        for statement in ddl::compile(schema) {
            script.push_str(&statement);
            script.push_str(";\n");
        }

        let conn = self.registry.acquire(path).await?;
        let table = schema.table_name().to_string();
        conn.call(move |conn| {
            conn.execute_batch(&script)?;
            Ok(())
        })
        .await
        .map_err(|e| classify(schema.table_name(), e))?;

        let key = (registry::normalize_path(path), table);
        self.ready.lock().expect("ready set poisoned").insert(key);
        debug!(table = schema.table_name(), path = %path.display(), "table ensured");
        Ok(())
    }

    /// Insert one row and return its assigned identifier.
    ///
    /// Omitted fields fall back to the primary-key auto-assignment, the
    /// declared default, or NULL; a non-nullable field with none of those
    /// fails with `MissingField` before any I/O. Auto-update fields are
    /// always stamped with the current time, overriding any caller value.
    pub async fn insert(
        &self,
        path: impl AsRef<Path>,
        schema: &ModelSchema,
        values: &[(&str, Value)],
    ) -> Result<i64, GranaryError> {
        let path = path.as_ref();
        self.check_ready(path, schema)?;

        for (name, _) in values {
            if schema.field(name).is_none() {
                return Err(GranaryError::QuerySchema {
                    table: schema.table_name().to_string(),
                    field: (*name).to_string(),
                });
            }
        }

        let now = now_timestamp();
        let mut columns = Vec::new();
        let mut params: Vec<Value> = Vec::new();
        for field in schema.fields() {
            if field.is_auto_update() {
                columns.push(ddl::quote_ident(field.name()));
                params.push(Value::Text(now.clone()));
                continue;
            }
            match values.iter().find(|(n, _)| *n == field.name()) {
                Some((_, value)) => {
                    columns.push(ddl::quote_ident(field.name()));
                    params.push(value.clone());
                }
                None => {
                    if field.is_primary_key() || field.default().is_some() || field.is_nullable()
                    {
                        continue;
                    }
                    return Err(GranaryError::MissingField {
                        table: schema.table_name().to_string(),
                        field: field.name().to_string(),
                    });
                }
            }
        }

        let table = ddl::quote_ident(schema.table_name());
        let sql = if columns.is_empty() {
            format!("INSERT INTO {table} DEFAULT VALUES")
        } else {
            let placeholders: Vec<String> =
                (1..=params.len()).map(|i| format!("?{i}")).collect();
            format!(
                "INSERT INTO {table} ({}) VALUES ({})",
                columns.join(", "),
                placeholders.join(", ")
            )
        };

        let conn = self.registry.acquire(path).await?;
        conn.call(move |conn| {
            conn.execute(&sql, rusqlite::params_from_iter(params))?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(|e| classify(schema.table_name(), e))
    }

    /// Return every row matching the equality filter, in storage order.
    /// An empty filter returns all rows; an empty result is not an error.
    pub async fn find(
        &self,
        path: impl AsRef<Path>,
        schema: &ModelSchema,
        filter: &[(&str, Value)],
    ) -> Result<Vec<Row>, GranaryError> {
        let path = path.as_ref();
        self.check_ready(path, schema)?;
        let compiled = query::compile_filter(schema, filter)?;

        let column_names: Vec<String> = schema
            .fields()
            .iter()
            .map(|f| f.name().to_string())
            .collect();
        let column_list: Vec<String> =
            column_names.iter().map(|n| ddl::quote_ident(n)).collect();
        let sql = format!(
            "SELECT {} FROM {}{}",
            column_list.join(", "),
            ddl::quote_ident(schema.table_name()),
            compiled.where_sql()
        );
        let params = compiled.into_params();

        let conn = self.registry.acquire(path).await?;
        conn.call(move |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params_from_iter(params), |row| {
                    let mut fields = Vec::with_capacity(column_names.len());
                    for (i, name) in column_names.iter().enumerate() {
                        fields.push((name.clone(), Value::from(row.get_ref(i)?)));
                    }
                    Ok(Row::new(fields))
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
        .map_err(|e| classify(schema.table_name(), e))
    }

    /// Count rows matching the filter without materializing them.
    pub async fn count(
        &self,
        path: impl AsRef<Path>,
        schema: &ModelSchema,
        filter: &[(&str, Value)],
    ) -> Result<i64, GranaryError> {
        let path = path.as_ref();
        self.check_ready(path, schema)?;
        let compiled = query::compile_filter(schema, filter)?;
        let sql = format!(
            "SELECT COUNT(*) FROM {}{}",
            ddl::quote_ident(schema.table_name()),
            compiled.where_sql()
        );
        let params = compiled.into_params();

        let conn = self.registry.acquire(path).await?;
        conn.call(move |conn| {
            Ok(conn.query_row(&sql, rusqlite::params_from_iter(params), |row| row.get(0))?)
        })
        .await
        .map_err(|e| classify(schema.table_name(), e))
    }

    /// Set `changes` on every row matching `filter`; auto-update fields are
    /// re-stamped by the compiled trigger. Returns the number of rows
    /// changed. Primary-key and auto-update columns are engine-owned and
    /// rejected as change targets.
    pub async fn update(
        &self,
        path: impl AsRef<Path>,
        schema: &ModelSchema,
        changes: &[(&str, Value)],
        filter: &[(&str, Value)],
    ) -> Result<usize, GranaryError> {
        let path = path.as_ref();
        self.check_ready(path, schema)?;
        if changes.is_empty() {
            return Ok(0);
        }

        let mut assignments = Vec::with_capacity(changes.len());
        let mut params: Vec<Value> = Vec::with_capacity(changes.len());
        for (i, (name, value)) in changes.iter().enumerate() {
            let usable = schema
                .field(name)
                .is_some_and(|f| !f.is_primary_key() && !f.is_auto_update());
            if !usable {
                return Err(GranaryError::QuerySchema {
                    table: schema.table_name().to_string(),
                    field: (*name).to_string(),
                });
            }
            assignments.push(format!("{} = ?{}", ddl::quote_ident(name), i + 1));
            params.push(value.clone());
        }

        let compiled = query::compile_filter_from(schema, filter, params.len() + 1)?;
        let sql = format!(
            "UPDATE {} SET {}{}",
            ddl::quote_ident(schema.table_name()),
            assignments.join(", "),
            compiled.where_sql()
        );
        params.extend(compiled.into_params());

        let conn = self.registry.acquire(path).await?;
        conn.call(move |conn| {
            Ok(conn.execute(&sql, rusqlite::params_from_iter(params))?)
        })
        .await
        .map_err(|e| classify(schema.table_name(), e))
    }

    /// Delete every row matching the filter; returns the number removed.
    pub async fn delete(
        &self,
        path: impl AsRef<Path>,
        schema: &ModelSchema,
        filter: &[(&str, Value)],
    ) -> Result<usize, GranaryError> {
        let path = path.as_ref();
        self.check_ready(path, schema)?;
        let compiled = query::compile_filter(schema, filter)?;
        let sql = format!(
            "DELETE FROM {}{}",
            ddl::quote_ident(schema.table_name()),
            compiled.where_sql()
        );
        let params = compiled.into_params();

        let conn = self.registry.acquire(path).await?;
        conn.call(move |conn| {
            Ok(conn.execute(&sql, rusqlite::params_from_iter(params))?)
        })
        .await
        .map_err(|e| classify(schema.table_name(), e))
    }

    /// Probe the connection for `path`.
    pub async fn health_check(
        &self,
        path: impl AsRef<Path>,
    ) -> Result<HealthStatus, GranaryError> {
        let conn = self.registry.acquire(path.as_ref()).await?;
        conn.call(|conn| {
            conn.execute_batch("SELECT 1;")?;
            Ok::<(), rusqlite::Error>(())
        })
        .await
        .map_err(|e| GranaryError::StorageIo {
            source: Box::new(e),
        })?;
        Ok(HealthStatus::Healthy)
    }

    /// Checkpoint and close the connection for `path`. No-op if unopened.
    /// Table readiness survives within the process: the DDL is durable.
    pub async fn close(&self, path: impl AsRef<Path>) -> Result<(), GranaryError> {
        self.registry.close(path.as_ref()).await
    }

    /// Checkpoint and close every open connection.
    pub async fn close_all(&self) -> Result<(), GranaryError> {
        self.registry.close_all().await
    }

    fn check_ready(&self, path: &Path, schema: &ModelSchema) -> Result<(), GranaryError> {
        let key = (
            registry::normalize_path(path),
            schema.table_name().to_string(),
        );
        if self.ready.lock().expect("ready set poisoned").contains(&key) {
            Ok(())
        } else {
            Err(GranaryError::TableNotReady {
                table: schema.table_name().to_string(),
            })
        }
    }
}

#[async_trait]
impl StorageAdapter for StorageEngine {
    async fn create_table(&self, path: &Path, schema: &ModelSchema) -> Result<(), GranaryError> {
        self.create_table(path, schema).await
    }

    async fn insert(
        &self,
        path: &Path,
        schema: &ModelSchema,
        values: &[(&str, Value)],
    ) -> Result<i64, GranaryError> {
        self.insert(path, schema, values).await
    }

    async fn find(
        &self,
        path: &Path,
        schema: &ModelSchema,
        filter: &[(&str, Value)],
    ) -> Result<Vec<Row>, GranaryError> {
        self.find(path, schema, filter).await
    }

    async fn count(
        &self,
        path: &Path,
        schema: &ModelSchema,
        filter: &[(&str, Value)],
    ) -> Result<i64, GranaryError> {
        self.count(path, schema, filter).await
    }

    async fn update(
        &self,
        path: &Path,
        schema: &ModelSchema,
        changes: &[(&str, Value)],
        filter: &[(&str, Value)],
    ) -> Result<usize, GranaryError> {
        self.update(path, schema, changes, filter).await
    }

    async fn delete(
        &self,
        path: &Path,
        schema: &ModelSchema,
        filter: &[(&str, Value)],
    ) -> Result<usize, GranaryError> {
        self.delete(path, schema, filter).await
    }

    async fn health_check(&self, path: &Path) -> Result<HealthStatus, GranaryError> {
        self.health_check(path).await
    }

    async fn close(&self, path: &Path) -> Result<(), GranaryError> {
        self.close(path).await
    }

    async fn close_all(&self) -> Result<(), GranaryError> {
        self.close_all().await
    }
}

/// Current time as ISO-8601 UTC text with millisecond precision -- the same
/// shape `strftime('%Y-%m-%dT%H:%M:%fZ','now')` produces in the compiled
/// DDL.
fn now_timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

/// Map a failed call into the error taxonomy: constraint rejections become
/// `ConstraintViolation` with SQLite's description of the offending
/// constraint; everything else is `StorageIo`.
fn classify(table: &str, e: tokio_rusqlite::Error) -> GranaryError {
    if let tokio_rusqlite::Error::Error(rusqlite::Error::SqliteFailure(code, ref message)) = e
    {
        if code.code == rusqlite::ErrorCode::ConstraintViolation {
            let constraint = message.clone().unwrap_or_else(|| code.to_string());
            return GranaryError::ConstraintViolation {
                table: table.to_string(),
                constraint,
            };
        }
    }
    GranaryError::StorageIo {
        source: Box::new(e),
    }
}
