// SPDX-FileCopyrightText: 2026 Granary Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage adapter trait for schema-driven persistence backends.

use std::path::Path;

use async_trait::async_trait;

use crate::error::GranaryError;
use crate::schema::ModelSchema;
use crate::value::{Row, Value};

/// Health reported by a backend's health check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Backend is fully operational.
    Healthy,
    /// Backend is operational but experiencing issues.
    Degraded(String),
}

/// The CRUD contract agent code programs against.
///
/// Every operation routes on a `(file path, schema)` pair; callers never
/// hold a database connection directly. Operations against the same file
/// are applied in submission order; operations against different files are
/// independent.
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    /// Idempotently create the schema's table (and any triggers) in the
    /// database file at `path`, opening the file if needed.
    async fn create_table(&self, path: &Path, schema: &ModelSchema) -> Result<(), GranaryError>;

    /// Insert one row and return its assigned row identifier.
    async fn insert(
        &self,
        path: &Path,
        schema: &ModelSchema,
        values: &[(&str, Value)],
    ) -> Result<i64, GranaryError>;

    /// Return all rows matching every (field, value) pair in `filter`.
    /// An empty filter matches all rows.
    async fn find(
        &self,
        path: &Path,
        schema: &ModelSchema,
        filter: &[(&str, Value)],
    ) -> Result<Vec<Row>, GranaryError>;

    /// Count rows matching the filter without materializing them.
    async fn count(
        &self,
        path: &Path,
        schema: &ModelSchema,
        filter: &[(&str, Value)],
    ) -> Result<i64, GranaryError>;

    /// Set the given non-engine-owned columns on every row matching the
    /// filter. Auto-update fields are re-stamped as a side effect. Returns
    /// the number of rows changed.
    async fn update(
        &self,
        path: &Path,
        schema: &ModelSchema,
        changes: &[(&str, Value)],
        filter: &[(&str, Value)],
    ) -> Result<usize, GranaryError>;

    /// Delete every row matching the filter. Returns the number of rows
    /// removed.
    async fn delete(
        &self,
        path: &Path,
        schema: &ModelSchema,
        filter: &[(&str, Value)],
    ) -> Result<usize, GranaryError>;

    /// Probe the connection for the given file.
    async fn health_check(&self, path: &Path) -> Result<HealthStatus, GranaryError>;

    /// Flush and close the connection for `path`. Closing an unopened path
    /// is a no-op.
    async fn close(&self, path: &Path) -> Result<(), GranaryError>;

    /// Flush and close every open connection.
    async fn close_all(&self) -> Result<(), GranaryError>;
}
