// SPDX-FileCopyrightText: 2026 Granary Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Granary storage engine.

use thiserror::Error;

/// The primary error type used across the Granary schema and storage layers.
///
/// Every failure mode is a distinct, inspectable variant. Schema and query
/// variants indicate caller bugs and are never worth retrying; `StorageIo`
/// surfaces the underlying engine failure and leaves the retry decision to
/// the caller -- the storage layer itself performs no implicit retries.
#[derive(Debug, Error)]
pub enum GranaryError {
    /// A schema was declared inconsistently (duplicate field, bad identifier,
    /// invalid primary key). Raised at construction time, before any I/O.
    #[error("schema definition error in table '{table}': {reason}")]
    SchemaDefinition { table: String, reason: String },

    /// The underlying database file could not be opened, read, or written.
    #[error("storage I/O error: {source}")]
    StorageIo {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A declared CHECK, NOT NULL, or uniqueness constraint rejected a write.
    /// `constraint` carries the engine's description of the offending
    /// constraint (e.g. "CHECK constraint failed: state IN ('new','processed')").
    #[error("constraint violation on table '{table}': {constraint}")]
    ConstraintViolation { table: String, constraint: String },

    /// An insert omitted a non-nullable field that has no default.
    #[error("missing required field '{field}' in insert into table '{table}'")]
    MissingField { table: String, field: String },

    /// An operation referenced a field that is not usable there: either the
    /// name is not in the schema, or the column is engine-owned (primary key
    /// or auto-update) and cannot be assigned by the caller.
    #[error("field '{field}' is not usable in this operation on table '{table}'")]
    QuerySchema { table: String, field: String },

    /// An insert or query was issued before `create_table` was called for
    /// this (file, table) pair in the current process.
    #[error("table '{table}' is not ready: call create_table() first")]
    TableNotReady { table: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_name_the_offender() {
        let e = GranaryError::MissingField {
            table: "messages".into(),
            field: "data".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("messages"));
        assert!(msg.contains("data"));

        let e = GranaryError::ConstraintViolation {
            table: "messages".into(),
            constraint: "CHECK constraint failed: state".into(),
        };
        assert!(e.to_string().contains("CHECK constraint failed"));
    }

    #[test]
    fn storage_io_wraps_a_source() {
        let e = GranaryError::StorageIo {
            source: Box::new(std::io::Error::other("disk full")),
        };
        assert!(e.to_string().contains("disk full"));
    }
}
