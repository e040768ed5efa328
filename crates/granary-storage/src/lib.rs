// SPDX-FileCopyrightText: 2026 Granary Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Async SQLite storage engine for Granary agents.
//!
//! Compiles declarative [`ModelSchema`](granary_core::ModelSchema)s into
//! idempotent DDL (including auto-update timestamp triggers), keeps exactly
//! one serialized connection per database file via `tokio-rusqlite`'s
//! single background thread, and exposes the typed CRUD surface agent code
//! builds on. No raw SQL execution is exposed.

pub mod config;
pub mod ddl;
pub mod engine;
pub mod query;
pub mod registry;

pub use config::StorageConfig;
pub use engine::StorageEngine;
pub use registry::ConnectionRegistry;
