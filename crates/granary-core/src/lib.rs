// SPDX-FileCopyrightText: 2026 Granary Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Granary storage engine.
//!
//! This crate holds the pure metadata layer -- field and schema descriptors,
//! scalar values and rows, the shared error taxonomy -- plus the
//! [`StorageAdapter`] trait that storage backends implement. It performs no
//! I/O of its own.

pub mod error;
pub mod field;
pub mod schema;
pub mod traits;
pub mod value;

// Re-export key items at crate root for ergonomic imports.
pub use error::GranaryError;
pub use field::{DefaultValue, FieldSpec, FieldType};
pub use schema::ModelSchema;
pub use traits::{HealthStatus, StorageAdapter};
pub use value::{Row, Value};
