// SPDX-FileCopyrightText: 2026 Granary Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Validated table schemas.
//!
//! A [`ModelSchema`] is an ordered, named set of [`FieldSpec`]s declared once
//! at startup and immutable thereafter. All internal-consistency checks run
//! at construction, before any I/O.

use crate::error::GranaryError;
use crate::field::{FieldSpec, FieldType};

/// Named, ordered set of field descriptors defining one table.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSchema {
    table_name: String,
    fields: Vec<FieldSpec>,
}

impl ModelSchema {
    /// Build and validate a schema.
    ///
    /// Fails with [`GranaryError::SchemaDefinition`] on: empty field list,
    /// invalid table or field identifiers, duplicate field names, more than
    /// one primary key, a nullable or non-integer primary key, or an
    /// auto-update field that is not a `DateTime`.
    pub fn new(
        table_name: impl Into<String>,
        fields: Vec<FieldSpec>,
    ) -> Result<Self, GranaryError> {
        let table_name = table_name.into();
        let err = |reason: String| GranaryError::SchemaDefinition {
            table: table_name.clone(),
            reason,
        };

        if !valid_identifier(&table_name) {
            return Err(err(format!("invalid table name '{table_name}'")));
        }
        if fields.is_empty() {
            return Err(err("schema declares no fields".into()));
        }

        let mut primary_key: Option<&str> = None;
        for (i, field) in fields.iter().enumerate() {
            let name = field.name();
            if !valid_identifier(name) {
                return Err(err(format!("invalid field name '{name}'")));
            }
            if fields[..i].iter().any(|f| f.name() == name) {
                return Err(err(format!("duplicate field name '{name}'")));
            }
            if field.is_primary_key() {
                if let Some(existing) = primary_key {
                    return Err(err(format!(
                        "multiple primary keys: '{existing}' and '{name}'"
                    )));
                }
                if field.is_nullable() {
                    return Err(err(format!("primary key '{name}' must not be nullable")));
                }
                if field.field_type() != FieldType::Integer {
                    return Err(err(format!(
                        "primary key '{name}' must be an Integer for auto-assignment"
                    )));
                }
                primary_key = Some(name);
            }
            if field.is_auto_update() && field.field_type() != FieldType::DateTime {
                return Err(err(format!(
                    "auto-update field '{name}' must be a DateTime"
                )));
            }
        }

        Ok(Self { table_name, fields })
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name() == name)
    }

    /// The primary-key field, if the schema declares one.
    pub fn primary_key(&self) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.is_primary_key())
    }

    /// Names of all auto-update timestamp fields, in declaration order.
    pub fn auto_update_fields(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|f| f.is_auto_update())
            .map(FieldSpec::name)
            .collect()
    }
}

/// Identifiers are restricted to ASCII `[A-Za-z_][A-Za-z0-9_]*` so they can
/// be double-quoted into SQL without any escaping concern.
fn valid_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
