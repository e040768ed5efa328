// SPDX-FileCopyrightText: 2026 Granary Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Declarative column descriptors.
//!
//! A [`FieldSpec`] describes one column of a table: its storage type,
//! nullability, default, CHECK expression, and whether the engine owns its
//! value (primary key, auto-update timestamp). FieldSpecs are pure metadata;
//! the storage crate compiles them into DDL.

/// Storage type of a column. `DateTime` values are stored as ISO-8601 UTC
/// text, the engine's canonical timestamp representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Integer,
    Text,
    Real,
    DateTime,
}

impl FieldType {
    /// The SQLite column type this field compiles to.
    pub fn sql_type(self) -> &'static str {
        match self {
            FieldType::Integer => "INTEGER",
            FieldType::Real => "REAL",
            FieldType::Text | FieldType::DateTime => "TEXT",
        }
    }
}

/// A column default: a literal, or the current-timestamp sentinel which
/// compiles to an engine-evaluated expression.
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultValue {
    Integer(i64),
    Real(f64),
    Text(String),
    CurrentTimestamp,
}

/// Immutable descriptor of one table column.
///
/// Construct with [`FieldSpec::new`] and refine with the builder methods, or
/// use the [`FieldSpec::primary_key`] / [`FieldSpec::auto_update`]
/// constructors for engine-owned columns. Fields are nullable unless
/// [`not_null`](FieldSpec::not_null) is called.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    name: String,
    field_type: FieldType,
    primary_key: bool,
    nullable: bool,
    default: Option<DefaultValue>,
    check: Option<String>,
    auto_update: bool,
}

impl FieldSpec {
    /// A plain nullable column of the given type.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            primary_key: false,
            nullable: true,
            default: None,
            check: None,
            auto_update: false,
        }
    }

    /// An auto-assigned integer primary key. The engine assigns the value on
    /// insert when the caller omits it.
    pub fn primary_key(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: FieldType::Integer,
            primary_key: true,
            nullable: false,
            default: None,
            check: None,
            auto_update: false,
        }
    }

    /// A timestamp column the engine stamps with the current time on every
    /// insert and update. Never caller-settable.
    pub fn auto_update(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: FieldType::DateTime,
            primary_key: false,
            nullable: false,
            default: Some(DefaultValue::CurrentTimestamp),
            check: None,
            auto_update: true,
        }
    }

    /// Mark the column NOT NULL.
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Attach a default applied when an insert omits the column.
    pub fn default_value(mut self, default: DefaultValue) -> Self {
        self.default = Some(default);
        self
    }

    /// Attach a CHECK expression over this row, e.g.
    /// `state IN ('new','processed')`.
    pub fn check(mut self, expr: impl Into<String>) -> Self {
        self.check = Some(expr.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    pub fn is_primary_key(&self) -> bool {
        self.primary_key
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn default(&self) -> Option<&DefaultValue> {
        self.default.as_ref()
    }

    pub fn check_expr(&self) -> Option<&str> {
        self.check.as_deref()
    }

    pub fn is_auto_update(&self) -> bool {
        self.auto_update
    }
}
