// SPDX-FileCopyrightText: 2026 Granary Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query compilation: equality filters -> parameterized predicates.
//!
//! Values are always bound as parameters, never interpolated into statement
//! text, so filter content (quotes, control bytes) can never change the
//! statement's shape.

use granary_core::error::GranaryError;
use granary_core::schema::ModelSchema;
use granary_core::value::Value;

use crate::ddl::quote_ident;

/// A compiled predicate: the `WHERE` fragment (empty for match-all) plus the
/// bound values in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledFilter {
    where_sql: String,
    params: Vec<Value>,
}

impl CompiledFilter {
    /// The ` WHERE ...` fragment to append to a statement, or `""` when the
    /// filter was empty.
    pub fn where_sql(&self) -> &str {
        &self.where_sql
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }

    pub fn into_params(self) -> Vec<Value> {
        self.params
    }
}

/// Compile an equality filter against a schema, numbering placeholders
/// from `?1`.
pub fn compile_filter(
    schema: &ModelSchema,
    filter: &[(&str, Value)],
) -> Result<CompiledFilter, GranaryError> {
    compile_filter_from(schema, filter, 1)
}

/// Compile an equality filter with placeholders numbered from
/// `?first_param`, for statements that bind other parameters first.
///
/// Every field name is validated against the schema before execution; an
/// unknown name fails with [`GranaryError::QuerySchema`]. A `Null` value
/// compiles to `IS NULL` (SQL `= NULL` never matches) and binds no
/// parameter.
pub fn compile_filter_from(
    schema: &ModelSchema,
    filter: &[(&str, Value)],
    first_param: usize,
) -> Result<CompiledFilter, GranaryError> {
    let mut clauses = Vec::with_capacity(filter.len());
    let mut params = Vec::with_capacity(filter.len());
    let mut index = first_param;

    for (name, value) in filter {
        if schema.field(name).is_none() {
            return Err(GranaryError::QuerySchema {
                table: schema.table_name().to_string(),
                field: (*name).to_string(),
            });
        }
        if value.is_null() {
            clauses.push(format!("{} IS NULL", quote_ident(name)));
        } else {
            clauses.push(format!("{} = ?{index}", quote_ident(name)));
            params.push(value.clone());
            index += 1;
        }
    }

    let where_sql = if clauses.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", clauses.join(" AND "))
    };
    Ok(CompiledFilter { where_sql, params })
}

#[cfg(test)]
mod tests {
    use super::*;
    use granary_core::field::{FieldSpec, FieldType};

    fn schema() -> ModelSchema {
        ModelSchema::new(
            "messages",
            vec![
                FieldSpec::primary_key("id"),
                FieldSpec::new("data", FieldType::Text),
                FieldSpec::new("state", FieldType::Text),
            ],
        )
        .unwrap()
    }

    #[test]
    fn empty_filter_matches_all_rows() {
        let compiled = compile_filter(&schema(), &[]).unwrap();
        assert_eq!(compiled.where_sql(), "");
        assert!(compiled.params().is_empty());
    }

    #[test]
    fn clauses_and_params_stay_in_filter_order() {
        let compiled = compile_filter(
            &schema(),
            &[("state", Value::from("new")), ("id", Value::from(3i64))],
        )
        .unwrap();
        assert_eq!(compiled.where_sql(), " WHERE \"state\" = ?1 AND \"id\" = ?2");
        assert_eq!(
            compiled.params(),
            [Value::Text("new".into()), Value::Integer(3)]
        );
    }

    #[test]
    fn unknown_field_is_rejected_before_execution() {
        let err = compile_filter(&schema(), &[("nope", Value::from(1i64))]).unwrap_err();
        assert!(matches!(err, GranaryError::QuerySchema { ref field, .. } if field == "nope"));
    }

    #[test]
    fn null_compiles_to_is_null_without_a_param() {
        let compiled = compile_filter(
            &schema(),
            &[("data", Value::Null), ("state", Value::from("new"))],
        )
        .unwrap();
        assert_eq!(
            compiled.where_sql(),
            " WHERE \"data\" IS NULL AND \"state\" = ?1"
        );
        assert_eq!(compiled.params(), [Value::Text("new".into())]);
    }

    #[test]
    fn placeholder_numbering_honors_the_offset() {
        let compiled =
            compile_filter_from(&schema(), &[("state", Value::from("new"))], 4).unwrap();
        assert_eq!(compiled.where_sql(), " WHERE \"state\" = ?4");
    }

    #[test]
    fn hostile_values_never_reach_statement_text() {
        let compiled = compile_filter(
            &schema(),
            &[("data", Value::from("'; DROP TABLE messages; --"))],
        )
        .unwrap();
        assert!(!compiled.where_sql().contains("DROP"));
        assert_eq!(compiled.params().len(), 1);
    }
}
