// SPDX-FileCopyrightText: 2026 Granary Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Schema compilation: `ModelSchema` -> DDL statements.
//!
//! Compilation is deterministic and side-effect-free; executing the
//! statements is the engine's job. Every statement is `IF NOT EXISTS` so
//! re-running the set against an existing database is a no-op.

use granary_core::field::{DefaultValue, FieldSpec};
use granary_core::schema::ModelSchema;

/// SQLite expression producing the canonical ISO-8601 UTC timestamp,
/// e.g. `2026-01-01T00:00:00.000Z`.
const SQLITE_NOW: &str = "strftime('%Y-%m-%dT%H:%M:%fZ','now')";

/// Compile the full DDL set for a schema: the table definition followed by
/// one AFTER UPDATE trigger per auto-update field.
///
/// SQLite's `DEFAULT` only covers inserts; the trigger re-stamps the column
/// whenever any statement updates a row of the table.
pub fn compile(schema: &ModelSchema) -> Vec<String> {
    let mut statements = vec![create_table_sql(schema)];
    for field in schema.auto_update_fields() {
        statements.push(auto_update_trigger_sql(schema, field));
    }
    statements
}

/// The idempotent `CREATE TABLE` statement for a schema.
pub fn create_table_sql(schema: &ModelSchema) -> String {
    let columns: Vec<String> = schema.fields().iter().map(column_def).collect();
    format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        quote_ident(schema.table_name()),
        columns.join(", ")
    )
}

/// The trigger keeping one auto-update column current on row updates.
///
/// `recursive_triggers` is off by default in SQLite, so the trigger's own
/// UPDATE does not re-fire it.
pub fn auto_update_trigger_sql(schema: &ModelSchema, field_name: &str) -> String {
    let table = quote_ident(schema.table_name());
    let column = quote_ident(field_name);
    let trigger = quote_ident(&format!(
        "{}_{}_auto_update",
        schema.table_name(),
        field_name
    ));
    format!(
        "CREATE TRIGGER IF NOT EXISTS {trigger} AFTER UPDATE ON {table} FOR EACH ROW \
         BEGIN UPDATE {table} SET {column} = {SQLITE_NOW} WHERE rowid = NEW.rowid; END"
    )
}

/// One column definition, derived mechanically from the field's flags.
fn column_def(field: &FieldSpec) -> String {
    let mut def = format!("{} {}", quote_ident(field.name()), field.field_type().sql_type());
    if field.is_primary_key() {
        def.push_str(" PRIMARY KEY AUTOINCREMENT");
        return def;
    }
    if !field.is_nullable() {
        def.push_str(" NOT NULL");
    }
    if let Some(default) = field.default() {
        def.push_str(" DEFAULT ");
        def.push_str(&render_default(default));
    }
    if let Some(expr) = field.check_expr() {
        def.push_str(" CHECK (");
        def.push_str(expr);
        def.push(')');
    }
    def
}

fn render_default(default: &DefaultValue) -> String {
    match default {
        DefaultValue::Integer(i) => i.to_string(),
        DefaultValue::Real(f) => f.to_string(),
        DefaultValue::Text(s) => format!("'{}'", s.replace('\'', "''")),
        DefaultValue::CurrentTimestamp => format!("({SQLITE_NOW})"),
    }
}

/// Schema identifiers are validated at `ModelSchema` construction, so
/// double-quoting here can never need escaping.
pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{name}\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use granary_core::field::FieldType;

    fn messages_schema() -> ModelSchema {
        ModelSchema::new(
            "messages",
            vec![
                FieldSpec::primary_key("id"),
                FieldSpec::new("data", FieldType::Text).not_null(),
                FieldSpec::new("state", FieldType::Text)
                    .default_value(DefaultValue::Text("new".into()))
                    .check("state IN ('new','processed')"),
                FieldSpec::auto_update("updated_at"),
            ],
        )
        .unwrap()
    }

    #[test]
    fn create_table_maps_every_field_clause() {
        let sql = create_table_sql(&messages_schema());
        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS \"messages\""));
        assert!(sql.contains("\"id\" INTEGER PRIMARY KEY AUTOINCREMENT"));
        assert!(sql.contains("\"data\" TEXT NOT NULL"));
        assert!(sql.contains("\"state\" TEXT DEFAULT 'new' CHECK (state IN ('new','processed'))"));
        assert!(sql.contains(
            "\"updated_at\" TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now'))"
        ));
    }

    #[test]
    fn text_defaults_escape_embedded_quotes() {
        let schema = ModelSchema::new(
            "t",
            vec![FieldSpec::new("note", FieldType::Text)
                .default_value(DefaultValue::Text("it's".into()))],
        )
        .unwrap();
        assert!(create_table_sql(&schema).contains("DEFAULT 'it''s'"));
    }

    #[test]
    fn compile_emits_one_trigger_per_auto_update_field() {
        let statements = compile(&messages_schema());
        assert_eq!(statements.len(), 2);
        let trigger = &statements[1];
        assert!(trigger.contains("CREATE TRIGGER IF NOT EXISTS \"messages_updated_at_auto_update\""));
        assert!(trigger.contains("AFTER UPDATE ON \"messages\""));
        assert!(trigger.contains("WHERE rowid = NEW.rowid"));
    }

    #[test]
    fn schema_without_auto_update_compiles_to_a_single_statement() {
        let schema = ModelSchema::new(
            "plain",
            vec![FieldSpec::new("n", FieldType::Integer)],
        )
        .unwrap();
        assert_eq!(compile(&schema).len(), 1);
    }

    #[test]
    fn compilation_is_deterministic() {
        let schema = messages_schema();
        assert_eq!(compile(&schema), compile(&schema));
    }
}
