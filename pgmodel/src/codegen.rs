//! # Model Generation
//!
//! Renders `#[derive(Model)]` structs from a table's live schema, so a model
//! can be bootstrapped from an existing database instead of written by hand.

use std::{
    collections::BTreeMap,
    fmt::Write as _,
    fs,
    path::{Path, PathBuf},
};

use heck::ToSnakeCase;
use log::info;

use crate::{
    naming::snake_to_camel,
    schema::{ColumnSchema, KeyConstraint},
    Database, Error,
};

/// Everything known about a table that is needed to render its model.
#[derive(Debug, Clone, Default)]
pub struct TableDefinition {
    pub table: String,
    pub columns: Vec<ColumnSchema>,
    pub primary_key: Option<KeyConstraint>,
    pub foreign_keys: BTreeMap<String, KeyConstraint>,
}

impl Database {
    /// Introspects `table` and renders the source of its model.
    pub async fn generate_model(table: &str) -> Result<String, Error> {
        let columns = Self::columns(table).await?;
        if columns.is_empty() {
            return Err(Error::ModelCreation(format!("The table '{}' does not exist or has no columns!", table)));
        }

        let definition = TableDefinition {
            table: table.to_string(),
            columns,
            primary_key: Self::primary_key(table).await?,
            foreign_keys: Self::foreign_keys(table).await?,
        };
        render_model(&definition)
    }

    /// Writes the generated model of `table` to `<directory>/<table>.rs`,
    /// creating the directory when needed.
    pub async fn create_model(directory: impl AsRef<Path>, table: &str) -> Result<PathBuf, Error> {
        let directory = directory.as_ref();
        let file_stem = module_name(table)?;

        if !directory.as_os_str().is_empty() && !directory.exists() {
            fs::create_dir_all(directory).map_err(|e| {
                Error::ModelCreation(format!("The directory '{}' could not be created: {}", directory.display(), e))
            })?;
        }

        let source = Self::generate_model(table).await?;
        let path = directory.join(format!("{}.rs", file_stem));
        fs::write(&path, source)?;

        info!("generated model for '{}' at {}", table, path.display());
        Ok(path)
    }
}

/// Module (file) name for a table: the unqualified, snake_cased table name.
fn module_name(table: &str) -> Result<String, Error> {
    let unqualified = table.rsplit('.').next().unwrap_or(table);
    if unqualified.is_empty() || !unqualified.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(Error::ModelCreation(format!("The table name '{}' is invalid!", table)));
    }
    Ok(unqualified.to_snake_case())
}

/// Renders the Rust source of a model for `definition`.
pub fn render_model(definition: &TableDefinition) -> Result<String, Error> {
    let module = module_name(&definition.table)?;
    let struct_name = snake_to_camel(&module);
    if struct_name.is_empty() || struct_name.starts_with(|c: char| c.is_ascii_digit()) {
        return Err(Error::ModelCreation(format!("The table name '{}' is invalid!", definition.table)));
    }

    let mut out = String::new();
    writeln!(out, "//! Model for the `{}` table.", definition.table).ok();
    writeln!(out).ok();
    writeln!(out, "use pgmodel::Model;").ok();
    writeln!(out).ok();
    writeln!(out, "#[derive(Debug, Clone, Default, Model)]").ok();
    writeln!(out, "#[orm(table = \"{}\")]", definition.table).ok();
    writeln!(out, "pub struct {} {{", struct_name).ok();

    for column in &definition.columns {
        let field = field_name(&column.column_name);
        let mut attrs = Vec::new();

        if field.trim_start_matches("r#") != column.column_name {
            attrs.push(format!("column = \"{}\"", column.column_name));
        }
        if definition.primary_key.as_ref().is_some_and(|key| key.column_name == column.column_name) {
            attrs.push("primary_key".to_string());
        }
        if let Some(key) = definition.foreign_keys.get(&column.column_name) {
            attrs.push(format!("foreign_key = \"{}::{}\"", key.foreign_table_name, key.foreign_column_name));
        }

        if !attrs.is_empty() {
            writeln!(out, "    #[orm({})]", attrs.join(", ")).ok();
        }

        let rust_type = rust_type(&column.udt_name);
        if column.is_nullable {
            writeln!(out, "    pub {}: Option<{}>,", field, rust_type).ok();
        } else {
            writeln!(out, "    pub {}: {},", field, rust_type).ok();
        }
    }

    writeln!(out, "}}").ok();
    Ok(out)
}

const KEYWORDS: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "dyn", "else", "enum", "extern", "false", "fn", "for", "gen",
    "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut", "pub", "ref", "return", "static", "struct",
    "trait", "true", "type", "unsafe", "use", "where", "while", "abstract", "become", "box", "do", "final", "macro",
    "override", "priv", "try", "typeof", "unsized", "virtual", "yield",
];

fn field_name(column: &str) -> String {
    let mut name = column.to_snake_case();
    if name.is_empty() || name.starts_with(|c: char| c.is_ascii_digit()) {
        name = format!("column_{}", name);
    }
    if KEYWORDS.contains(&name.as_str()) {
        name = format!("r#{}", name);
    }
    name
}

/// Maps a PostgreSQL `udt_name` to the field type able to hold the decoded value.
fn rust_type(udt_name: &str) -> String {
    if let Some(element) = udt_name.strip_prefix('_') {
        return format!("Vec<{}>", rust_type(element));
    }

    match udt_name {
        "bool" => "bool",
        "int2" => "i16",
        "int4" => "i32",
        "int8" => "i64",
        "oid" => "u32",
        "float4" => "f32",
        "float8" => "f64",
        "uuid" => "uuid::Uuid",
        "json" | "jsonb" => "serde_json::Value",
        "timestamptz" => "chrono::DateTime<chrono::Utc>",
        "timestamp" => "chrono::NaiveDateTime",
        "date" => "chrono::NaiveDate",
        "time" => "chrono::NaiveTime",
        // numeric is decoded as a decimal string, bytea as hex
        _ => "String",
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(name: &str, udt: &str, nullable: bool, position: i32) -> ColumnSchema {
        ColumnSchema {
            column_name: name.to_string(),
            data_type: udt.to_string(),
            udt_name: udt.to_string(),
            is_nullable: nullable,
            column_default: None,
            ordinal_position: position,
        }
    }

    fn key(table: &str, column: &str, foreign_table: &str, foreign_column: &str) -> KeyConstraint {
        KeyConstraint {
            constraint_name: format!("{}_{}_key", table, column),
            table_name: table.to_string(),
            column_name: column.to_string(),
            foreign_table_name: foreign_table.to_string(),
            foreign_column_name: foreign_column.to_string(),
        }
    }

    #[test]
    fn renders_model_with_keys_and_nullables() {
        let mut foreign_keys = BTreeMap::new();
        foreign_keys.insert("group_id".to_string(), key("user", "group_id", "user_group", "group_id"));

        let definition = TableDefinition {
            table: "user".to_string(),
            columns: vec![
                column("user_id", "int4", false, 1),
                column("group_id", "int4", true, 2),
                column("isActive", "bool", false, 3),
                column("type", "text", false, 4),
                column("created_at", "timestamptz", false, 5),
                column("backup_codes", "_text", true, 6),
            ],
            primary_key: Some(key("user", "user_id", "user", "user_id")),
            foreign_keys,
        };

        let source = render_model(&definition).unwrap();

        assert!(source.contains("#[orm(table = \"user\")]\npub struct User {"));
        assert!(source.contains("    #[orm(primary_key)]\n    pub user_id: i32,"));
        assert!(source.contains("    #[orm(foreign_key = \"user_group::group_id\")]\n    pub group_id: Option<i32>,"));
        assert!(source.contains("    #[orm(column = \"isActive\")]\n    pub is_active: bool,"));
        assert!(source.contains("    pub r#type: String,"));
        assert!(source.contains("    pub created_at: chrono::DateTime<chrono::Utc>,"));
        assert!(source.contains("    pub backup_codes: Option<Vec<String>>,"));
        assert!(source.ends_with("}\n"));
    }

    #[test]
    fn struct_name_comes_from_the_unqualified_table() {
        let definition = TableDefinition {
            table: "ucrm.user_group".to_string(),
            columns: vec![column("group_id", "int4", false, 1)],
            ..Default::default()
        };

        let source = render_model(&definition).unwrap();
        assert!(source.contains("pub struct UserGroup {"));
        assert!(source.contains("#[orm(table = \"ucrm.user_group\")]"));
    }

    #[test]
    fn rejects_unusable_table_names() {
        let definition = TableDefinition { table: "drop table;".to_string(), ..Default::default() };
        assert!(matches!(render_model(&definition), Err(Error::ModelCreation(_))));

        let definition = TableDefinition { table: "2fa".to_string(), ..Default::default() };
        assert!(matches!(render_model(&definition), Err(Error::ModelCreation(_))));
    }

    #[test]
    fn odd_column_names_become_valid_fields() {
        assert_eq!(field_name("user_id"), "user_id");
        assert_eq!(field_name("match"), "r#match");
        assert_eq!(field_name("2fa_code"), "column_2fa_code");
        assert_eq!(rust_type("_int4"), "Vec<i32>");
        assert_eq!(rust_type("numeric"), "String");
        assert_eq!(rust_type("citext"), "String");
    }
}
