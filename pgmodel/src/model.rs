//! # Model Module
//!
//! Reflection over `#[derive(Model)]` structs. The derive only describes the
//! struct (its name, table annotation and properties); everything built from
//! that description lives here and is memoized per model type:
//!
//! * the table name, taken from `#[orm(table = "...")]` or inferred from the
//!   struct name with [`camel_to_snake`],
//! * the column => properties mapping used to hydrate rows.
//!
//! The cache is filled on first use and never invalidated; model metadata is
//! fixed at compile time.

use std::{
    any::TypeId,
    sync::{Arc, LazyLock},
};

use async_trait::async_trait;
use dashmap::DashMap;
use log::trace;
use serde::de::DeserializeOwned;
use serde_json::Value;
use sqlx::{Encode, Postgres, Type};

use crate::{
    naming::{camel_to_snake, quote_identifier},
    query::{select_sql, Op},
    value::Record,
    Database, Error,
};

/// Metadata about a mapped struct field.
///
/// Generated by the `#[derive(Model)]` macro, one entry per field that is not
/// marked `#[orm(skip)]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyInfo {
    /// The field name (without any `r#` prefix).
    pub name: &'static str,
    /// Column set with `#[orm(column = "...")]`, if any.
    pub column: Option<&'static str>,
    pub is_primary_key: bool,
    /// Whether the field is an `Option<T>`.
    pub is_nullable: bool,
    /// Referenced table from `#[orm(foreign_key = "table::column")]`.
    pub foreign_table: Option<&'static str>,
    /// Referenced column from `#[orm(foreign_key = "table::column")]`.
    pub foreign_key: Option<&'static str>,
}

impl PropertyInfo {
    /// The column this property is read from.
    pub fn column_name(&self) -> &'static str {
        self.column.unwrap_or(self.name)
    }
}

/// A column and every property populated from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMapping {
    pub column: String,
    pub properties: Vec<&'static str>,
}

/// Reflected, cached description of a model type.
#[derive(Debug, Clone)]
pub struct ModelMetadata {
    pub model: &'static str,
    pub table: String,
    /// Columns in field declaration order.
    pub columns: Vec<ColumnMapping>,
    pub properties: Vec<PropertyInfo>,
}

impl ModelMetadata {
    fn build<T: Model>() -> Result<Self, Error> {
        let model = T::type_name();
        let properties = T::properties();

        if properties.is_empty() {
            return Err(Error::ModelClass(format!(
                "The model '{}' does not map any properties and cannot be queried!",
                model
            )));
        }

        let table = match T::table_annotation() {
            Some(table) => table.to_string(),
            None => camel_to_snake(model),
        };
        if table.is_empty() {
            return Err(Error::ModelClass(format!("Could not determine a table name for the model '{}'!", model)));
        }

        let mut columns: Vec<ColumnMapping> = Vec::new();
        for property in &properties {
            let column = property.column_name();
            match columns.iter_mut().find(|mapping| mapping.column == column) {
                Some(mapping) => mapping.properties.push(property.name),
                None => columns.push(ColumnMapping { column: column.to_string(), properties: vec![property.name] }),
            }
        }

        Ok(Self { model, table, columns, properties })
    }

    /// Resolves a column or property name to its column name.
    ///
    /// Column names win over property names when both match.
    pub fn column_name(&self, name: &str) -> Option<&str> {
        if let Some(mapping) = self.columns.iter().find(|mapping| mapping.column == name) {
            return Some(&mapping.column);
        }
        self.columns
            .iter()
            .find(|mapping| mapping.properties.iter().any(|property| *property == name))
            .map(|mapping| mapping.column.as_str())
    }

    /// The properties populated from `column`.
    pub fn properties_for(&self, column: &str) -> Option<&[&'static str]> {
        self.columns
            .iter()
            .find(|mapping| mapping.column == column)
            .map(|mapping| mapping.properties.as_slice())
    }
}

static METADATA: LazyLock<DashMap<TypeId, Arc<ModelMetadata>>> = LazyLock::new(DashMap::new);

/// Returns the cached metadata for `T`, reflecting over it on first use.
pub fn metadata<T: Model>() -> Result<Arc<ModelMetadata>, Error> {
    let key = TypeId::of::<T>();
    if let Some(cached) = METADATA.get(&key) {
        return Ok(Arc::clone(cached.value()));
    }

    let built = Arc::new(ModelMetadata::build::<T>()?);
    trace!("cached metadata for model '{}' (table '{}')", built.model, built.table);
    Ok(Arc::clone(METADATA.entry(key).or_insert(built).value()))
}

/// Deserializes a column value into a field type.
///
/// Called by the code generated for `set_property`.
pub fn decode_property<T: DeserializeOwned>(model: &str, property: &str, value: &Value) -> Result<T, Error> {
    T::deserialize(value).map_err(|source| Error::PropertyDecode {
        model: model.to_string(),
        property: property.to_string(),
        source,
    })
}

/// The core trait of pgmodel: a struct mapped onto a database table.
///
/// Implemented with `#[derive(Model)]`; the provided methods build on the four
/// generated ones.
///
/// # Example
///
/// ```rust,ignore
/// use pgmodel::{Model, Op};
///
/// #[derive(Debug, Default, Model)]
/// struct UserGroup {
///     #[orm(column = "group_id", primary_key)]
///     id: i32,
///     name: String,
/// }
///
/// // SELECT * FROM "user_group" WHERE "group_id" = $1
/// let groups = UserGroup::select_where("id", Op::Eq, 1).await?;
/// ```
#[async_trait]
pub trait Model: Default + Send + Sync + 'static {
    /// The struct name.
    fn type_name() -> &'static str;

    /// Table name from `#[orm(table = "...")]`.
    fn table_annotation() -> Option<&'static str> {
        None
    }

    /// Mapped fields in declaration order.
    fn properties() -> Vec<PropertyInfo>;

    /// Assigns a column value to the named property.
    fn set_property(&mut self, property: &str, value: &Value) -> Result<(), Error>;

    /// The table this model reads from.
    fn table_name() -> Result<String, Error> {
        Ok(metadata::<Self>()?.table.clone())
    }

    /// Resolves a column or property name to the column name, if mapped.
    fn column_name(name: &str) -> Result<Option<String>, Error> {
        Ok(metadata::<Self>()?.column_name(name).map(str::to_string))
    }

    /// Builds a model from an associative row.
    ///
    /// Each column's value is assigned to every property mapped to it; a column
    /// without a property is an error. Properties absent from the row keep
    /// their `Default` value.
    fn from_record(record: &Record) -> Result<Self, Error> {
        let meta = metadata::<Self>()?;
        let mut model = Self::default();

        for (column, value) in record {
            let Some(properties) = meta.properties_for(column) else {
                return Err(Error::MissingProperty { model: meta.model.to_string(), name: column.clone() });
            };
            for property in properties {
                model.set_property(property, value)?;
            }
        }

        Ok(model)
    }

    /// Selects every row of the model's table.
    async fn select() -> Result<Vec<Self>, Error> {
        let meta = metadata::<Self>()?;
        let db = Database::connect().await?;

        let sql = select_sql(&quote_identifier(&meta.table), &[], None, None);
        let records = db.fetch_records(sqlx::query(&sql)).await?;

        records.iter().map(Self::from_record).collect()
    }

    /// Selects the rows where `column` compares to `value` with `op`.
    ///
    /// `column` may be a column name or a property name. The value is sent as a
    /// bound parameter.
    async fn select_where<V>(column: &str, op: Op, value: V) -> Result<Vec<Self>, Error>
    where
        V: for<'q> Encode<'q, Postgres> + Type<Postgres> + Send + 'static,
    {
        let meta = metadata::<Self>()?;
        let Some(column) = meta.column_name(column).map(str::to_string) else {
            return Err(Error::MissingProperty { model: meta.model.to_string(), name: column.to_string() });
        };
        let db = Database::connect().await?;

        let filter = format!("{} {} $1", quote_identifier(&column), op.as_sql());
        let sql = select_sql(&quote_identifier(&meta.table), &[], Some(&filter), None);
        let records = db.fetch_records(sqlx::query(&sql).bind(value)).await?;

        records.iter().map(Self::from_record).collect()
    }
}
