//! # Schema Introspection
//!
//! Primary key, foreign key and nullability lookups against
//! `information_schema`. Results are memoized per table name until the shared
//! connection is replaced.
//!
//! Table names may be schema-qualified (`ucrm.client`); unqualified names match
//! the table in any schema.

use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        LazyLock,
    },
};

use dashmap::DashMap;
use log::{debug, trace};
use serde::Serialize;

use crate::{Database, Error};

/// One column of a key constraint.
///
/// For primary keys the `foreign_*` fields point back at the table itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct KeyConstraint {
    pub constraint_name: String,
    pub table_name: String,
    pub column_name: String,
    pub foreign_table_name: String,
    pub foreign_column_name: String,
}

/// A column as described by `information_schema.columns`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct ColumnSchema {
    pub column_name: String,
    pub data_type: String,
    pub udt_name: String,
    pub is_nullable: bool,
    pub column_default: Option<String>,
    pub ordinal_position: i32,
}

/// Per-table lookups tagged with the generation they were fetched in.
///
/// A lookup that finishes after [`clear_caches`] carries a stale generation and
/// is never served, even if it lands in the map after the clear.
struct SchemaCache<T> {
    generation: AtomicU64,
    entries: DashMap<String, (u64, T)>,
}

impl<T: Clone> SchemaCache<T> {
    fn new() -> Self {
        Self { generation: AtomicU64::new(0), entries: DashMap::new() }
    }

    fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    fn get(&self, table: &str) -> Option<T> {
        let current = self.generation();
        self.entries.get(table).filter(|entry| entry.0 == current).map(|entry| entry.1.clone())
    }

    fn insert(&self, table: &str, generation: u64, value: T) {
        if generation == self.generation() {
            self.entries.insert(table.to_string(), (generation, value));
        }
    }

    fn clear(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.entries.clear();
    }
}

static PRIMARY_KEYS: LazyLock<SchemaCache<Option<KeyConstraint>>> = LazyLock::new(SchemaCache::new);
static FOREIGN_KEYS: LazyLock<SchemaCache<BTreeMap<String, KeyConstraint>>> = LazyLock::new(SchemaCache::new);
static NULLABLES: LazyLock<SchemaCache<BTreeMap<String, ColumnSchema>>> = LazyLock::new(SchemaCache::new);

/// Forgets every memoized lookup, including ones still in flight.
pub(crate) fn clear_caches() {
    PRIMARY_KEYS.clear();
    FOREIGN_KEYS.clear();
    NULLABLES.clear();
}

/// Splits `schema.table` into its parts.
fn split_table(table: &str) -> (Option<&str>, &str) {
    match table.rsplit_once('.') {
        Some((schema, name)) => (Some(schema.rsplit('.').next().unwrap_or(schema)), name),
        None => (None, table),
    }
}

const KEY_CONSTRAINTS_SQL: &str = "
    SELECT
        tc.constraint_name::text AS constraint_name,
        tc.table_name::text AS table_name,
        kcu.column_name::text AS column_name,
        ccu.table_name::text AS foreign_table_name,
        ccu.column_name::text AS foreign_column_name
    FROM
        information_schema.table_constraints AS tc
        JOIN information_schema.key_column_usage AS kcu
          ON tc.constraint_name = kcu.constraint_name AND tc.table_schema = kcu.table_schema
        JOIN information_schema.constraint_column_usage AS ccu
          ON ccu.constraint_name = tc.constraint_name AND ccu.constraint_schema = tc.constraint_schema
    WHERE tc.constraint_type = $1
      AND tc.table_name = $2
      AND ($3::text IS NULL OR tc.table_schema = $3)
    ORDER BY kcu.ordinal_position
";

const COLUMNS_SQL: &str = "
    SELECT
        column_name::text AS column_name,
        data_type::text AS data_type,
        udt_name::text AS udt_name,
        (is_nullable::text = 'YES') AS is_nullable,
        column_default::text AS column_default,
        ordinal_position::int4 AS ordinal_position
    FROM information_schema.columns
    WHERE table_name = $1
      AND ($2::text IS NULL OR table_schema = $2)
    ORDER BY ordinal_position
";

impl Database {
    async fn key_constraints(table: &str, constraint_type: &str) -> Result<Vec<KeyConstraint>, Error> {
        let db = Self::connect().await?;
        let (schema, name) = split_table(table);
        debug!("introspecting {} constraints of '{}'", constraint_type, table);

        let rows = sqlx::query_as::<_, KeyConstraint>(KEY_CONSTRAINTS_SQL)
            .bind(constraint_type)
            .bind(name)
            .bind(schema)
            .fetch_all(&db.pool)
            .await?;
        Ok(rows)
    }

    /// Returns every column of `table` in ordinal order.
    pub async fn columns(table: &str) -> Result<Vec<ColumnSchema>, Error> {
        let db = Self::connect().await?;
        let (schema, name) = split_table(table);

        let rows = sqlx::query_as::<_, ColumnSchema>(COLUMNS_SQL).bind(name).bind(schema).fetch_all(&db.pool).await?;
        Ok(rows)
    }

    /// Checks whether `table` exists.
    pub async fn table_exists(table: &str) -> Result<bool, Error> {
        Ok(!Self::columns(table).await?.is_empty())
    }

    // ------------------------------------------------------------------------
    // Primary keys
    // ------------------------------------------------------------------------

    /// The primary key of `table`; for composite keys, its first column.
    pub async fn primary_key(table: &str) -> Result<Option<KeyConstraint>, Error> {
        if let Some(cached) = PRIMARY_KEYS.get(table) {
            return Ok(cached);
        }

        let generation = PRIMARY_KEYS.generation();
        let key = Self::key_constraints(table, "PRIMARY KEY").await?.into_iter().next();
        trace!("cached primary key of '{}'", table);
        PRIMARY_KEYS.insert(table, generation, key.clone());
        Ok(key)
    }

    pub async fn primary_key_name(table: &str) -> Result<Option<String>, Error> {
        Ok(Self::primary_key(table).await?.map(|key| key.column_name))
    }

    pub async fn is_primary_key(table: &str, column: &str) -> Result<bool, Error> {
        Ok(Self::primary_key(table).await?.is_some_and(|key| key.column_name == column))
    }

    // ------------------------------------------------------------------------
    // Foreign keys
    // ------------------------------------------------------------------------

    /// The foreign keys of `table`, keyed by column name.
    pub async fn foreign_keys(table: &str) -> Result<BTreeMap<String, KeyConstraint>, Error> {
        if let Some(cached) = FOREIGN_KEYS.get(table) {
            return Ok(cached);
        }

        let generation = FOREIGN_KEYS.generation();
        let keys: BTreeMap<String, KeyConstraint> = Self::key_constraints(table, "FOREIGN KEY")
            .await?
            .into_iter()
            .map(|key| (key.column_name.clone(), key))
            .collect();
        trace!("cached {} foreign keys of '{}'", keys.len(), table);
        FOREIGN_KEYS.insert(table, generation, keys.clone());
        Ok(keys)
    }

    pub async fn foreign_key_names(table: &str) -> Result<Vec<String>, Error> {
        Ok(Self::foreign_keys(table).await?.into_keys().collect())
    }

    pub async fn is_foreign_key(table: &str, column: &str) -> Result<bool, Error> {
        Ok(Self::foreign_keys(table).await?.contains_key(column))
    }

    // ------------------------------------------------------------------------
    // Nullability
    // ------------------------------------------------------------------------

    /// The NULL-able columns of `table`, keyed by column name.
    pub async fn nullables(table: &str) -> Result<BTreeMap<String, ColumnSchema>, Error> {
        if let Some(cached) = NULLABLES.get(table) {
            return Ok(cached);
        }

        let generation = NULLABLES.generation();
        let nullables: BTreeMap<String, ColumnSchema> = Self::columns(table)
            .await?
            .into_iter()
            .filter(|column| column.is_nullable)
            .map(|column| (column.column_name.clone(), column))
            .collect();
        trace!("cached {} nullable columns of '{}'", nullables.len(), table);
        NULLABLES.insert(table, generation, nullables.clone());
        Ok(nullables)
    }

    pub async fn nullable_names(table: &str) -> Result<Vec<String>, Error> {
        Ok(Self::nullables(table).await?.into_keys().collect())
    }

    pub async fn is_nullable(table: &str, column: &str) -> Result<bool, Error> {
        Ok(Self::nullables(table).await?.contains_key(column))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_schema_qualified_names() {
        assert_eq!(split_table("client"), (None, "client"));
        assert_eq!(split_table("ucrm.client"), (Some("ucrm"), "client"));
        assert_eq!(split_table("unms.ucrm.option"), (Some("ucrm"), "option"));
    }

    #[test]
    fn lookups_from_before_a_clear_are_dropped() {
        let cache = SchemaCache::new();
        let before = cache.generation();
        cache.insert("client", before, 1);
        assert_eq!(cache.get("client"), Some(1));

        // A lookup started before the clear finishes after it.
        let in_flight = cache.generation();
        cache.clear();
        cache.insert("client", in_flight, 2);
        assert_eq!(cache.get("client"), None);

        cache.insert("client", cache.generation(), 3);
        assert_eq!(cache.get("client"), Some(3));
    }

    #[test]
    fn foreign_keys_join_on_constraint_schema() {
        // The referenced table may live in another schema than the referencing one.
        assert!(KEY_CONSTRAINTS_SQL.contains("ccu.constraint_schema = tc.constraint_schema"));
        assert!(!KEY_CONSTRAINTS_SQL.contains("ccu.table_schema"));
    }
}
