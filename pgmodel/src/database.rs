//! # Database Module
//!
//! This module provides the shared connection used by every query in pgmodel.
//! A single PostgreSQL connection is created lazily and kept for the life of the
//! process; the `Database` facade also runs ad-hoc `SELECT` queries that return
//! raw [`Record`]s.

// ============================================================================
// External Crate Imports
// ============================================================================

use std::sync::LazyLock;

use futures::{future, TryStreamExt};
use log::{debug, info};
use sqlx::{
    postgres::{PgArguments, PgConnectOptions, PgPoolOptions},
    query::Query,
    Execute, PgPool, Postgres,
};
use tokio::sync::Mutex;

// ============================================================================
// Internal Crate Imports
// ============================================================================

use crate::{
    config::DatabaseConfig,
    query::select_sql,
    schema,
    value::{decode_row, Record},
    Error,
};

// ============================================================================
// Shared Connection State
// ============================================================================

/// The connection handle and the parameters it was opened with.
#[derive(Default)]
struct Shared {
    params: DatabaseConfig,
    handle: Option<Database>,
}

static SHARED: LazyLock<Mutex<Shared>> = LazyLock::new(|| Mutex::new(Shared::default()));

// ============================================================================
// Database Struct
// ============================================================================

/// Handle to the shared PostgreSQL connection.
///
/// The underlying pool is capped at one connection, so every query issued
/// through pgmodel runs on the same session.
#[derive(Debug, Clone)]
pub struct Database {
    pub(crate) pool: PgPool,
}

// ============================================================================
// Database Implementation
// ============================================================================

impl Database {
    /// Creates a new DatabaseBuilder for configuring the connection.
    pub fn builder() -> DatabaseBuilder {
        DatabaseBuilder::new()
    }

    /// Returns the shared connection, opening it with the remembered parameters
    /// when none exists yet.
    ///
    /// Fails with [`Error::Connection`] when no connection was ever configured.
    pub async fn connect() -> Result<Self, Error> {
        DatabaseBuilder::new().connect().await
    }

    /// The underlying sqlx pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Selects rows from `table`.
    ///
    /// An empty `columns` slice selects every column. `table` and `order_by` are
    /// interpolated as-is, so schema-qualified names and expressions work.
    pub async fn select(table: &str, columns: &[&str], order_by: Option<&str>) -> Result<Vec<Record>, Error> {
        let db = Self::connect().await?;
        let sql = select_sql(table, columns, None, order_by);
        db.fetch_records(sqlx::query(&sql)).await
    }

    /// Selects the rows of `table` matching the raw `filter` fragment.
    ///
    /// ```rust,ignore
    /// let rows = Database::select_where("option", "code = 'SITE_NAME'", &["code", "value"], None).await?;
    /// ```
    pub async fn select_where(
        table: &str,
        filter: &str,
        columns: &[&str],
        order_by: Option<&str>,
    ) -> Result<Vec<Record>, Error> {
        let db = Self::connect().await?;
        let sql = select_sql(table, columns, Some(filter), order_by);
        db.fetch_records(sqlx::query(&sql)).await
    }

    /// Executes a statement and returns the number of affected rows.
    pub async fn execute(sql: &str) -> Result<u64, Error> {
        let db = Self::connect().await?;
        debug!("execute: {}", sql);
        let result = sqlx::query(sql).execute(&db.pool).await?;
        Ok(result.rows_affected())
    }

    /// Runs `query` and decodes each row as it arrives.
    pub(crate) async fn fetch_records<'q>(&self, query: Query<'q, Postgres, PgArguments>) -> Result<Vec<Record>, Error> {
        debug!("query: {}", query.sql());
        query
            .fetch(&self.pool)
            .map_err(Error::from)
            .and_then(|row| future::ready(decode_row(&row)))
            .try_collect()
            .await
    }
}

// ============================================================================
// DatabaseBuilder Struct
// ============================================================================

/// Connection parameters for [`Database`].
///
/// Unset parameters fall back to those of the last successful connection.
#[derive(Debug, Clone, Default)]
pub struct DatabaseBuilder {
    params: DatabaseConfig,
    reconnect: bool,
}

impl DatabaseBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: DatabaseConfig) -> Self {
        Self { params: config, reconnect: false }
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.params.host = Some(host.into());
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.params.port = Some(port);
        self
    }

    pub fn dbname(mut self, dbname: impl Into<String>) -> Self {
        self.params.dbname = Some(dbname.into());
        self
    }

    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.params.user = Some(user.into());
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.params.password = Some(password.into());
        self
    }

    /// Replace an existing shared connection instead of returning it.
    pub fn reconnect(mut self, reconnect: bool) -> Self {
        self.reconnect = reconnect;
        self
    }

    /// Returns the shared connection, creating it when missing or when a
    /// reconnect was requested.
    pub async fn connect(self) -> Result<Database, Error> {
        let mut shared = SHARED.lock().await;

        if !self.reconnect {
            if let Some(db) = &shared.handle {
                return Ok(db.clone());
            }
        }

        let params = resolve(&self.params, &shared.params)?;
        let options = PgConnectOptions::new()
            .host(params.host.as_deref().unwrap_or_default())
            .port(params.port.unwrap_or_default())
            .database(params.dbname.as_deref().unwrap_or_default())
            .username(params.user.as_deref().unwrap_or_default())
            .password(params.password.as_deref().unwrap_or_default());

        let pool = PgPoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| Error::Connection(e.to_string()))?;

        info!(
            "connected to postgres at {}:{}/{}",
            params.host.as_deref().unwrap_or_default(),
            params.port.unwrap_or_default(),
            params.dbname.as_deref().unwrap_or_default()
        );

        if let Some(previous) = shared.handle.take() {
            previous.pool.close().await;
        }
        schema::clear_caches();

        let db = Database { pool };
        shared.handle = Some(db.clone());
        shared.params = params;
        Ok(db)
    }
}

/// Merges requested parameters over the stored ones and validates the result.
fn resolve(requested: &DatabaseConfig, stored: &DatabaseConfig) -> Result<DatabaseConfig, Error> {
    fn pick(requested: &Option<String>, stored: &Option<String>, message: &str) -> Result<Option<String>, Error> {
        requested
            .iter()
            .chain(stored.iter())
            .find(|value| !value.is_empty())
            .cloned()
            .map(Some)
            .ok_or_else(|| Error::Connection(message.to_string()))
    }

    let host = pick(&requested.host, &stored.host, "A valid host name was not provided!")?;
    let port = requested
        .port
        .into_iter()
        .chain(stored.port)
        .find(|port| *port != 0)
        .ok_or_else(|| Error::Connection("A valid port number was not provided!".to_string()))?;
    let dbname = pick(&requested.dbname, &stored.dbname, "A valid database name was not provided!")?;
    let user = pick(&requested.user, &stored.user, "A valid username was not provided!")?;
    let password = pick(&requested.password, &stored.password, "A valid password was not provided!")?;

    Ok(DatabaseConfig { host, port: Some(port), dbname, user, password })
}
