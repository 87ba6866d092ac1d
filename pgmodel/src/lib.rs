//! # pgmodel
//!
//! A small active-record style mapper for PostgreSQL.
//!
//! Structs derive [`Model`] to map their fields onto table columns; the table
//! name is taken from `#[orm(table = "...")]` or inferred from the struct name.
//! [`Database`] owns a single shared connection and also runs ad-hoc queries
//! that return raw [`Record`]s.
//!
//! ```rust,ignore
//! use pgmodel::{Database, Model, Op};
//!
//! #[derive(Debug, Default, Model)]
//! #[orm(table = "option")]
//! struct AppOption {
//!     #[orm(primary_key)]
//!     option_id: i32,
//!     code: String,
//!     value: Option<String>,
//! }
//!
//! Database::builder()
//!     .host("localhost")
//!     .port(5432)
//!     .dbname("ucrm")
//!     .user("ucrm")
//!     .password("secret")
//!     .connect()
//!     .await?;
//!
//! let options = AppOption::select_where("code", Op::Eq, "SITE_NAME").await?;
//! let rows = Database::select("option", &["code", "value"], Some("code")).await?;
//! ```

extern crate self as pgmodel;

pub mod check;
pub mod codegen;
pub mod config;
pub mod database;
pub mod error;
pub mod model;
pub mod naming;
pub mod query;
pub mod schema;
pub mod value;

pub use check::ModelCheck;
pub use config::DatabaseConfig;
pub use database::{Database, DatabaseBuilder};
pub use error::Error;
pub use model::{Model, ModelMetadata, PropertyInfo};
pub use pgmodel_macro::Model;
pub use query::Op;
pub use schema::{ColumnSchema, KeyConstraint};
pub use serde_json::Value;
pub use value::Record;
