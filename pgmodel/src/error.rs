//! # Error Module
//!
//! A single error type covers connection setup, model reflection and the
//! underlying driver. Every fallible call in the crate returns `Result<_, Error>`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Connection parameters were missing or the server could not be reached.
    #[error("database connection error: {0}")]
    Connection(String),

    /// The model type cannot be used for queries, e.g. it maps no properties.
    #[error("model class error: {0}")]
    ModelClass(String),

    /// A column has no matching property on the model.
    #[error(
        "could not find a property '{name}' of model '{model}'; are you missing a `#[orm(column = \"...\")]` attribute on a field?"
    )]
    MissingProperty { model: String, name: String },

    /// A column value could not be converted into the field's type.
    #[error("could not decode property '{property}' of model '{model}': {source}")]
    PropertyDecode {
        model: String,
        property: String,
        #[source]
        source: serde_json::Error,
    },

    /// A model source file could not be generated.
    #[error("model creation error: {0}")]
    ModelCreation(String),

    #[error("unsupported operator '{0}'")]
    InvalidOperator(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
