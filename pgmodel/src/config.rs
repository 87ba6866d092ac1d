//! # Configuration
//!
//! Connection settings loaded from the environment. Applications typically call
//! `dotenvy::dotenv()` first so a local `.env` file can provide them.

use serde::Serialize;

use crate::Error;

pub const ENV_HOST: &str = "DATABASE_HOST";
pub const ENV_PORT: &str = "DATABASE_PORT";
pub const ENV_NAME: &str = "DATABASE_NAME";
pub const ENV_USER: &str = "DATABASE_USER";
pub const ENV_PASSWORD: &str = "DATABASE_PASSWORD";

/// PostgreSQL connection settings.
///
/// Serializes without the password, so it can be logged as-is.
///
/// Every field is optional; anything left unset falls back to the parameters of
/// the previous successful connection when passed to
/// [`DatabaseBuilder::from_config`](crate::DatabaseBuilder::from_config).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DatabaseConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub dbname: Option<String>,
    pub user: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
}

impl DatabaseConfig {
    /// Reads `DATABASE_HOST`, `DATABASE_PORT`, `DATABASE_NAME`, `DATABASE_USER`
    /// and `DATABASE_PASSWORD`.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let port = match get(ENV_PORT) {
            Some(raw) => Some(
                raw.trim()
                    .parse::<u16>()
                    .map_err(|_| Error::Connection("A valid port number was not provided!".to_string()))?,
            ),
            None => None,
        };

        Ok(Self {
            host: get(ENV_HOST),
            port,
            dbname: get(ENV_NAME),
            user: get(ENV_USER),
            password: get(ENV_PASSWORD),
        })
    }

    /// True when every setting needed for a first connection is present.
    pub fn is_complete(&self) -> bool {
        self.host.is_some() && self.port.is_some() && self.dbname.is_some() && self.user.is_some() && self.password.is_some()
    }
}
