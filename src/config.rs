//! Bootstrap configuration for both binaries.
//!
//! Database credentials come exclusively from the environment (a `.env` file
//! is honored via `dotenv`). All four variables are required; there are no
//! fallback values.

use anyhow::{Context, Result};
use sqlx::postgres::PgConnectOptions;

const POSTGRES_DB: &str = "POSTGRES_DB";
const POSTGRES_USER: &str = "POSTGRES_USER";
const POSTGRES_PASSWORD: &str = "POSTGRES_PASSWORD";
const POSTGRES_HOST: &str = "POSTGRES_HOST";

/// Connection parameters for the process-scoped Postgres pool.
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub database: String,
    pub user: String,
    pub password: String,
    pub host: String,
}

impl PostgresConfig {
    /// Read all required variables from the environment.
    ///
    /// Fails with the name of the first missing variable.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database: require(POSTGRES_DB)?,
            user: require(POSTGRES_USER)?,
            password: require(POSTGRES_PASSWORD)?,
            host: require(POSTGRES_HOST)?,
        })
    }

    /// Build sqlx connect options. The password stays out of any log output.
    pub fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .database(&self.database)
            .username(&self.user)
            .password(&self.password)
    }
}

fn require(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("missing required environment variable {key}"))
}

/// What to do when a notification payload fails to decode.
///
/// `Fail` preserves the documented contract: one malformed payload stops the
/// bridge. `Skip` treats decode failures like forward failures instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum DecodeErrorPolicy {
    /// Propagate the error; the listener stops and the process exits.
    Fail,
    /// Log the payload at warn level and keep listening.
    Skip,
}
