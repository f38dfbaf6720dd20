use crate::error::{EtlError, Result};
use std::env;
use std::path::PathBuf;

/// Connection parameters for the target database, one env var per field.
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub username: String,
    pub password: String,
    pub host: String,
    pub port: u16,
    pub database: String,
}

impl DbConfig {
    /// Connection URL for sqlx. Never log this, it embeds the password.
    pub fn url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database
        )
    }

    /// Credential-free description for log lines.
    pub fn display_target(&self) -> String {
        format!("{}:{}/{}", self.host, self.port, self.database)
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub csv_path: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any lookup function, so tests can drive it from
    /// a map instead of mutating the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let username = require(&lookup, "USERNAME")?;
        let password = require(&lookup, "PASSWORD")?;
        let host = require(&lookup, "HOST")?;
        let port_raw = require(&lookup, "PORT")?;
        let database = require(&lookup, "DATABASE")?;
        let csv_path = require(&lookup, "CSV_PATH")?;

        let port: u16 = port_raw.parse().map_err(|_| {
            EtlError::Config(format!("PORT must be a TCP port number, got '{port_raw}'"))
        })?;

        Ok(Self {
            db: DbConfig {
                username,
                password,
                host,
                port,
                database,
            },
            csv_path: PathBuf::from(csv_path),
        })
    }
}

fn require(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String> {
    match lookup(key) {
        Some(value) if !value.trim().is_empty() => Ok(value),
        Some(_) => Err(EtlError::Config(format!(
            "Environment variable {key} is set but empty"
        ))),
        None => Err(EtlError::Config(format!(
            "Missing required environment variable {key}"
        ))),
    }
}
