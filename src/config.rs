//! Connection settings, resolved once at startup and passed down explicitly.

use std::str::FromStr;

use serde::Serialize;
use sqlx::postgres::{PgConnectOptions, PgSslMode};

use crate::error::{Error, Result};

pub const DEFAULT_DATABASE_URL: &str = "postgres://postgres@localhost:5432/postgres";

/// TLS negotiation mode for the database connection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SslMode {
    Disable,
    #[default]
    Prefer,
    Require,
}

impl FromStr for SslMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "disable" => Ok(SslMode::Disable),
            "prefer" => Ok(SslMode::Prefer),
            "require" => Ok(SslMode::Require),
            other => Err(Error::InvalidConfig(format!(
                "unknown sslmode '{}', expected disable, prefer or require",
                other
            ))),
        }
    }
}

impl From<SslMode> for PgSslMode {
    fn from(mode: SslMode) -> Self {
        match mode {
            SslMode::Disable => PgSslMode::Disable,
            SslMode::Prefer => PgSslMode::Prefer,
            SslMode::Require => PgSslMode::Require,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub database_url: String,
    pub ssl_mode: SslMode,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            ssl_mode: SslMode::default(),
        }
    }
}

impl Config {
    /// Build from optional raw values (flags or environment), falling back to
    /// defaults. Empty strings count as unset.
    pub fn resolve(database_url: Option<String>, ssl_mode: Option<String>) -> Result<Self> {
        let database_url = database_url
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

        let ssl_mode = match ssl_mode.filter(|m| !m.trim().is_empty()) {
            Some(raw) => raw.parse()?,
            None => SslMode::default(),
        };

        Ok(Self {
            database_url,
            ssl_mode,
        })
    }

    pub fn connect_options(&self) -> Result<PgConnectOptions> {
        let options = PgConnectOptions::from_str(&self.database_url)
            .map_err(|e| Error::InvalidConfig(format!("bad database url: {}", e)))?;
        Ok(options.ssl_mode(self.ssl_mode.into()))
    }

    /// Database URL with any password replaced, for log and console output
    pub fn redacted_url(&self) -> String {
        let Some((scheme, rest)) = self.database_url.split_once("://") else {
            return self.database_url.clone();
        };
        let Some((userinfo, host)) = rest.rsplit_once('@') else {
            return self.database_url.clone();
        };
        match userinfo.split_once(':') {
            Some((user, _)) => format!("{}://{}:***@{}", scheme, user, host),
            None => self.database_url.clone(),
        }
    }
}
