use sqlx::{ConnectOptions, PgConnection};

use crate::config::Config;
use crate::error::{Error, Result};

/// Open the one connection a run uses for all of its statements
pub async fn connect(config: &Config) -> Result<PgConnection> {
    let options = config.connect_options()?;
    tracing::info!(url = %config.redacted_url(), ssl_mode = ?config.ssl_mode, "connecting");
    options.connect().await.map_err(Error::Connect)
}
