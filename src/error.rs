use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to connect to database")]
    Connect(#[source] sqlx::Error),

    /// Reading `pg_indexes` failed. Fatal for a provisioning run.
    #[error("catalog query failed")]
    Catalog(#[source] sqlx::Error),

    #[error("query failed")]
    Query(#[from] sqlx::Error),

    #[error("invalid export filter: {0}")]
    InvalidFilter(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
