// BMI Service - Error types
// InvalidInput is the caller's fault, Storage is ours, Config stops startup

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// True when the caller sent something we refuse to compute
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::InvalidInput(_))
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Storage(err.to_string())
    }
}

#[cfg(feature = "server")]
impl From<deadpool_sqlite::PoolError> for Error {
    fn from(err: deadpool_sqlite::PoolError) -> Self {
        Error::Storage(format!("connection pool: {err}"))
    }
}

#[cfg(feature = "server")]
impl From<deadpool_sqlite::InteractError> for Error {
    fn from(err: deadpool_sqlite::InteractError) -> Self {
        Error::Storage(format!("database interaction failed: {err}"))
    }
}

#[cfg(feature = "postgres")]
impl From<deadpool_postgres::PoolError> for Error {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        Error::Storage(format!("connection pool: {err}"))
    }
}

#[cfg(feature = "postgres")]
impl From<tokio_postgres::Error> for Error {
    fn from(err: tokio_postgres::Error) -> Self {
        Error::Storage(err.to_string())
    }
}
