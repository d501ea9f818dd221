//! Crate-wide error type

use thiserror::Error;

/// Errors surfaced by statehouse services
#[derive(Debug, Error)]
pub enum StatehouseError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StatehouseError>;
