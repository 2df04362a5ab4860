//! Shared error type for the mbmap crates

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the shared configuration layer
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file unreadable, unparsable or holding an invalid value
    #[error("Configuration error: {0}")]
    Config(String),
}
