//! Error types for the pool engine

use thiserror::Error;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while configuring or driving pools
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Failed to parse configuration file
    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Rejected by the pool itself (bad network, wrong prefix length, ...)
    #[error("pool error: {0}")]
    Pool(#[from] v6pool_core::Error),

    /// No pool with this name is configured
    #[error("unknown pool: {0}")]
    UnknownPool(String),

    /// The pool has no free subnet left
    #[error("pool {0} is exhausted")]
    Exhausted(String),

    /// The requested subnet is already allocated
    #[error("network not available: {0}")]
    Unavailable(String),
}

impl Error {
    /// Check if this is a configuration error
    pub fn is_config_error(&self) -> bool {
        matches!(self, Error::Config(_) | Error::ConfigParse(_))
    }

    /// Check if the request may succeed once other subnets are released
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::Exhausted(_) | Error::Unavailable(_))
    }
}
