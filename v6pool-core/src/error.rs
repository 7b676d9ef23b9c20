//! Error types for address arithmetic and pool allocation

use thiserror::Error;

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building or operating on addresses, networks and pools
///
/// Running out of free subnets is not an error: allocation returns `None` instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Malformed construction input or a request the receiver cannot serve
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An address offered as a network mask is not a contiguous run of leading ones
    #[error("inconsistency: {0}")]
    Inconsistency(String),

    /// Textual notation could not be parsed
    #[error("parse error: {0}")]
    Parse(String),
}

impl Error {
    /// Check if this error was caused by an invalid argument
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Error::InvalidArgument(_))
    }

    /// Check if this error was caused by an inconsistent network mask
    pub fn is_inconsistency(&self) -> bool {
        matches!(self, Error::Inconsistency(_))
    }
}

impl From<std::net::AddrParseError> for Error {
    fn from(e: std::net::AddrParseError) -> Self {
        Error::Parse(e.to_string())
    }
}
