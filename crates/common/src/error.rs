//! Common error types for Downwatch components.

use std::fmt;

/// A specialized Result type for Downwatch operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for Downwatch operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Probe error: {0}")]
    Probe(String),

    #[error("Notification error: {0}")]
    Notify(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create a new probe error.
    pub fn probe(msg: impl fmt::Display) -> Self {
        Error::Probe(msg.to_string())
    }

    /// Create a new notification error.
    pub fn notify(msg: impl fmt::Display) -> Self {
        Error::Notify(msg.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors_format_message() {
        assert_eq!(
            Error::notify("status 500").to_string(),
            "Notification error: status 500"
        );
        assert_eq!(Error::probe("refused").to_string(), "Probe error: refused");
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::AddrInUse, "in use");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
