//! Error types for the MI client

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while talking to the management interface
#[derive(Debug, Error)]
pub enum MiError {
    /// Socket level failure (bind, connect, send or receive)
    #[error("MI transport error: {0}")]
    Io(#[from] std::io::Error),

    /// No matching reply arrived in time
    #[error("MI request {method} timed out after {timeout:?}")]
    Timeout { method: String, timeout: Duration },

    /// The management interface answered with a JSON-RPC error object
    #[error("MI error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// The reply could not be understood
    #[error("Malformed MI reply: {0}")]
    Decode(String),
}

/// Errors produced when decoding an inbound JSON-RPC notification
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The datagram is not valid JSON
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The datagram is JSON but not an object
    #[error("notification is not a JSON object")]
    NotAnObject,

    /// `jsonrpc` member missing or not "2.0"
    #[error("unsupported JSON-RPC version: {0:?}")]
    InvalidVersion(Option<String>),

    /// `method` member missing or not a string
    #[error("notification has no method")]
    MissingMethod,

    /// A notification must not carry an id
    #[error("message carries an id and is not a notification")]
    UnexpectedId,
}

/// Result type for MI operations
pub type Result<T> = std::result::Result<T, MiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mi_error_display() {
        let error = MiError::Rpc {
            code: -32601,
            message: "Method not found".to_string(),
        };
        assert_eq!(error.to_string(), "MI error -32601: Method not found");

        let error = MiError::Timeout {
            method: "event_subscribe".to_string(),
            timeout: Duration::from_secs(5),
        };
        assert_eq!(
            error.to_string(),
            "MI request event_subscribe timed out after 5s"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let error: MiError = io.into();
        assert!(matches!(error, MiError::Io(_)));
        assert!(error.to_string().contains("refused"));
    }

    #[test]
    fn test_decode_error_display() {
        assert_eq!(
            DecodeError::InvalidVersion(Some("1.0".to_string())).to_string(),
            "unsupported JSON-RPC version: Some(\"1.0\")"
        );
        assert_eq!(DecodeError::MissingMethod.to_string(), "notification has no method");
    }
}
