//! Error types for the call-events crate.

use mi_client::MiError;

/// Errors that can occur while managing event subscriptions.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    /// The MI cannot be reached over the transport the backend needs
    #[error("Unsupported transport: {0}")]
    UnsupportedTransport(String),

    /// Opening or binding a delivery socket failed
    #[error("Failed to bind event socket: {0}")]
    Bind(#[from] std::io::Error),

    /// The MI refused or failed an `event_subscribe` call
    #[error("MI call for event {event} failed: {source}")]
    ControlPlane {
        /// The event being (un)subscribed
        event: String,
        #[source]
        source: MiError,
    },

    /// Invalid configuration provided
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The delivery socket of a subscription is gone
    #[error("Connection closed: {0}")]
    ConnectionClosed(String),
}

/// Convenience type alias for Results using EventError.
pub type Result<T> = std::result::Result<T, EventError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_error_display() {
        let error = EventError::UnsupportedTransport("http://127.0.0.1:8888/mi".to_string());
        assert_eq!(
            error.to_string(),
            "Unsupported transport: http://127.0.0.1:8888/mi"
        );

        let error = EventError::Configuration("socket buffer size must be greater than 0".to_string());
        assert_eq!(
            error.to_string(),
            "Configuration error: socket buffer size must be greater than 0"
        );

        let error = EventError::ConnectionClosed("udp:127.0.0.1:40000".to_string());
        assert_eq!(error.to_string(), "Connection closed: udp:127.0.0.1:40000");
    }

    #[test]
    fn test_control_plane_error_keeps_source() {
        use std::error::Error;

        let error = EventError::ControlPlane {
            event: "E_DIALOG_ID".to_string(),
            source: MiError::Rpc {
                code: -32000,
                message: "Unknown event".to_string(),
            },
        };

        assert!(error.to_string().contains("E_DIALOG_ID"));
        assert!(error.to_string().contains("Unknown event"));
        assert!(error.source().is_some());
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::AddrInUse, "address in use");
        let error: EventError = io.into();
        assert!(matches!(error, EventError::Bind(_)));
    }
}
