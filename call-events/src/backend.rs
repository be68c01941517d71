//! Event backend abstraction and the configuration-driven factory.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use mi_client::MiClient;

use crate::config::EventsConfig;
use crate::datagram::DatagramEvents;
use crate::error::{EventError, Result};
use crate::subscription::{EventCallback, Subscription};

/// A mechanism for receiving MI event notifications.
///
/// Construction is backend specific; see [`create_backend`] for building one
/// from configuration.
#[async_trait]
pub trait EventBackend: Send + Sync {
    /// Subscribe to `event`, delivering every notification to `callback`.
    ///
    /// # Errors
    ///
    /// Returns an error if no delivery endpoint could be set up or the MI
    /// refused the subscription. Nothing stays registered in that case.
    async fn subscribe(&self, event: &str, callback: EventCallback) -> Result<Arc<dyn Subscription>>;

    /// Release backend-level resources.
    async fn close(&self);
}

/// Available event backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
    /// Notifications arrive as JSON-RPC datagrams on local UDP sockets
    #[default]
    Datagram,
}

impl FromStr for BackendKind {
    type Err = EventError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "datagram" | "udp" => Ok(BackendKind::Datagram),
            other => Err(EventError::Configuration(format!(
                "Unknown event backend: {other}"
            ))),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Datagram => f.write_str("datagram"),
        }
    }
}

/// Build the backend selected by `config.backend`.
///
/// # Errors
///
/// Returns `EventError::Configuration` if `config` does not validate.
pub fn create_backend(
    client: Arc<dyn MiClient>,
    config: EventsConfig,
) -> Result<Box<dyn EventBackend>> {
    tracing::debug!(backend = %config.backend, "creating event backend");

    match config.backend {
        BackendKind::Datagram => Ok(Box::new(DatagramEvents::new(client, config)?)),
    }
}
