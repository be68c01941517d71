//! Configuration types for the call-events crate
//!
//! `EventsConfig` selects the event backend and controls the lease requested
//! from the MI and the sizing of the delivery sockets.

use std::time::Duration;

use crate::backend::BackendKind;
use crate::error::{EventError, Result};

/// Configuration for the event backends
#[derive(Debug, Clone)]
pub struct EventsConfig {
    /// Which backend `create_backend` builds
    /// Default: Datagram
    pub backend: BackendKind,

    /// Lease requested with every `event_subscribe`
    /// Default: 120 seconds
    pub subscribe_expire: Duration,

    /// SO_RCVBUF / SO_SNDBUF applied to every delivery socket
    /// Default: 65535
    pub socket_buffer_size: usize,

    /// Largest notification datagram accepted
    /// Default: 65535
    pub max_datagram_size: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Datagram,
            subscribe_expire: Duration::from_secs(120),
            socket_buffer_size: 65535,
            max_datagram_size: 65535,
        }
    }
}

impl EventsConfig {
    /// Create a new EventsConfig with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an EventsConfig for high notification rates
    pub fn high_throughput() -> Self {
        Self {
            socket_buffer_size: 4 * 1024 * 1024,
            ..Default::default()
        }
    }

    /// Create an EventsConfig with a long MI lease, for callers that renew rarely
    pub fn long_lease() -> Self {
        Self {
            subscribe_expire: Duration::from_secs(3600),
            ..Default::default()
        }
    }

    /// Lease in whole seconds, as sent in the `expire` parameter
    pub fn expire_secs(&self) -> u64 {
        self.subscribe_expire.as_secs()
    }

    /// Validate the configuration and return any issues
    pub fn validate(&self) -> Result<()> {
        if self.subscribe_expire.as_secs() == 0 {
            return Err(EventError::Configuration(
                "Subscribe expire must be at least one second".to_string(),
            ));
        }

        if self.socket_buffer_size == 0 {
            return Err(EventError::Configuration(
                "Socket buffer size must be greater than 0".to_string(),
            ));
        }

        if self.max_datagram_size == 0 || self.max_datagram_size > 65535 {
            return Err(EventError::Configuration(
                "Max datagram size must be between 1 and 65535".to_string(),
            ));
        }

        Ok(())
    }

    pub fn with_backend(mut self, backend: BackendKind) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_subscribe_expire(mut self, expire: Duration) -> Self {
        self.subscribe_expire = expire;
        self
    }

    pub fn with_socket_buffer_size(mut self, size: usize) -> Self {
        self.socket_buffer_size = size;
        self
    }

    pub fn with_max_datagram_size(mut self, size: usize) -> Self {
        self.max_datagram_size = size;
        self
    }
}
