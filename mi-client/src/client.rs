//! Management interface client.

use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::net::UdpSocket;
use tokio::sync::Mutex;

use crate::error::{MiError, Result};
use crate::jsonrpc::{Request, Response};

/// Where a client reaches the management interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MiEndpoint {
    /// JSON-RPC over UDP (`mi_datagram`)
    Udp(SocketAddr),
    /// Any other transport, described for logging
    Other(String),
}

impl fmt::Display for MiEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MiEndpoint::Udp(addr) => write!(f, "udp:{}", addr),
            MiEndpoint::Other(description) => f.write_str(description),
        }
    }
}

/// Request/response access to the OpenSIPS management interface.
///
/// `call` completes only once the MI has answered (or the call failed), which is
/// what the event core relies on when it registers or drops a delivery socket.
#[async_trait]
pub trait MiClient: Send + Sync {
    /// Invoke an MI command and return its `result` member.
    async fn call(&self, method: &str, params: Value) -> Result<Value>;

    /// The endpoint the client sends its requests to.
    fn endpoint(&self) -> MiEndpoint;
}

/// Configuration for [`DatagramMiClient`].
#[derive(Debug, Clone)]
pub struct MiClientConfig {
    /// How long to wait for the reply to a single request
    /// Default: 5 seconds
    pub request_timeout: Duration,

    /// Receive buffer size, the largest reply accepted
    /// Default: 65535
    pub max_datagram_size: usize,
}

impl Default for MiClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(5),
            max_datagram_size: 65535,
        }
    }
}

impl MiClientConfig {
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// JSON-RPC client for the `mi_datagram` transport.
///
/// Requests are serialized: one request is in flight at a time and replies
/// that do not carry the id of the pending request are discarded.
#[derive(Debug)]
pub struct DatagramMiClient {
    socket: Mutex<UdpSocket>,
    remote: SocketAddr,
    local: SocketAddr,
    next_id: AtomicU64,
    config: MiClientConfig,
}

impl DatagramMiClient {
    /// Connect to the MI listening on `remote` with default settings.
    pub async fn connect(remote: SocketAddr) -> Result<Self> {
        Self::with_config(remote, MiClientConfig::default()).await
    }

    pub async fn with_config(remote: SocketAddr, config: MiClientConfig) -> Result<Self> {
        let bind_addr: SocketAddr = if remote.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };

        let socket = UdpSocket::bind(bind_addr).await?;
        socket.connect(remote).await?;
        let local = socket.local_addr()?;

        tracing::debug!(%remote, %local, "MI datagram client ready");

        Ok(Self {
            socket: Mutex::new(socket),
            remote,
            local,
            next_id: AtomicU64::new(1),
            config,
        })
    }

    /// Local address the client sends from.
    pub fn local_addr(&self) -> SocketAddr {
        self.local
    }
}

#[async_trait]
impl MiClient for DatagramMiClient {
    async fn call(&self, method: &str, params: Value) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let payload = Request::new(method, &params, id).to_vec()?;

        let socket = self.socket.lock().await;
        tracing::debug!(method, id, remote = %self.remote, "sending MI request");
        socket.send(&payload).await?;

        let mut buffer = vec![0u8; self.config.max_datagram_size];
        let deadline = tokio::time::Instant::now() + self.config.request_timeout;

        loop {
            let len = match tokio::time::timeout_at(deadline, socket.recv(&mut buffer)).await {
                Ok(received) => received?,
                Err(_) => {
                    return Err(MiError::Timeout {
                        method: method.to_string(),
                        timeout: self.config.request_timeout,
                    })
                }
            };

            let response = match Response::parse(&buffer[..len]) {
                Ok(response) => response,
                Err(e) => {
                    tracing::debug!(method, id, error = %e, "discarding malformed MI reply");
                    continue;
                }
            };
            if !response.answers(id) {
                tracing::debug!(method, id, reply_id = ?response.id, "discarding stale MI reply");
                continue;
            }

            return response.into_result();
        }
    }

    fn endpoint(&self) -> MiEndpoint {
        MiEndpoint::Udp(self.remote)
    }
}
