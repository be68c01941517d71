//! Datagram connection: one delivery socket and its receive loop.

use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use mi_client::{MiClient, MiEndpoint, Notification};
use parking_lot::RwLock;
use serde_json::json;
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;

use super::hub::HubInner;
use super::socket;
use super::subscription::DatagramSubscription;
use crate::config::EventsConfig;
use crate::error::{EventError, Result};
use crate::subscription::{EventCallback, Subscription};

/// MI command used both to subscribe (`expire > 0`) and unsubscribe (`expire == 0`).
pub(crate) const EVENT_SUBSCRIBE: &str = "event_subscribe";

/// Counters kept by a connection's receive loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectionStats {
    /// Datagrams read from the socket
    pub received: u64,
    /// Datagrams that were not valid notifications
    pub decode_failures: u64,
    /// Notifications for an event nobody on this socket subscribed to
    pub unrouted: u64,
    /// Notifications handed to a subscriber callback
    pub dispatched: u64,
}

#[derive(Debug, Default)]
struct Counters {
    received: AtomicU64,
    decode_failures: AtomicU64,
    unrouted: AtomicU64,
    dispatched: AtomicU64,
}

struct State {
    subscriptions: Vec<Arc<DatagramSubscription>>,
    /// Set once the last subscription left; the connection takes no new ones.
    closing: bool,
}

/// A bound delivery socket shared by subscriptions to distinct events.
///
/// The socket itself is owned by the receive task and closed when that task
/// ends, which happens once the last subscription has been removed.
pub struct Connection {
    identity: String,
    local_addr: SocketAddr,
    state: RwLock<State>,
    shutdown: CancellationToken,
    hub: Weak<HubInner>,
    client: Arc<dyn MiClient>,
    expire_secs: u64,
    counters: Counters,
}

impl Connection {
    /// Open a delivery socket reachable by the MI and start its receive loop.
    ///
    /// # Errors
    ///
    /// * `EventError::UnsupportedTransport` - the client does not reach the MI over UDP
    /// * `EventError::Bind` - the socket could not be opened
    pub(crate) fn bind_and_start(
        hub: Weak<HubInner>,
        client: Arc<dyn MiClient>,
        config: &EventsConfig,
    ) -> Result<Arc<Self>> {
        let remote = match client.endpoint() {
            MiEndpoint::Udp(addr) => addr,
            other => {
                tracing::error!(endpoint = %other, "using non-UDP protocol to connect to MI");
                return Err(EventError::UnsupportedTransport(other.to_string()));
            }
        };

        let ip = socket::local_ip_towards(remote)?;
        let udp = socket::bind_delivery_socket(ip, config.socket_buffer_size)?;
        let local_addr = udp.local_addr()?;

        let connection = Arc::new(Self {
            identity: format!("udp:{}", local_addr),
            local_addr,
            state: RwLock::new(State {
                subscriptions: Vec::with_capacity(1),
                closing: false,
            }),
            shutdown: CancellationToken::new(),
            hub,
            client,
            expire_secs: config.expire_secs(),
            counters: Counters::default(),
        });

        tracing::info!(socket = %connection, mi = %remote, "opened event connection");
        tokio::spawn(
            connection
                .clone()
                .receive_loop(udp, config.max_datagram_size),
        );

        Ok(connection)
    }

    /// Transport and address, as registered with the MI.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Events currently subscribed on this connection.
    pub fn events(&self) -> Vec<String> {
        self.state
            .read()
            .subscriptions
            .iter()
            .map(|sub| sub.event().to_string())
            .collect()
    }

    pub fn subscription_count(&self) -> usize {
        self.state.read().subscriptions.len()
    }

    /// Whether the last subscription left and the connection is shutting down.
    pub fn is_closing(&self) -> bool {
        self.state.read().closing
    }

    /// Whether the receive loop was told to stop.
    pub fn is_stopped(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    pub fn stats(&self) -> ConnectionStats {
        ConnectionStats {
            received: self.counters.received.load(Ordering::Relaxed),
            decode_failures: self.counters.decode_failures.load(Ordering::Relaxed),
            unrouted: self.counters.unrouted.load(Ordering::Relaxed),
            dispatched: self.counters.dispatched.load(Ordering::Relaxed),
        }
    }

    /// Attach a new subscription for `event` unless this connection already
    /// carries that event or is closing.
    pub(crate) fn attach(
        self: &Arc<Self>,
        event: &str,
        callback: EventCallback,
    ) -> Option<Arc<DatagramSubscription>> {
        let mut state = self.state.write();
        if state.closing || state.subscriptions.iter().any(|sub| sub.event() == event) {
            return None;
        }

        let subscription = Arc::new(DatagramSubscription::new(
            event.to_string(),
            self.identity.clone(),
            Arc::downgrade(self),
            callback,
        ));
        state.subscriptions.push(subscription.clone());
        Some(subscription)
    }

    /// Ask the MI to deliver `event` to this socket for the configured lease.
    pub(crate) async fn register(&self, event: &str) -> Result<()> {
        self.call_event_subscribe(event, self.expire_secs).await
    }

    /// Remove `sub` from this connection and tell the MI to stop delivering it.
    ///
    /// Local removal always happens; a failing MI call is only logged.
    pub(crate) async fn unsubscribe(&self, sub: &DatagramSubscription) {
        let last = {
            let mut state = self.state.write();
            if let Some(index) = state
                .subscriptions
                .iter()
                .position(|s| std::ptr::eq(s.as_ref(), sub))
            {
                state.subscriptions.remove(index);
            }

            if state.subscriptions.is_empty() && !state.closing {
                state.closing = true;
                true
            } else {
                false
            }
        };

        if last {
            tracing::info!(socket = %self, "closing connection");
            self.shutdown.cancel();
        }

        if sub.detach() {
            self.release(sub.event()).await;
        }
    }

    /// Tell the MI to stop delivering `event` to this socket. Failures are only logged.
    pub(crate) async fn release(&self, event: &str) {
        if let Err(e) = self.call_event_subscribe(event, 0).await {
            tracing::warn!(
                event,
                socket = %self,
                error = %e,
                "could not unsubscribe from event"
            );
        }
    }

    async fn call_event_subscribe(&self, event: &str, expire: u64) -> Result<()> {
        let params = json!({
            "event": event,
            "socket": self.identity,
            "expire": expire,
        });

        self.client
            .call(EVENT_SUBSCRIBE, params)
            .await
            .map(|_| ())
            .map_err(|source| EventError::ControlPlane {
                event: event.to_string(),
                source,
            })
    }

    fn subscription_for(&self, event: &str) -> Option<Arc<DatagramSubscription>> {
        self.state
            .read()
            .subscriptions
            .iter()
            .find(|sub| sub.event() == event)
            .cloned()
    }

    async fn receive_loop(self: Arc<Self>, udp: UdpSocket, max_datagram_size: usize) {
        let mut buffer = vec![0u8; max_datagram_size];

        loop {
            if self.shutdown.is_cancelled() {
                break;
            }

            let received = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                received = udp.recv_from(&mut buffer) => received,
            };

            match received {
                Ok((len, peer)) => self.handle_datagram(&buffer[..len], peer),
                Err(e) => {
                    tracing::warn!(socket = %self, error = %e, "error while listening for events");
                }
            }
        }

        drop(udp);
        tracing::debug!(socket = %self, "event receive loop stopped");

        if let Some(hub) = self.hub.upgrade() {
            hub.remove_connection(&self).await;
        }
    }

    fn handle_datagram(&self, datagram: &[u8], peer: SocketAddr) {
        self.counters.received.fetch_add(1, Ordering::Relaxed);

        let notification = match Notification::parse(datagram) {
            Ok(notification) => notification,
            Err(e) => {
                self.counters.decode_failures.fetch_add(1, Ordering::Relaxed);
                tracing::error!(socket = %self, %peer, error = %e, "could not parse notification");
                return;
            }
        };

        let Some(subscription) = self.subscription_for(&notification.method) else {
            self.counters.unrouted.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(
                socket = %self,
                event = %notification.method,
                "unknown subscriber for event"
            );
            return;
        };

        self.counters.dispatched.fetch_add(1, Ordering::Relaxed);
        let callback = subscription.callback();
        let handle: Arc<dyn Subscription> = subscription;
        tokio::task::spawn_blocking(move || callback(handle, notification));
    }
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.identity)
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("identity", &self.identity)
            .field("events", &self.events())
            .field("closing", &self.is_closing())
            .finish()
    }
}
