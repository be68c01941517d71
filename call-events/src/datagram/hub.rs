//! Datagram event hub: connection placement and the connection registry.

use std::sync::Arc;

use async_trait::async_trait;
use mi_client::MiClient;
use tokio::sync::Mutex;

use super::connection::Connection;
use super::subscription::DatagramSubscription;
use crate::backend::EventBackend;
use crate::config::EventsConfig;
use crate::error::{EventError, Result};
use crate::subscription::{EventCallback, Subscription};

pub(crate) struct HubInner {
    client: Arc<dyn MiClient>,
    config: EventsConfig,
    connections: Mutex<Vec<Arc<Connection>>>,
}

impl HubInner {
    /// Drop `connection` from the active set. Called by its receive loop on exit.
    pub(crate) async fn remove_connection(&self, connection: &Connection) -> bool {
        let mut connections = self.connections.lock().await;
        match connections
            .iter()
            .position(|c| std::ptr::eq(c.as_ref(), connection))
        {
            Some(index) => {
                tracing::info!(socket = %connection, "removing connection");
                connections.remove(index);
                true
            }
            None => false,
        }
    }
}

/// Event backend that receives MI notifications on UDP sockets.
///
/// Subscriptions are multiplexed onto as few sockets as possible: a new
/// subscription goes to the first connection that does not already carry its
/// event, and a new socket is opened only when every existing one does.
/// Subscriptions never move between connections.
///
/// Cloning the hub is cheap; clones share the same connections.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use call_events::{DatagramEvents, EventsConfig, Subscription};
/// use mi_client::{DatagramMiClient, Notification};
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let client = DatagramMiClient::connect("127.0.0.1:8080".parse()?).await?;
/// let hub = DatagramEvents::new(Arc::new(client), EventsConfig::default())?;
///
/// let subscription = hub
///     .subscribe_event("E_DIALOG_ID", Arc::new(|sub: Arc<dyn Subscription>, notification: Notification| {
///         println!("{} on {}: {}", sub.event(), sub.identity(), notification.params);
///     }))
///     .await?;
///
/// subscription.unsubscribe().await;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct DatagramEvents {
    inner: Arc<HubInner>,
}

impl DatagramEvents {
    /// Bind the hub to an MI client.
    ///
    /// # Errors
    ///
    /// Returns `EventError::Configuration` if `config` does not validate.
    pub fn new(client: Arc<dyn MiClient>, config: EventsConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            inner: Arc::new(HubInner {
                client,
                config,
                connections: Mutex::new(Vec::with_capacity(1)),
            }),
        })
    }

    /// Subscribe to `event`, delivering notifications to `callback`.
    ///
    /// # Process
    ///
    /// 1. Place the subscription on the first connection without `event`,
    ///    opening a new connection when there is none
    /// 2. Issue `event_subscribe` for the connection's socket
    /// 3. On failure, drop the local registration again
    /// 4. If the subscription was dropped before the MI answered, withdraw it
    ///    from the MI as well
    ///
    /// The subscription is attached before the MI is asked to deliver, so a
    /// notification sent right after the MI answers is never missed.
    ///
    /// # Errors
    ///
    /// * `EventError::UnsupportedTransport` / `EventError::Bind` - no socket could be opened
    /// * `EventError::ControlPlane` - the MI rejected the subscription
    /// * `EventError::ConnectionClosed` - the subscription was unsubscribed before
    ///   the MI acknowledged it
    pub async fn subscribe_event(
        &self,
        event: &str,
        callback: EventCallback,
    ) -> Result<Arc<DatagramSubscription>> {
        let (connection, subscription) = self.place(event, callback).await?;

        tracing::debug!(event, socket = %connection, "subscribing for event");

        if let Err(e) = connection.register(event).await {
            tracing::error!(event, socket = %connection, error = %e, "could not subscribe for event");
            connection.unsubscribe(&subscription).await;
            return Err(e);
        }

        if !subscription.confirm() {
            // Unsubscribed while the MI was still answering
            tracing::debug!(event, socket = %connection, "subscription dropped before acknowledgement");
            connection.release(event).await;
            return Err(EventError::ConnectionClosed(connection.identity().to_string()));
        }

        tracing::debug!(event, socket = %connection, "subscribed");
        Ok(subscription)
    }

    async fn place(
        &self,
        event: &str,
        callback: EventCallback,
    ) -> Result<(Arc<Connection>, Arc<DatagramSubscription>)> {
        let mut connections = self.inner.connections.lock().await;

        for connection in connections.iter() {
            if let Some(subscription) = connection.attach(event, callback.clone()) {
                return Ok((connection.clone(), subscription));
            }
        }

        let connection = Connection::bind_and_start(
            Arc::downgrade(&self.inner),
            self.inner.client.clone(),
            &self.inner.config,
        )
        .map_err(|e| {
            tracing::error!(event, error = %e, "could not open event connection");
            e
        })?;
        connections.push(connection.clone());

        let subscription = connection
            .attach(event, callback)
            .ok_or_else(|| EventError::ConnectionClosed(connection.identity().to_string()))?;
        Ok((connection, subscription))
    }

    /// Release hub-level resources.
    ///
    /// Live connections keep running; subscribers unsubscribe individually.
    pub async fn close(&self) {
        tracing::debug!("closing datagram handler");
    }

    /// Active connections, in placement order.
    pub async fn connections(&self) -> Vec<Arc<Connection>> {
        self.inner.connections.lock().await.clone()
    }

    pub async fn connection_count(&self) -> usize {
        self.inner.connections.lock().await.len()
    }

    pub async fn connection_identities(&self) -> Vec<String> {
        self.inner
            .connections
            .lock()
            .await
            .iter()
            .map(|c| c.identity().to_string())
            .collect()
    }

    pub fn config(&self) -> &EventsConfig {
        &self.inner.config
    }
}

#[async_trait]
impl EventBackend for DatagramEvents {
    async fn subscribe(&self, event: &str, callback: EventCallback) -> Result<Arc<dyn Subscription>> {
        let subscription = self.subscribe_event(event, callback).await?;
        Ok(subscription)
    }

    async fn close(&self) {
        DatagramEvents::close(self).await
    }
}
