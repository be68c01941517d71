//! Subscription handle for the datagram backend.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Weak};

use async_trait::async_trait;

use super::connection::Connection;
use crate::error::{EventError, Result};
use crate::subscription::{EventCallback, Subscription};

const PENDING: u8 = 0;
const SUBSCRIBED: u8 = 1;
const DETACHED: u8 = 2;

/// One event registered on one delivery socket.
pub struct DatagramSubscription {
    event: String,
    identity: String,
    connection: Weak<Connection>,
    callback: EventCallback,
    /// PENDING until the MI acknowledges, DETACHED once removed from its connection
    state: AtomicU8,
}

impl DatagramSubscription {
    pub(crate) fn new(
        event: String,
        identity: String,
        connection: Weak<Connection>,
        callback: EventCallback,
    ) -> Self {
        Self {
            event,
            identity,
            connection,
            callback,
            state: AtomicU8::new(PENDING),
        }
    }

    /// The connection carrying this subscription, while it is still alive.
    pub fn connection(&self) -> Option<Arc<Connection>> {
        self.connection.upgrade()
    }

    pub(crate) fn callback(&self) -> EventCallback {
        self.callback.clone()
    }

    /// Mark the subscription acknowledged by the MI.
    ///
    /// Returns `false` if it was detached while the acknowledgement was pending.
    pub(crate) fn confirm(&self) -> bool {
        self.state
            .compare_exchange(PENDING, SUBSCRIBED, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Mark the subscription detached, returning whether the MI had acknowledged it.
    pub(crate) fn detach(&self) -> bool {
        self.state.swap(DETACHED, Ordering::SeqCst) == SUBSCRIBED
    }
}

#[async_trait]
impl Subscription for DatagramSubscription {
    fn event(&self) -> &str {
        &self.event
    }

    fn identity(&self) -> &str {
        &self.identity
    }

    fn is_subscribed(&self) -> bool {
        self.state.load(Ordering::SeqCst) == SUBSCRIBED
    }

    async fn unsubscribe(&self) {
        tracing::debug!(event = %self.event, socket = %self.identity, "unsubscribing event");

        match self.connection.upgrade() {
            Some(connection) => connection.unsubscribe(self).await,
            None => {
                self.detach();
            }
        }
    }

    async fn renew(&self) -> Result<()> {
        let connection = self
            .connection
            .upgrade()
            .filter(|_| self.is_subscribed())
            .ok_or_else(|| EventError::ConnectionClosed(self.identity.clone()))?;

        tracing::debug!(event = %self.event, socket = %self.identity, "renewing event lease");
        connection.register(&self.event).await
    }
}

impl fmt::Display for DatagramSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.event, self.identity)
    }
}

impl fmt::Debug for DatagramSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatagramSubscription")
            .field("event", &self.event)
            .field("identity", &self.identity)
            .field("subscribed", &self.is_subscribed())
            .finish()
    }
}
