//! Subscription trait and callback type shared by all event backends.

use std::sync::Arc;

use async_trait::async_trait;
use mi_client::Notification;

use crate::error::Result;

/// Callback invoked for every notification delivered to a subscription.
///
/// Callbacks run off the receive loop on the blocking pool, so they may block
/// without delaying other notifications.
pub type EventCallback = Arc<dyn Fn(Arc<dyn Subscription>, Notification) + Send + Sync>;

/// Trait representing an active MI event subscription.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; handles are shared between the
/// application, the backend and the callback tasks.
#[async_trait]
pub trait Subscription: Send + Sync {
    /// Name of the subscribed event.
    fn event(&self) -> &str;

    /// Identity of the socket the MI delivers this event to
    /// (`"<transport>:<ip>:<port>"`).
    fn identity(&self) -> &str;

    /// Whether the MI acknowledged the subscription and it was not dropped since.
    fn is_subscribed(&self) -> bool;

    /// Drop the subscription.
    ///
    /// Local delivery stops immediately. The MI is told to stop sending; a
    /// failure to do so is logged and does not keep the subscription alive.
    async fn unsubscribe(&self);

    /// Extend the MI lease by re-issuing the subscription on the same socket.
    ///
    /// Nothing renews leases automatically.
    ///
    /// # Errors
    ///
    /// Returns `EventError::ConnectionClosed` if the subscription was dropped.
    /// Returns `EventError::ControlPlane` if the MI call fails.
    async fn renew(&self) -> Result<()>;
}
