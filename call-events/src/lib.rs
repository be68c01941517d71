//! Event subscriptions against an OpenSIPS-style management interface (MI).
//!
//! Applications subscribe to named events (for example `E_DIALOG_ID`) and get a
//! callback for every notification the MI pushes. The MI is told where to push
//! with the `event_subscribe` command; notifications arrive as JSON-RPC 2.0
//! datagrams on local sockets owned by this crate.
//!
//! # Overview
//!
//! - [`EventBackend`]: a way of receiving events. [`create_backend`] builds the
//!   one selected by [`EventsConfig::backend`].
//! - [`DatagramEvents`]: the UDP backend. It multiplexes subscriptions onto as
//!   few sockets as possible while keeping event names unique per socket.
//! - [`Subscription`]: handle returned by `subscribe`, used to unsubscribe or
//!   renew the MI lease.
//! - [`Connection`]: one delivery socket and its receive loop.
//!
//! # Lifecycle
//!
//! 1. `subscribe` places the subscription on a connection, opening a new socket
//!    if needed, and asks the MI to deliver the event there
//! 2. The connection's receive loop decodes each datagram and runs the callback
//!    of the subscription whose event matches the notification method
//! 3. `unsubscribe` removes the subscription locally and tells the MI to stop;
//!    the last subscription leaving a connection shuts its socket down
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use call_events::{create_backend, EventsConfig, Notification, Subscription};
//! use mi_client::DatagramMiClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = DatagramMiClient::connect("127.0.0.1:8080".parse()?).await?;
//!     let backend = create_backend(Arc::new(client), EventsConfig::default())?;
//!
//!     let dialogs = backend
//!         .subscribe(
//!             "E_DIALOG_ID",
//!             Arc::new(|_sub: Arc<dyn Subscription>, notification: Notification| {
//!                 println!("dialog event: {}", notification.params);
//!             }),
//!         )
//!         .await?;
//!
//!     tokio::signal::ctrl_c().await?;
//!     dialogs.unsubscribe().await;
//!     backend.close().await;
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod config;
pub mod datagram;
pub mod error;
pub mod event;
pub mod logging;
pub mod subscription;

#[cfg(test)]
mod testing;

pub use backend::{create_backend, BackendKind, EventBackend};
pub use config::EventsConfig;
pub use datagram::{Connection, ConnectionStats, DatagramEvents, DatagramSubscription};
pub use error::{EventError, Result};
pub use event::CommandEvent;
pub use subscription::{EventCallback, Subscription};

pub use mi_client::Notification;
