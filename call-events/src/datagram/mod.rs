//! UDP datagram event backend.
//!
//! The MI pushes each notification as a single JSON-RPC datagram to a local
//! socket that was registered with `event_subscribe`. A socket carries at most
//! one subscription per event name, so notifications route by method alone.

mod connection;
mod hub;
mod socket;
mod subscription;

pub use connection::{Connection, ConnectionStats};
pub use hub::DatagramEvents;
pub use subscription::DatagramSubscription;
