//! Client for the OpenSIPS management interface (MI)
//!
//! This crate provides the request/response seam the event core talks through,
//! a JSON-RPC client for the `mi_datagram` transport, and the decoder for the
//! JSON-RPC notifications OpenSIPS pushes to subscribed event sockets.

mod client;
mod error;
pub mod jsonrpc;

pub use client::{DatagramMiClient, MiClient, MiClientConfig, MiEndpoint};
pub use error::{DecodeError, MiError, Result};
pub use jsonrpc::Notification;
