//! Client side of the knipview RPC channel
//!
//! [`KnipviewClient`] connects to a server's `{base}/rpc` WebSocket and
//! exposes the served operations as typed async methods.

mod client;
mod messages;

pub use client::{ConnectionState, KnipviewClient};
pub use messages::user_message;
