//! Bidirectional RPC over any message-oriented duplex channel
//!
//! Both sides of a connection are symmetric: each attaches an
//! [`RpcEndpoint`] that serves calls through its own [`RpcHandler`] and can
//! invoke functions on the peer. The channel is modeled as a stream of
//! incoming text frames plus a sink for outgoing ones, so the same endpoint
//! runs over a WebSocket, a pair of in-memory channels in tests, or anything
//! else that moves strings.

pub mod endpoint;
pub mod frame;

pub use endpoint::{NoFunctions, RpcEndpoint, RpcHandler, RpcOptions, TimeoutCallback};
pub use frame::{Frame, FrameCodec, JsonCodec};
