//! Signaling transport for the display surface
//!
//! JSON-RPC 2.0 over WebSocket: the surface sends `ready`,
//! `remoteDescription`, `remoteCandidate` and `close`; the bridge answers
//! with responses and pushes surface calls as notifications.

pub mod protocol;
pub mod websocket;

pub use protocol::{InboundSignal, JsonRpcError, JsonRpcRequest, JsonRpcResponse};
pub use websocket::{WebSocketServerHandle, WebSocketSignalingServer};
