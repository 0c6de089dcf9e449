//! WebSocket signaling server for JSON-RPC 2.0 protocol
//!
//! One connection at a time may own a session; a second `ready` is
//! refused while a session is active.

mod handler;
mod server;

pub use handler::SharedState;
pub use server::{WebSocketServerHandle, WebSocketSignalingServer};
