//! WebRTC signaling bridge for WebControl
//!
//! This crate connects a display surface (a control page that can be
//! scripted asynchronously) to a WebRTC peer connection. It owns the
//! offer/answer state machine, relays ICE candidates in both directions and
//! carries a single control data channel.
//!
//! # Features
//!
//! - **Offer/answer negotiation**: full signaling state machine with a
//!   configurable glare policy
//! - **ICE relay**: local candidates forwarded in generation order, early
//!   remote candidates queued until a remote description exists
//! - **Data channel**: one reliable or unreliable control channel
//! - **JSON-RPC 2.0 signaling**: WebSocket display surface and server
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │  Display Surface (browser page, WebSocket client)      │
//! │  ↑ surface calls            ↓ ready / remote SDP / ICE │
//! │  SurfaceDispatcher          signaling::websocket       │
//! │  SignalingBridge (one session task)                    │
//! │  ├─ Negotiator (signaling state machine)               │
//! │  ├─ IceRelay (local relay, remote queue)               │
//! │  └─ DataChannelManager (state, in-order delivery)      │
//! │     ↑ TransportEvent via EventSink                     │
//! │  PeerTransport (webrtc-rs RTCPeerConnection)           │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use webcontrol_webrtc::BridgeConfig;
//!
//! let config = BridgeConfig::with_ice_servers(["stun:stun.example.org:19302"]);
//! assert!(config.validate().is_ok());
//! assert_eq!(config.data_channel_label, "WebControl");
//! ```
//!
//! ## Async Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use webcontrol_webrtc::{BridgeConfig, SdpType, SignalingBridge, WebSocketSurface};
//!
//! # async fn example() -> webcontrol_webrtc::Result<()> {
//! let (outbound, _frames) = tokio::sync::mpsc::unbounded_channel();
//! let surface = Arc::new(WebSocketSurface::new(outbound));
//!
//! let (bridge, mut streams) =
//!     SignalingBridge::initialize(BridgeConfig::default(), surface).await?;
//! bridge.apply_remote_description(SdpType::Answer, "v=0\r\n...").await?;
//!
//! while let Some(msg) = streams.messages.recv().await {
//!     println!("{} bytes", msg.size());
//! }
//! bridge.close();
//! # Ok(())
//! # }
//! ```

#![warn(clippy::all)]

// Public modules
pub mod channels;
pub mod config;
pub mod error;
pub mod peer;
pub mod session;
pub mod signaling;
pub mod surface;

// Re-exports for convenience
pub use channels::{ChannelMessage, DataChannelManager};
pub use config::{BridgeConfig, DataChannelMode, GlarePolicy, MediaConstraints, TurnServerConfig};
pub use error::{DispatchError, Error, NegotiationError, Result, TransportInitError};
pub use peer::{
    DataChannelState, EventSink, IceCandidate, IceConnectionState, IceGatheringState,
    PeerTransport, RtcConnector, SdpType, SessionDescription, SignalingState, TransportConnector,
    TransportEvent,
};
pub use session::{BridgeStreams, SessionId, SessionSnapshot, SignalingBridge};
pub use signaling::{WebSocketServerHandle, WebSocketSignalingServer};
pub use surface::{DisplaySurface, SurfaceCommand, WebSocketSurface};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get crate version
pub fn version() -> &'static str {
    VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}
