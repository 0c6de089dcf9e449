//! Peer connection collaborator
//!
//! State types, the transport seam, and the webrtc-rs implementation.

pub mod connection;
pub mod state;
pub mod transport;

pub use connection::{RtcConnector, RtcPeerTransport};
pub use state::{
    DataChannelState, IceCandidate, IceConnectionState, IceGatheringState, SdpType,
    SessionDescription, SignalingState,
};
pub use transport::{EventSink, PeerTransport, TransportConnector, TransportEvent};
