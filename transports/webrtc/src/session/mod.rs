//! Signaling session
//!
//! A session binds one peer connection to one display surface. All of its
//! state lives in a single task; transport callbacks and caller requests
//! reach that task as [`SessionEvent`]s on one queue, so transitions are
//! applied one at a time in arrival order.

pub mod bridge;
pub mod ice_relay;
pub mod negotiation;

pub use bridge::{BridgeStreams, SignalingBridge};
pub use ice_relay::IceRelay;
pub use negotiation::{Negotiator, RemotePlan};

use crate::error::NegotiationError;
use crate::peer::{
    DataChannelState, IceCandidate, IceConnectionState, IceGatheringState, SessionDescription,
    SignalingState, TransportEvent,
};
use crate::surface::SurfaceCommand;
use bytes::Bytes;
use serde::Serialize;
use std::fmt;
use tokio::sync::oneshot;
use uuid::Uuid;

/// Unique session identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generate a new random id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Point-in-time view of a session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    /// Session id
    pub session_id: SessionId,
    /// Signaling state
    pub signaling_state: SignalingState,
    /// ICE gathering state
    pub ice_gathering_state: IceGatheringState,
    /// Last ICE connection state reported by the transport
    pub ice_connection_state: IceConnectionState,
    /// Control data channel state
    pub data_channel_state: DataChannelState,
    /// Remote candidates waiting for a remote description
    pub pending_remote_candidates: usize,
    /// Set once the session has fully shut down
    pub terminated: bool,
}

impl SessionSnapshot {
    fn initial(session_id: SessionId) -> Self {
        Self {
            session_id,
            signaling_state: SignalingState::Stable,
            ice_gathering_state: IceGatheringState::New,
            ice_connection_state: IceConnectionState::New,
            data_channel_state: DataChannelState::Connecting,
            pending_remote_candidates: 0,
            terminated: false,
        }
    }
}

/// Input to the session task
#[derive(Debug)]
pub(crate) enum SessionEvent {
    /// Notification from the transport library
    Transport(TransportEvent),
    /// Request from a bridge handle
    Command(BridgeCommand),
}

/// Requests made through [`SignalingBridge`]
#[derive(Debug)]
pub(crate) enum BridgeCommand {
    ApplyRemoteDescription {
        description: SessionDescription,
        reply: oneshot::Sender<Result<(), NegotiationError>>,
    },
    ApplyRemoteCandidate {
        candidate: IceCandidate,
        reply: oneshot::Sender<Result<(), NegotiationError>>,
    },
    SendData {
        data: Bytes,
        reply: oneshot::Sender<crate::Result<()>>,
    },
    Dispatch(SurfaceCommand),
    Close,
}
