//! Transport library seam
//!
//! The bridge never talks to a WebRTC stack directly. It drives a
//! [`PeerTransport`] obtained from a [`TransportConnector`], and the transport
//! reports back by pushing [`TransportEvent`]s into an [`EventSink`].
//!
//! Transport callbacks may run on any library-owned thread. They must only
//! call [`EventSink::emit`], which never blocks and never awaits.

use crate::channels::ChannelMessage;
use crate::config::{BridgeConfig, DataChannelMode, MediaConstraints};
use crate::error::TransportInitError;
use crate::peer::state::{
    DataChannelState, IceCandidate, IceConnectionState, IceGatheringState, SessionDescription,
    SignalingState,
};
use crate::session::SessionEvent;
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::trace;

/// Notification from the transport library
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// Tracks or channels changed and an offer is required
    NegotiationNeeded,
    /// Signaling state reported by the transport
    SignalingStateChanged(SignalingState),
    /// ICE gathering state reported by the transport
    IceGatheringStateChanged(IceGatheringState),
    /// ICE connection state reported by the transport
    IceConnectionStateChanged(IceConnectionState),
    /// A local candidate was gathered
    CandidateGenerated(IceCandidate),
    /// Local candidates are no longer usable
    CandidatesRemoved(Vec<IceCandidate>),
    /// The control data channel changed state
    DataChannelStateChanged(DataChannelState),
    /// A buffer arrived on the control data channel
    DataChannelMessage(ChannelMessage),
}

/// Non-blocking handle transport callbacks use to notify the bridge
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl EventSink {
    pub(crate) fn new(tx: mpsc::UnboundedSender<SessionEvent>) -> Self {
        Self { tx }
    }

    /// Enqueue an event for the session task.
    ///
    /// Returns false once the session has terminated.
    pub fn emit(&self, event: TransportEvent) -> bool {
        match self.tx.send(SessionEvent::Transport(event)) {
            Ok(()) => true,
            Err(e) => {
                trace!("Dropping transport event after session end: {:?}", e.0);
                false
            }
        }
    }

    /// True once the session task has gone away
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Peer connection operations the bridge drives
///
/// Failures are opaque to the bridge; it wraps them into the matching
/// [`NegotiationError`](crate::NegotiationError) variant.
#[async_trait]
pub trait PeerTransport: Send + Sync {
    /// Create the control data channel
    async fn create_data_channel(&self, label: &str, mode: DataChannelMode) -> anyhow::Result<()>;

    /// Produce an offer honoring `constraints`
    async fn create_offer(&self, constraints: &MediaConstraints)
        -> anyhow::Result<SessionDescription>;

    /// Produce an answer to the applied remote offer
    async fn create_answer(
        &self,
        constraints: &MediaConstraints,
    ) -> anyhow::Result<SessionDescription>;

    /// Apply a local description
    async fn set_local_description(&self, description: SessionDescription) -> anyhow::Result<()>;

    /// Apply a remote description
    async fn set_remote_description(&self, description: SessionDescription)
        -> anyhow::Result<()>;

    /// Add a remote ICE candidate
    async fn add_ice_candidate(&self, candidate: IceCandidate) -> anyhow::Result<()>;

    /// Send a binary buffer on the control data channel
    async fn send(&self, data: Bytes) -> anyhow::Result<()>;

    /// Release the data channel and the peer connection
    async fn close(&self) -> anyhow::Result<()>;
}

/// Creates peer connections bound to an [`EventSink`]
#[async_trait]
pub trait TransportConnector: Send + Sync {
    /// Bring up the transport and instantiate a peer connection
    async fn connect(
        &self,
        config: &BridgeConfig,
        events: EventSink,
    ) -> Result<Arc<dyn PeerTransport>, TransportInitError>;
}
