//! Signaling, ICE and data channel state types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Offer/answer signaling state of the peer connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SignalingState {
    /// No offer/answer exchange in progress
    Stable,
    /// A local offer has been applied
    HaveLocalOffer,
    /// A local provisional answer has been applied
    #[serde(rename = "have-local-pranswer")]
    HaveLocalProvisionalAnswer,
    /// A remote offer has been applied
    HaveRemoteOffer,
    /// A remote provisional answer has been applied
    #[serde(rename = "have-remote-pranswer")]
    HaveRemoteProvisionalAnswer,
    /// The connection is closed
    Closed,
}

impl SignalingState {
    /// Name as used by the W3C API
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalingState::Stable => "stable",
            SignalingState::HaveLocalOffer => "have-local-offer",
            SignalingState::HaveLocalProvisionalAnswer => "have-local-pranswer",
            SignalingState::HaveRemoteOffer => "have-remote-offer",
            SignalingState::HaveRemoteProvisionalAnswer => "have-remote-pranswer",
            SignalingState::Closed => "closed",
        }
    }
}

impl fmt::Display for SignalingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// ICE candidate gathering state
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IceGatheringState {
    /// Gathering has not started
    New,
    /// Candidates are being gathered
    Gathering,
    /// No further candidates this negotiation round
    Complete,
}

impl fmt::Display for IceGatheringState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            IceGatheringState::New => "new",
            IceGatheringState::Gathering => "gathering",
            IceGatheringState::Complete => "complete",
        })
    }
}

/// ICE connection state, as reported by the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IceConnectionState {
    New,
    Checking,
    Connected,
    Completed,
    Failed,
    Disconnected,
    Closed,
}

/// Data channel ready state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataChannelState {
    /// Channel is being established
    Connecting,
    /// Channel can carry messages
    Open,
    /// Channel shutdown has started
    Closing,
    /// Channel is closed
    Closed,
}

impl DataChannelState {
    /// Name as used by the W3C API
    pub fn as_str(&self) -> &'static str {
        match self {
            DataChannelState::Connecting => "connecting",
            DataChannelState::Open => "open",
            DataChannelState::Closing => "closing",
            DataChannelState::Closed => "closed",
        }
    }
}

impl fmt::Display for DataChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Session description type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpType {
    /// An offer
    Offer,
    /// A provisional answer
    #[serde(rename = "pranswer")]
    ProvisionalAnswer,
    /// A final answer
    Answer,
    /// Discards the pending local or remote offer
    Rollback,
}

impl SdpType {
    /// Name as used in SDP signaling
    pub fn as_str(&self) -> &'static str {
        match self {
            SdpType::Offer => "offer",
            SdpType::ProvisionalAnswer => "pranswer",
            SdpType::Answer => "answer",
            SdpType::Rollback => "rollback",
        }
    }
}

impl fmt::Display for SdpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A session description: type plus SDP text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    /// Description type
    #[serde(rename = "type")]
    pub sdp_type: SdpType,
    /// SDP body
    pub sdp: String,
}

impl SessionDescription {
    /// Create a description
    pub fn new(sdp_type: SdpType, sdp: impl Into<String>) -> Self {
        Self {
            sdp_type,
            sdp: sdp.into(),
        }
    }

    /// Create an offer
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self::new(SdpType::Offer, sdp)
    }

    /// Create an answer
    pub fn answer(sdp: impl Into<String>) -> Self {
        Self::new(SdpType::Answer, sdp)
    }

    /// Create a rollback marker
    pub fn rollback() -> Self {
        Self::new(SdpType::Rollback, String::new())
    }
}

/// An ICE candidate
///
/// Serialized with the field names browsers use for `RTCIceCandidateInit`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IceCandidate {
    /// The `candidate:...` attribute line
    #[serde(rename = "candidate")]
    pub sdp_fragment: String,

    /// Index of the media section this candidate belongs to
    #[serde(rename = "sdpMLineIndex", default)]
    pub sdp_mline_index: u16,

    /// Media stream identification tag
    #[serde(rename = "sdpMid", default, skip_serializing_if = "Option::is_none")]
    pub sdp_mid: Option<String>,
}

impl IceCandidate {
    /// Create a candidate without a media id
    pub fn new(sdp_fragment: impl Into<String>, sdp_mline_index: u16) -> Self {
        Self {
            sdp_fragment: sdp_fragment.into(),
            sdp_mline_index,
            sdp_mid: None,
        }
    }

    /// Attach a media id
    pub fn with_mid(mut self, sdp_mid: impl Into<String>) -> Self {
        self.sdp_mid = Some(sdp_mid.into());
        self
    }
}
