//! Error types for the signaling bridge

use crate::peer::{SdpType, SignalingState};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Result type alias using the bridge Error
pub type Result<T> = std::result::Result<T, Error>;

/// The transport library could not be brought up.
///
/// Fatal: no session exists when this is returned.
#[derive(Debug, thiserror::Error)]
pub enum TransportInitError {
    /// Codec or interceptor registration failed
    #[error("Failed to initialize WebRTC: {0}")]
    Setup(String),

    /// The peer connection could not be created
    #[error("Failed to create peer connection: {0}")]
    PeerConnection(String),

    /// The control data channel could not be created
    #[error("Failed to create data channel '{label}': {reason}")]
    DataChannel {
        /// Requested channel label
        label: String,
        /// Underlying failure
        reason: String,
    },
}

/// Offer/answer, description or candidate failure.
///
/// The session stays alive; negotiation stalls until retried externally.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NegotiationError {
    /// Transport failed to produce an offer
    #[error("Failed at offer: {0}")]
    OfferFailed(String),

    /// Transport failed to produce an answer
    #[error("Failed at answer: {0}")]
    AnswerFailed(String),

    /// Setting the local description failed
    #[error("Failed at local description: {0}")]
    LocalDescriptionFailed(String),

    /// Setting the remote description failed
    #[error("Failed at remote description: {0}")]
    RemoteDescriptionFailed(String),

    /// Adding a remote candidate failed
    #[error("Failed to add ICE candidate: {0}")]
    CandidateFailed(String),

    /// The description is not allowed in the current signaling state
    #[error("Cannot apply {direction} {sdp_type} in signaling state {state}")]
    InvalidTransition {
        /// Current state
        state: SignalingState,
        /// Offending description type
        sdp_type: SdpType,
        /// "local" or "remote"
        direction: &'static str,
    },

    /// Remote offer collided with a pending local offer
    #[error("Remote offer rejected: local offer already pending (glare)")]
    Glare,

    /// The session has been closed
    #[error("Session closed")]
    SessionClosed,
}

/// A Display Surface invocation failed.
///
/// Does not affect peer-connection state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Failed at display surface call '{function}': {reason}")]
pub struct DispatchError {
    /// Invoked function name
    pub function: String,
    /// Failure reported by the surface
    pub reason: String,
}

impl DispatchError {
    /// Create a dispatch error for `function`
    pub fn new(function: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            function: function.into(),
            reason: reason.into(),
        }
    }
}

/// Errors that can occur in bridge operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Transport could not be initialized
    #[error(transparent)]
    TransportInit(#[from] TransportInitError),

    /// Negotiation failure
    #[error(transparent)]
    Negotiation(#[from] NegotiationError),

    /// Display surface failure
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// Invalid configuration parameter
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Data channel error
    #[error("Data channel error: {0}")]
    DataChannelError(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Any other error
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::SerializationError(e.to_string())
    }
}

impl Error {
    /// Check if this error ends the session
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::TransportInit(_))
    }

    /// Check if this error is a configuration error
    pub fn is_config_error(&self) -> bool {
        matches!(self, Error::InvalidConfig(_))
    }

    /// Check if this error came out of offer/answer negotiation
    pub fn is_negotiation_error(&self) -> bool {
        matches!(self, Error::Negotiation(_))
    }
}

/// The single error-reporting boundary
///
/// Every asynchronous failure (callbacks, surface calls, queued candidates)
/// ends up here: logged, then forwarded to `BridgeStreams::errors`.
#[derive(Debug, Clone)]
pub struct ErrorReporter {
    tx: mpsc::UnboundedSender<Error>,
}

impl ErrorReporter {
    /// Report into `tx`
    pub fn new(tx: mpsc::UnboundedSender<Error>) -> Self {
        Self { tx }
    }

    /// Log and forward an error
    pub fn report(&self, err: impl Into<Error>) {
        let err = err.into();
        warn!("{}", err);
        if self.tx.send(err).is_err() {
            debug!("Error receiver dropped");
        }
    }
}
