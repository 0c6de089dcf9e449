//! Offer/answer state machine
//!
//! Pure bookkeeping: the session task asks for a transition, performs the
//! transport call, and commits the transition only if the call succeeded.
//! Nothing else can move the signaling state.

use crate::config::GlarePolicy;
use crate::error::NegotiationError;
use crate::peer::{SdpType, SignalingState};
use tracing::{debug, info};

/// How a remote description is to be applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemotePlan {
    /// Apply it; on success the state becomes the given one
    Apply(SignalingState),
    /// Glare under `RollbackLocal`: roll back the local offer first, then
    /// apply the remote offer
    RollbackLocalThenApply(SignalingState),
}

impl RemotePlan {
    /// State after the remote description is applied
    pub fn next_state(&self) -> SignalingState {
        match self {
            RemotePlan::Apply(s) | RemotePlan::RollbackLocalThenApply(s) => *s,
        }
    }
}

/// Signaling state machine for one session
#[derive(Debug)]
pub struct Negotiator {
    state: SignalingState,
    glare_policy: GlarePolicy,
    current_remote: bool,
    pending_remote: bool,
    deferred_negotiation: bool,
}

impl Negotiator {
    /// Start in Stable
    pub fn new(glare_policy: GlarePolicy) -> Self {
        Self {
            state: SignalingState::Stable,
            glare_policy,
            current_remote: false,
            pending_remote: false,
            deferred_negotiation: false,
        }
    }

    /// Current signaling state
    pub fn state(&self) -> SignalingState {
        self.state
    }

    /// True while the transport holds a remote description, either from a
    /// completed exchange or one still being negotiated
    pub fn has_remote_description(&self) -> bool {
        self.current_remote || self.pending_remote
    }

    /// True if a local offer may be created now
    pub fn can_offer(&self) -> bool {
        matches!(
            self.state,
            SignalingState::Stable | SignalingState::HaveLocalOffer
        )
    }

    /// Remember a negotiation-needed that arrived mid-exchange
    pub fn defer_negotiation(&mut self) {
        if !self.deferred_negotiation {
            debug!("Deferring negotiation until signaling state is stable");
        }
        self.deferred_negotiation = true;
    }

    /// Take the deferred negotiation if it can run now
    pub fn take_deferred_negotiation(&mut self) -> bool {
        if self.deferred_negotiation && self.state == SignalingState::Stable {
            self.deferred_negotiation = false;
            return true;
        }
        false
    }

    /// Target state for applying a local description of `sdp_type`
    pub fn local_transition(&self, sdp_type: SdpType) -> Result<SignalingState, NegotiationError> {
        use SignalingState::*;

        let next = match (self.state, sdp_type) {
            (Closed, _) => return Err(NegotiationError::SessionClosed),
            (Stable | HaveLocalOffer, SdpType::Offer) => HaveLocalOffer,
            (HaveRemoteOffer | HaveLocalProvisionalAnswer, SdpType::Answer) => Stable,
            (HaveRemoteOffer | HaveLocalProvisionalAnswer, SdpType::ProvisionalAnswer) => {
                HaveLocalProvisionalAnswer
            }
            (HaveLocalOffer, SdpType::Rollback) => Stable,
            (state, sdp_type) => {
                return Err(NegotiationError::InvalidTransition {
                    state,
                    sdp_type,
                    direction: "local",
                })
            }
        };
        Ok(next)
    }

    /// Plan for applying a remote description of `sdp_type`
    pub fn remote_transition(&self, sdp_type: SdpType) -> Result<RemotePlan, NegotiationError> {
        use SignalingState::*;

        let next = match (self.state, sdp_type) {
            (Closed, _) => return Err(NegotiationError::SessionClosed),
            (HaveLocalOffer, SdpType::Offer) => {
                return match self.glare_policy {
                    GlarePolicy::RejectRemote => Err(NegotiationError::Glare),
                    GlarePolicy::RollbackLocal => {
                        Ok(RemotePlan::RollbackLocalThenApply(HaveRemoteOffer))
                    }
                }
            }
            (Stable | HaveRemoteOffer, SdpType::Offer) => HaveRemoteOffer,
            (HaveLocalOffer | HaveRemoteProvisionalAnswer, SdpType::Answer) => Stable,
            (HaveLocalOffer | HaveRemoteProvisionalAnswer, SdpType::ProvisionalAnswer) => {
                HaveRemoteProvisionalAnswer
            }
            (HaveRemoteOffer, SdpType::Rollback) => Stable,
            (state, sdp_type) => {
                return Err(NegotiationError::InvalidTransition {
                    state,
                    sdp_type,
                    direction: "remote",
                })
            }
        };
        Ok(RemotePlan::Apply(next))
    }

    /// Record a successful local description
    pub fn commit_local(&mut self, next: SignalingState) {
        // A local answer completes the exchange started by the remote offer
        if next == SignalingState::Stable && self.pending_remote {
            self.current_remote = true;
            self.pending_remote = false;
        }
        self.transition(next);
    }

    /// Record a successful remote description of `sdp_type`
    ///
    /// A remote rollback discards only the pending remote description; one
    /// from an earlier completed exchange stays in place.
    pub fn commit_remote(&mut self, sdp_type: SdpType, next: SignalingState) {
        match sdp_type {
            SdpType::Rollback => self.pending_remote = false,
            _ if next == SignalingState::Stable => {
                self.current_remote = true;
                self.pending_remote = false;
            }
            _ => self.pending_remote = true,
        }
        self.transition(next);
    }

    /// Enter Closed; every later transition is rejected
    pub fn close(&mut self) {
        self.transition(SignalingState::Closed);
        self.deferred_negotiation = false;
    }

    fn transition(&mut self, next: SignalingState) {
        if self.state != next {
            info!("Signaling state: {} -> {}", self.state, next);
            self.state = next;
        }
    }
}
