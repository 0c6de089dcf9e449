//! Local and remote ICE candidate bookkeeping
//!
//! Local candidates are turned into surface calls in generation order.
//! Remote candidates that arrive before a remote description are held
//! here and flushed, in arrival order, once one has been applied.

use crate::peer::{IceCandidate, IceGatheringState};
use crate::surface::SurfaceCommand;
use std::collections::VecDeque;
use tracing::{debug, info, warn};

/// ICE candidate relay state for one session
#[derive(Debug)]
pub struct IceRelay {
    relay_removed: bool,
    gathering_state: IceGatheringState,
    round_pending: bool,
    generated: u64,
    pending_remote: VecDeque<IceCandidate>,
}

impl IceRelay {
    /// Create a relay; `relay_removed` forwards removal notices to the surface
    pub fn new(relay_removed: bool) -> Self {
        Self {
            relay_removed,
            gathering_state: IceGatheringState::New,
            round_pending: false,
            generated: 0,
            pending_remote: VecDeque::new(),
        }
    }

    /// Current gathering state
    pub fn gathering_state(&self) -> IceGatheringState {
        self.gathering_state
    }

    /// Local candidates seen so far
    pub fn generated(&self) -> u64 {
        self.generated
    }

    /// A new local offer may start a new gathering round
    ///
    /// The state stays Complete until the transport actually reports the
    /// new round or produces a candidate; a renegotiation without an ICE
    /// restart gathers nothing.
    pub fn begin_round(&mut self) {
        if self.gathering_state == IceGatheringState::Complete {
            debug!("ICE gathering may restart for the new offer");
            self.round_pending = true;
        }
    }

    /// Record a gathering state notification. Returns true if it changed.
    ///
    /// Within a round the state only moves forward; a backwards report is
    /// logged and ignored unless it opens a round announced by
    /// [`begin_round`](Self::begin_round).
    pub fn on_gathering_state(&mut self, state: IceGatheringState) -> bool {
        if state == self.gathering_state {
            return false;
        }
        if state < self.gathering_state && self.round_pending {
            info!("ICE gathering restarted: {} -> {}", self.gathering_state, state);
            self.round_pending = false;
            self.gathering_state = state;
            return true;
        }
        if state < self.gathering_state {
            warn!(
                "Ignoring ICE gathering regression {} -> {}",
                self.gathering_state, state
            );
            return false;
        }

        info!("ICE gathering state: {} -> {}", self.gathering_state, state);
        self.gathering_state = state;
        true
    }

    /// Surface call for a freshly gathered local candidate
    pub fn on_local_candidate(&mut self, candidate: &IceCandidate) -> SurfaceCommand {
        self.generated += 1;
        let restarted = self.round_pending && self.gathering_state == IceGatheringState::Complete;
        if self.gathering_state == IceGatheringState::New || restarted {
            self.round_pending = false;
            self.gathering_state = IceGatheringState::Gathering;
        }
        debug!(
            "Local ICE candidate #{} (mline {}): {}",
            self.generated, candidate.sdp_mline_index, candidate.sdp_fragment
        );
        SurfaceCommand::receive_candidate(candidate)
    }

    /// Surface call for removed local candidates, if relaying is enabled
    pub fn on_candidates_removed(&self, candidates: Vec<IceCandidate>) -> Option<SurfaceCommand> {
        if candidates.is_empty() {
            return None;
        }
        if !self.relay_removed {
            debug!("{} local candidates removed, not relayed", candidates.len());
            return None;
        }
        Some(SurfaceCommand::RemoveCandidates(candidates))
    }

    /// Hold a remote candidate until a remote description exists
    pub fn queue_remote(&mut self, candidate: IceCandidate) {
        debug!(
            "Queueing remote candidate until remote description is set ({} pending)",
            self.pending_remote.len() + 1
        );
        self.pending_remote.push_back(candidate);
    }

    /// Take all held remote candidates in arrival order
    pub fn drain_pending(&mut self) -> Vec<IceCandidate> {
        self.pending_remote.drain(..).collect()
    }

    /// Number of held remote candidates
    pub fn pending_len(&self) -> usize {
        self.pending_remote.len()
    }
}
