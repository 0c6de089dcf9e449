//! Display surface collaborator
//!
//! The display surface renders the control page and accepts asynchronous
//! function invocations. Calls are typed [`SurfaceCommand`]s and are only
//! turned into text at the boundary, either as a script call for surfaces
//! that evaluate script or as a JSON-RPC notification.

pub mod dispatcher;
pub mod websocket;

use crate::error::DispatchError;
use crate::peer::{DataChannelState, IceCandidate, SessionDescription};
use crate::signaling::protocol::JsonRpcRequest;
use async_trait::async_trait;

pub use dispatcher::SurfaceDispatcher;
pub use websocket::WebSocketSurface;

/// Function names invoked on the display surface
pub mod functions {
    /// A local ICE candidate was gathered
    pub const RECEIVE_CANDIDATE: &str = "receiveCandidate";
    /// A local offer or answer was applied
    pub const RECEIVE_DESCRIPTION: &str = "receiveDescription";
    /// Local candidates were removed
    pub const REMOVE_CANDIDATES: &str = "removeCandidates";
    /// The control data channel changed state
    pub const CHANNEL_STATE_CHANGED: &str = "channelStateChanged";
}

/// Remote invocation on the display surface
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceCommand {
    /// `receiveCandidate(sdpFragment, sdpMLineIndex)`
    ReceiveCandidate {
        /// The `candidate:...` line
        sdp_fragment: String,
        /// Media section index
        sdp_mline_index: u16,
    },
    /// `receiveDescription(type, sdp)`
    ReceiveDescription(SessionDescription),
    /// `removeCandidates(sdpFragment...)`
    RemoveCandidates(Vec<IceCandidate>),
    /// `channelStateChanged(state)`
    ChannelStateChanged(DataChannelState),
}

impl SurfaceCommand {
    /// Build the relay command for a local candidate
    pub fn receive_candidate(candidate: &IceCandidate) -> Self {
        SurfaceCommand::ReceiveCandidate {
            sdp_fragment: candidate.sdp_fragment.clone(),
            sdp_mline_index: candidate.sdp_mline_index,
        }
    }

    /// Function name on the surface
    pub fn function_name(&self) -> &'static str {
        match self {
            SurfaceCommand::ReceiveCandidate { .. } => functions::RECEIVE_CANDIDATE,
            SurfaceCommand::ReceiveDescription(_) => functions::RECEIVE_DESCRIPTION,
            SurfaceCommand::RemoveCandidates(_) => functions::REMOVE_CANDIDATES,
            SurfaceCommand::ChannelStateChanged(_) => functions::CHANNEL_STATE_CHANGED,
        }
    }

    /// Ordered string arguments
    pub fn arguments(&self) -> Vec<String> {
        match self {
            SurfaceCommand::ReceiveCandidate {
                sdp_fragment,
                sdp_mline_index,
            } => vec![sdp_fragment.clone(), sdp_mline_index.to_string()],
            SurfaceCommand::ReceiveDescription(desc) => {
                vec![desc.sdp_type.to_string(), desc.sdp.clone()]
            }
            SurfaceCommand::RemoveCandidates(candidates) => candidates
                .iter()
                .map(|c| c.sdp_fragment.clone())
                .collect(),
            SurfaceCommand::ChannelStateChanged(state) => vec![state.to_string()],
        }
    }

    /// Render as a script call, e.g. `receiveCandidate("candidate:1 ...","0")`
    ///
    /// Arguments are emitted as JSON string literals, which are valid
    /// script string literals with every quote, backslash and control
    /// character escaped.
    pub fn to_script(&self) -> String {
        let args: Vec<String> = self
            .arguments()
            .iter()
            .map(|arg| serde_json::Value::String(arg.clone()).to_string())
            .collect();
        format!("{}({})", self.function_name(), args.join(","))
    }

    /// Render as a JSON-RPC notification with positional string params
    pub fn to_json_rpc(&self) -> JsonRpcRequest {
        JsonRpcRequest::notification(
            self.function_name(),
            serde_json::Value::from(self.arguments()),
        )
    }
}

/// Surface that accepts function invocations
///
/// `invoke` is only ever called from the dispatcher task, one call at a
/// time, in enqueue order.
#[async_trait]
pub trait DisplaySurface: Send + Sync {
    /// Deliver one invocation
    async fn invoke(&self, command: &SurfaceCommand) -> Result<(), DispatchError>;
}
