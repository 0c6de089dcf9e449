//! JSON-RPC 2.0 signaling protocol types
//!
//! Inbound requests from the display surface map onto [`InboundSignal`];
//! outbound surface calls are sent as notifications (requests without id).

use crate::peer::{IceCandidate, SessionDescription};
use serde::{Deserialize, Serialize};

/// JSON-RPC 2.0 protocol version
pub const JSONRPC_VERSION: &str = "2.0";

/// JSON-RPC 2.0 request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcRequest {
    /// Protocol version (must be "2.0")
    pub jsonrpc: String,

    /// Method name to invoke
    pub method: String,

    /// Method parameters
    #[serde(default)]
    pub params: serde_json::Value,

    /// Request ID for matching with response (absent for notifications)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<serde_json::Value>,
}

/// JSON-RPC 2.0 response (success)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcResponse {
    /// Protocol version (must be "2.0")
    pub jsonrpc: String,

    /// Result data
    pub result: serde_json::Value,

    /// Request ID this response corresponds to
    pub id: serde_json::Value,
}

/// JSON-RPC 2.0 error response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcError {
    /// Protocol version (must be "2.0")
    pub jsonrpc: String,

    /// Error details
    pub error: ErrorObject,

    /// Request ID this error corresponds to
    pub id: serde_json::Value,
}

/// JSON-RPC 2.0 error object
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorObject {
    /// Error code
    pub code: i32,

    /// Human-readable error message
    pub message: String,

    /// Additional error data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl ErrorObject {
    /// Create an error object without data
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }
}

/// Standard JSON-RPC 2.0 error codes
pub mod error_codes {
    /// Invalid JSON was received
    pub const PARSE_ERROR: i32 = -32700;

    /// The JSON sent is not a valid Request object
    pub const INVALID_REQUEST: i32 = -32600;

    /// The method does not exist / is not available
    pub const METHOD_NOT_FOUND: i32 = -32601;

    /// Invalid method parameter(s)
    pub const INVALID_PARAMS: i32 = -32602;

    /// Internal JSON-RPC error
    pub const INTERNAL_ERROR: i32 = -32603;

    // Bridge-specific error codes

    /// No session has been started with `ready`
    pub const NO_SESSION: i32 = -32000;

    /// The transport library failed to initialize
    pub const TRANSPORT_INIT_FAILED: i32 = -32001;

    /// Invalid SDP offer
    pub const OFFER_INVALID: i32 = -32002;

    /// Invalid SDP answer
    pub const ANSWER_INVALID: i32 = -32003;

    /// Invalid ICE candidate
    pub const ICE_CANDIDATE_INVALID: i32 = -32004;

    /// Another session is already active
    pub const SESSION_ACTIVE: i32 = -32005;
}

/// Method names accepted from the display surface
pub mod methods {
    /// Session-ready trigger
    pub const READY: &str = "ready";
    /// Remote description
    pub const REMOTE_DESCRIPTION: &str = "remoteDescription";
    /// Remote ICE candidate
    pub const REMOTE_CANDIDATE: &str = "remoteCandidate";
    /// Session teardown
    pub const CLOSE: &str = "close";
    /// Error notification pushed to the surface
    pub const REPORT_ERROR: &str = "reportError";
}

/// Signaling input from the display surface
#[derive(Debug, Clone, PartialEq)]
pub enum InboundSignal {
    /// The surface finished loading; start a session
    Ready,
    /// Apply a remote offer or answer
    RemoteDescription(SessionDescription),
    /// Apply a remote ICE candidate
    RemoteCandidate(IceCandidate),
    /// Tear the session down
    Close,
}

impl InboundSignal {
    /// Interpret a JSON-RPC request
    pub fn from_request(request: &JsonRpcRequest) -> Result<Self, ErrorObject> {
        if request.jsonrpc != JSONRPC_VERSION {
            return Err(ErrorObject::new(
                error_codes::INVALID_REQUEST,
                format!("Unsupported jsonrpc version: {}", request.jsonrpc),
            ));
        }

        match request.method.as_str() {
            methods::READY => Ok(InboundSignal::Ready),
            methods::CLOSE => Ok(InboundSignal::Close),
            methods::REMOTE_DESCRIPTION => serde_json::from_value(request.params.clone())
                .map(InboundSignal::RemoteDescription)
                .map_err(|e| {
                    ErrorObject::new(
                        error_codes::INVALID_PARAMS,
                        format!("Invalid remote description: {}", e),
                    )
                }),
            methods::REMOTE_CANDIDATE => serde_json::from_value(request.params.clone())
                .map(InboundSignal::RemoteCandidate)
                .map_err(|e| {
                    ErrorObject::new(
                        error_codes::INVALID_PARAMS,
                        format!("Invalid remote candidate: {}", e),
                    )
                }),
            other => Err(ErrorObject::new(
                error_codes::METHOD_NOT_FOUND,
                format!("Unknown method: {}", other),
            )),
        }
    }
}

impl JsonRpcRequest {
    /// Create a new JSON-RPC request
    pub fn new(method: String, params: serde_json::Value, id: Option<serde_json::Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method,
            params,
            id,
        }
    }

    /// Create a notification (no response expected)
    pub fn notification(method: impl Into<String>, params: serde_json::Value) -> Self {
        Self::new(method.into(), params, None)
    }

    /// Convert to JSON string
    pub fn to_json(&self) -> crate::Result<String> {
        serde_json::to_string(self).map_err(|e| {
            crate::Error::SerializationError(format!("Failed to serialize JSON-RPC request: {}", e))
        })
    }

    /// Parse from JSON string
    pub fn from_json(json: &str) -> crate::Result<Self> {
        serde_json::from_str(json).map_err(|e| {
            crate::Error::SerializationError(format!(
                "Failed to deserialize JSON-RPC request: {}",
                e
            ))
        })
    }
}

impl JsonRpcResponse {
    /// Create a new JSON-RPC response
    pub fn new(result: serde_json::Value, id: serde_json::Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result,
            id,
        }
    }

    /// Convert to JSON string
    pub fn to_json(&self) -> crate::Result<String> {
        serde_json::to_string(self).map_err(|e| {
            crate::Error::SerializationError(format!(
                "Failed to serialize JSON-RPC response: {}",
                e
            ))
        })
    }
}

impl JsonRpcError {
    /// Create a new JSON-RPC error
    pub fn new(code: i32, message: String, id: serde_json::Value) -> Self {
        Self::from_object(ErrorObject::new(code, message), id)
    }

    /// Wrap an existing error object
    pub fn from_object(error: ErrorObject, id: serde_json::Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            error,
            id,
        }
    }

    /// Convert to JSON string
    pub fn to_json(&self) -> crate::Result<String> {
        serde_json::to_string(self).map_err(|e| {
            crate::Error::SerializationError(format!("Failed to serialize JSON-RPC error: {}", e))
        })
    }
}
