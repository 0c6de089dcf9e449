//! Display surface reached over a WebSocket
//!
//! Each invocation becomes a JSON-RPC notification text frame. Frames are
//! handed to the connection's writer task; this surface never touches the
//! socket directly.

use crate::error::DispatchError;
use crate::signaling::protocol::JsonRpcRequest;
use crate::surface::{DisplaySurface, SurfaceCommand};
use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

/// Display surface backed by a WebSocket connection's outbound queue
#[derive(Debug, Clone)]
pub struct WebSocketSurface {
    outbound: mpsc::UnboundedSender<Message>,
}

impl WebSocketSurface {
    /// Wrap the writer queue of a connection
    pub fn new(outbound: mpsc::UnboundedSender<Message>) -> Self {
        Self { outbound }
    }

    /// Push an arbitrary notification, bypassing the dispatcher
    pub fn notify(&self, notification: &JsonRpcRequest) -> Result<(), DispatchError> {
        let text = notification
            .to_json()
            .map_err(|e| DispatchError::new(notification.method.clone(), e.to_string()))?;
        self.outbound
            .send(Message::Text(text))
            .map_err(|_| DispatchError::new(notification.method.clone(), "WebSocket closed"))
    }
}

#[async_trait]
impl DisplaySurface for WebSocketSurface {
    async fn invoke(&self, command: &SurfaceCommand) -> Result<(), DispatchError> {
        self.notify(&command.to_json_rpc())
    }
}
