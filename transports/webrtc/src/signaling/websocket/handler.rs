//! WebSocket message handler for JSON-RPC 2.0 signaling
//!
//! Handles individual WebSocket connections and routes their requests into
//! a [`SignalingBridge`].

use crate::config::BridgeConfig;
use crate::peer::{SdpType, TransportConnector};
use crate::session::{BridgeStreams, SignalingBridge};
use crate::signaling::protocol::{
    error_codes, methods, ErrorObject, InboundSignal, JsonRpcError, JsonRpcRequest,
    JsonRpcResponse,
};
use crate::surface::{DisplaySurface, WebSocketSurface};
use futures::future::join_all;
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tokio_tungstenite::{
    accept_async,
    tungstenite::{Message, Result as WsResult},
};
use tracing::{debug, error, info, warn};

/// Shared state across all WebSocket connections
pub struct SharedState {
    /// Configuration for every session started by this server
    pub config: BridgeConfig,
    /// Transport used to create peer connections
    pub connector: Arc<dyn TransportConnector>,
    session_slot: Arc<Semaphore>,
}

impl SharedState {
    /// Create shared state allowing one active session
    pub fn new(config: BridgeConfig, connector: Arc<dyn TransportConnector>) -> Self {
        Self {
            config,
            connector,
            session_slot: Arc::new(Semaphore::new(1)),
        }
    }

    /// True while some connection owns a session
    pub fn session_active(&self) -> bool {
        self.session_slot.available_permits() == 0
    }
}

/// A session owned by one connection
struct ActiveSession {
    bridge: SignalingBridge,
    pumps: Vec<JoinHandle<()>>,
    _slot: OwnedSemaphorePermit,
}

/// Per-connection routing state
struct Connection {
    state: Arc<SharedState>,
    surface: Arc<WebSocketSurface>,
    tx: mpsc::UnboundedSender<Message>,
    session: Option<ActiveSession>,
}

/// Handle a WebSocket connection
pub async fn handle_connection(
    stream: TcpStream,
    state: Arc<SharedState>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> WsResult<()> {
    let addr = stream.peer_addr()?;
    info!("New WebSocket connection from: {}", addr);

    let ws_stream = accept_async(stream).await?;
    let (mut ws_tx, mut ws_rx) = ws_stream.split();

    // Channel for sending messages back to this connection
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

    // Task to forward messages from channel to WebSocket
    let forward_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Err(e) = ws_tx.send(msg).await {
                error!("Failed to send WebSocket message: {}", e);
                break;
            }
        }
    });

    let mut conn = Connection {
        state,
        surface: Arc::new(WebSocketSurface::new(tx.clone())),
        tx,
        session: None,
    };

    loop {
        let msg = tokio::select! {
            msg = ws_rx.next() => msg,
            _ = shutdown_rx.recv() => {
                info!("Server shutting down, closing connection from {}", addr);
                break;
            }
        };

        match msg {
            Some(Ok(Message::Text(text))) => conn.handle_message(&text).await,
            Some(Ok(Message::Ping(data))) => conn.send(Message::Pong(data)),
            Some(Ok(Message::Close(_))) | None => {
                info!("WebSocket connection closed by client: {}", addr);
                break;
            }
            Some(Err(e)) => {
                error!("WebSocket error: {}", e);
                break;
            }
            Some(Ok(_)) => {}
        }
    }

    // Cleanup on disconnect
    conn.end_session().await;
    forward_task.abort();

    Ok(())
}

impl Connection {
    /// Handle a JSON-RPC message
    async fn handle_message(&mut self, text: &str) {
        let request = match JsonRpcRequest::from_json(text) {
            Ok(req) => req,
            Err(e) => {
                let error = JsonRpcError::new(error_codes::PARSE_ERROR, e.to_string(), json!(null));
                self.send_json(error.to_json());
                return;
            }
        };

        let id = request.id.clone();
        let result = match InboundSignal::from_request(&request) {
            Ok(signal) => self.route(signal).await,
            Err(e) => Err(e),
        };
        self.reply(&request.method, id, result);
    }

    async fn route(&mut self, signal: InboundSignal) -> Result<Value, ErrorObject> {
        match signal {
            InboundSignal::Ready => self.start_session().await,
            InboundSignal::RemoteDescription(desc) => {
                let bridge = self.bridge()?;
                let code = match desc.sdp_type {
                    SdpType::Offer => error_codes::OFFER_INVALID,
                    _ => error_codes::ANSWER_INVALID,
                };
                bridge
                    .apply_remote_description(desc.sdp_type, desc.sdp)
                    .await
                    .map(|()| Value::Null)
                    .map_err(|e| ErrorObject::new(code, e.to_string()))
            }
            InboundSignal::RemoteCandidate(candidate) => {
                let bridge = self.bridge()?;
                bridge
                    .apply_remote_candidate(candidate)
                    .await
                    .map(|()| Value::Null)
                    .map_err(|e| {
                        ErrorObject::new(error_codes::ICE_CANDIDATE_INVALID, e.to_string())
                    })
            }
            InboundSignal::Close => {
                self.end_session().await;
                Ok(Value::Null)
            }
        }
    }

    fn bridge(&self) -> Result<SignalingBridge, ErrorObject> {
        self.session
            .as_ref()
            .map(|s| s.bridge.clone())
            .ok_or_else(|| ErrorObject::new(error_codes::NO_SESSION, "No active session"))
    }

    async fn start_session(&mut self) -> Result<Value, ErrorObject> {
        let slot = match (&self.session, Arc::clone(&self.state.session_slot).try_acquire_owned()) {
            (None, Ok(permit)) => permit,
            _ => {
                return Err(ErrorObject::new(
                    error_codes::SESSION_ACTIVE,
                    "A session is already active",
                ))
            }
        };

        let surface: Arc<dyn DisplaySurface> = self.surface.clone();
        let (bridge, streams) = SignalingBridge::initialize_with(
            self.state.connector.as_ref(),
            self.state.config.clone(),
            surface,
        )
        .await
        .map_err(|e| ErrorObject::new(error_codes::TRANSPORT_INIT_FAILED, e.to_string()))?;

        let session_id = bridge.session_id();
        self.session = Some(ActiveSession {
            pumps: spawn_pumps(streams, Arc::clone(&self.surface)),
            bridge,
            _slot: slot,
        });

        info!(%session_id, "Session started for display surface");
        Ok(json!({ "sessionId": session_id.to_string() }))
    }

    async fn end_session(&mut self) {
        let Some(active) = self.session.take() else {
            return;
        };

        active.bridge.close();
        active.bridge.closed().await;
        for result in join_all(active.pumps).await {
            if let Err(e) = result {
                debug!("Session pump ended abnormally: {}", e);
            }
        }
        info!(session_id = %active.bridge.session_id(), "Session ended");
    }

    fn reply(&self, method: &str, id: Option<Value>, result: Result<Value, ErrorObject>) {
        let Some(id) = id else {
            if let Err(e) = result {
                warn!("Notification '{}' failed: {}", method, e.message);
            }
            return;
        };

        match result {
            Ok(value) => self.send_json(JsonRpcResponse::new(value, id).to_json()),
            Err(e) => self.send_json(JsonRpcError::from_object(e, id).to_json()),
        }
    }

    fn send_json(&self, json: crate::Result<String>) {
        match json {
            Ok(text) => self.send(Message::Text(text)),
            Err(e) => error!("Failed to encode reply: {}", e),
        }
    }

    fn send(&self, msg: Message) {
        if self.tx.send(msg).is_err() {
            debug!("WebSocket writer gone, dropping frame");
        }
    }
}

/// Forward session errors to the surface and log channel traffic
fn spawn_pumps(streams: BridgeStreams, surface: Arc<WebSocketSurface>) -> Vec<JoinHandle<()>> {
    let BridgeStreams {
        mut messages,
        mut errors,
    } = streams;

    let error_pump = tokio::spawn(async move {
        while let Some(err) = errors.recv().await {
            let note = JsonRpcRequest::notification(
                methods::REPORT_ERROR,
                json!({ "message": err.to_string(), "fatal": err.is_fatal() }),
            );
            if let Err(e) = surface.notify(&note) {
                debug!("Could not report error to surface: {}", e);
            }
        }
    });

    let message_pump = tokio::spawn(async move {
        while let Some(msg) = messages.recv().await {
            match msg.as_text() {
                Some(text) => info!("Data channel text message: {}", text),
                None => info!("Data channel binary message ({} bytes)", msg.size()),
            }
        }
    });

    vec![error_pump, message_pump]
}
