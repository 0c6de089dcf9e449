//! WebSocket signaling server
//!
//! Provides a WebSocket server for JSON-RPC 2.0 signaling protocol.

use super::handler::{handle_connection, SharedState};
use crate::config::BridgeConfig;
use crate::peer::{RtcConnector, TransportConnector};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// WebSocket signaling server
pub struct WebSocketSignalingServer {
    /// Server address
    addr: SocketAddr,

    /// Shared state
    state: Arc<SharedState>,
}

impl WebSocketSignalingServer {
    /// Create a server that drives webrtc-rs peer connections
    pub fn new(addr: SocketAddr, config: BridgeConfig) -> Self {
        Self::with_connector(addr, config, Arc::new(RtcConnector))
    }

    /// Create a server on a specific transport
    pub fn with_connector(
        addr: SocketAddr,
        config: BridgeConfig,
        connector: Arc<dyn TransportConnector>,
    ) -> Self {
        Self {
            addr,
            state: Arc::new(SharedState::new(config, connector)),
        }
    }

    /// Get shared state (for external access)
    pub fn state(&self) -> Arc<SharedState> {
        Arc::clone(&self.state)
    }

    /// Bind and start accepting connections
    ///
    /// Returns once the listener is bound; the accept loop runs until
    /// [`WebSocketServerHandle::shutdown`].
    pub async fn start(self) -> Result<WebSocketServerHandle, std::io::Error> {
        let listener = TcpListener::bind(&self.addr).await.map_err(|e| {
            error!("Failed to bind WebSocket server to {}: {}", self.addr, e);
            e
        })?;
        let local_addr = listener.local_addr()?;
        info!(
            "WebSocket signaling server bound and listening on ws://{}",
            local_addr
        );

        let (shutdown_tx, _) = broadcast::channel::<()>(1);
        let shutdown = shutdown_tx.clone();
        let state = self.state;

        let task = tokio::spawn(async move {
            let mut shutdown_rx = shutdown.subscribe();

            // Accept loop
            loop {
                tokio::select! {
                    result = listener.accept() => {
                        match result {
                            Ok((stream, peer_addr)) => {
                                info!("Accepted WebSocket connection from {}", peer_addr);
                                let state_clone = Arc::clone(&state);
                                let conn_shutdown = shutdown.subscribe();
                                tokio::spawn(async move {
                                    if let Err(e) =
                                        handle_connection(stream, state_clone, conn_shutdown).await
                                    {
                                        error!(
                                            "WebSocket connection error from {}: {}",
                                            peer_addr, e
                                        );
                                    }
                                });
                            }
                            Err(e) => {
                                error!("Failed to accept WebSocket connection: {}", e);
                            }
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        info!("WebSocket signaling server received shutdown signal");
                        break;
                    }
                }
            }

            info!("WebSocket signaling server accept loop exited");
        });

        Ok(WebSocketServerHandle {
            local_addr,
            task,
            shutdown_tx,
        })
    }

    /// Get the server address
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }
}

/// Handle for controlling the WebSocket server
pub struct WebSocketServerHandle {
    local_addr: SocketAddr,
    task: JoinHandle<()>,
    shutdown_tx: broadcast::Sender<()>,
}

impl WebSocketServerHandle {
    /// Address the listener is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Shut down the server and every open connection
    pub async fn shutdown(self) {
        info!("Sending shutdown signal to WebSocket server");
        let _ = self.shutdown_tx.send(());

        if let Err(e) = self.task.await {
            error!("WebSocket server task ended abnormally: {}", e);
        }
        info!("WebSocket server stopped");
    }
}
