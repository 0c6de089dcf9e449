//! WebSocket test client standing in for a display surface

use super::{HarnessError, HarnessResult, TIMEOUT};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::net::SocketAddr;
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::debug;

type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// JSON-RPC client over a WebSocket
pub struct TestClient {
    tx: SplitSink<Ws, Message>,
    rx: SplitStream<Ws>,
}

impl TestClient {
    /// Connect to a signaling server
    pub async fn connect(addr: SocketAddr) -> HarnessResult<Self> {
        let (ws, _) = connect_async(format!("ws://{}", addr))
            .await
            .map_err(|e| HarnessError::ConnectionError(e.to_string()))?;
        let (tx, rx) = ws.split();
        Ok(Self { tx, rx })
    }

    /// Send a request with an id
    pub async fn request(&mut self, method: &str, params: Value, id: u64) -> HarnessResult<()> {
        self.send(json!({"jsonrpc": "2.0", "method": method, "params": params, "id": id}))
            .await
    }

    /// Send a notification
    pub async fn notify(&mut self, method: &str, params: Value) -> HarnessResult<()> {
        self.send(json!({"jsonrpc": "2.0", "method": method, "params": params}))
            .await
    }

    /// Send raw text
    pub async fn send_text(&mut self, text: &str) -> HarnessResult<()> {
        self.tx
            .send(Message::Text(text.to_string()))
            .await
            .map_err(|e| HarnessError::ConnectionError(e.to_string()))
    }

    async fn send(&mut self, value: Value) -> HarnessResult<()> {
        self.send_text(&value.to_string()).await
    }

    /// Next JSON text frame
    pub async fn next_json(&mut self) -> HarnessResult<Value> {
        loop {
            let frame = tokio::time::timeout(TIMEOUT, self.rx.next())
                .await
                .map_err(|_| HarnessError::Timeout("next frame".to_string()))?;
            match frame {
                Some(Ok(Message::Text(text))) => {
                    debug!("Test client received: {}", text);
                    return serde_json::from_str(&text)
                        .map_err(|e| HarnessError::ProtocolError(e.to_string()));
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(HarnessError::ConnectionError(e.to_string())),
                None => return Err(HarnessError::ConnectionError("closed".to_string())),
            }
        }
    }

    /// Read frames until one matches `pred`, returning it
    pub async fn wait_for(&mut self, pred: impl Fn(&Value) -> bool) -> HarnessResult<Value> {
        loop {
            let value = self.next_json().await?;
            if pred(&value) {
                return Ok(value);
            }
        }
    }

    /// Read frames until the response (or error) for `id` arrives
    pub async fn response(&mut self, id: u64) -> HarnessResult<Value> {
        self.wait_for(|v| v.get("id") == Some(&json!(id))).await
    }
}

/// True if `value` is a notification calling `method`
pub fn is_call(value: &Value, method: &str) -> bool {
    value.get("id").is_none() && value.get("method") == Some(&json!(method))
}
