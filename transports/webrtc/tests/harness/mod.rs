//! Signaling bridge test harness
//!
//! Provides infrastructure for integration testing of the bridge with:
//! - A scriptable mock transport that records every call
//! - A recording display surface
//! - A WebSocket test client for the signaling server
//!
//! Basic usage pattern:
//!
//! 1. Create a `MockConnector`, optionally with failures in `MockBehavior`
//! 2. Start a bridge with `SignalingBridge::initialize_with`
//! 3. Drive transport callbacks through `MockTransport::emit`
//! 4. Assert on recorded transport calls and surface commands

#![allow(dead_code)]

pub mod mock_transport;
pub mod recording_surface;
pub mod test_client;

use std::future::Future;
use std::time::Duration;

pub use mock_transport::{Call, MockBehavior, MockConnector, MockTransport};
pub use recording_surface::RecordingSurface;
pub use test_client::TestClient;

/// Default wait for asynchronous effects
pub const TIMEOUT: Duration = Duration::from_secs(5);

/// Result type for test harness operations
pub type HarnessResult<T> = Result<T, HarnessError>;

/// Error type for test harness operations
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Protocol error: {0}")]
    ProtocolError(String),
}

/// Initialize test logging (safe to call from every test)
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("info,webcontrol_webrtc=debug")
        .with_test_writer()
        .try_init();
}

/// Poll `condition` until it holds or [`TIMEOUT`] elapses
pub async fn eventually<F>(what: &str, mut condition: F)
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + TIMEOUT;
    while !condition() {
        if tokio::time::Instant::now() >= deadline {
            panic!("Timed out waiting for {}", what);
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Await `fut`, failing the test after [`TIMEOUT`]
pub async fn within<T>(what: &str, fut: impl Future<Output = T>) -> T {
    match tokio::time::timeout(TIMEOUT, fut).await {
        Ok(value) => value,
        Err(_) => panic!("Timed out waiting for {}", what),
    }
}
