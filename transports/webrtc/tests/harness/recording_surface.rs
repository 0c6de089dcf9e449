//! Display surface that records every invocation

use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;
use webcontrol_webrtc::{DispatchError, DisplaySurface, SurfaceCommand};

/// Records surface calls in delivery order
#[derive(Default)]
pub struct RecordingSurface {
    calls: Mutex<Vec<SurfaceCommand>>,
    fail_function: Option<&'static str>,
    delay: Option<Duration>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every call to `function`
    pub fn failing(function: &'static str) -> Self {
        Self {
            fail_function: Some(function),
            ..Default::default()
        }
    }

    /// Take `delay` to deliver each call
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Default::default()
        }
    }

    /// Calls delivered so far
    pub fn calls(&self) -> Vec<SurfaceCommand> {
        self.calls.lock().unwrap().clone()
    }

    /// Delivered calls to `function`
    pub fn calls_to(&self, function: &str) -> Vec<SurfaceCommand> {
        self.calls()
            .into_iter()
            .filter(|c| c.function_name() == function)
            .collect()
    }

    /// First argument of each delivered `receiveCandidate`
    pub fn candidate_fragments(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                SurfaceCommand::ReceiveCandidate { sdp_fragment, .. } => Some(sdp_fragment),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl DisplaySurface for RecordingSurface {
    async fn invoke(&self, command: &SurfaceCommand) -> Result<(), DispatchError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_function == Some(command.function_name()) {
            return Err(DispatchError::new(
                command.function_name(),
                "page not loaded",
            ));
        }
        self.calls.lock().unwrap().push(command.clone());
        Ok(())
    }
}
