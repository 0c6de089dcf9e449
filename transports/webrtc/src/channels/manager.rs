//! Control data channel state tracking and in-order delivery
//!
//! The manager records what the transport reports; it never infers a state
//! transition on its own. Received buffers are forwarded to the consumer
//! in receipt order, each exactly once. There is no flow control: a slow
//! consumer accumulates buffers in the unbounded delivery queue.

use crate::channels::{ChannelMessage, MAX_MESSAGE_SIZE};
use crate::peer::DataChannelState;
use crate::{Error, Result};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// State and delivery for the single control data channel
#[derive(Debug)]
pub struct DataChannelManager {
    label: String,
    state: DataChannelState,
    consumer: mpsc::UnboundedSender<ChannelMessage>,
    delivered: u64,
}

impl DataChannelManager {
    /// Track a freshly created channel
    pub fn new(label: impl Into<String>, consumer: mpsc::UnboundedSender<ChannelMessage>) -> Self {
        Self {
            label: label.into(),
            state: DataChannelState::Connecting,
            consumer,
            delivered: 0,
        }
    }

    /// Channel label
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Last state reported by the transport
    pub fn state(&self) -> DataChannelState {
        self.state
    }

    /// Number of buffers handed to the consumer
    pub fn delivered(&self) -> u64 {
        self.delivered
    }

    /// Record a state notification. Returns true if the state changed.
    pub fn on_state_change(&mut self, state: DataChannelState) -> bool {
        if self.state == state {
            return false;
        }

        info!(
            "Data channel '{}' state: {} -> {}",
            self.label, self.state, state
        );
        self.state = state;
        true
    }

    /// Deliver a received buffer to the consumer
    pub fn on_message(&mut self, message: ChannelMessage) {
        debug!(
            "Data channel '{}' received {} bytes",
            self.label,
            message.size()
        );

        if self.consumer.send(message).is_err() {
            warn!(
                "Data channel '{}' consumer dropped, discarding message",
                self.label
            );
            return;
        }
        self.delivered += 1;
    }

    /// Check an outbound buffer can be sent now
    pub fn check_send(&self, len: usize) -> Result<()> {
        if self.state != DataChannelState::Open {
            return Err(Error::DataChannelError(format!(
                "Data channel '{}' is not open (state: {})",
                self.label, self.state
            )));
        }

        if len > MAX_MESSAGE_SIZE {
            return Err(Error::DataChannelError(format!(
                "Message of {} bytes exceeds maximum of {} bytes",
                len, MAX_MESSAGE_SIZE
            )));
        }

        Ok(())
    }
}
