//! Data channel message type
//!
//! The bridge imposes no framing of its own: a message is exactly one
//! buffer as delivered by the transport, plus the text/binary flag.

use bytes::Bytes;
use serde::de::DeserializeOwned;

/// Largest buffer accepted by `send_data` (SCTP default max message size)
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024;

/// One buffer received on the control data channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelMessage {
    data: Bytes,
    is_text: bool,
}

impl ChannelMessage {
    /// Wrap a received buffer
    pub fn new(data: impl Into<Bytes>, is_text: bool) -> Self {
        Self {
            data: data.into(),
            is_text,
        }
    }

    /// Create a binary message
    pub fn binary(data: impl Into<Bytes>) -> Self {
        Self::new(data, false)
    }

    /// Create a text message
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(Bytes::from(text.into()), true)
    }

    /// Raw payload
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Consume the message, returning the payload
    pub fn into_data(self) -> Bytes {
        self.data
    }

    /// True if the sender marked this buffer as a string
    pub fn is_text(&self) -> bool {
        self.is_text
    }

    /// Get the size of this message in bytes
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Payload as UTF-8, if this is a text message with valid UTF-8
    pub fn as_text(&self) -> Option<&str> {
        if self.is_text {
            std::str::from_utf8(&self.data).ok()
        } else {
            None
        }
    }

    /// Parse the payload as JSON, whatever its text/binary flag
    pub fn decode_json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.data)
    }
}
