//! Control data channel

pub mod manager;
pub mod messages;

pub use manager::DataChannelManager;
pub use messages::{ChannelMessage, MAX_MESSAGE_SIZE};
