//! Configuration types for the signaling bridge

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Default public STUN server
pub const DEFAULT_STUN_SERVER: &str = "stun:stun.l.google.com:19302";

/// Default label of the control data channel
pub const DEFAULT_DATA_CHANNEL_LABEL: &str = "WebControl";

/// Data channel labels are limited to 65535 bytes by the DCEP wire format
const MAX_LABEL_LEN: usize = u16::MAX as usize;

/// Immutable session configuration, fixed at `SignalingBridge::initialize`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// STUN server URLs
    pub ice_servers: Vec<String>,

    /// TURN server configurations (optional)
    pub turn_servers: Vec<TurnServerConfig>,

    /// Label of the single control data channel
    pub data_channel_label: String,

    /// Data channel delivery mode (default: Reliable)
    pub data_channel_mode: DataChannelMode,

    /// Offer/answer constraints
    pub constraints: MediaConstraints,

    /// What to do when a remote offer collides with a pending local offer
    pub glare_policy: GlarePolicy,

    /// Relay `removeCandidates` to the display surface (default: false)
    pub relay_removed_candidates: bool,
}

/// TURN server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnServerConfig {
    /// TURN server URL (turn: or turns:)
    pub url: String,

    /// Username for TURN authentication
    pub username: String,

    /// Credential for TURN authentication
    pub credential: String,
}

/// Mandatory and optional constraint sets passed to offer/answer creation.
///
/// Keys follow the classic `RTCMediaConstraints` names. Only the keys the
/// transport understands are honored; the rest are carried but ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConstraints {
    /// Constraints that must be honored
    pub mandatory: BTreeMap<String, String>,

    /// Constraints honored when possible
    pub optional: BTreeMap<String, String>,
}

impl MediaConstraints {
    /// Constraint key requesting an ICE restart on the next offer
    pub const ICE_RESTART: &'static str = "IceRestart";

    /// Constraint key toggling voice activity detection
    pub const VOICE_ACTIVITY_DETECTION: &'static str = "VoiceActivityDetection";

    /// Look up a constraint, mandatory set first
    pub fn get(&self, key: &str) -> Option<&str> {
        self.mandatory
            .get(key)
            .or_else(|| self.optional.get(key))
            .map(String::as_str)
    }

    /// Interpret a constraint as a boolean flag
    pub fn flag(&self, key: &str) -> Option<bool> {
        self.get(key).map(|v| v.eq_ignore_ascii_case("true"))
    }

    /// True if both sets are empty
    pub fn is_empty(&self) -> bool {
        self.mandatory.is_empty() && self.optional.is_empty()
    }
}

/// Data channel mode
///
/// Determines the reliability of message delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataChannelMode {
    /// Reliable, ordered delivery (default)
    Reliable,
    /// Unreliable, unordered delivery (low latency)
    Unreliable,
}

impl DataChannelMode {
    /// Get the ordered setting for webrtc-rs
    pub fn ordered(&self) -> bool {
        match self {
            DataChannelMode::Reliable => true,
            DataChannelMode::Unreliable => false,
        }
    }

    /// Get the max retransmits setting for webrtc-rs
    pub fn max_retransmits(&self) -> Option<u16> {
        match self {
            DataChannelMode::Reliable => None,
            DataChannelMode::Unreliable => Some(0),
        }
    }
}

/// Glare resolution policy.
///
/// Glare is a remote offer arriving while a local offer is pending.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GlarePolicy {
    /// This side is the designated offerer: the remote offer is rejected
    #[default]
    RejectRemote,
    /// Roll back the local offer and answer the remote one
    RollbackLocal,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            ice_servers: vec![DEFAULT_STUN_SERVER.to_string()],
            turn_servers: Vec::new(),
            data_channel_label: DEFAULT_DATA_CHANNEL_LABEL.to_string(),
            data_channel_mode: DataChannelMode::Reliable,
            constraints: MediaConstraints::default(),
            glare_policy: GlarePolicy::default(),
            relay_removed_candidates: false,
        }
    }
}

impl BridgeConfig {
    /// Configuration using the given STUN servers and defaults elsewhere
    pub fn with_ice_servers<I, S>(servers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ice_servers: servers.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Parse a configuration from TOML
    pub fn from_toml_str(s: &str) -> crate::Result<Self> {
        let config: Self = toml::from_str(s)
            .map_err(|e| crate::Error::InvalidConfig(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file
    pub fn from_file(path: impl AsRef<Path>) -> crate::Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&contents)
    }

    /// Validate configuration parameters
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - an ICE server URL is not a `stun:`/`stuns:` URL
    /// - a TURN server URL is not a `turn:`/`turns:` URL
    /// - `data_channel_label` is empty or longer than 65535 bytes
    pub fn validate(&self) -> crate::Result<()> {
        use crate::Error;

        for url in &self.ice_servers {
            if !url.starts_with("stun:") && !url.starts_with("stuns:") {
                return Err(Error::InvalidConfig(format!(
                    "ice server must start with stun: or stuns:, got {}",
                    url
                )));
            }
        }

        for turn in &self.turn_servers {
            if !turn.url.starts_with("turn:") && !turn.url.starts_with("turns:") {
                return Err(Error::InvalidConfig(format!(
                    "turn server must start with turn: or turns:, got {}",
                    turn.url
                )));
            }
        }

        if self.data_channel_label.is_empty() {
            return Err(Error::InvalidConfig(
                "data_channel_label must not be empty".to_string(),
            ));
        }

        if self.data_channel_label.len() > MAX_LABEL_LEN {
            return Err(Error::InvalidConfig(format!(
                "data_channel_label exceeds {} bytes",
                MAX_LABEL_LEN
            )));
        }

        Ok(())
    }
}
