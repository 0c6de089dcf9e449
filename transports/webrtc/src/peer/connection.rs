//! webrtc-rs backed peer connection

use crate::channels::ChannelMessage;
use crate::config::{BridgeConfig, DataChannelMode, MediaConstraints};
use crate::error::TransportInitError;
use crate::peer::state::{
    DataChannelState, IceCandidate, IceConnectionState, IceGatheringState, SdpType,
    SessionDescription, SignalingState,
};
use crate::peer::transport::{EventSink, PeerTransport, TransportConnector, TransportEvent};
use anyhow::{anyhow, Context};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::APIBuilder;
use webrtc::data_channel::data_channel_init::RTCDataChannelInit;
use webrtc::data_channel::data_channel_message::DataChannelMessage;
use webrtc::data_channel::data_channel_state::RTCDataChannelState;
use webrtc::data_channel::RTCDataChannel;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_connection_state::RTCIceConnectionState;
use webrtc::ice_transport::ice_gatherer_state::RTCIceGathererState;
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::offer_answer_options::{RTCAnswerOptions, RTCOfferOptions};
use webrtc::peer_connection::sdp::sdp_type::RTCSdpType;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::signaling_state::RTCSignalingState;
use webrtc::peer_connection::RTCPeerConnection;

/// Connector producing webrtc-rs peer connections
#[derive(Debug, Clone, Copy, Default)]
pub struct RtcConnector;

#[async_trait]
impl TransportConnector for RtcConnector {
    async fn connect(
        &self,
        config: &BridgeConfig,
        events: EventSink,
    ) -> Result<Arc<dyn PeerTransport>, TransportInitError> {
        let transport = RtcPeerTransport::new(config, events).await?;
        Ok(Arc::new(transport))
    }
}

/// Peer connection wrapper
///
/// Owns a webrtc-rs `RTCPeerConnection` and its single control data channel.
/// Every library callback is translated into a [`TransportEvent`].
pub struct RtcPeerTransport {
    /// Unique identifier for this connection instance
    connection_id: String,

    /// Actual WebRTC peer connection
    peer_connection: Arc<RTCPeerConnection>,

    /// Control data channel, once created
    data_channel: RwLock<Option<Arc<RTCDataChannel>>>,

    events: EventSink,
}

impl RtcPeerTransport {
    /// Create a new peer connection
    #[instrument(skip_all)]
    pub async fn new(config: &BridgeConfig, events: EventSink) -> Result<Self, TransportInitError> {
        let connection_id = uuid::Uuid::new_v4().to_string();

        info!("Creating peer connection: connection_id={}", connection_id);

        let mut media_engine = MediaEngine::default();
        media_engine
            .register_default_codecs()
            .map_err(|e| TransportInitError::Setup(format!("Failed to register codecs: {}", e)))?;

        let interceptor_registry =
            register_default_interceptors(Registry::new(), &mut media_engine).map_err(|e| {
                TransportInitError::Setup(format!("Failed to register interceptors: {}", e))
            })?;

        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(interceptor_registry)
            .build();

        let rtc_config = RTCConfiguration {
            ice_servers: ice_servers(config),
            ..Default::default()
        };

        let peer_connection = Arc::new(
            api.new_peer_connection(rtc_config)
                .await
                .map_err(|e| TransportInitError::PeerConnection(e.to_string()))?,
        );

        register_peer_handlers(&peer_connection, &events);

        Ok(Self {
            connection_id,
            peer_connection,
            data_channel: RwLock::new(None),
            events,
        })
    }

    /// Get the connection ID
    pub fn connection_id(&self) -> &str {
        &self.connection_id
    }

    /// Get the underlying WebRTC peer connection
    pub fn peer_connection(&self) -> &Arc<RTCPeerConnection> {
        &self.peer_connection
    }
}

#[async_trait]
impl PeerTransport for RtcPeerTransport {
    async fn create_data_channel(&self, label: &str, mode: DataChannelMode) -> anyhow::Result<()> {
        if self.data_channel.read().await.is_some() {
            return Err(anyhow!("Data channel already exists for this connection"));
        }

        let init = RTCDataChannelInit {
            ordered: Some(mode.ordered()),
            max_retransmits: mode.max_retransmits(),
            ..Default::default()
        };

        let channel = self
            .peer_connection
            .create_data_channel(label, Some(init))
            .await
            .context("Failed to create data channel")?;

        register_channel_handlers(&channel, &self.events);
        self.events.emit(TransportEvent::DataChannelStateChanged(
            DataChannelState::Connecting,
        ));

        debug!("Data channel '{}' created ({:?})", label, mode);
        *self.data_channel.write().await = Some(channel);
        Ok(())
    }

    async fn create_offer(
        &self,
        constraints: &MediaConstraints,
    ) -> anyhow::Result<SessionDescription> {
        let options = RTCOfferOptions {
            ice_restart: constraints
                .flag(MediaConstraints::ICE_RESTART)
                .unwrap_or(false),
            voice_activity_detection: constraints
                .flag(MediaConstraints::VOICE_ACTIVITY_DETECTION)
                .unwrap_or(false),
        };

        let offer = self.peer_connection.create_offer(Some(options)).await?;
        from_rtc_description(offer)
    }

    async fn create_answer(
        &self,
        constraints: &MediaConstraints,
    ) -> anyhow::Result<SessionDescription> {
        let options = RTCAnswerOptions {
            voice_activity_detection: constraints
                .flag(MediaConstraints::VOICE_ACTIVITY_DETECTION)
                .unwrap_or(false),
        };

        let answer = self.peer_connection.create_answer(Some(options)).await?;
        from_rtc_description(answer)
    }

    async fn set_local_description(&self, description: SessionDescription) -> anyhow::Result<()> {
        let description = to_rtc_description(description)?;
        self.peer_connection
            .set_local_description(description)
            .await?;
        Ok(())
    }

    async fn set_remote_description(
        &self,
        description: SessionDescription,
    ) -> anyhow::Result<()> {
        let description = to_rtc_description(description)?;
        self.peer_connection
            .set_remote_description(description)
            .await?;
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> anyhow::Result<()> {
        let init = RTCIceCandidateInit {
            candidate: candidate.sdp_fragment,
            sdp_mid: candidate.sdp_mid,
            sdp_mline_index: Some(candidate.sdp_mline_index),
            ..Default::default()
        };

        self.peer_connection.add_ice_candidate(init).await?;
        Ok(())
    }

    async fn send(&self, data: Bytes) -> anyhow::Result<()> {
        let guard = self.data_channel.read().await;
        let channel = guard
            .as_ref()
            .ok_or_else(|| anyhow!("No data channel configured for this connection"))?;

        if channel.ready_state() != RTCDataChannelState::Open {
            return Err(anyhow!(
                "Data channel is not open (state: {})",
                channel.ready_state()
            ));
        }

        channel.send(&data).await?;
        Ok(())
    }

    async fn close(&self) -> anyhow::Result<()> {
        info!("Closing peer connection {}", self.connection_id);

        if let Some(channel) = self.data_channel.write().await.take() {
            self.events.emit(TransportEvent::DataChannelStateChanged(
                DataChannelState::Closing,
            ));
            channel.close().await.context("Failed to close data channel")?;
        }

        self.peer_connection
            .close()
            .await
            .context("Failed to close connection")?;
        Ok(())
    }
}

fn ice_servers(config: &BridgeConfig) -> Vec<RTCIceServer> {
    config
        .ice_servers
        .iter()
        .map(|url| RTCIceServer {
            urls: vec![url.clone()],
            ..Default::default()
        })
        .chain(config.turn_servers.iter().map(|turn| RTCIceServer {
            urls: vec![turn.url.clone()],
            username: turn.username.clone(),
            credential: turn.credential.clone(),
            ..Default::default()
        }))
        .collect()
}

fn register_peer_handlers(peer_connection: &RTCPeerConnection, events: &EventSink) {
    let sink = events.clone();
    peer_connection.on_negotiation_needed(Box::new(move || {
        sink.emit(TransportEvent::NegotiationNeeded);
        Box::pin(async {})
    }));

    let sink = events.clone();
    peer_connection.on_signaling_state_change(Box::new(move |s: RTCSignalingState| {
        if let Some(state) = map_signaling_state(s) {
            sink.emit(TransportEvent::SignalingStateChanged(state));
        }
        Box::pin(async {})
    }));

    let sink = events.clone();
    peer_connection.on_ice_gathering_state_change(Box::new(move |s: RTCIceGathererState| {
        if let Some(state) = map_gathering_state(s) {
            sink.emit(TransportEvent::IceGatheringStateChanged(state));
        }
        Box::pin(async {})
    }));

    let sink = events.clone();
    peer_connection.on_ice_connection_state_change(Box::new(move |s: RTCIceConnectionState| {
        if let Some(state) = map_connection_state(s) {
            sink.emit(TransportEvent::IceConnectionStateChanged(state));
        }
        Box::pin(async {})
    }));

    let sink = events.clone();
    peer_connection.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
        // None marks the end of gathering, reported separately
        if let Some(candidate) = c {
            match candidate.to_json() {
                Ok(init) => {
                    sink.emit(TransportEvent::CandidateGenerated(IceCandidate {
                        sdp_fragment: init.candidate,
                        sdp_mline_index: init.sdp_mline_index.unwrap_or(0),
                        sdp_mid: init.sdp_mid,
                    }));
                }
                Err(e) => debug!("Skipping unserializable local candidate: {}", e),
            }
        }
        Box::pin(async {})
    }));
}

fn register_channel_handlers(channel: &RTCDataChannel, events: &EventSink) {
    let sink = events.clone();
    channel.on_open(Box::new(move || {
        sink.emit(TransportEvent::DataChannelStateChanged(DataChannelState::Open));
        Box::pin(async {})
    }));

    let sink = events.clone();
    channel.on_close(Box::new(move || {
        sink.emit(TransportEvent::DataChannelStateChanged(
            DataChannelState::Closed,
        ));
        Box::pin(async {})
    }));

    let sink = events.clone();
    channel.on_message(Box::new(move |msg: DataChannelMessage| {
        sink.emit(TransportEvent::DataChannelMessage(ChannelMessage::new(
            msg.data,
            msg.is_string,
        )));
        Box::pin(async {})
    }));
}

fn map_signaling_state(s: RTCSignalingState) -> Option<SignalingState> {
    match s {
        RTCSignalingState::Stable => Some(SignalingState::Stable),
        RTCSignalingState::HaveLocalOffer => Some(SignalingState::HaveLocalOffer),
        RTCSignalingState::HaveRemoteOffer => Some(SignalingState::HaveRemoteOffer),
        RTCSignalingState::HaveLocalPranswer => Some(SignalingState::HaveLocalProvisionalAnswer),
        RTCSignalingState::HaveRemotePranswer => {
            Some(SignalingState::HaveRemoteProvisionalAnswer)
        }
        RTCSignalingState::Closed => Some(SignalingState::Closed),
        _ => None,
    }
}

fn map_gathering_state(s: RTCIceGathererState) -> Option<IceGatheringState> {
    match s {
        RTCIceGathererState::New => Some(IceGatheringState::New),
        RTCIceGathererState::Gathering => Some(IceGatheringState::Gathering),
        RTCIceGathererState::Complete => Some(IceGatheringState::Complete),
        _ => None,
    }
}

fn map_connection_state(s: RTCIceConnectionState) -> Option<IceConnectionState> {
    match s {
        RTCIceConnectionState::New => Some(IceConnectionState::New),
        RTCIceConnectionState::Checking => Some(IceConnectionState::Checking),
        RTCIceConnectionState::Connected => Some(IceConnectionState::Connected),
        RTCIceConnectionState::Completed => Some(IceConnectionState::Completed),
        RTCIceConnectionState::Failed => Some(IceConnectionState::Failed),
        RTCIceConnectionState::Disconnected => Some(IceConnectionState::Disconnected),
        RTCIceConnectionState::Closed => Some(IceConnectionState::Closed),
        _ => None,
    }
}

fn to_rtc_description(description: SessionDescription) -> anyhow::Result<RTCSessionDescription> {
    let rtc = match description.sdp_type {
        SdpType::Offer => RTCSessionDescription::offer(description.sdp)?,
        SdpType::ProvisionalAnswer => RTCSessionDescription::pranswer(description.sdp)?,
        SdpType::Answer => RTCSessionDescription::answer(description.sdp)?,
        SdpType::Rollback => {
            let mut rollback = RTCSessionDescription::default();
            rollback.sdp_type = RTCSdpType::Rollback;
            rollback
        }
    };
    Ok(rtc)
}

fn from_rtc_description(description: RTCSessionDescription) -> anyhow::Result<SessionDescription> {
    let sdp_type = match description.sdp_type {
        RTCSdpType::Offer => SdpType::Offer,
        RTCSdpType::Pranswer => SdpType::ProvisionalAnswer,
        RTCSdpType::Answer => SdpType::Answer,
        RTCSdpType::Rollback => SdpType::Rollback,
        other => return Err(anyhow!("Unsupported description type: {}", other)),
    };
    Ok(SessionDescription::new(sdp_type, description.sdp))
}
