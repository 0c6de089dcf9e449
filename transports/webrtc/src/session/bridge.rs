//! Signaling bridge between a display surface and a peer transport

use crate::channels::{ChannelMessage, DataChannelManager};
use crate::config::BridgeConfig;
use crate::error::{
    DispatchError, Error, ErrorReporter, NegotiationError, Result, TransportInitError,
};
use crate::peer::{
    EventSink, IceCandidate, IceConnectionState, PeerTransport, RtcConnector, SdpType,
    SessionDescription, SignalingState, TransportConnector, TransportEvent,
};
use crate::session::{
    BridgeCommand, IceRelay, Negotiator, RemotePlan, SessionEvent, SessionId, SessionSnapshot,
};
use crate::surface::{DisplaySurface, SurfaceCommand, SurfaceDispatcher};
use bytes::Bytes;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, instrument, warn};

/// Receivers handed out by [`SignalingBridge::initialize`]
#[derive(Debug)]
pub struct BridgeStreams {
    /// Data channel buffers, in receipt order
    pub messages: mpsc::UnboundedReceiver<ChannelMessage>,
    /// Every asynchronous failure of the session
    pub errors: mpsc::UnboundedReceiver<Error>,
}

/// Handle to a running signaling session
///
/// Cheap to clone. The session is closed when [`close`](Self::close) is
/// called or the last handle is dropped.
#[derive(Debug, Clone)]
pub struct SignalingBridge {
    inner: Arc<BridgeInner>,
}

#[derive(Debug)]
struct BridgeInner {
    session_id: SessionId,
    commands: mpsc::UnboundedSender<SessionEvent>,
    closed: Arc<AtomicBool>,
    snapshot: watch::Receiver<SessionSnapshot>,
}

impl BridgeInner {
    fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        info!(session_id = %self.session_id, "Closing signaling session");
        if self
            .commands
            .send(SessionEvent::Command(BridgeCommand::Close))
            .is_err()
        {
            debug!("Session task already gone");
        }
    }
}

impl Drop for BridgeInner {
    fn drop(&mut self) {
        self.close();
    }
}

impl SignalingBridge {
    /// Start a session on the webrtc-rs transport
    pub async fn initialize(
        config: BridgeConfig,
        surface: Arc<dyn DisplaySurface>,
    ) -> Result<(Self, BridgeStreams)> {
        Self::initialize_with(&RtcConnector, config, surface).await
    }

    /// Start a session on any transport
    ///
    /// Brings up the peer connection and the control data channel before
    /// returning. A [`TransportInitError`] means nothing was started.
    #[instrument(skip_all, fields(label = %config.data_channel_label))]
    pub async fn initialize_with(
        connector: &dyn TransportConnector,
        config: BridgeConfig,
        surface: Arc<dyn DisplaySurface>,
    ) -> Result<(Self, BridgeStreams)> {
        config.validate()?;

        let session_id = SessionId::new();
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let transport = connector
            .connect(&config, EventSink::new(events_tx.clone()))
            .await?;

        if let Err(e) = transport
            .create_data_channel(&config.data_channel_label, config.data_channel_mode)
            .await
        {
            if let Err(close_err) = transport.close().await {
                warn!("Failed to release transport after init failure: {}", close_err);
            }
            return Err(TransportInitError::DataChannel {
                label: config.data_channel_label.clone(),
                reason: e.to_string(),
            }
            .into());
        }

        let (messages_tx, messages_rx) = mpsc::unbounded_channel();
        let (errors_tx, errors_rx) = mpsc::unbounded_channel();
        let errors = ErrorReporter::new(errors_tx);

        let closed = Arc::new(AtomicBool::new(false));
        let dispatcher = SurfaceDispatcher::spawn(surface, errors.clone(), Arc::clone(&closed));
        let (snapshot_tx, snapshot_rx) = watch::channel(SessionSnapshot::initial(session_id));

        let core = SessionCore {
            session_id,
            channel: DataChannelManager::new(config.data_channel_label.clone(), messages_tx),
            negotiator: Negotiator::new(config.glare_policy),
            ice: IceRelay::new(config.relay_removed_candidates),
            ice_connection_state: IceConnectionState::New,
            config,
            transport,
            dispatcher: Some(dispatcher),
            errors,
            snapshot: snapshot_tx,
        };
        tokio::spawn(core.run(events_rx));

        info!(%session_id, "Signaling session initialized");

        let bridge = Self {
            inner: Arc::new(BridgeInner {
                session_id,
                commands: events_tx,
                closed,
                snapshot: snapshot_rx,
            }),
        };
        Ok((
            bridge,
            BridgeStreams {
                messages: messages_rx,
                errors: errors_rx,
            },
        ))
    }

    /// Session id
    pub fn session_id(&self) -> SessionId {
        self.inner.session_id
    }

    /// Queue a call on the display surface; never blocks
    pub fn dispatch_outbound(
        &self,
        command: SurfaceCommand,
    ) -> std::result::Result<(), DispatchError> {
        let function = command.function_name();
        self.send_command(BridgeCommand::Dispatch(command))
            .map_err(|e| DispatchError::new(function, e.to_string()))
    }

    /// Apply a remote offer or answer
    ///
    /// A remote offer is answered, and the answer relayed to the surface,
    /// before this returns.
    pub async fn apply_remote_description(
        &self,
        sdp_type: SdpType,
        sdp: impl Into<String>,
    ) -> std::result::Result<(), NegotiationError> {
        let (reply, rx) = oneshot::channel();
        self.send_command(BridgeCommand::ApplyRemoteDescription {
            description: SessionDescription::new(sdp_type, sdp),
            reply,
        })?;
        rx.await.unwrap_or(Err(NegotiationError::SessionClosed))
    }

    /// Apply a remote ICE candidate, or hold it until a remote description
    /// has been applied
    pub async fn apply_remote_candidate(
        &self,
        candidate: IceCandidate,
    ) -> std::result::Result<(), NegotiationError> {
        let (reply, rx) = oneshot::channel();
        self.send_command(BridgeCommand::ApplyRemoteCandidate { candidate, reply })?;
        rx.await.unwrap_or(Err(NegotiationError::SessionClosed))
    }

    /// Send a binary buffer on the control data channel
    pub async fn send_data(&self, data: impl Into<Bytes>) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.send_command(BridgeCommand::SendData {
            data: data.into(),
            reply,
        })?;
        rx.await
            .unwrap_or_else(|_| Err(NegotiationError::SessionClosed.into()))
    }

    /// Close the session. Idempotent, returns immediately.
    pub fn close(&self) {
        self.inner.close();
    }

    /// True once [`close`](Self::close) has been called
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Wait until teardown has finished
    pub async fn closed(&self) {
        let mut rx = self.inner.snapshot.clone();
        // Sender dropped also means the task is gone
        let _ = rx.wait_for(|s| s.terminated).await;
    }

    /// Current view of the session
    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.snapshot.borrow().clone()
    }

    /// Subscribe to session changes
    pub fn watch_session(&self) -> watch::Receiver<SessionSnapshot> {
        self.inner.snapshot.clone()
    }

    fn send_command(&self, command: BridgeCommand) -> std::result::Result<(), NegotiationError> {
        if self.is_closed() {
            return Err(NegotiationError::SessionClosed);
        }
        self.inner
            .commands
            .send(SessionEvent::Command(command))
            .map_err(|_| NegotiationError::SessionClosed)
    }
}

/// State owned by the session task
struct SessionCore {
    session_id: SessionId,
    config: BridgeConfig,
    transport: Arc<dyn PeerTransport>,
    negotiator: Negotiator,
    ice: IceRelay,
    channel: DataChannelManager,
    ice_connection_state: IceConnectionState,
    dispatcher: Option<SurfaceDispatcher>,
    errors: ErrorReporter,
    snapshot: watch::Sender<SessionSnapshot>,
}

impl SessionCore {
    async fn run(mut self, mut events: mpsc::UnboundedReceiver<SessionEvent>) {
        while let Some(event) = events.recv().await {
            match event {
                SessionEvent::Command(BridgeCommand::Close) => break,
                SessionEvent::Command(command) => self.on_command(command).await,
                SessionEvent::Transport(event) => self.on_transport_event(event).await,
            }

            if self.negotiator.take_deferred_negotiation() {
                debug!("Replaying deferred negotiation");
                self.negotiate().await;
            }
            self.publish(false);
        }

        self.terminate(events).await;
    }

    async fn on_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::NegotiationNeeded => {
                if self.negotiator.can_offer() {
                    self.negotiate().await;
                } else {
                    self.negotiator.defer_negotiation();
                }
            }
            TransportEvent::SignalingStateChanged(state) => {
                if state != self.negotiator.state() {
                    debug!(
                        "Transport reports signaling state {} (session: {})",
                        state,
                        self.negotiator.state()
                    );
                }
            }
            TransportEvent::IceGatheringStateChanged(state) => {
                self.ice.on_gathering_state(state);
            }
            TransportEvent::IceConnectionStateChanged(state) => {
                if state == IceConnectionState::Failed {
                    warn!(session_id = %self.session_id, "ICE connection failed");
                } else {
                    info!("ICE connection state: {:?}", state);
                }
                self.ice_connection_state = state;
            }
            TransportEvent::CandidateGenerated(candidate) => {
                let command = self.ice.on_local_candidate(&candidate);
                self.dispatch(command);
            }
            TransportEvent::CandidatesRemoved(candidates) => {
                if let Some(command) = self.ice.on_candidates_removed(candidates) {
                    self.dispatch(command);
                }
            }
            TransportEvent::DataChannelStateChanged(state) => {
                if self.channel.on_state_change(state) {
                    self.dispatch(SurfaceCommand::ChannelStateChanged(state));
                }
            }
            TransportEvent::DataChannelMessage(message) => {
                self.channel.on_message(message);
            }
        }
    }

    async fn on_command(&mut self, command: BridgeCommand) {
        match command {
            BridgeCommand::ApplyRemoteDescription { description, reply } => {
                let result = self.apply_remote_description(description).await;
                if let Err(e) = &result {
                    self.errors.report(e.clone());
                }
                self.publish(false);
                let _ = reply.send(result);
            }
            BridgeCommand::ApplyRemoteCandidate { candidate, reply } => {
                let result = self.apply_remote_candidate(candidate).await;
                if let Err(e) = &result {
                    self.errors.report(e.clone());
                }
                self.publish(false);
                let _ = reply.send(result);
            }
            BridgeCommand::SendData { data, reply } => {
                let result = match self.channel.check_send(data.len()) {
                    Ok(()) => self
                        .transport
                        .send(data)
                        .await
                        .map_err(|e| Error::DataChannelError(e.to_string())),
                    Err(e) => Err(e),
                };
                let _ = reply.send(result);
            }
            BridgeCommand::Dispatch(command) => self.dispatch(command),
            BridgeCommand::Close => {}
        }
    }

    async fn negotiate(&mut self) {
        if let Err(e) = self.send_offer().await {
            self.errors.report(e);
        }
    }

    async fn send_offer(&mut self) -> std::result::Result<(), NegotiationError> {
        self.negotiator.local_transition(SdpType::Offer)?;

        debug!("Creating offer");
        let offer = self
            .transport
            .create_offer(&self.config.constraints)
            .await
            .map_err(|e| NegotiationError::OfferFailed(e.to_string()))?;

        self.set_local_description(offer).await
    }

    async fn set_local_description(
        &mut self,
        description: SessionDescription,
    ) -> std::result::Result<(), NegotiationError> {
        let sdp_type = description.sdp_type;
        let next = self.negotiator.local_transition(sdp_type)?;

        self.transport
            .set_local_description(description.clone())
            .await
            .map_err(|e| NegotiationError::LocalDescriptionFailed(e.to_string()))?;
        self.negotiator.commit_local(next);

        match sdp_type {
            SdpType::Rollback => {}
            SdpType::Offer => {
                self.ice.begin_round();
                self.dispatch(SurfaceCommand::ReceiveDescription(description));
            }
            SdpType::Answer | SdpType::ProvisionalAnswer => {
                self.dispatch(SurfaceCommand::ReceiveDescription(description));
            }
        }
        Ok(())
    }

    async fn apply_remote_description(
        &mut self,
        description: SessionDescription,
    ) -> std::result::Result<(), NegotiationError> {
        let sdp_type = description.sdp_type;
        let plan = self.negotiator.remote_transition(sdp_type)?;

        if let RemotePlan::RollbackLocalThenApply(_) = plan {
            info!("Glare: rolling back local offer in favor of remote offer");
            self.set_local_description(SessionDescription::rollback())
                .await?;
            self.negotiator.defer_negotiation();
        }

        self.transport
            .set_remote_description(description)
            .await
            .map_err(|e| NegotiationError::RemoteDescriptionFailed(e.to_string()))?;
        self.negotiator.commit_remote(sdp_type, plan.next_state());

        self.flush_pending_candidates().await;

        if sdp_type == SdpType::Offer {
            debug!("Answering remote offer");
            let answer = self
                .transport
                .create_answer(&self.config.constraints)
                .await
                .map_err(|e| NegotiationError::AnswerFailed(e.to_string()))?;
            self.set_local_description(answer).await?;
        }
        Ok(())
    }

    async fn apply_remote_candidate(
        &mut self,
        candidate: IceCandidate,
    ) -> std::result::Result<(), NegotiationError> {
        if self.negotiator.state() == SignalingState::Closed {
            return Err(NegotiationError::SessionClosed);
        }
        if !self.negotiator.has_remote_description() {
            self.ice.queue_remote(candidate);
            return Ok(());
        }

        self.transport
            .add_ice_candidate(candidate)
            .await
            .map_err(|e| NegotiationError::CandidateFailed(e.to_string()))
    }

    async fn flush_pending_candidates(&mut self) {
        let pending = self.ice.drain_pending();
        if pending.is_empty() {
            return;
        }

        debug!("Applying {} queued remote candidates", pending.len());
        for candidate in pending {
            if let Err(e) = self.transport.add_ice_candidate(candidate).await {
                self.errors
                    .report(NegotiationError::CandidateFailed(e.to_string()));
            }
        }
    }

    fn dispatch(&self, command: SurfaceCommand) {
        match &self.dispatcher {
            Some(dispatcher) if dispatcher.dispatch(command) => {}
            _ => debug!("Surface dispatch unavailable, call dropped"),
        }
    }

    fn publish(&self, terminated: bool) {
        let next = SessionSnapshot {
            session_id: self.session_id,
            signaling_state: self.negotiator.state(),
            ice_gathering_state: self.ice.gathering_state(),
            ice_connection_state: self.ice_connection_state,
            data_channel_state: self.channel.state(),
            pending_remote_candidates: self.ice.pending_len(),
            terminated,
        };
        self.snapshot.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
    }

    async fn terminate(mut self, mut events: mpsc::UnboundedReceiver<SessionEvent>) {
        if let Some(dispatcher) = &self.dispatcher {
            dispatcher.close();
        }
        self.negotiator.close();

        if let Err(e) = self.transport.close().await {
            self.errors.report(Error::Other(e));
        }

        // Keep state notifications raised by the close itself, reject the rest
        events.close();
        while let Ok(event) = events.try_recv() {
            match event {
                SessionEvent::Transport(TransportEvent::DataChannelStateChanged(state)) => {
                    self.channel.on_state_change(state);
                }
                SessionEvent::Transport(_) => {}
                SessionEvent::Command(command) => reject(command),
            }
        }

        if let Some(dispatcher) = self.dispatcher.take() {
            dispatcher.shutdown().await;
        }

        info!(
            session_id = %self.session_id,
            candidates = self.ice.generated(),
            messages = self.channel.delivered(),
            "Signaling session closed"
        );
        self.publish(true);
    }
}

fn reject(command: BridgeCommand) {
    match command {
        BridgeCommand::ApplyRemoteDescription { reply, .. }
        | BridgeCommand::ApplyRemoteCandidate { reply, .. } => {
            let _ = reply.send(Err(NegotiationError::SessionClosed));
        }
        BridgeCommand::SendData { reply, .. } => {
            let _ = reply.send(Err(NegotiationError::SessionClosed.into()));
        }
        BridgeCommand::Dispatch(_) | BridgeCommand::Close => {}
    }
}
