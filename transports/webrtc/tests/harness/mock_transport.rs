//! Scriptable in-memory transport
//!
//! Records every call the bridge makes and lets tests play the part of the
//! transport library by emitting events into the bridge's sink.

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use webcontrol_webrtc::{
    BridgeConfig, DataChannelMode, EventSink, IceCandidate, MediaConstraints, PeerTransport,
    SdpType, SessionDescription, TransportConnector, TransportEvent, TransportInitError,
};

/// A recorded transport call
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    CreateDataChannel(String),
    CreateOffer,
    CreateAnswer,
    SetLocal(SessionDescription),
    SetRemote(SessionDescription),
    AddCandidate(IceCandidate),
    Send(Bytes),
    Close,
}

/// Failure injection
#[derive(Debug, Clone, Default)]
pub struct MockBehavior {
    pub fail_connect: bool,
    pub fail_data_channel: bool,
    pub fail_offer: bool,
    pub fail_answer: bool,
    pub fail_set_remote: bool,
    pub fail_add_candidate: bool,
    pub fail_close: bool,
    /// Emit negotiation-needed when the data channel is created, as a real
    /// peer connection does
    pub negotiate_on_channel: bool,
}

/// In-memory peer transport
pub struct MockTransport {
    behavior: MockBehavior,
    events: EventSink,
    calls: Mutex<Vec<Call>>,
    offers: AtomicUsize,
}

impl MockTransport {
    fn new(behavior: MockBehavior, events: EventSink) -> Self {
        Self {
            behavior,
            events,
            calls: Mutex::new(Vec::new()),
            offers: AtomicUsize::new(0),
        }
    }

    /// Play a transport callback
    pub fn emit(&self, event: TransportEvent) -> bool {
        self.events.emit(event)
    }

    /// All calls so far, in order
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of calls matching `pred`
    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| pred(c)).count()
    }

    /// Index of the first call matching `pred`
    pub fn position(&self, pred: impl Fn(&Call) -> bool) -> Option<usize> {
        self.calls.lock().unwrap().iter().position(|c| pred(c))
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl PeerTransport for MockTransport {
    async fn create_data_channel(&self, label: &str, _mode: DataChannelMode) -> anyhow::Result<()> {
        self.record(Call::CreateDataChannel(label.to_string()));
        if self.behavior.fail_data_channel {
            anyhow::bail!("SCTP transport unavailable");
        }
        if self.behavior.negotiate_on_channel {
            self.events.emit(TransportEvent::NegotiationNeeded);
        }
        Ok(())
    }

    async fn create_offer(
        &self,
        _constraints: &MediaConstraints,
    ) -> anyhow::Result<SessionDescription> {
        self.record(Call::CreateOffer);
        if self.behavior.fail_offer {
            anyhow::bail!("no codecs negotiated");
        }
        let n = self.offers.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(SessionDescription::offer(format!("v=0 mock-offer-{}", n)))
    }

    async fn create_answer(
        &self,
        _constraints: &MediaConstraints,
    ) -> anyhow::Result<SessionDescription> {
        self.record(Call::CreateAnswer);
        if self.behavior.fail_answer {
            anyhow::bail!("remote offer has no compatible media");
        }
        Ok(SessionDescription::answer("v=0 mock-answer"))
    }

    async fn set_local_description(&self, description: SessionDescription) -> anyhow::Result<()> {
        self.record(Call::SetLocal(description));
        Ok(())
    }

    async fn set_remote_description(
        &self,
        description: SessionDescription,
    ) -> anyhow::Result<()> {
        self.record(Call::SetRemote(description));
        if self.behavior.fail_set_remote {
            anyhow::bail!("malformed SDP");
        }
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> anyhow::Result<()> {
        self.record(Call::AddCandidate(candidate));
        if self.behavior.fail_add_candidate {
            anyhow::bail!("unparseable candidate");
        }
        Ok(())
    }

    async fn send(&self, data: Bytes) -> anyhow::Result<()> {
        self.record(Call::Send(data));
        Ok(())
    }

    async fn close(&self) -> anyhow::Result<()> {
        self.record(Call::Close);
        if self.behavior.fail_close {
            anyhow::bail!("peer connection already torn down");
        }
        Ok(())
    }
}

/// Connector producing [`MockTransport`]s
#[derive(Default)]
pub struct MockConnector {
    behavior: MockBehavior,
    transports: Mutex<Vec<Arc<MockTransport>>>,
    configs: Mutex<Vec<BridgeConfig>>,
}

impl MockConnector {
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            ..Default::default()
        }
    }

    /// Most recently created transport
    pub fn transport(&self) -> Arc<MockTransport> {
        self.transports
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no transport created")
    }

    /// Number of transports created
    pub fn connections(&self) -> usize {
        self.transports.lock().unwrap().len()
    }

    /// Configuration passed to the most recent connect
    pub fn last_config(&self) -> Option<BridgeConfig> {
        self.configs.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl TransportConnector for MockConnector {
    async fn connect(
        &self,
        config: &BridgeConfig,
        events: EventSink,
    ) -> Result<Arc<dyn PeerTransport>, TransportInitError> {
        self.configs.lock().unwrap().push(config.clone());
        if self.behavior.fail_connect {
            return Err(TransportInitError::Setup(
                "secure transport bootstrap failed".to_string(),
            ));
        }

        let transport = Arc::new(MockTransport::new(self.behavior.clone(), events));
        self.transports.lock().unwrap().push(Arc::clone(&transport));
        Ok(transport)
    }
}

/// Shorthand predicates for [`MockTransport::count`]
pub fn is_offer(call: &Call) -> bool {
    matches!(call, Call::CreateOffer)
}

pub fn is_set_local(sdp_type: SdpType) -> impl Fn(&Call) -> bool {
    move |call| matches!(call, Call::SetLocal(d) if d.sdp_type == sdp_type)
}

pub fn is_set_remote(call: &Call) -> bool {
    matches!(call, Call::SetRemote(_))
}

pub fn is_add_candidate(call: &Call) -> bool {
    matches!(call, Call::AddCandidate(_))
}
