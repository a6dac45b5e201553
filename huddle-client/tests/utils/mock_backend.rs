use anyhow::{Result, anyhow};
use async_trait::async_trait;
use bytes::Bytes;
use huddle_client::{NativeBackend, NativeConnection, NativeEvent, NativeEventSink, SdpKind};
use huddle_core::{IceCandidate, PeerId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// A call made on a [`MockConnection`], in the order it happened.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    CreateDataChannel,
    CreateOffer,
    CreateAnswer,
    SetLocal(SdpKind, String),
    SetRemote(SdpKind, String),
    AddCandidate(String),
    SendText(String),
    Close,
}

#[derive(Default)]
struct MockState {
    calls: Vec<Call>,
    local_set: bool,
    remote_set: bool,
    channel_open: bool,
    auto_open: bool,
    fail_remote_description: bool,
}

/// Test-side view of one mock connection.
#[derive(Clone)]
pub struct MockHandle {
    state: Arc<Mutex<MockState>>,
    sink: NativeEventSink,
}

impl MockHandle {
    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.lock().calls.iter().filter(|call| pred(call)).count()
    }

    pub fn fail_remote_description(&self, fail: bool) {
        self.lock().fail_remote_description = fail;
    }

    /// Marks the channel writable without emitting anything.
    pub fn set_channel_open(&self, open: bool) {
        self.lock().channel_open = open;
    }

    /// Pushes a native event as if the transport produced it.
    pub fn emit(&self, event: NativeEvent) {
        self.sink.emit(event);
    }
}

/// Routes data-channel text between mock connections owned by different peers.
#[derive(Clone, Default)]
pub struct MockNetwork {
    sinks: Arc<Mutex<HashMap<(PeerId, PeerId), NativeEventSink>>>,
}

impl MockNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend for the peer whose relay id is `owner`.
    pub fn backend(&self, owner: &str) -> MockBackend {
        MockBackend {
            network: Some(self.clone()),
            owner: PeerId::from(owner),
            handles: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn register(&self, owner: &PeerId, sink: NativeEventSink) {
        self.sinks
            .lock()
            .unwrap()
            .insert((owner.clone(), sink.remote().clone()), sink);
    }

    fn deliver(&self, from: &PeerId, to: &PeerId, text: String) {
        let sinks = self.sinks.lock().unwrap();
        if let Some(sink) = sinks.get(&(to.clone(), from.clone())) {
            sink.emit(NativeEvent::ChannelMessage(Bytes::from(text)));
        }
    }
}

/// Backend whose connections open their channel as soon as both
/// descriptions are set.
pub struct MockBackend {
    network: Option<MockNetwork>,
    owner: PeerId,
    handles: Arc<Mutex<HashMap<PeerId, MockHandle>>>,
}

impl MockBackend {
    /// The latest connection created towards `remote`.
    pub fn handle_for(&self, remote: &str) -> Option<MockHandle> {
        self.handles.lock().unwrap().get(&PeerId::from(remote)).cloned()
    }

    pub fn connection_count(&self) -> usize {
        self.handles.lock().unwrap().len()
    }
}

#[async_trait]
impl NativeBackend for MockBackend {
    async fn connect(&self, sink: NativeEventSink) -> Result<Box<dyn NativeConnection>> {
        if let Some(network) = &self.network {
            network.register(&self.owner, sink.clone());
        }
        let (connection, handle) =
            MockConnection::new(self.owner.clone(), sink.clone(), self.network.clone(), true);
        self.handles
            .lock()
            .unwrap()
            .insert(sink.remote().clone(), handle);
        Ok(Box::new(connection))
    }
}

pub struct MockConnection {
    owner: PeerId,
    sink: NativeEventSink,
    network: Option<MockNetwork>,
    state: Arc<Mutex<MockState>>,
}

impl MockConnection {
    pub fn new(
        owner: PeerId,
        sink: NativeEventSink,
        network: Option<MockNetwork>,
        auto_open: bool,
    ) -> (Self, MockHandle) {
        let state = Arc::new(Mutex::new(MockState {
            auto_open,
            ..MockState::default()
        }));
        let handle = MockHandle {
            state: state.clone(),
            sink: sink.clone(),
        };
        let connection = Self {
            owner,
            sink,
            network,
            state,
        };
        (connection, handle)
    }

    /// Connection that never opens on its own; tests drive it through the handle.
    pub fn manual(owner: &str, sink: NativeEventSink) -> (Self, MockHandle) {
        Self::new(PeerId::from(owner), sink, None, false)
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    fn record(&self, call: Call) {
        self.lock().calls.push(call);
    }

    fn maybe_open(&self) {
        let mut state = self.lock();
        if state.auto_open && state.local_set && state.remote_set && !state.channel_open {
            state.channel_open = true;
            drop(state);
            self.sink.emit(NativeEvent::ChannelOpen);
        }
    }
}

#[async_trait]
impl NativeConnection for MockConnection {
    async fn create_data_channel(&self) -> Result<()> {
        self.record(Call::CreateDataChannel);
        Ok(())
    }

    async fn create_offer(&self) -> Result<String> {
        self.record(Call::CreateOffer);
        Ok(format!("offer from {}", self.owner))
    }

    async fn create_answer(&self) -> Result<String> {
        self.record(Call::CreateAnswer);
        Ok(format!("answer from {}", self.owner))
    }

    async fn set_local_description(&self, kind: SdpKind, sdp: String) -> Result<()> {
        self.record(Call::SetLocal(kind, sdp));
        self.lock().local_set = true;
        self.sink.emit(NativeEvent::CandidateDiscovered(IceCandidate {
            candidate: format!("candidate:{} 1 udp 2122260223 127.0.0.1 9 typ host", self.owner),
            sdp_m_line_index: Some(0),
            sdp_mid: Some("0".into()),
        }));
        self.maybe_open();
        Ok(())
    }

    async fn set_remote_description(&self, kind: SdpKind, sdp: String) -> Result<()> {
        if self.lock().fail_remote_description {
            return Err(anyhow!("malformed session description"));
        }
        self.record(Call::SetRemote(kind, sdp));
        self.lock().remote_set = true;
        self.maybe_open();
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()> {
        self.record(Call::AddCandidate(candidate.candidate));
        Ok(())
    }

    fn is_channel_open(&self) -> bool {
        self.lock().channel_open
    }

    async fn send_text(&self, text: String) -> Result<()> {
        self.record(Call::SendText(text.clone()));
        if let Some(network) = &self.network {
            network.deliver(&self.owner, self.sink.remote(), text);
        }
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.record(Call::Close);
        self.lock().channel_open = false;
        Ok(())
    }
}
