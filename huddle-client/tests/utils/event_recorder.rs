use huddle_client::{ClientBuilder, Event, EventKind};
use huddle_core::PeerId;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

pub const ALL_KINDS: [EventKind; 10] = [
    EventKind::Open,
    EventKind::Close,
    EventKind::Error,
    EventKind::Join,
    EventKind::RemoteJoin,
    EventKind::RemoteLeave,
    EventKind::Connect,
    EventKind::Disconnect,
    EventKind::Receive,
    EventKind::RemoteStream,
];

/// Records every event a client emits.
///
/// Listeners run synchronously inside the client runtime, so the log uses a
/// plain mutex and is never held across an await.
#[derive(Clone, Default)]
pub struct EventRecorder {
    events: Arc<Mutex<Vec<Event>>>,
}

impl EventRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one recording listener per event kind.
    pub fn attach(&self, mut builder: ClientBuilder) -> ClientBuilder {
        for kind in ALL_KINDS {
            let events = Arc::clone(&self.events);
            builder = builder.on(kind, move |event| {
                events.lock().unwrap().push(event.clone());
            });
        }
        builder
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&Event) -> bool) -> usize {
        self.events.lock().unwrap().iter().filter(|e| pred(e)).count()
    }

    pub fn kinds(&self) -> Vec<EventKind> {
        self.events.lock().unwrap().iter().map(Event::kind).collect()
    }

    /// Polls until an event matching `pred` has been recorded.
    pub async fn wait_for(&self, pred: impl Fn(&Event) -> bool, timeout_ms: u64) -> bool {
        let start = Instant::now();
        let timeout = Duration::from_millis(timeout_ms);

        loop {
            if self.count(&pred) > 0 {
                return true;
            }
            if start.elapsed() > timeout {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    pub async fn wait_for_connect(&self, remote: &PeerId, timeout_ms: u64) -> bool {
        self.wait_for(|e| matches!(e, Event::Connect(id) if id == remote), timeout_ms)
            .await
    }

    pub fn has_connect(&self, remote: &PeerId) -> bool {
        self.count(|e| matches!(e, Event::Connect(id) if id == remote)) > 0
    }

    /// Data received from `remote`, in arrival order.
    pub fn received_from(&self, remote: &PeerId) -> Vec<serde_json::Value> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| match e {
                Event::Receive { from, data } if from == remote => Some(data.clone()),
                _ => None,
            })
            .collect()
    }
}

/// Polls `check` until it returns true.
pub async fn wait_until(mut check: impl FnMut() -> bool, timeout_ms: u64) -> bool {
    let start = Instant::now();
    let timeout = Duration::from_millis(timeout_ms);

    loop {
        if check() {
            return true;
        }
        if start.elapsed() > timeout {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
