use async_trait::async_trait;
use huddle_client::SignalOutput;
use huddle_core::{Signal, SignalPayload};
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};

/// SignalOutput that captures every signal a link writes.
#[derive(Clone)]
pub struct RecordingSignalOutput {
    tx: mpsc::UnboundedSender<Signal>,
    signals: Arc<Mutex<Vec<Signal>>>,
}

impl RecordingSignalOutput {
    /// Create a recorder and the receiver that sees each signal as it is sent.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Signal>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let output = Self {
            tx,
            signals: Arc::new(Mutex::new(Vec::new())),
        };
        (output, rx)
    }

    pub async fn signals(&self) -> Vec<Signal> {
        self.signals.lock().await.clone()
    }

    /// Signals of one kind (`offer`, `answer` or `candidate`), in send order.
    pub async fn of_kind(&self, kind: &str) -> Vec<Signal> {
        self.signals
            .lock()
            .await
            .iter()
            .filter(|s| s.kind() == kind)
            .cloned()
            .collect()
    }

    /// The SDP of the first offer or answer sent, if any.
    pub async fn first_sdp(&self, kind: &str) -> Option<String> {
        self.signals.lock().await.iter().find_map(|s| match &s.payload {
            SignalPayload::Offer { sdp } if kind == "offer" => Some(sdp.clone()),
            SignalPayload::Answer { sdp } if kind == "answer" => Some(sdp.clone()),
            _ => None,
        })
    }
}

impl Default for RecordingSignalOutput {
    fn default() -> Self {
        Self::new().0
    }
}

#[async_trait]
impl SignalOutput for RecordingSignalOutput {
    async fn send_signal(&self, signal: Signal) {
        tracing::debug!("[RecordingSignal] {} to {}", signal.kind(), signal.peer);

        self.signals.lock().await.push(signal.clone());
        let _ = self.tx.send(signal);
    }
}
