use crate::store::{OpenedSession, RelayStore, StoreError};
use async_trait::async_trait;
use dashmap::DashMap;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use huddle_core::relay::{ClientFrame, RelayFrame, StoreEvent, StoreReply, StoreRequest, WatchKind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, error, info, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Default)]
struct WsInner {
    outgoing: OnceLock<mpsc::UnboundedSender<Message>>,
    pending: DashMap<u64, oneshot::Sender<StoreReply>>,
    subscriptions: DashMap<u64, mpsc::UnboundedSender<StoreEvent>>,
    next_id: AtomicU64,
}

impl WsInner {
    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn route(&self, frame: RelayFrame) {
        match frame {
            RelayFrame::Response { req_id, reply } => {
                if let Some((_, waiter)) = self.pending.remove(&req_id) {
                    let _ = waiter.send(reply);
                } else {
                    warn!("Relay answered unknown request {}", req_id);
                }
            }
            RelayFrame::Event { sub_id, event } => {
                let delivered = self
                    .subscriptions
                    .get(&sub_id)
                    .is_some_and(|tx| tx.send(event).is_ok());
                if !delivered {
                    self.subscriptions.remove(&sub_id);
                }
            }
            other => debug!("Ignoring unexpected relay frame: {:?}", other),
        }
    }
}

/// Relay store backed by a `huddle-relay` server over WebSocket.
pub struct WsRelayStore {
    url: String,
    token: Option<String>,
    inner: Arc<WsInner>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl WsRelayStore {
    /// `url` points at the relay's `/ws` endpoint, e.g. `ws://127.0.0.1:7070/ws`.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            token: None,
            inner: Arc::new(WsInner::default()),
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    async fn request(&self, request: StoreRequest) -> Result<StoreReply, StoreError> {
        let outgoing = self.inner.outgoing.get().ok_or(StoreError::NotOpen)?;
        let req_id = self.inner.next_id();
        let (reply_tx, reply_rx) = oneshot::channel();
        self.inner.pending.insert(req_id, reply_tx);

        let frame = ClientFrame::Request { req_id, request };
        let json = match serde_json::to_string(&frame) {
            Ok(json) => json,
            Err(e) => {
                self.inner.pending.remove(&req_id);
                return Err(StoreError::Protocol(e.to_string()));
            }
        };
        if outgoing.send(Message::Text(json.into())).is_err() {
            self.inner.pending.remove(&req_id);
            return Err(StoreError::Disconnected);
        }

        match reply_rx.await.map_err(|_| StoreError::Disconnected)? {
            StoreReply::Error { message } => Err(StoreError::Request(message)),
            reply => Ok(reply),
        }
    }

    async fn handshake(&self, ws: &mut WsStream) -> Result<RelayFrame, StoreError> {
        let hello = serde_json::to_string(&ClientFrame::Hello {
            token: self.token.clone(),
        })
        .map_err(|e| StoreError::Protocol(e.to_string()))?;
        ws.send(Message::Text(hello.into()))
            .await
            .map_err(|e| StoreError::Request(e.to_string()))?;

        while let Some(msg) = ws.next().await {
            match msg.map_err(|e| StoreError::Request(e.to_string()))? {
                Message::Text(text) => {
                    return serde_json::from_str::<RelayFrame>(text.as_str())
                        .map_err(|e| StoreError::Protocol(e.to_string()));
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
        Err(StoreError::Disconnected)
    }

    async fn sender_task(mut write: SplitSink<WsStream, Message>, mut rx: mpsc::UnboundedReceiver<Message>) {
        while let Some(msg) = rx.recv().await {
            if let Err(e) = write.send(msg).await {
                error!("Failed to send relay frame: {}", e);
                break;
            }
        }
        let _ = write.close().await;
    }

    async fn receiver_task(
        mut read: SplitStream<WsStream>,
        inner: Arc<WsInner>,
        closed: oneshot::Sender<()>,
    ) {
        while let Some(msg) = read.next().await {
            match msg {
                Ok(Message::Text(text)) => match serde_json::from_str::<RelayFrame>(text.as_str()) {
                    Ok(frame) => inner.route(frame),
                    Err(e) => warn!("Invalid relay frame: {}", e),
                },
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    warn!("Relay connection error: {}", e);
                    break;
                }
            }
        }

        inner.pending.clear();
        inner.subscriptions.clear();
        info!("Relay connection closed");
        let _ = closed.send(());
    }
}

impl Drop for WsRelayStore {
    fn drop(&mut self) {
        let tasks = self.tasks.get_mut().unwrap_or_else(|e| e.into_inner());
        for task in tasks.drain(..) {
            task.abort();
        }
    }
}

#[async_trait]
impl RelayStore for WsRelayStore {
    async fn open(&self) -> Result<OpenedSession, StoreError> {
        if self.inner.outgoing.get().is_some() {
            return Err(StoreError::Request("session already open".into()));
        }

        info!("Connecting to relay {}", self.url);
        let (mut ws, _) = connect_async(self.url.as_str())
            .await
            .map_err(|e| StoreError::Request(format!("failed to connect: {}", e)))?;

        let peer_id = match self.handshake(&mut ws).await? {
            RelayFrame::Welcome { peer_id } => peer_id,
            RelayFrame::Rejected { reason } => return Err(StoreError::Rejected(reason)),
            other => {
                return Err(StoreError::Protocol(format!(
                    "expected welcome, got {:?}",
                    other
                )));
            }
        };

        let (write, read) = ws.split();
        let (tx, rx) = mpsc::unbounded_channel();
        if self.inner.outgoing.set(tx).is_err() {
            return Err(StoreError::Request("session already open".into()));
        }

        let (closed_tx, closed) = oneshot::channel();
        let sender = tokio::spawn(Self::sender_task(write, rx));
        let receiver = tokio::spawn(Self::receiver_task(read, self.inner.clone(), closed_tx));
        self.tasks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .extend([sender, receiver]);

        info!("Relay session opened as {}", peer_id);
        Ok(OpenedSession { peer_id, closed })
    }

    async fn get(&self, path: &str) -> Result<Option<String>, StoreError> {
        match self.request(StoreRequest::Get { path: path.into() }).await? {
            StoreReply::Value { value } => Ok(value),
            other => Err(unexpected(other)),
        }
    }

    async fn count(&self, path: &str) -> Result<usize, StoreError> {
        match self.request(StoreRequest::Count { path: path.into() }).await? {
            StoreReply::Count { count } => Ok(count),
            other => Err(unexpected(other)),
        }
    }

    async fn set(&self, path: &str, value: String) -> Result<(), StoreError> {
        self.request(StoreRequest::Set {
            path: path.into(),
            value,
        })
        .await
        .map(|_| ())
    }

    async fn remove(&self, path: &str) -> Result<(), StoreError> {
        self.request(StoreRequest::Remove { path: path.into() })
            .await
            .map(|_| ())
    }

    async fn remove_on_disconnect(&self, path: &str) -> Result<(), StoreError> {
        self.request(StoreRequest::RemoveOnDisconnect { path: path.into() })
            .await
            .map(|_| ())
    }

    async fn subscribe(
        &self,
        path: &str,
        kind: WatchKind,
    ) -> Result<mpsc::UnboundedReceiver<StoreEvent>, StoreError> {
        let sub_id = self.inner.next_id();
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.subscriptions.insert(sub_id, tx);

        let request = StoreRequest::Subscribe {
            sub_id,
            path: path.into(),
            kind,
        };
        if let Err(e) = self.request(request).await {
            self.inner.subscriptions.remove(&sub_id);
            return Err(e);
        }
        Ok(rx)
    }
}

fn unexpected(reply: StoreReply) -> StoreError {
    StoreError::Protocol(format!("unexpected reply {:?}", reply))
}
