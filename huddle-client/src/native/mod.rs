//! Capability seam to the native peer-to-peer transport.
//!
//! Connections never call back into link code. Everything they observe is
//! pushed as a [`TaggedNativeEvent`] into the client runtime's queue.

mod webrtc_backend;

pub use webrtc_backend::{WebRtcBackend, WebRtcConnection};

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use huddle_core::{IceCandidate, PeerId};
use std::any::Any;
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SdpKind {
    Offer,
    Answer,
}

/// Low-level connectivity of a connection, independent of its data channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityState {
    New,
    Checking,
    Connected,
    Completed,
    Disconnected,
    Failed,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Audio,
    Video,
}

/// A remote media track, opaque to the client. The backend's own track
/// type can be recovered with [`MediaStreamHandle::downcast`].
#[derive(Debug, Clone)]
pub struct MediaStreamHandle {
    pub stream_id: String,
    pub track_id: String,
    pub kind: MediaKind,
    inner: Arc<dyn Any + Send + Sync>,
}

impl MediaStreamHandle {
    pub fn new(
        stream_id: impl Into<String>,
        track_id: impl Into<String>,
        kind: MediaKind,
        inner: Arc<dyn Any + Send + Sync>,
    ) -> Self {
        Self {
            stream_id: stream_id.into(),
            track_id: track_id.into(),
            kind,
            inner,
        }
    }

    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.inner.clone().downcast::<T>().ok()
    }
}

#[derive(Debug)]
pub enum NativeEvent {
    /// A local candidate to trickle to the remote side.
    CandidateDiscovered(IceCandidate),
    ChannelOpen,
    ChannelClose,
    ChannelError(String),
    ChannelMessage(Bytes),
    Connectivity(ConnectivityState),
    RemoteStream(MediaStreamHandle),
}

#[derive(Debug)]
pub struct TaggedNativeEvent {
    pub remote: PeerId,
    /// Which connection to `remote` produced the event.
    pub generation: u64,
    pub event: NativeEvent,
}

/// Where a connection reports its events.
#[derive(Debug, Clone)]
pub struct NativeEventSink {
    remote: PeerId,
    generation: u64,
    tx: mpsc::UnboundedSender<TaggedNativeEvent>,
}

impl NativeEventSink {
    pub fn new(
        remote: PeerId,
        generation: u64,
        tx: mpsc::UnboundedSender<TaggedNativeEvent>,
    ) -> Self {
        Self {
            remote,
            generation,
            tx,
        }
    }

    pub fn remote(&self) -> &PeerId {
        &self.remote
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// False once the runtime has stopped listening.
    pub fn emit(&self, event: NativeEvent) -> bool {
        self.tx
            .send(TaggedNativeEvent {
                remote: self.remote.clone(),
                generation: self.generation,
                event,
            })
            .is_ok()
    }
}

/// One native peer connection with at most one data channel.
#[async_trait]
pub trait NativeConnection: Send + Sync {
    /// Opens the data channel from this side. Offerers call it before
    /// creating the offer; answerers accept the remote one instead.
    async fn create_data_channel(&self) -> Result<()>;

    async fn create_offer(&self) -> Result<String>;

    async fn create_answer(&self) -> Result<String>;

    async fn set_local_description(&self, kind: SdpKind, sdp: String) -> Result<()>;

    async fn set_remote_description(&self, kind: SdpKind, sdp: String) -> Result<()>;

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()>;

    /// True while the data channel can take writes.
    fn is_channel_open(&self) -> bool;

    async fn send_text(&self, text: String) -> Result<()>;

    async fn close(&self) -> Result<()>;
}

#[async_trait]
pub trait NativeBackend: Send + Sync {
    async fn connect(&self, sink: NativeEventSink) -> Result<Box<dyn NativeConnection>>;
}
