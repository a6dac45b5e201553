pub mod client;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod event;
pub mod link;
pub mod native;
pub mod peer_set;
pub mod signaling;
pub mod store;

pub use client::{Client, ClientBuilder};
pub use config::ClientConfig;
pub use coordinator::RoomCoordinator;
pub use error::{ErrorKind, HuddleError, Result};
pub use event::{Event, EventKind, Listener};
pub use link::{LinkEvent, LinkState, PeerLink, Role};
pub use native::{
    ConnectivityState, MediaKind, MediaStreamHandle, NativeBackend, NativeConnection, NativeEvent,
    NativeEventSink, SdpKind, TaggedNativeEvent, WebRtcBackend,
};
pub use peer_set::PeerSet;
pub use signaling::{SignalOutput, SignalingAdapter, SignalingEvent};
pub use store::{MemoryRelay, MemorySession, OpenedSession, RelayStore, StoreError, WsRelayStore};
