mod ice;
mod peer;
mod room;
mod signaling;

pub use ice::{IceCandidate, IceServerConfig, default_ice_servers};
pub use peer::PeerId;
pub use room::{Room, RoomId};
pub use signaling::{Signal, SignalPayload};
