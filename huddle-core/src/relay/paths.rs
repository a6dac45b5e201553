use crate::model::{PeerId, RoomId};

/// Top-level key holding every room's host record.
pub const HOST_ROOT: &str = "host";

/// Room ids must be a single path segment and must not shadow [`HOST_ROOT`].
pub fn is_valid_room(room: &RoomId) -> bool {
    let id = room.as_str();
    !id.is_empty() && !id.contains('/') && id != HOST_ROOT
}

/// Parent of every member entry of a room.
pub fn room_path(room: &RoomId) -> String {
    room.as_str().to_owned()
}

pub fn member_path(room: &RoomId, peer: &PeerId) -> String {
    format!("{}/{}", room, peer)
}

/// Where a peer writes the signals it sends; everyone in the room watches it.
pub fn mailbox_path(room: &RoomId, peer: &PeerId) -> String {
    format!("{}/{}/signal", room, peer)
}

pub fn host_path(room: &RoomId) -> String {
    format!("{}/{}", HOST_ROOT, room)
}
