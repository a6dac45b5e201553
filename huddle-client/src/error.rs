use crate::store::StoreError;
use huddle_core::{PeerId, RoomId};
use std::fmt::Display;
use thiserror::Error;

/// Coarse category of a [`HuddleError`], for listeners that branch on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Transport,
    Negotiation,
    CapabilityMissing,
    InvalidRoom,
    Closed,
}

#[derive(Debug, Clone, Error)]
pub enum HuddleError {
    /// The relay rejected us or the session could not be used.
    #[error("signaling transport failed: {0}")]
    Transport(String),

    /// A description or candidate could not be applied. The link keeps its state.
    #[error("negotiation with {peer} failed: {message}")]
    Negotiation { peer: PeerId, message: String },

    #[error("native transport unavailable: {0}")]
    CapabilityMissing(String),

    #[error("invalid room id '{0}'")]
    InvalidRoom(RoomId),

    #[error("client runtime has shut down")]
    Closed,
}

impl HuddleError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            HuddleError::Transport(_) => ErrorKind::Transport,
            HuddleError::Negotiation { .. } => ErrorKind::Negotiation,
            HuddleError::CapabilityMissing(_) => ErrorKind::CapabilityMissing,
            HuddleError::InvalidRoom(_) => ErrorKind::InvalidRoom,
            HuddleError::Closed => ErrorKind::Closed,
        }
    }

    pub(crate) fn negotiation(peer: &PeerId, err: impl Display) -> Self {
        HuddleError::Negotiation {
            peer: peer.clone(),
            message: err.to_string(),
        }
    }
}

impl From<StoreError> for HuddleError {
    fn from(err: StoreError) -> Self {
        HuddleError::Transport(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, HuddleError>;
