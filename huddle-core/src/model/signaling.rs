use crate::model::ice::IceCandidate;
use crate::model::peer::PeerId;
use serde::{Deserialize, Serialize};

/// Negotiation message relayed between two peers through a mailbox.
///
/// Mailboxes are broadcast-shaped, so every receiver sees every signal its
/// sender writes. `id` is the author and `peer` the intended recipient;
/// anything else is noise for a given link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub id: PeerId,
    pub peer: PeerId,
    #[serde(flatten)]
    pub payload: SignalPayload,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SignalPayload {
    Offer { sdp: String },
    Answer { sdp: String },
    Candidate(IceCandidate),
}

impl Signal {
    pub fn new(from: PeerId, to: PeerId, payload: SignalPayload) -> Self {
        Self {
            id: from,
            peer: to,
            payload,
        }
    }

    /// True when this signal was written by `remote` for `local`.
    pub fn is_between(&self, remote: &PeerId, local: &PeerId) -> bool {
        &self.id == remote && &self.peer == local
    }

    pub fn kind(&self) -> &'static str {
        match self.payload {
            SignalPayload::Offer { .. } => "offer",
            SignalPayload::Answer { .. } => "answer",
            SignalPayload::Candidate(_) => "candidate",
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }
}
