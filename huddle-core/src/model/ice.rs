use crate::utils::{
    DEFAULT_STUN_ADDR, DEFAULT_STUN_ADDR_2, DEFAULT_STUN_ADDR_3, DEFAULT_STUN_ADDR_4,
    DEFAULT_STUN_ADDR_5,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    pub username: Option<String>,
    pub credential: Option<String>,
}

impl IceServerConfig {
    pub fn stun(url: impl Into<String>) -> Self {
        Self {
            urls: vec![url.into()],
            username: None,
            credential: None,
        }
    }
}

/// Public STUN servers used when nothing else is configured.
pub fn default_ice_servers() -> Vec<IceServerConfig> {
    [
        DEFAULT_STUN_ADDR,
        DEFAULT_STUN_ADDR_2,
        DEFAULT_STUN_ADDR_3,
        DEFAULT_STUN_ADDR_4,
        DEFAULT_STUN_ADDR_5,
    ]
    .into_iter()
    .map(IceServerConfig::stun)
    .collect()
}

/// A connectivity candidate as it travels inside a `candidate` signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidate {
    pub candidate: String,
    #[serde(
        rename = "sdpMLineIndex",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub sdp_m_line_index: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdp_mid: Option<String>,
}
