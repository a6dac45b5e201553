use huddle_core::{IceServerConfig, default_ice_servers};

/// Settings for the native transport of every link a client creates.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub ice_servers: Vec<IceServerConfig>,
    /// Label of the data channel the offering side opens.
    pub channel_label: String,
    /// Unordered delivery with no retransmits.
    pub unreliable: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            ice_servers: default_ice_servers(),
            channel_label: "huddle".to_owned(),
            unreliable: true,
        }
    }
}

impl ClientConfig {
    /// No ICE servers: host candidates only. Enough for peers on one machine.
    pub fn local() -> Self {
        Self {
            ice_servers: Vec::new(),
            ..Self::default()
        }
    }
}
