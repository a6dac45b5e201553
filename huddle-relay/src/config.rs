use std::net::{Ipv4Addr, SocketAddr};

pub const DEFAULT_RELAY_PORT: u16 = 7070;

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub bind: SocketAddr,
    /// Sessions must present this token in their hello. `None` admits everyone.
    pub auth_token: Option<String>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_RELAY_PORT)),
            auth_token: None,
        }
    }
}

impl RelayConfig {
    /// Loopback on a port picked by the OS.
    pub fn ephemeral() -> Self {
        Self {
            bind: SocketAddr::from((Ipv4Addr::LOCALHOST, 0)),
            auth_token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }
}
