mod config;
mod server;
mod signaling;

pub use config::RelayConfig;
pub use server::{RelayServer, router};
pub use signaling::relay_service::RelayService;
pub use signaling::ws_handler::ws_handler;
