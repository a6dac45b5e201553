use crate::{RelayConfig, RelayService, ws_handler};
use anyhow::{Context, Result};
use axum::{Router, routing::get};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

/// `GET /ws` for relay sessions, `GET /health` for health checks.
pub fn router(service: RelayService) -> Router {
    // Browser peers connect from other origins.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health))
        .layer(cors)
        .with_state(service)
}

async fn health() -> &'static str {
    "ok"
}

pub struct RelayServer {
    listener: TcpListener,
    service: RelayService,
}

impl RelayServer {
    pub async fn bind(config: RelayConfig) -> Result<Self> {
        let listener = TcpListener::bind(config.bind)
            .await
            .with_context(|| format!("Failed to bind relay to {}", config.bind))?;
        let service = RelayService::new(&config);

        Ok(Self { listener, service })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .context("Relay listener has no local address")
    }

    pub fn service(&self) -> RelayService {
        self.service.clone()
    }

    /// Runs until the listener fails.
    pub async fn serve(self) -> Result<()> {
        let addr = self.local_addr()?;
        info!("Signaling relay listening on ws://{}/ws", addr);

        axum::serve(self.listener, router(self.service))
            .await
            .context("Relay server stopped")
    }
}
