use crate::RelayService;
use crate::signaling::relay_state::send_frame;
use axum::extract::State;
use axum::extract::WebSocketUpgrade;
use axum::extract::ws::{Message, WebSocket};
use axum::response::IntoResponse;
use futures::stream::SplitStream;
use futures::{SinkExt, StreamExt};
use huddle_core::PeerId;
use huddle_core::relay::{ClientFrame, RelayFrame};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// How long a fresh socket may take to say hello.
const HELLO_TIMEOUT: Duration = Duration::from_secs(10);

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(service): State<RelayService>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, service))
}

async fn handle_socket(socket: WebSocket, service: RelayService) {
    let (mut sender, mut receiver) = socket.split();

    let greeting = tokio::time::timeout(HELLO_TIMEOUT, greet(&mut receiver, &service))
        .await
        .unwrap_or_else(|_| Err("no hello received".into()));
    let peer_id = match greeting {
        Ok(peer_id) => peer_id,
        Err(reason) => {
            warn!("Rejecting relay session: {}", reason);
            if let Ok(json) = serde_json::to_string(&RelayFrame::Rejected { reason }) {
                let _ = sender.send(Message::Text(json.into())).await;
            }
            let _ = sender.close().await;
            return;
        }
    };

    info!("New relay session: {}", peer_id);

    let (tx, mut rx) = mpsc::unbounded_channel();
    send_frame(
        &tx,
        &RelayFrame::Welcome {
            peer_id: peer_id.clone(),
        },
    );
    service.add_session(peer_id.clone(), tx.clone());

    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(msg).await.is_err() {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn({
        let service = service.clone();
        let peer_id = peer_id.clone();

        async move {
            while let Some(Ok(msg)) = receiver.next().await {
                match msg {
                    Message::Text(text) => match serde_json::from_str::<ClientFrame>(&text) {
                        Ok(ClientFrame::Request { req_id, request }) => {
                            let reply = service.handle_request(&peer_id, &tx, request);
                            if !send_frame(&tx, &RelayFrame::Response { req_id, reply }) {
                                break;
                            }
                        }
                        Ok(ClientFrame::Hello { .. }) => {
                            warn!("Ignoring repeated hello from {}", peer_id);
                        }
                        Err(e) => warn!("Invalid relay frame from {}: {}", peer_id, e),
                    },
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    };

    service.disconnect(&peer_id);
    info!("Relay session disconnected: {}", peer_id);
}

/// Waits for the first text frame, which must be a hello.
async fn greet(
    receiver: &mut SplitStream<WebSocket>,
    service: &RelayService,
) -> Result<PeerId, String> {
    while let Some(msg) = receiver.next().await {
        match msg.map_err(|e| e.to_string())? {
            Message::Text(text) => {
                return match serde_json::from_str::<ClientFrame>(&text) {
                    Ok(ClientFrame::Hello { token }) => service.authorize(token.as_deref()),
                    Ok(_) => Err("expected hello".into()),
                    Err(e) => Err(format!("invalid hello: {}", e)),
                };
            }
            Message::Close(_) => break,
            _ => {}
        }
    }
    Err("socket closed before hello".into())
}
