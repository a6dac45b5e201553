use huddle_client::{Client, ClientConfig, Event, MemoryRelay};
use huddle_core::PeerId;
use serde_json::json;
use std::sync::Arc;

use crate::integration::{CONNECTION_TIMEOUT_MS, EVENT_TIMEOUT_MS, init_tracing};
use crate::utils::EventRecorder;

async fn webrtc_peer(relay: &MemoryRelay, id: &str) -> (Client, EventRecorder) {
    let events = EventRecorder::new();
    let backend = huddle_client::WebRtcBackend::new(&ClientConfig::local())
        .expect("Failed to build webrtc backend");
    let client = events
        .attach(Client::builder(Arc::new(relay.session_as(id)), Arc::new(backend)))
        .spawn()
        .expect("Failed to spawn client");
    (client, events)
}

#[tokio::test]
async fn test_webrtc_loopback() {
    init_tracing();

    let relay = MemoryRelay::new();
    let (host, host_events) = webrtc_peer(&relay, "host").await;
    let (guest, guest_events) = webrtc_peer(&relay, "guest").await;
    let host_id = PeerId::from("host");
    let guest_id = PeerId::from("guest");

    host.join("lobby").await.expect("host join failed");
    guest.join("lobby").await.expect("guest join failed");

    assert!(host_events.wait_for_connect(&guest_id, CONNECTION_TIMEOUT_MS).await);
    assert!(guest_events.wait_for_connect(&host_id, CONNECTION_TIMEOUT_MS).await);

    guest.send(&host_id, json!({ "ping": 1 })).await.unwrap();
    assert!(
        host_events
            .wait_for(|e| matches!(e, Event::Receive { .. }), EVENT_TIMEOUT_MS)
            .await
    );
    assert_eq!(host_events.received_from(&guest_id), vec![json!({ "ping": 1 })]);
}
