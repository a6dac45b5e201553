use huddle_client::{Event, EventKind, MemoryRelay};
use serde_json::json;

use crate::integration::{EVENT_TIMEOUT_MS, init_tracing, spawn_peer};
use crate::utils::{Call, MockNetwork, wait_until};

#[tokio::test]
async fn test_two_peers_connect() {
    init_tracing();

    let relay = MemoryRelay::new();
    let network = MockNetwork::new();

    let host = spawn_peer(&relay, &network, "host").await;
    let room = host.client.join("lobby").await.expect("host join failed");
    assert_eq!(room.host_id, Some(host.id.clone()));

    let guest = spawn_peer(&relay, &network, "guest").await;
    let room = guest.client.join("lobby").await.expect("guest join failed");
    assert_eq!(room.host_id, Some(host.id.clone()));

    assert!(host.events.wait_for_connect(&guest.id, EVENT_TIMEOUT_MS).await);
    assert!(guest.events.wait_for_connect(&host.id, EVENT_TIMEOUT_MS).await);

    // Only the host offers.
    let host_side = host.backend.handle_for("guest").expect("host connection");
    let guest_side = guest.backend.handle_for("host").expect("guest connection");
    assert_eq!(host_side.count(|c| *c == Call::CreateOffer), 1);
    assert_eq!(host_side.count(|c| *c == Call::CreateAnswer), 0);
    assert_eq!(guest_side.count(|c| *c == Call::CreateAnswer), 1);
    assert_eq!(guest_side.count(|c| *c == Call::CreateOffer), 0);

    // Each side trickles its candidate to the other, possibly after opening.
    for side in [&host_side, &guest_side] {
        assert!(
            wait_until(
                || side.count(|c| matches!(c, Call::AddCandidate(_))) == 1,
                EVENT_TIMEOUT_MS
            )
            .await
        );
    }

    assert_eq!(host.client.connection_count().await.unwrap(), 1);
    assert!(host.client.has_connection(&guest.id).await.unwrap());
    assert!(guest.client.has_connection(&host.id).await.unwrap());
    assert_eq!(guest.client.local_id().await.unwrap(), Some(guest.id.clone()));

    host.client.send(&guest.id, json!({ "hello": "guest" })).await.unwrap();
    guest.client.send(&host.id, json!([1, 2, 3])).await.unwrap();

    assert!(
        guest
            .events
            .wait_for(|e| matches!(e, Event::Receive { .. }), EVENT_TIMEOUT_MS)
            .await
    );
    assert!(
        host.events
            .wait_for(|e| matches!(e, Event::Receive { .. }), EVENT_TIMEOUT_MS)
            .await
    );
    assert_eq!(guest.events.received_from(&host.id), vec![json!({ "hello": "guest" })]);
    assert_eq!(host.events.received_from(&guest.id), vec![json!([1, 2, 3])]);

    // Event order on the guest: session, room, host presence, then the link.
    let kinds: Vec<EventKind> = guest
        .events
        .kinds()
        .into_iter()
        .filter(|k| *k != EventKind::Receive)
        .collect();
    assert_eq!(
        kinds,
        vec![
            EventKind::Open,
            EventKind::Join,
            EventKind::RemoteJoin,
            EventKind::Connect
        ]
    );
}
