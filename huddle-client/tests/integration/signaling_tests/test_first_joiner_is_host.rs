use huddle_client::{MemoryRelay, SignalOutput, SignalingEvent};
use huddle_core::{PeerId, RoomId, Signal};

use crate::integration::{init_tracing, next_event, offer, open_adapter, signal};

#[tokio::test]
async fn test_first_joiner_is_host() {
    init_tracing();

    let relay = MemoryRelay::new();
    let mut a = open_adapter(&relay, "a").await;

    let room = a.adapter.join(RoomId::from("lobby")).await.expect("join failed");
    assert_eq!(room.host_id, Some(PeerId::from("a")));
    assert!(room.is_host(&PeerId::from("a")));

    assert_eq!(relay.value("host/lobby").as_deref(), Some("a"));
    assert_eq!(relay.value("lobby/a/signal").as_deref(), Some(""));
    assert!(matches!(next_event(&mut a.events).await, Some(SignalingEvent::Join(r)) if r == room));

    // Signals land in our own mailbox.
    let mailbox = a.adapter.mailbox().expect("mailbox after join");
    let sent = signal("a", "b", offer("v=0 a"));
    mailbox.send_signal(sent.clone()).await;
    let written = relay.value("lobby/a/signal").expect("mailbox value");
    assert_eq!(Signal::from_json(&written).unwrap(), sent);

    // The host record goes away with the host's session.
    a.session.disconnect();
    assert_eq!(relay.value("host/lobby"), None);
    assert!(relay.children("lobby").is_empty());
    assert!(matches!(
        next_event(&mut a.events).await,
        Some(SignalingEvent::Close(id)) if id == PeerId::from("a")
    ));
}

#[tokio::test]
async fn test_second_joiner_reads_host() {
    init_tracing();

    let relay = MemoryRelay::new();
    let mut a = open_adapter(&relay, "a").await;
    a.adapter.join(RoomId::from("lobby")).await.unwrap();
    let mut b = open_adapter(&relay, "b").await;

    let room = b.adapter.join(RoomId::from("lobby")).await.unwrap();
    assert_eq!(room.host_id, Some(PeerId::from("a")));
    assert_eq!(relay.value("host/lobby").as_deref(), Some("a"));

    // Join comes before the existing members are announced.
    assert!(matches!(next_event(&mut b.events).await, Some(SignalingEvent::Join(_))));
    assert!(matches!(
        next_event(&mut b.events).await,
        Some(SignalingEvent::RemoteJoin(id)) if id == PeerId::from("a")
    ));

    assert!(matches!(next_event(&mut a.events).await, Some(SignalingEvent::Join(_))));
    assert!(matches!(
        next_event(&mut a.events).await,
        Some(SignalingEvent::RemoteJoin(id)) if id == PeerId::from("b")
    ));
}
