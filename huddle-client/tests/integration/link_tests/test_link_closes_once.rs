use huddle_client::{ConnectivityState, LinkEvent, LinkState, NativeEvent, Role};
use huddle_core::PeerId;

use crate::integration::{answer, create_link, init_tracing, signal};

#[tokio::test]
async fn test_link_closes_once() {
    init_tracing();

    let mut h = create_link("host", "guest", Role::Offerer);
    h.link.offer().await;
    h.link.handle_signal(signal("guest", "host", answer("v=0 guest"))).await;

    let events = h.link.handle_native(NativeEvent::ChannelOpen).await;
    assert!(matches!(events.as_slice(), [LinkEvent::Open(id)] if *id == PeerId::from("guest")));
    assert!(h.link.is_open());
    assert_eq!(h.link.state(), LinkState::Open);

    // A second open notification changes nothing.
    assert!(h.link.handle_native(NativeEvent::ChannelOpen).await.is_empty());

    let events = h.link.handle_native(NativeEvent::ChannelClose).await;
    assert!(matches!(events.as_slice(), [LinkEvent::Close(id)] if *id == PeerId::from("guest")));
    assert_eq!(h.link.state(), LinkState::Closed);
    assert!(!h.link.is_open());

    // Connectivity loss after the channel closed must not close twice.
    let events = h
        .link
        .handle_native(NativeEvent::Connectivity(ConnectivityState::Disconnected))
        .await;
    assert!(events.is_empty());
    assert!(h.link.handle_native(NativeEvent::ChannelOpen).await.is_empty());
}

#[tokio::test]
async fn test_connectivity_loss_closes_open_link() {
    init_tracing();

    let mut h = create_link("host", "guest", Role::Offerer);
    h.link.offer().await;
    h.link.handle_signal(signal("guest", "host", answer("v=0 guest"))).await;
    h.link.handle_native(NativeEvent::ChannelOpen).await;

    let events = h
        .link
        .handle_native(NativeEvent::Connectivity(ConnectivityState::Disconnected))
        .await;
    assert!(matches!(events.as_slice(), [LinkEvent::Close(_)]));
    assert!(h.link.handle_native(NativeEvent::ChannelClose).await.is_empty());
}
