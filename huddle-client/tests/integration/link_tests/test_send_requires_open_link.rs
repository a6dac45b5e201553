use bytes::Bytes;
use huddle_client::{LinkEvent, NativeEvent, Role};
use serde_json::json;

use crate::integration::{answer, create_link, init_tracing, signal};
use crate::utils::Call;

#[tokio::test]
async fn test_send_requires_open_link() {
    init_tracing();

    let mut h = create_link("host", "guest", Role::Offerer);
    h.link.offer().await;

    h.link.send(&json!({ "early": true })).await;
    assert_eq!(h.mock.count(|c| matches!(c, Call::SendText(_))), 0);

    h.link.handle_signal(signal("guest", "host", answer("v=0 guest"))).await;
    h.mock.set_channel_open(true);
    h.link.handle_native(NativeEvent::ChannelOpen).await;

    h.link.send(&json!({ "x": 1, "tag": "hi" })).await;
    let sent: Vec<String> = h
        .mock
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            Call::SendText(text) => Some(text),
            _ => None,
        })
        .collect();
    assert_eq!(sent.len(), 1);
    let value: serde_json::Value = serde_json::from_str(&sent[0]).unwrap();
    assert_eq!(value, json!({ "x": 1, "tag": "hi" }));
}

#[tokio::test]
async fn test_incoming_messages_are_parsed() {
    init_tracing();

    let mut h = create_link("guest", "host", Role::Answerer);

    let events = h
        .link
        .handle_native(NativeEvent::ChannelMessage(Bytes::from_static(br#"{"n":[1,2]}"#)))
        .await;
    assert!(matches!(events.as_slice(), [LinkEvent::Data(v)] if *v == json!({ "n": [1, 2] })));

    let events = h
        .link
        .handle_native(NativeEvent::ChannelMessage(Bytes::from_static(b"not json")))
        .await;
    assert!(events.is_empty());
}
