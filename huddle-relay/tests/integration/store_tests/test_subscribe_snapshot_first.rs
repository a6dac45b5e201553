use huddle_client::RelayStore;
use huddle_core::relay::{StoreEvent, WatchKind};
use huddle_relay::RelayConfig;

use crate::integration::init_tracing;
use crate::utils::{TestRelay, next_store_event};

#[tokio::test]
async fn test_subscribe_snapshot_first() {
    init_tracing();

    let relay = TestRelay::start(RelayConfig::ephemeral()).await.unwrap();
    let (writer, _) = relay.open_store().await.unwrap();
    let (watcher, _) = relay.open_store().await.unwrap();

    writer.set("lobby/a/signal", String::new()).await.unwrap();

    let mut members = watcher.subscribe("lobby", WatchKind::Children).await.unwrap();
    let mut mailbox = watcher
        .subscribe("lobby/a/signal", WatchKind::Value)
        .await
        .unwrap();

    // The snapshot is queued before subscribe returns.
    assert_eq!(
        members.try_recv().ok(),
        Some(StoreEvent::ChildAdded { key: "a".into() })
    );
    assert_eq!(
        mailbox.try_recv().ok(),
        Some(StoreEvent::Value {
            value: Some(String::new())
        })
    );

    writer.set("lobby/b/signal", String::new()).await.unwrap();
    writer.set("lobby/a/signal", "offer".into()).await.unwrap();

    assert_eq!(
        next_store_event(&mut members).await,
        Some(StoreEvent::ChildAdded { key: "b".into() })
    );
    assert_eq!(
        next_store_event(&mut mailbox).await,
        Some(StoreEvent::Value {
            value: Some("offer".into())
        })
    );

    // Writes to an existing member never repeat its child-added.
    writer.set("lobby/a/signal", "answer".into()).await.unwrap();
    writer.remove("lobby/b").await.unwrap();
    assert_eq!(
        next_store_event(&mut members).await,
        Some(StoreEvent::ChildRemoved { key: "b".into() })
    );
}
