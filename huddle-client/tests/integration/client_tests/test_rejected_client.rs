use huddle_client::{Client, ErrorKind, Event, MemoryRelay};
use std::sync::Arc;

use crate::integration::{EVENT_TIMEOUT_MS, init_tracing};
use crate::utils::{EventRecorder, MockNetwork};

#[tokio::test]
async fn test_rejected_client() {
    init_tracing();

    let relay = MemoryRelay::with_token("secret");
    let network = MockNetwork::new();
    let events = EventRecorder::new();

    let client = events
        .attach(Client::builder(
            Arc::new(relay.session_with_token("nope")),
            Arc::new(network.backend("x")),
        ))
        .spawn()
        .unwrap();

    assert!(
        events
            .wait_for(|e| matches!(e, Event::Error(err) if err.kind() == ErrorKind::Transport), EVENT_TIMEOUT_MS)
            .await
    );
    assert_eq!(client.local_id().await.unwrap(), None);

    let err = client.join("lobby").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transport);
    assert_eq!(events.count(|e| matches!(e, Event::Open(_))), 0);
}

#[test]
fn test_spawn_needs_a_runtime() {
    let relay = MemoryRelay::new();
    let network = MockNetwork::new();

    let result = Client::builder(Arc::new(relay.session()), Arc::new(network.backend("x"))).spawn();
    assert_eq!(result.err().map(|e| e.kind()), Some(ErrorKind::CapabilityMissing));
}
