use huddle_client::{LinkState, Role};

use crate::integration::{candidate, create_link, init_tracing, offer, signal};

#[tokio::test]
async fn test_misaddressed_signals_ignored() {
    init_tracing();

    let mut h = create_link("guest", "host", Role::Answerer);
    h.link.await_offer();

    // Written by someone else, for someone else, or by ourselves.
    let noise = [
        signal("stranger", "guest", offer("v=0 stranger")),
        signal("host", "other-guest", offer("v=0 host")),
        signal("guest", "host", candidate(1)),
    ];
    for s in noise {
        assert!(h.link.handle_signal(s).await.is_empty());
    }

    assert_eq!(h.link.state(), LinkState::AwaitingRemoteOffer);
    assert_eq!(h.link.pending_candidates(), 0);
    assert!(h.mock.calls().is_empty());
    assert!(h.signals.signals().await.is_empty());
}
