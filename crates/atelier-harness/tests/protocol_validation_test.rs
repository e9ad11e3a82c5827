//! Protocol validation integration tests.
//!
//! Malformed or misdirected payloads must be dropped without closing the
//! connection, surfacing an error state, or corrupting replicated state.

use std::time::Duration;

use atelier_core::session::{SessionConfig, SessionState};
use atelier_harness::{settle, SessionDriver, SimEnv, SimNetwork};
use atelier_proto::{Cursor, Diagram, Message, Mode};
use serde_json::json;

const WINDOW: Duration = Duration::from_millis(100);

async fn pair() -> (SessionDriver, SessionDriver, SimNetwork) {
    let network = SimNetwork::new();

    let mut host =
        SessionDriver::host(SimEnv::with_seed(1), network.clone(), SessionConfig::default());
    host.start().await.unwrap();
    settle(&mut [&mut host], Duration::ZERO).await;
    host.set_diagram(Diagram::new("inventory"));
    settle(&mut [&mut host], WINDOW).await;

    let room = host.session().room_id().unwrap().clone();
    let mut guest =
        SessionDriver::guest(SimEnv::with_seed(2), network.clone(), SessionConfig::default(), room);
    guest.start().await.unwrap();
    settle(&mut [&mut host, &mut guest], WINDOW + WINDOW).await;

    (host, guest, network)
}

#[tokio::test(start_paused = true)]
async fn malformed_payloads_leave_the_host_undisturbed() {
    let (mut host, mut guest, network) = pair().await;
    let room = host.session().room_id().unwrap().clone();
    let guest_id = guest.session().local_id().unwrap().clone();
    let users_before = host.session().users().clone();

    for payload in [
        json!({"type": "takeover"}),
        json!({"type": "user", "user": {"username": 42}}),
        json!({"no": "type tag"}),
        json!(null),
        json!([1, 2, 3]),
    ] {
        assert!(network.send_raw(&guest_id, &room, payload));
    }
    settle(&mut [&mut host, &mut guest], WINDOW).await;

    assert_eq!(host.session().state(), SessionState::Connected);
    assert_eq!(host.session().users(), &users_before);

    // The same connection keeps working.
    guest.set_user_cursor(Cursor { x: 3.0, y: 4.0 });
    settle(&mut [&mut host, &mut guest], WINDOW * 2).await;
    assert_eq!(
        host.session().users().get(&guest_id).unwrap().cursor,
        Cursor { x: 3.0, y: 4.0 }
    );
}

#[tokio::test(start_paused = true)]
async fn malformed_payloads_leave_the_guest_replica_untouched() {
    let (mut host, mut guest, network) = pair().await;
    let room = host.session().room_id().unwrap().clone();
    let guest_id = guest.session().local_id().unwrap().clone();

    assert!(network.send_raw(&room, &guest_id, json!({"type": "syncDiagram", "diagram": "?"})));
    assert!(network.send_raw(&room, &guest_id, json!({"type": "shutdown"})));
    settle(&mut [&mut host, &mut guest], WINDOW).await;

    assert_eq!(guest.session().state(), SessionState::Connected);
    assert_eq!(guest.session().diagram(), Some(&Diagram::new("inventory")));

    // Valid traffic still lands afterwards.
    host.set_diagram(Diagram::new("inventory-v2"));
    settle(&mut [&mut host, &mut guest], WINDOW * 2).await;
    assert_eq!(guest.session().diagram(), Some(&Diagram::new("inventory-v2")));
}

#[tokio::test(start_paused = true)]
async fn wrong_direction_messages_are_dropped() {
    let (mut host, mut guest, network) = pair().await;
    let room = host.session().room_id().unwrap().clone();
    let guest_id = guest.session().local_id().unwrap().clone();

    // A guest has no business changing the mode.
    let payload = Message::SyncMode { mode: Mode::Edit }.encode().unwrap();
    assert!(network.send_raw(&guest_id, &room, payload));

    // And the host never joins its own room.
    let join = guest.session().users().get(&room).map(|host_user| {
        Message::Join { user: host_user.clone() }.encode().unwrap()
    });
    assert!(network.send_raw(&room, &guest_id, join.unwrap()));

    settle(&mut [&mut host, &mut guest], WINDOW).await;

    assert_eq!(host.session().mode(), Mode::Read);
    assert_eq!(guest.session().mode(), Mode::Read);
    assert_eq!(guest.session().state(), SessionState::Connected);
    assert_eq!(host.session().state(), SessionState::Connected);
}

#[tokio::test(start_paused = true)]
async fn abrupt_connection_failure_isolates_one_guest() {
    let (mut host, mut guest, network) = pair().await;
    let room = host.session().room_id().unwrap().clone();
    let guest_id = guest.session().local_id().unwrap().clone();

    network.break_connection(&room, &guest_id);
    settle(&mut [&mut host, &mut guest], WINDOW * 2).await;

    // The guest's session is failed; the host's room survives.
    assert_eq!(guest.session().state(), SessionState::Error);
    assert_eq!(host.session().state(), SessionState::Connected);
    assert!(!host.session().users().contains_key(&guest_id));
}
