//! Session lifecycle integration tests.
//!
//! Drives host and guest sessions over the simulated network:
//! - Handshake flow (connect -> join -> sync)
//! - Document and mode propagation
//! - Teardown, restart, and failure paths

use std::time::Duration;

use atelier_core::session::{SessionConfig, SessionState};
use atelier_harness::{settle, SessionDriver, SimEnv, SimNetwork};
use atelier_proto::{Column, Diagram, Mode, PeerId, Table};

const WINDOW: Duration = Duration::from_millis(100);

fn sample_diagram() -> Diagram {
    let mut diagram = Diagram::new("inventory");
    diagram.tables.push(Table {
        name: "orders".to_string(),
        columns: vec![Column { name: "id".to_string(), ty: "uuid".to_string(), flags: None }],
    });
    diagram
}

/// A host with an open room and a published document.
async fn serving_host(network: &SimNetwork) -> SessionDriver {
    let mut host = SessionDriver::host(SimEnv::with_seed(1), network.clone(), SessionConfig::default());
    host.start().await.unwrap();
    settle(&mut [&mut host], Duration::ZERO).await;
    assert_eq!(host.session().state(), SessionState::Connected);

    host.set_diagram(sample_diagram());
    settle(&mut [&mut host], WINDOW).await;
    host
}

async fn joined_guest(network: &SimNetwork, host: &mut SessionDriver, seed: u64) -> SessionDriver {
    let room = host.session().room_id().unwrap().clone();
    let mut guest =
        SessionDriver::guest(SimEnv::with_seed(seed), network.clone(), SessionConfig::default(), room);
    guest.start().await.unwrap();
    settle(&mut [host, &mut guest], WINDOW + WINDOW).await;
    guest
}

#[tokio::test(start_paused = true)]
async fn host_and_guest_converge_on_the_shared_state() {
    let network = SimNetwork::new();
    let mut host = serving_host(&network).await;
    let guest = joined_guest(&network, &mut host, 2).await;

    assert_eq!(guest.session().state(), SessionState::Connected);
    assert_eq!(guest.session().diagram(), Some(&sample_diagram()));
    assert_eq!(guest.session().mode(), Mode::Read);

    let room = host.session().room_id().unwrap();
    let guest_id = guest.session().local_id().unwrap();

    // Host sees the guest; guest sees the host but never itself.
    assert!(host.session().users().contains_key(guest_id));
    assert!(guest.session().users().contains_key(room));
    assert!(!guest.session().users().contains_key(guest_id));
}

#[tokio::test(start_paused = true)]
async fn document_changes_reach_guests_within_one_window() {
    let network = SimNetwork::new();
    let mut host = serving_host(&network).await;
    let mut guest = joined_guest(&network, &mut host, 2).await;

    let mut changed = sample_diagram();
    changed.tables.push(Table { name: "customers".to_string(), columns: Vec::new() });
    host.set_diagram(changed.clone());

    settle(&mut [&mut host, &mut guest], WINDOW).await;
    assert_eq!(guest.session().diagram(), Some(&changed));
}

#[tokio::test(start_paused = true)]
async fn mode_changes_propagate_without_waiting_for_a_window() {
    let network = SimNetwork::new();
    let mut host = serving_host(&network).await;
    let mut guest = joined_guest(&network, &mut host, 2).await;

    host.set_mode(Mode::Edit).await;

    // No time needs to pass at all: only queued events are exchanged.
    settle(&mut [&mut host, &mut guest], Duration::ZERO).await;
    assert_eq!(guest.session().mode(), Mode::Edit);
}

#[tokio::test(start_paused = true)]
async fn handle_failure_is_terminal_until_an_explicit_restart() {
    let network = SimNetwork::new();
    network.fail_next_open();

    let mut host = SessionDriver::host(SimEnv::new(), network.clone(), SessionConfig::default());
    host.start().await.unwrap();
    settle(&mut [&mut host], Duration::ZERO).await;
    assert_eq!(host.session().state(), SessionState::Error);

    // The failed state persists; only a new start() recovers.
    settle(&mut [&mut host], Duration::from_secs(5)).await;
    assert_eq!(host.session().state(), SessionState::Error);

    host.start().await.unwrap();
    settle(&mut [&mut host], Duration::ZERO).await;
    assert_eq!(host.session().state(), SessionState::Connected);
}

#[tokio::test(start_paused = true)]
async fn host_stop_disconnects_every_guest() {
    let network = SimNetwork::new();
    let mut host = serving_host(&network).await;
    let mut guest = joined_guest(&network, &mut host, 2).await;
    let old_room = host.session().room_id().unwrap().clone();

    host.stop().await;
    settle(&mut [&mut host, &mut guest], Duration::ZERO).await;

    assert_eq!(host.session().state(), SessionState::Disconnected);
    assert_eq!(guest.session().state(), SessionState::Disconnected);

    // A restarted host is a new room.
    host.start().await.unwrap();
    settle(&mut [&mut host], Duration::ZERO).await;
    assert_eq!(host.session().state(), SessionState::Connected);
    assert_ne!(host.session().room_id(), Some(&old_room));
    assert!(host.session().users().is_empty());
}

#[tokio::test(start_paused = true)]
async fn guest_stop_leaves_the_room_intact() {
    let network = SimNetwork::new();
    let mut host = serving_host(&network).await;
    let mut guest = joined_guest(&network, &mut host, 2).await;
    let guest_id = guest.session().local_id().unwrap().clone();

    guest.stop().await;
    settle(&mut [&mut host, &mut guest], WINDOW + WINDOW).await;

    assert_eq!(host.session().state(), SessionState::Connected);
    assert!(!host.session().users().contains_key(&guest_id));
}

#[tokio::test(start_paused = true)]
async fn joining_a_missing_room_fails_the_session() {
    let network = SimNetwork::new();
    let mut guest = SessionDriver::guest(
        SimEnv::new(),
        network.clone(),
        SessionConfig::default(),
        PeerId::from("no-such-room"),
    );

    guest.start().await.unwrap();
    settle(&mut [&mut guest], Duration::ZERO).await;

    assert_eq!(guest.session().state(), SessionState::Error);
}

#[tokio::test(start_paused = true)]
async fn persisted_username_is_used_on_join() {
    let network = SimNetwork::new();
    let mut host = serving_host(&network).await;
    let room = host.session().room_id().unwrap().clone();

    let config = SessionConfig { username: Some("dba42".to_string()), ..Default::default() };
    let mut guest = SessionDriver::guest(SimEnv::with_seed(2), network.clone(), config, room);
    guest.start().await.unwrap();
    settle(&mut [&mut host, &mut guest], WINDOW).await;

    let guest_id = guest.session().local_id().unwrap();
    assert_eq!(host.session().users().get(guest_id).unwrap().username, "dba42");
}
