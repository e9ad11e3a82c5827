//! Presence synchronization integration tests.
//!
//! Verifies directory convergence across three peers and the rate limit on
//! presence broadcasts under cursor-move bursts.

use std::time::Duration;

use atelier_core::session::SessionConfig;
use atelier_harness::{settle, SessionDriver, SimEnv, SimNetwork};
use atelier_proto::{Cursor, Diagram, User};

const WINDOW: Duration = Duration::from_millis(100);

/// A host and two joined guests, fully converged.
async fn trio() -> (SessionDriver, SessionDriver, SessionDriver) {
    let network = SimNetwork::new();

    let mut host =
        SessionDriver::host(SimEnv::with_seed(1), network.clone(), SessionConfig::default());
    host.start().await.unwrap();
    settle(&mut [&mut host], Duration::ZERO).await;
    host.set_diagram(Diagram::new("inventory"));
    settle(&mut [&mut host], WINDOW).await;

    let room = host.session().room_id().unwrap().clone();
    let mut guest1 = SessionDriver::guest(
        SimEnv::with_seed(2),
        network.clone(),
        SessionConfig::default(),
        room.clone(),
    );
    let mut guest2 =
        SessionDriver::guest(SimEnv::with_seed(3), network.clone(), SessionConfig::default(), room);

    guest1.start().await.unwrap();
    guest2.start().await.unwrap();
    settle(&mut [&mut host, &mut guest1, &mut guest2], WINDOW + WINDOW).await;

    (host, guest1, guest2)
}

fn broadcast_count(kinds: &[String]) -> usize {
    kinds.iter().filter(|kind| *kind == "syncUsers" || *kind == "sync").count()
}

#[tokio::test(start_paused = true)]
async fn every_peer_sees_everyone_but_itself() {
    let (host, guest1, guest2) = trio().await;

    let room = host.session().room_id().unwrap();
    let id1 = guest1.session().local_id().unwrap();
    let id2 = guest2.session().local_id().unwrap();

    assert!(host.session().users().contains_key(id1));
    assert!(host.session().users().contains_key(id2));
    assert!(!host.session().users().contains_key(room));

    for (guest, own, other) in [(&guest1, id1, id2), (&guest2, id2, id1)] {
        assert!(guest.session().users().contains_key(room));
        assert!(guest.session().users().contains_key(other));
        assert!(!guest.session().users().contains_key(own));
    }
}

#[tokio::test(start_paused = true)]
async fn cursor_bursts_collapse_to_coalesced_broadcasts() {
    let (mut host, mut guest1, mut guest2) = trio().await;
    let observed_before = broadcast_count(guest2.received_kinds());

    // 50 cursor moves spread over 200 ms, far above the 10/s wire budget.
    for i in 0..50u32 {
        guest1.set_user_cursor(Cursor { x: f64::from(i), y: 2.0 * f64::from(i) });
        settle(&mut [&mut host, &mut guest1, &mut guest2], Duration::from_millis(4)).await;
    }
    // Let the trailing windows drain.
    settle(&mut [&mut host, &mut guest1, &mut guest2], WINDOW + WINDOW).await;

    // 200 ms of burst plus drain is at most 4 flush windows end to end.
    let broadcasts = broadcast_count(guest2.received_kinds()) - observed_before;
    assert!((1..=4).contains(&broadcasts), "expected coalesced broadcasts, saw {broadcasts}");

    // Nothing was lost: the terminal position is what everyone converges on.
    let id1 = guest1.session().local_id().unwrap();
    let expected = Cursor { x: 49.0, y: 98.0 };
    assert_eq!(host.session().users().get(id1).unwrap().cursor, expected);
    assert_eq!(guest2.session().users().get(id1).unwrap().cursor, expected);
}

#[tokio::test(start_paused = true)]
async fn renames_propagate_to_every_peer() {
    let (mut host, mut guest1, mut guest2) = trio().await;

    let renamed = User {
        username: "Index Ninja".to_string(),
        color: "#dc2626".to_string(),
        cursor: Cursor::default(),
    };
    guest1.set_user(renamed);
    settle(&mut [&mut host, &mut guest1, &mut guest2], WINDOW * 3).await;

    let id1 = guest1.session().local_id().unwrap();
    assert_eq!(host.session().users().get(id1).unwrap().username, "Index Ninja");
    assert_eq!(guest2.session().users().get(id1).unwrap().username, "Index Ninja");
}

#[tokio::test(start_paused = true)]
async fn departures_drop_out_of_the_directory() {
    let (mut host, mut guest1, mut guest2) = trio().await;
    let id1 = guest1.session().local_id().unwrap().clone();

    guest1.stop().await;
    settle(&mut [&mut host, &mut guest1, &mut guest2], WINDOW * 3).await;

    assert!(!host.session().users().contains_key(&id1));
    assert!(!guest2.session().users().contains_key(&id1));
}

#[tokio::test(start_paused = true)]
async fn host_cursor_moves_reach_guests() {
    let (mut host, mut guest1, mut guest2) = trio().await;
    let room = host.session().room_id().unwrap().clone();

    host.set_user_cursor(Cursor { x: 7.0, y: -3.0 });
    settle(&mut [&mut host, &mut guest1, &mut guest2], WINDOW * 2).await;

    let expected = Cursor { x: 7.0, y: -3.0 };
    assert_eq!(guest1.session().users().get(&room).unwrap().cursor, expected);
    assert_eq!(guest2.session().users().get(&room).unwrap().cursor, expected);
}
