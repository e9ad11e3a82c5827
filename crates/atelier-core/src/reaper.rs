//! Idle-connection deadlines (host side).
//!
//! Every guest connection owns one inactivity deadline, reset whenever any
//! message — valid or invalid — arrives from that connection. A connection
//! whose deadline passes is force-closed by the host. The reaper does not
//! distinguish "timed out" from "left voluntarily": both feed the same
//! uniform close path in the session store.
//!
//! Deadlines live in a map owned by the reaper and are released exactly
//! when the connection closes, so an abrupt teardown cannot leak a timer.

use std::{collections::BTreeMap, ops::Add, time::Duration};

use atelier_proto::PeerId;

/// Per-peer inactivity deadlines.
#[derive(Debug, Clone)]
pub struct IdleReaper<I> {
    window: Duration,
    deadlines: BTreeMap<PeerId, I>,
}

impl<I> IdleReaper<I>
where
    I: Copy + Ord + Add<Duration, Output = I>,
{
    /// Create a reaper with the given inactivity window.
    pub fn new(window: Duration) -> Self {
        Self { window, deadlines: BTreeMap::new() }
    }

    /// Start (or restart) watching a connection.
    pub fn watch(&mut self, peer: PeerId, now: I) {
        self.deadlines.insert(peer, now + self.window);
    }

    /// Reset the deadline for a watched connection.
    ///
    /// Unwatched peers are ignored: a message can race a close.
    pub fn touch(&mut self, peer: &PeerId, now: I) {
        if let Some(deadline) = self.deadlines.get_mut(peer) {
            *deadline = now + self.window;
        }
    }

    /// Stop watching a connection (it closed).
    pub fn release(&mut self, peer: &PeerId) {
        self.deadlines.remove(peer);
    }

    /// Collect and unwatch every connection whose deadline has passed.
    pub fn expired(&mut self, now: I) -> Vec<PeerId> {
        let expired: Vec<PeerId> = self
            .deadlines
            .iter()
            .filter(|(_, deadline)| now >= **deadline)
            .map(|(peer, _)| peer.clone())
            .collect();

        for peer in &expired {
            self.deadlines.remove(peer);
        }

        expired
    }

    /// The earliest deadline across all watched connections.
    pub fn next_deadline(&self) -> Option<I> {
        self.deadlines.values().min().copied()
    }

    /// Drop all deadlines.
    pub fn clear(&mut self) {
        self.deadlines.clear();
    }

    /// Whether any connection is currently watched.
    pub fn is_empty(&self) -> bool {
        self.deadlines.is_empty()
    }
}
