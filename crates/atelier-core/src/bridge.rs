//! One-way document propagation into the session.
//!
//! The application's document store publishes snapshots through the bridge;
//! the bridge drops snapshots identical to the last published one and
//! forwards the rest onto the session's coalesced broadcast channel.
//! Nothing flows back through it: inbound snapshots land directly on the
//! session replica, and the document store reads them from there. The two
//! directions never share a code path, so an inbound snapshot can never
//! echo back out as a fresh broadcast.

use atelier_proto::Diagram;

use crate::{env::Environment, session::SessionStore};

/// Deduplicating outbound document pipe.
#[derive(Debug, Clone, Default)]
pub struct DocumentBridge {
    last: Option<Diagram>,
}

impl DocumentBridge {
    /// Create a bridge with no published snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Forward a snapshot to the session unless it equals the last one
    /// published.
    ///
    /// Document stores typically notify on every subscription event, most
    /// of which do not change the document; those must not occupy a flush
    /// window.
    pub fn publish<E: Environment>(
        &mut self,
        session: &mut SessionStore<E>,
        diagram: Diagram,
        now: E::Instant,
    ) {
        if self.last.as_ref() == Some(&diagram) {
            tracing::trace!("unchanged document snapshot skipped");
            return;
        }

        self.last = Some(diagram.clone());
        session.set_diagram(diagram, now);
    }

    /// Forget the last published snapshot. Call on session restart so the
    /// first snapshot of the new session always goes out.
    pub fn reset(&mut self) {
        self.last = None;
    }
}
