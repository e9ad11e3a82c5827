//! Host-side role state: connection registry, coalesced broadcast channel,
//! and idle reaping.
//!
//! The host is the only writer of the document and the only fan-out point:
//! every guest state change flows up to the host and back out as a
//! broadcast. Presence and document updates share one coalescer so that
//! changes queued in the same window leave as a single combined `sync`.

use std::{collections::BTreeSet, ops::Add, time::Duration};

use atelier_proto::{Diagram, Message, PeerId, PresenceMap, User};

use super::{RoleState, SessionAction, SessionConfig, SessionStore};
use crate::{coalesce::Coalescer, env::Environment, reaper::IdleReaper};

/// Mutable host state: who is connected, what is pending, who is idle.
pub(crate) struct HostRole<I> {
    pub(super) connections: BTreeSet<PeerId>,
    pub(super) pending: Coalescer<PendingSync, I>,
    pub(super) reaper: IdleReaper<I>,
}

/// The coalescer slot for the host broadcast channel. Presence and document
/// snapshots queue independently and flush together.
#[derive(Debug, Clone, Default)]
pub(super) struct PendingSync {
    pub(super) users: Option<PresenceMap>,
    pub(super) diagram: Option<Diagram>,
}

impl<I> HostRole<I>
where
    I: Copy + Ord + Add<Duration, Output = I>,
{
    pub(super) fn new(config: &SessionConfig) -> Self {
        Self {
            connections: BTreeSet::new(),
            pending: Coalescer::new(config.updates_per_second),
            reaper: IdleReaper::new(config.idle_timeout),
        }
    }

    pub(super) fn reset(&mut self) {
        self.connections.clear();
        self.pending.clear();
        self.reaper.clear();
    }
}

impl<E: Environment> SessionStore<E> {
    pub(super) fn host_on_connection_open(
        &mut self,
        peer: PeerId,
        now: E::Instant,
    ) -> Vec<SessionAction> {
        if let RoleState::Host(role) = &mut self.role {
            tracing::debug!(%peer, "guest connection open");
            role.connections.insert(peer.clone());
            // The idle window starts at accept, not at the first message.
            role.reaper.watch(peer, now);
        }
        Vec::new()
    }

    pub(super) fn host_on_data(
        &mut self,
        peer: PeerId,
        payload: serde_json::Value,
        now: E::Instant,
    ) -> Vec<SessionAction> {
        if let RoleState::Host(role) = &mut self.role {
            if !role.connections.contains(&peer) {
                tracing::debug!(%peer, "data from unknown connection dropped");
                return Vec::new();
            }
            // Any inbound traffic counts as liveness, including payloads
            // that fail validation below.
            role.reaper.touch(&peer, now);
        }

        let message = match Message::decode(payload) {
            Ok(message) => message,
            Err(error) => {
                tracing::warn!(%peer, %error, "invalid message dropped");
                return Vec::new();
            },
        };

        match message {
            Message::Join { user } => self.host_on_join(peer, user, now),
            Message::User { user } => {
                self.users.insert(peer, user);
                self.host_queue_presence(now);
                Vec::new()
            },
            other => {
                tracing::warn!(%peer, kind = other.kind(), "guest sent a host-only message, dropped");
                Vec::new()
            },
        }
    }

    fn host_on_join(&mut self, peer: PeerId, user: User, now: E::Instant) -> Vec<SessionAction> {
        let Some(diagram) = self.diagram.clone() else {
            // No document yet means nothing to serve; the guest gets no
            // reply and stays waiting on its side.
            tracing::warn!(%peer, "join before a document exists, dropped");
            return Vec::new();
        };

        // The reply carries the directory as the newcomer should see it:
        // without its own entry.
        let mut reply_users = self.users.clone();
        reply_users.remove(&peer);

        self.users.insert(peer.clone(), user);
        // Everyone else learns about the newcomer on the next flush.
        self.host_queue_presence(now);

        vec![SessionAction::Send {
            peer,
            message: Message::Sync { mode: self.mode, diagram, users: reply_users },
        }]
    }

    pub(super) fn host_on_connection_gone(
        &mut self,
        peer: &PeerId,
        now: E::Instant,
    ) -> Vec<SessionAction> {
        tracing::debug!(%peer, "guest connection gone");
        self.host_drop_connection(peer, now);
        Vec::new()
    }

    /// Uniform close path: timeout, voluntary close, and connection error
    /// all land here.
    fn host_drop_connection(&mut self, peer: &PeerId, now: E::Instant) {
        let known = match &mut self.role {
            RoleState::Host(role) => {
                role.reaper.release(peer);
                role.connections.remove(peer)
            },
            RoleState::Guest(_) => false,
        };
        if !known {
            return;
        }

        self.users.remove(peer);
        self.host_queue_presence(now);
    }

    pub(super) fn host_queue_presence(&mut self, now: E::Instant) {
        // Broadcasts include the host itself, keyed under its own peer id.
        let Some(users) = self.presence_with_local() else { return };

        if let RoleState::Host(role) = &mut self.role {
            role.pending.update(now, |pending| pending.users = Some(users));
        }
    }

    pub(super) fn host_tick(&mut self, now: E::Instant) -> Vec<SessionAction> {
        let mut actions = Vec::new();

        // Reap first: the presence update an expiry queues must not carry
        // the reaped guest.
        let expired = match &mut self.role {
            RoleState::Host(role) => role.reaper.expired(now),
            RoleState::Guest(_) => return actions,
        };
        for peer in expired {
            tracing::info!(%peer, "closing idle guest connection");
            self.host_drop_connection(&peer, now);
            actions.push(SessionAction::CloseConnection { peer });
        }

        let flushed = match &mut self.role {
            RoleState::Host(role) => role.pending.poll(now),
            RoleState::Guest(_) => return actions,
        };
        let Some(pending) = flushed else { return actions };
        let Some(message) = self.host_flush_message(pending) else { return actions };

        if let RoleState::Host(role) = &self.role {
            for peer in &role.connections {
                actions.push(SessionAction::Send { peer: peer.clone(), message: message.clone() });
            }
        }

        actions
    }

    /// Map a flushed slot onto the narrowest message that carries it.
    fn host_flush_message(&self, pending: PendingSync) -> Option<Message> {
        match (pending.users, pending.diagram) {
            (Some(users), Some(diagram)) => {
                Some(Message::Sync { mode: self.mode, diagram, users })
            },
            (Some(users), None) => Some(Message::SyncUsers { users }),
            (None, Some(diagram)) => Some(Message::SyncDiagram { diagram }),
            (None, None) => None,
        }
    }
}
