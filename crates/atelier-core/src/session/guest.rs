//! Guest-side role state: one connection to the host, coalesced cursor
//! reports, and read-only replica updates.
//!
//! A guest never originates sync messages. Its only outbound traffic is the
//! initial `join` and coalesced `user` updates; everything it receives from
//! the host replaces the corresponding local slice wholesale.

use std::{ops::Add, time::Duration};

use atelier_proto::{Message, PeerId, PresenceMap, User};

use super::{RoleState, SessionAction, SessionConfig, SessionState, SessionStore};
use crate::{coalesce::Coalescer, env::Environment};

/// Mutable guest state: the host's id and the pending self-presence report.
pub(crate) struct GuestRole<I> {
    pub(super) room: PeerId,
    pub(super) pending: Coalescer<User, I>,
}

impl<I> GuestRole<I>
where
    I: Copy + Ord + Add<Duration, Output = I>,
{
    pub(super) fn new(config: &SessionConfig, room: PeerId) -> Self {
        Self { room, pending: Coalescer::new(config.updates_per_second) }
    }

    pub(super) fn reset(&mut self) {
        self.pending.clear();
    }
}

impl<E: Environment> SessionStore<E> {
    pub(super) fn guest_on_connection_open(&mut self, peer: PeerId) -> Vec<SessionAction> {
        let RoleState::Guest(role) = &self.role else { return Vec::new() };
        if peer != role.room {
            tracing::debug!(%peer, "connection from unexpected peer ignored");
            return Vec::new();
        }

        // The guest's user comes into existence with the connection:
        // persisted username or a pool pick, random color, cursor at
        // origin.
        let user =
            User::seeded(self.config.username.clone(), self.env.random_u64(), self.env.random_u64());
        self.user = Some(user.clone());
        self.state = SessionState::Connected;

        tracing::info!(room = %peer, "joined room");
        vec![SessionAction::Send { peer, message: Message::Join { user } }]
    }

    pub(super) fn guest_on_data(
        &mut self,
        peer: PeerId,
        payload: serde_json::Value,
    ) -> Vec<SessionAction> {
        let RoleState::Guest(role) = &self.role else { return Vec::new() };
        if peer != role.room {
            tracing::debug!(%peer, "data from unexpected peer dropped");
            return Vec::new();
        }

        let message = match Message::decode(payload) {
            Ok(message) => message,
            Err(error) => {
                tracing::warn!(%peer, %error, "invalid message dropped");
                return Vec::new();
            },
        };

        // Each message replaces its slice wholesale; re-receiving the same
        // snapshot is harmless.
        match message {
            Message::Sync { mode, diagram, users } => {
                self.mode = mode;
                self.diagram = Some(diagram);
                self.users = self.without_local(users);
            },
            Message::SyncUsers { users } => self.users = self.without_local(users),
            Message::SyncDiagram { diagram } => self.diagram = Some(diagram),
            Message::SyncMode { mode } => self.mode = mode,
            other => {
                tracing::warn!(%peer, kind = other.kind(), "host sent a guest-only message, dropped");
            },
        }

        Vec::new()
    }

    /// Strip the local peer's own entry from a received directory. The host
    /// broadcasts one map to everyone; each guest removes itself.
    fn without_local(&self, mut users: PresenceMap) -> PresenceMap {
        if let Some(id) = &self.local_id {
            users.remove(id);
        }
        users
    }

    pub(super) fn guest_on_connection_closed(&mut self, peer: &PeerId) -> Vec<SessionAction> {
        if let RoleState::Guest(role) = &mut self.role {
            if peer == &role.room {
                tracing::info!("host connection closed");
                role.pending.clear();
                self.state = SessionState::Disconnected;
            }
        }
        Vec::new()
    }

    pub(super) fn guest_on_connection_error(
        &mut self,
        peer: &PeerId,
        reason: &str,
    ) -> Vec<SessionAction> {
        if let RoleState::Guest(role) = &mut self.role {
            if peer == &role.room {
                tracing::warn!(%reason, "host connection failed");
                role.pending.clear();
                self.state = SessionState::Error;
            }
        }
        Vec::new()
    }

    pub(super) fn guest_queue_user(&mut self, now: E::Instant) {
        if self.state != SessionState::Connected {
            return;
        }
        let Some(user) = self.user.clone() else { return };

        if let RoleState::Guest(role) = &mut self.role {
            role.pending.record(now, user);
        }
    }

    pub(super) fn guest_tick(&mut self, now: E::Instant) -> Vec<SessionAction> {
        let (room, flushed) = match &mut self.role {
            RoleState::Guest(role) => (role.room.clone(), role.pending.poll(now)),
            RoleState::Host(_) => return Vec::new(),
        };

        match flushed {
            Some(user) if self.state == SessionState::Connected => {
                vec![SessionAction::Send { peer: room, message: Message::User { user } }]
            },
            _ => Vec::new(),
        }
    }
}
