//! Session store: connection state machine with role dispatch.
//!
//! One `SessionStore` is the authoritative local state of one collaboration
//! session: connection state, local user, presence directory, access mode,
//! and document replica. The role — host or guest — is fixed at
//! construction and dispatched once per event, not re-branched at every
//! call site.
//!
//! # State Machine
//!
//! ```text
//!                 start()            HandleOpen (host)
//! ┌──────────────┐      ┌────────────┐ ConnectionOpen (guest) ┌───────────┐
//! │ Disconnected │─────>│ Connecting │───────────────────────>│ Connected │
//! └──────────────┘      └────────────┘                        └───────────┘
//!        ↑ stop() (any state)  │ HandleError /                      │
//!        │ ConnectionClosed    │ ConnectionError                    │
//!        │ (guest room conn)   ↓                                    │
//!        │                ┌─────────┐<──────────────────────────────┘
//!        └────────────────│  Error  │   (restart requires start())
//!                         └─────────┘
//! ```
//!
//! # Action Pattern
//!
//! Methods accept time as a parameter and return [`SessionAction`]s for a
//! driver to execute. The store itself performs no I/O and holds no timers;
//! it exposes [`SessionStore::next_deadline`] and expects
//! [`SessionStore::tick`] at or after it. `stop()` clears every deadline,
//! so a wakeup scheduled before teardown polls into nothing.

mod guest;
mod host;

use std::time::Duration;

use atelier_proto::{Cursor, Diagram, Message, Mode, PeerId, PresenceMap, User};
pub(crate) use guest::GuestRole;
pub(crate) use host::HostRole;

use crate::{env::Environment, error::SessionError, transport::TransportEvent};

/// Connection state of the local session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Initial state, and terminal after `stop()`
    Disconnected,
    /// `start()` called, transport handle opening
    Connecting,
    /// Host: handle open. Guest: connection to the host open
    Connected,
    /// Transport failure; terminal until an explicit restart
    Error,
}

/// Which side of the session this store is. Fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Owns the authoritative document, mediates all guest connections
    Host,
    /// Connected to exactly one host, read-only replica
    Guest,
}

/// Actions returned by the session store for the driver to execute.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionAction {
    /// Open the local transport handle (resolving relay descriptors first)
    OpenHandle,
    /// Open a logical connection to this peer
    Connect {
        /// Remote peer to connect to
        peer: PeerId,
    },
    /// Send this message over the open connection to `peer`
    Send {
        /// Recipient peer
        peer: PeerId,
        /// Message to deliver
        message: Message,
    },
    /// Force-close the connection to this peer
    CloseConnection {
        /// Peer whose connection to close
        peer: PeerId,
    },
    /// Destroy the local transport handle and all its connections
    CloseHandle,
}

/// Session configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Persisted username preference; a pool name is picked when absent
    pub username: Option<String>,
    /// Coalescer flush rate (messages per second per channel)
    pub updates_per_second: u32,
    /// Host-side inactivity window before a guest connection is reaped
    pub idle_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { username: None, updates_per_second: 10, idle_timeout: Duration::from_secs(120) }
    }
}

pub(crate) enum RoleState<I> {
    Host(HostRole<I>),
    Guest(GuestRole<I>),
}

/// The stateful core of one collaboration session.
pub struct SessionStore<E: Environment> {
    env: E,
    config: SessionConfig,
    state: SessionState,
    local_id: Option<PeerId>,
    room_id: Option<PeerId>,
    user: Option<User>,
    users: PresenceMap,
    mode: Mode,
    diagram: Option<Diagram>,
    role: RoleState<E::Instant>,
}

impl<E: Environment> SessionStore<E> {
    /// Create a host session. The room id becomes known once the transport
    /// handle opens.
    pub fn host(env: E, config: SessionConfig) -> Self {
        let role = RoleState::Host(HostRole::new(&config));
        Self::with_role(env, config, role, None)
    }

    /// Create a guest session targeting the given room.
    pub fn guest(env: E, config: SessionConfig, room: PeerId) -> Self {
        let role = RoleState::Guest(GuestRole::new(&config, room.clone()));
        Self::with_role(env, config, role, Some(room))
    }

    fn with_role(
        env: E,
        config: SessionConfig,
        role: RoleState<E::Instant>,
        room_id: Option<PeerId>,
    ) -> Self {
        Self {
            env,
            config,
            state: SessionState::Disconnected,
            local_id: None,
            room_id,
            user: None,
            users: PresenceMap::new(),
            mode: Mode::default(),
            diagram: None,
            role,
        }
    }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// This session's role.
    #[must_use]
    pub fn role(&self) -> Role {
        match self.role {
            RoleState::Host(_) => Role::Host,
            RoleState::Guest(_) => Role::Guest,
        }
    }

    /// The room id: the host's transport-assigned identity. `None` on a
    /// host whose handle has not opened yet.
    #[must_use]
    pub fn room_id(&self) -> Option<&PeerId> {
        self.room_id.as_ref()
    }

    /// The local transport identity, once the handle is open.
    #[must_use]
    pub fn local_id(&self) -> Option<&PeerId> {
        self.local_id.as_ref()
    }

    /// The local user, if one exists yet.
    #[must_use]
    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    /// The presence directory of remote users. Never contains the local
    /// peer's own id.
    #[must_use]
    pub fn users(&self) -> &PresenceMap {
        &self.users
    }

    /// The current access mode.
    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// The current document snapshot. On guests this is a read-only
    /// replica.
    #[must_use]
    pub fn diagram(&self) -> Option<&Diagram> {
        self.diagram.as_ref()
    }

    /// Start the session: `Disconnected | Error → Connecting`.
    ///
    /// The host seeds its local user here (persisted username or a pool
    /// pick, random color, cursor at origin). A guest creates its user
    /// later, when its connection to the host opens. A restart after a
    /// failure discards the failed session's ephemeral state first; nothing
    /// carries over.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` if already connecting or connected.
    pub fn start(&mut self) -> Result<Vec<SessionAction>, SessionError> {
        match self.state {
            SessionState::Disconnected => {},
            SessionState::Error => {
                // The failed session's directory, connections, and
                // deadlines belong to the dead handle; the restart begins
                // clean.
                self.reset_ephemeral();
            },
            state => return Err(SessionError::InvalidState { state, operation: "start" }),
        }

        self.state = SessionState::Connecting;

        if let RoleState::Host(_) = self.role {
            let username = self.config.username.clone();
            self.user =
                Some(User::seeded(username, self.env.random_u64(), self.env.random_u64()));
        }

        Ok(vec![SessionAction::OpenHandle])
    }

    /// Stop the session and reset all ephemeral state.
    ///
    /// Idempotent and safe from any state. Clears every pending coalescer
    /// value and idle deadline, so timer wakeups scheduled before the stop
    /// become no-ops; no callback can mutate state afterwards.
    pub fn stop(&mut self) -> Vec<SessionAction> {
        self.state = SessionState::Disconnected;
        self.reset_ephemeral();
        vec![SessionAction::CloseHandle]
    }

    /// Drop everything tied to the current transport handle: identity,
    /// directory, mode, document, and all role deadlines.
    fn reset_ephemeral(&mut self) {
        self.local_id = None;
        self.user = None;
        self.users.clear();
        self.mode = Mode::default();
        self.diagram = None;

        match &mut self.role {
            RoleState::Host(role) => {
                // A host's room id is its handle identity; gone with it.
                self.room_id = None;
                role.reset();
            },
            RoleState::Guest(role) => role.reset(),
        }
    }

    /// Feed one transport lifecycle event into the state machine.
    ///
    /// Malformed payloads are dropped and logged without surfacing an
    /// error; the connection stays open.
    pub fn handle_event(&mut self, event: TransportEvent, now: E::Instant) -> Vec<SessionAction> {
        if matches!(self.state, SessionState::Disconnected | SessionState::Error) {
            // Events queued behind a stop() or a handle failure must not
            // mutate anything.
            tracing::debug!(state = ?self.state, "transport event outside an active session ignored");
            return Vec::new();
        }

        match event {
            TransportEvent::HandleOpen { id } => self.on_handle_open(id),
            TransportEvent::HandleError { reason } => {
                tracing::warn!(%reason, "transport handle failed");
                self.state = SessionState::Error;
                Vec::new()
            },
            TransportEvent::ConnectionOpen { peer } => match self.role {
                RoleState::Host(_) => self.host_on_connection_open(peer, now),
                RoleState::Guest(_) => self.guest_on_connection_open(peer),
            },
            TransportEvent::Data { peer, payload } => match self.role {
                RoleState::Host(_) => self.host_on_data(peer, payload, now),
                RoleState::Guest(_) => self.guest_on_data(peer, payload),
            },
            TransportEvent::ConnectionClosed { peer } => match self.role {
                RoleState::Host(_) => self.host_on_connection_gone(&peer, now),
                RoleState::Guest(_) => self.guest_on_connection_closed(&peer),
            },
            TransportEvent::ConnectionError { peer, reason } => match self.role {
                RoleState::Host(_) => {
                    // One broken guest connection must not take the whole
                    // room down; it follows the uniform close path.
                    tracing::warn!(%peer, %reason, "guest connection failed");
                    self.host_on_connection_gone(&peer, now)
                },
                RoleState::Guest(_) => self.guest_on_connection_error(&peer, &reason),
            },
        }
    }

    /// Advance timers: flush due coalescer windows and reap idle guests.
    ///
    /// The driver calls this at or after [`SessionStore::next_deadline`].
    /// Calling early or late is safe; calling after `stop()` is a no-op.
    pub fn tick(&mut self, now: E::Instant) -> Vec<SessionAction> {
        match self.role {
            RoleState::Host(_) => self.host_tick(now),
            RoleState::Guest(_) => self.guest_tick(now),
        }
    }

    /// The earliest pending deadline (coalescer flush or idle expiry), if
    /// any.
    pub fn next_deadline(&self) -> Option<E::Instant> {
        match &self.role {
            RoleState::Host(role) => {
                match (role.pending.next_deadline(), role.reaper.next_deadline()) {
                    (Some(flush), Some(reap)) => Some(flush.min(reap)),
                    (flush, reap) => flush.or(reap),
                }
            },
            RoleState::Guest(role) => role.pending.next_deadline(),
        }
    }

    /// Replace the local user and queue the corresponding presence sync.
    pub fn set_user(&mut self, user: User, now: E::Instant) {
        self.user = Some(user);
        self.queue_local_presence(now);
    }

    /// Merge a new cursor position into the local user.
    ///
    /// No-op when no local user exists yet (guest before its connection
    /// opens).
    pub fn set_user_cursor(&mut self, cursor: Cursor, now: E::Instant) {
        let Some(user) = &mut self.user else { return };
        user.cursor = cursor;
        self.queue_local_presence(now);
    }

    /// Set the access mode.
    ///
    /// On a host this broadcasts `syncMode` immediately, bypassing the
    /// coalescer: mode changes are rare and must not wait on a throttle
    /// window. On a guest the change is local-only (guests never originate
    /// sync messages); gating edits by mode is the UI's responsibility.
    pub fn set_mode(&mut self, mode: Mode) -> Vec<SessionAction> {
        self.mode = mode;

        match &self.role {
            RoleState::Host(role) => role
                .connections
                .iter()
                .map(|peer| SessionAction::Send {
                    peer: peer.clone(),
                    message: Message::SyncMode { mode },
                })
                .collect(),
            RoleState::Guest(_) => Vec::new(),
        }
    }

    /// Replace the outbound document snapshot (host only).
    ///
    /// The snapshot is queued on the coalesced broadcast channel. Guests
    /// hold a read-only replica; a guest call is logged and ignored.
    pub fn set_diagram(&mut self, diagram: Diagram, now: E::Instant) {
        match &mut self.role {
            RoleState::Host(role) => {
                self.diagram = Some(diagram.clone());
                role.pending.update(now, |pending| pending.diagram = Some(diagram));
            },
            RoleState::Guest(_) => {
                tracing::warn!("guest attempted to publish a document, ignored");
            },
        }
    }

    fn on_handle_open(&mut self, id: PeerId) -> Vec<SessionAction> {
        self.local_id = Some(id.clone());

        match &self.role {
            RoleState::Host(_) => {
                // The host's identity is the shareable room id.
                self.room_id = Some(id);
                self.state = SessionState::Connected;
                Vec::new()
            },
            RoleState::Guest(role) => {
                // Connected only once the connection itself opens, not
                // merely the local handle.
                vec![SessionAction::Connect { peer: role.room.clone() }]
            },
        }
    }

    fn queue_local_presence(&mut self, now: E::Instant) {
        match self.role {
            RoleState::Host(_) => self.host_queue_presence(now),
            RoleState::Guest(_) => self.guest_queue_user(now),
        }
    }

    /// The outbound presence map: remote users plus the local user under
    /// the local id. `None` until both exist.
    fn presence_with_local(&self) -> Option<PresenceMap> {
        let user = self.user.clone()?;
        let id = self.local_id.clone()?;

        let mut map = self.users.clone();
        map.insert(id, user);
        Some(map)
    }
}

#[cfg(test)]
pub(crate) mod testutil {
    use std::sync::{Arc, Mutex};

    use crate::env::Environment;

    /// Deterministic test environment: real instants (tests pass explicit
    /// offsets everywhere) and a counter-based RNG.
    #[derive(Clone)]
    pub(crate) struct TestEnv {
        counter: Arc<Mutex<u64>>,
    }

    impl TestEnv {
        pub(crate) fn new() -> Self {
            Self { counter: Arc::new(Mutex::new(0)) }
        }
    }

    impl Environment for TestEnv {
        type Instant = std::time::Instant;

        fn now(&self) -> Self::Instant {
            std::time::Instant::now()
        }

        async fn sleep(&self, _duration: std::time::Duration) {}

        fn random_bytes(&self, buffer: &mut [u8]) {
            let mut counter = self.counter.lock().expect("test env lock");
            for chunk in buffer.chunks_mut(8) {
                *counter += 1;
                let bytes = counter.to_be_bytes();
                let len = chunk.len();
                chunk.copy_from_slice(&bytes[..len]);
            }
        }
    }
}
