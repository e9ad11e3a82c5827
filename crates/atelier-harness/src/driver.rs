//! Session driver: executes actions against the simulated network.
//!
//! The driver is the I/O half of the action pattern. It owns one session
//! store and one transport handle, turns [`SessionAction`]s into transport
//! calls, feeds transport events back into the store, and wakes the store
//! at its reported deadlines. Production runtimes do the same job against a
//! real transport; the logic under test is identical.

use std::{collections::VecDeque, sync::Arc, time::Duration};

use atelier_core::{
    env::Environment,
    error::SessionError,
    relay::{resolve_relays, RelayProvider},
    session::{SessionAction, SessionConfig, SessionStore},
    transport::{PeerConfig, Transport, TransportEvent, TransportHandle},
};
use atelier_proto::{Cursor, Diagram, Mode, PeerId, User};

use crate::{sim_env::SimEnv, sim_transport::{SimHandle, SimNetwork}};

/// Drives one session store against a [`SimNetwork`].
pub struct SessionDriver {
    env: SimEnv,
    network: SimNetwork,
    session: SessionStore<SimEnv>,
    handle: Option<SimHandle>,
    provider: Option<Arc<dyn RelayProvider>>,
    received_kinds: Vec<String>,
}

impl SessionDriver {
    /// Create a driver around a host session.
    pub fn host(env: SimEnv, network: SimNetwork, config: SessionConfig) -> Self {
        let session = SessionStore::host(env.clone(), config);
        Self::with_session(env, network, session)
    }

    /// Create a driver around a guest session targeting `room`.
    pub fn guest(env: SimEnv, network: SimNetwork, config: SessionConfig, room: PeerId) -> Self {
        let session = SessionStore::guest(env.clone(), config, room);
        Self::with_session(env, network, session)
    }

    fn with_session(env: SimEnv, network: SimNetwork, session: SessionStore<SimEnv>) -> Self {
        Self { env, network, session, handle: None, provider: None, received_kinds: Vec::new() }
    }

    /// Resolve relay descriptors through `provider` when opening handles.
    #[must_use]
    pub fn with_relay_provider(mut self, provider: Arc<dyn RelayProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Read access to the driven session.
    pub fn session(&self) -> &SessionStore<SimEnv> {
        &self.session
    }

    /// Wire tags of every data payload this driver has received, in
    /// arrival order. Lets tests count broadcasts.
    pub fn received_kinds(&self) -> &[String] {
        &self.received_kinds
    }

    /// Start the session and execute the resulting actions.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] if the session is not startable.
    pub async fn start(&mut self) -> Result<(), SessionError> {
        let actions = self.session.start()?;
        self.execute(actions).await;
        Ok(())
    }

    /// Stop the session and tear down the handle.
    pub async fn stop(&mut self) {
        let actions = self.session.stop();
        self.execute(actions).await;
    }

    /// Replace the outbound document snapshot.
    pub fn set_diagram(&mut self, diagram: Diagram) {
        self.session.set_diagram(diagram, self.env.now());
    }

    /// Move the local cursor.
    pub fn set_user_cursor(&mut self, cursor: Cursor) {
        self.session.set_user_cursor(cursor, self.env.now());
    }

    /// Replace the local user.
    pub fn set_user(&mut self, user: User) {
        self.session.set_user(user, self.env.now());
    }

    /// Change the access mode, executing any immediate broadcast.
    pub async fn set_mode(&mut self, mode: Mode) {
        let actions = self.session.set_mode(mode);
        self.execute(actions).await;
    }

    /// Execute a batch of session actions, including any follow-ups they
    /// trigger.
    pub async fn execute(&mut self, actions: Vec<SessionAction>) {
        let mut queue: VecDeque<SessionAction> = actions.into();

        while let Some(action) = queue.pop_front() {
            match action {
                SessionAction::OpenHandle => {
                    let relays = match &self.provider {
                        Some(provider) => resolve_relays(provider.as_ref()).await,
                        None => Vec::new(),
                    };
                    match self.network.open(PeerConfig { relays }).await {
                        Ok(handle) => self.handle = Some(handle),
                        Err(error) => {
                            let event =
                                TransportEvent::HandleError { reason: error.to_string() };
                            queue.extend(self.session.handle_event(event, self.env.now()));
                        },
                    }
                },
                SessionAction::Connect { peer } => {
                    if let Some(handle) = &mut self.handle {
                        if let Err(error) = handle.connect(&peer).await {
                            let event = TransportEvent::ConnectionError {
                                peer,
                                reason: error.to_string(),
                            };
                            queue.extend(self.session.handle_event(event, self.env.now()));
                        }
                    }
                },
                SessionAction::Send { peer, message } => {
                    if let Some(handle) = &mut self.handle {
                        if let Err(error) = handle.send(&peer, &message).await {
                            tracing::debug!(%peer, %error, "send failed, dropping message");
                        }
                    }
                },
                SessionAction::CloseConnection { peer } => {
                    if let Some(handle) = &mut self.handle {
                        let _ = handle.close_connection(&peer).await;
                    }
                },
                SessionAction::CloseHandle => {
                    if let Some(mut handle) = self.handle.take() {
                        handle.close();
                    }
                },
            }
        }
    }

    /// Run due timers and drain queued events once.
    ///
    /// Returns whether anything happened, so callers can loop to
    /// quiescence.
    pub async fn pump_once(&mut self) -> bool {
        let mut progressed = false;

        let now = self.env.now();
        if self.session.next_deadline().is_some_and(|deadline| deadline <= now) {
            let actions = self.session.tick(now);
            self.execute(actions).await;
            progressed = true;
        }

        while let Some(event) = self.handle.as_mut().and_then(SimHandle::try_next_event) {
            if let TransportEvent::Data { payload, .. } = &event {
                let kind = payload
                    .get("type")
                    .and_then(|tag| tag.as_str())
                    .unwrap_or("<untagged>")
                    .to_string();
                self.received_kinds.push(kind);
            }
            let actions = self.session.handle_event(event, self.env.now());
            self.execute(actions).await;
            progressed = true;
        }

        progressed
    }
}

/// Advance virtual time by `duration`, exchanging events and firing
/// deadlines across all `drivers` until the window has fully played out.
///
/// Requires a paused-clock runtime (`#[tokio::test(start_paused = true)]`),
/// where `sleep_until` jumps the clock instead of waiting.
pub async fn settle(drivers: &mut [&mut SessionDriver], duration: Duration) {
    let target = tokio::time::Instant::now() + duration;

    loop {
        // Exchange until quiescent at the current instant.
        loop {
            let mut progressed = false;
            for driver in drivers.iter_mut() {
                progressed |= driver.pump_once().await;
            }
            if !progressed {
                break;
            }
        }

        let now = tokio::time::Instant::now();
        if now >= target {
            break;
        }

        // Jump to the earliest deadline inside the window, or the end.
        let next = drivers.iter().filter_map(|driver| driver.session().next_deadline()).min();
        let step = match next {
            Some(deadline) if deadline < target => deadline.max(now),
            _ => target,
        };
        tokio::time::sleep_until(step).await;
    }
}
