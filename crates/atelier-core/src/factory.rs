//! Construct-once session factory keyed by parameters.
//!
//! UI layers tend to request "the" session from several places (a toolbar,
//! a share dialog, a reconnect banner) without coordinating. The factory
//! makes that safe: equal parameters always yield the same shared store,
//! and a store is constructed at most once per key. Which session a caller
//! gets is decided by the parameters alone, never by request order.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use atelier_proto::PeerId;

use crate::{
    env::Environment,
    session::{SessionConfig, SessionStore},
};

/// What kind of session to construct. This is the entire cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SessionParams {
    /// Host a new room around the local document
    Host,
    /// Join an existing room as a read-only guest
    Guest {
        /// Room id to join (the host's peer identity)
        room: PeerId,
    },
}

/// Shared handle to one session store.
pub type SharedSession<E> = Arc<Mutex<SessionStore<E>>>;

/// Lazily constructs and caches one session store per parameter set.
pub struct SessionFactory<E: Environment> {
    env: E,
    config: SessionConfig,
    sessions: Mutex<HashMap<SessionParams, SharedSession<E>>>,
}

impl<E: Environment> SessionFactory<E> {
    /// Create a factory; every constructed session shares `config`.
    pub fn new(env: E, config: SessionConfig) -> Self {
        Self { env, config, sessions: Mutex::new(HashMap::new()) }
    }

    /// The session for `params`, constructed on first request.
    pub fn obtain(&self, params: SessionParams) -> SharedSession<E> {
        let mut sessions = match self.sessions.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        sessions
            .entry(params.clone())
            .or_insert_with(|| {
                tracing::debug!(?params, "constructing session store");
                let store = match &params {
                    SessionParams::Host => {
                        SessionStore::host(self.env.clone(), self.config.clone())
                    },
                    SessionParams::Guest { room } => {
                        SessionStore::guest(self.env.clone(), self.config.clone(), room.clone())
                    },
                };
                Arc::new(Mutex::new(store))
            })
            .clone()
    }

    /// Drop the cached store for `params`, if any. Callers evict after a
    /// final `stop()` so the next `obtain` starts from a fresh store.
    pub fn evict(&self, params: &SessionParams) {
        let mut sessions = match self.sessions.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        sessions.remove(params);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::testutil::TestEnv;

    fn factory() -> SessionFactory<TestEnv> {
        SessionFactory::new(TestEnv::new(), SessionConfig::default())
    }

    #[test]
    fn equal_params_share_one_store() {
        let factory = factory();

        let first = factory.obtain(SessionParams::Host);
        let second = factory.obtain(SessionParams::Host);
        assert!(Arc::ptr_eq(&first, &second));

        let guest_a = factory.obtain(SessionParams::Guest { room: PeerId::from("room-1") });
        let guest_b = factory.obtain(SessionParams::Guest { room: PeerId::from("room-1") });
        assert!(Arc::ptr_eq(&guest_a, &guest_b));
    }

    #[test]
    fn different_params_get_distinct_stores() {
        let factory = factory();

        let host = factory.obtain(SessionParams::Host);
        let guest = factory.obtain(SessionParams::Guest { room: PeerId::from("room-1") });
        let other = factory.obtain(SessionParams::Guest { room: PeerId::from("room-2") });

        assert!(!Arc::ptr_eq(&host, &guest));
        assert!(!Arc::ptr_eq(&guest, &other));
    }

    #[test]
    fn evict_forces_a_fresh_store() {
        let factory = factory();
        let params = SessionParams::Guest { room: PeerId::from("room-1") };

        let first = factory.obtain(params.clone());
        factory.evict(&params);
        let second = factory.obtain(params);

        assert!(!Arc::ptr_eq(&first, &second));
    }
}
