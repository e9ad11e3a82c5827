//! Environment abstraction for deterministic testing.
//!
//! The `Environment` trait decouples session logic from system resources
//! (time, randomness). The session store never calls `Instant::now()` or a
//! global RNG; it receives an environment at construction and time as a
//! parameter on every method that needs it.
//!
//! The environment is implemented twice:
//!
//! 1. `SimEnv` (atelier-harness): tokio's paused virtual clock and a seeded
//!    ChaCha20 RNG, for reproducible tests.
//! 2. A production runtime: real system clock and OS entropy.
//!
//! # Invariants
//!
//! - Monotonicity: `now()` never goes backwards
//! - Determinism: with the same seed, `random_bytes()` produces the same
//!   sequence

use std::time::Duration;

/// Abstract environment providing time and randomness.
///
/// # Type Parameters
///
/// - `Instant`: a point in time. Virtual in simulation, real in production.
///   Must support deadline arithmetic (`now + interval`) and elapsed-time
///   computation (`later - earlier`).
pub trait Environment: Clone + Send + Sync + 'static {
    /// Type representing a point in time.
    type Instant: Copy
        + Ord
        + Send
        + Sync
        + std::ops::Add<Duration, Output = Self::Instant>
        + std::ops::Sub<Output = Duration>;

    /// Returns the current time.
    ///
    /// Must never decrease within a single execution context.
    fn now(&self) -> Self::Instant;

    /// Sleeps for the specified duration.
    ///
    /// Driver-only: session logic never sleeps, it returns deadlines for
    /// the driver to wait on.
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send;

    /// Fills the provided buffer with random bytes.
    ///
    /// Seeded and reproducible in simulation; OS entropy in production.
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Generates a random `u64`.
    ///
    /// Convenience for picking usernames/colors from the default pools.
    fn random_u64(&self) -> u64 {
        let mut bytes = [0u8; 8];
        self.random_bytes(&mut bytes);
        u64::from_be_bytes(bytes)
    }
}
