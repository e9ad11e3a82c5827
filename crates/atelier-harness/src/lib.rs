//! Deterministic simulation harness for the Atelier session engine.
//!
//! This crate provides in-memory implementations of the `Environment` and
//! `Transport` traits plus a driver that executes session actions, enabling
//! deterministic, reproducible testing of the collaboration lifecycle on
//! tokio's paused virtual clock.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod driver;
pub mod sim_env;
pub mod sim_transport;

pub use driver::{settle, SessionDriver};
pub use sim_env::SimEnv;
pub use sim_transport::{SimHandle, SimNetwork};
