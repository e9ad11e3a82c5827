//! Atelier session engine core logic
//!
//! This crate contains the pure state machine logic for an Atelier
//! collaboration session. It is completely decoupled from I/O, enabling
//! deterministic testing of the connection lifecycle, message handling,
//! broadcast coalescing, and idle-peer eviction.
//!
//! # Architecture: Sans-IO Action Pattern
//!
//! Session logic is strictly separated from transport concerns:
//!
//! ```text
//!      ┌──────────────────────────────┐
//!      │ atelier-core                 │
//!      │ - Session state machine      │
//!      │ - Role dispatch (host/guest) │
//!      │ - Coalescer / idle reaper    │
//!      └──────────────────────────────┘
//!         ↓                       ↓
//! ┌─────────────────┐   ┌─────────────────┐
//! │ atelier-harness │   │ app runtime     │
//! │ (virtual clock) │   │ (real transport)│
//! │ - Sim transport │   │ - System clock  │
//! │ - Seeded RNG    │   │ - Relay creds   │
//! └─────────────────┘   └─────────────────┘
//! ```
//!
//! # Key Principles
//!
//! - No I/O in the core: never call `Instant::now()`, never spawn tasks,
//!   never touch the network. Time arrives as a method parameter; side
//!   effects leave as [`session::SessionAction`] values for a driver to
//!   execute.
//! - Timers are deadlines: the driver sleeps until
//!   [`session::SessionStore::next_deadline`] and calls `tick(now)`.
//!   `stop()` clears every deadline, so a wakeup scheduled before teardown
//!   fires into a no-op.
//! - Single writer: the host owns the document; guests hold a read-only
//!   replica and only ever report presence.
//!
//! # Modules
//!
//! - [`session`]: Session state machine with host/guest role dispatch
//! - [`coalesce`]: Rate-limited last-value-wins broadcast coalescer
//! - [`reaper`]: Idle-connection deadlines (host side)
//! - [`transport`]: Peer transport contract and lifecycle events
//! - [`relay`]: Injected relay-credential provider contract
//! - [`identity`]: Local username persistence contract
//! - [`bridge`]: One-way document propagation into the session
//! - [`factory`]: Construct-once session factory keyed by parameters
//! - [`env`]: Environment abstraction (time, RNG)
//! - [`error`]: Session error types

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod bridge;
pub mod coalesce;
pub mod env;
pub mod error;
pub mod factory;
pub mod identity;
pub mod reaper;
pub mod relay;
pub mod session;
pub mod transport;
