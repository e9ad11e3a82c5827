//! Atelier wire protocol
//!
//! This crate defines the JSON wire format spoken between a session host and
//! its guests: the tagged message union, the user/presence types, and the
//! diagram snapshot the messages carry.
//!
//! # Design Rationale
//!
//! ## Why JSON Instead of a Binary Format?
//!
//! - **Transport fit**: The peer transport delivers structured
//!   (JSON-serializable) values; there is no byte-stream framing layer to
//!   put a binary format into.
//!
//! - **Forward Compatibility**: Unknown fields are tolerated on decode, so
//!   newer peers can add optional fields without breaking older ones.
//!   Unknown message tags are rejected, never silently ignored.
//!
//! ## Full-Value Snapshots
//!
//! Every message carries a complete snapshot of the field(s) it updates,
//! never a delta. Receiving a message twice, or out of order relative to a
//! different connection, is safe: handling is an idempotent overwrite.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod diagram;
pub mod errors;
pub mod message;
pub mod user;

pub use diagram::{Column, ColumnFlags, Diagram, Position, Relation, Table};
pub use errors::ProtocolError;
pub use message::{Message, Mode, PeerId, PresenceMap};
pub use user::{Cursor, User};
