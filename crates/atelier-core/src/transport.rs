//! Peer transport contract.
//!
//! The `Transport` trait abstracts over connection-oriented peer transports
//! that address remote peers by an opaque string identity and deliver
//! structured JSON-serializable messages. This matches the data-channel
//! model of browser peer transports:
//!
//! - **Handle**: a local endpoint, assigned its identity asynchronously by
//!   the signaling layer (`HandleOpen` event)
//! - **Connections**: logical, named-peer links multiplexed under one
//!   handle, each with `open`/`data`/`close`/`error` lifecycle events
//!
//! # Assumptions the core makes
//!
//! - Per-connection delivery is reliable and ordered: no loss, no
//!   reordering within one connection. Nothing is guaranteed across
//!   different connections.
//! - Any `HandleError`/`ConnectionError`, and any `ConnectionClosed`, is
//!   terminal for that handle/connection. The core never reconnects.
//!
//! # Implementations
//!
//! - `SimNetwork` (atelier-harness): in-memory peer registry for
//!   deterministic testing
//! - Production adapters wrap a real peer/data-channel stack

use std::io;

use async_trait::async_trait;
use atelier_proto::{Message, PeerId};

use crate::relay::RelayDescriptor;

/// Configuration for opening a local peer handle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeerConfig {
    /// Relay/traversal descriptors from the injected provider; empty when
    /// the provider failed or none are configured (direct connectivity
    /// only).
    pub relays: Vec<RelayDescriptor>,
}

/// Lifecycle events emitted by a transport handle.
///
/// The driver feeds every event into
/// [`SessionStore::handle_event`](crate::session::SessionStore::handle_event)
/// together with the current time.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// The local handle is open and has been assigned its identity
    HandleOpen {
        /// Transport-assigned local peer identity
        id: PeerId,
    },
    /// The local handle failed; terminal for the whole session
    HandleError {
        /// Transport-reported reason, for logging
        reason: String,
    },
    /// A logical connection to `peer` is open (initiated or accepted)
    ConnectionOpen {
        /// Remote peer identity
        peer: PeerId,
    },
    /// A structured payload arrived from `peer`; not yet validated
    Data {
        /// Remote peer identity
        peer: PeerId,
        /// Raw JSON payload, validated by the session before use
        payload: serde_json::Value,
    },
    /// The connection to `peer` closed (voluntarily or force-closed)
    ConnectionClosed {
        /// Remote peer identity
        peer: PeerId,
    },
    /// The connection to `peer` failed; terminal for that connection
    ConnectionError {
        /// Remote peer identity
        peer: PeerId,
        /// Transport-reported reason, for logging
        reason: String,
    },
}

/// Factory for local peer handles.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// The handle type produced by [`Transport::open`].
    type Handle: TransportHandle;

    /// Open a local peer handle.
    ///
    /// The handle's identity is not known until it emits
    /// [`TransportEvent::HandleOpen`].
    ///
    /// # Errors
    ///
    /// Returns `io::Error` if the transport cannot allocate an endpoint.
    async fn open(&self, config: PeerConfig) -> io::Result<Self::Handle>;
}

/// An open local peer endpoint.
#[async_trait]
pub trait TransportHandle: Send + 'static {
    /// Open a logical connection to the named remote peer.
    ///
    /// Completion is signaled by [`TransportEvent::ConnectionOpen`], not by
    /// this method returning.
    ///
    /// # Errors
    ///
    /// Returns `io::Error` if the handle is closed.
    async fn connect(&mut self, peer: &PeerId) -> io::Result<()>;

    /// Send a message over the open connection to `peer`.
    ///
    /// # Errors
    ///
    /// Returns `io::Error` if no open connection to `peer` exists.
    async fn send(&mut self, peer: &PeerId, message: &Message) -> io::Result<()>;

    /// Force-close the connection to `peer`, if one exists.
    ///
    /// # Errors
    ///
    /// Returns `io::Error` if the handle is closed.
    async fn close_connection(&mut self, peer: &PeerId) -> io::Result<()>;

    /// Receive the next lifecycle event.
    ///
    /// Returns `None` once the handle is closed and drained.
    async fn next_event(&mut self) -> Option<TransportEvent>;

    /// Destroy the handle and all its connections.
    fn close(&mut self);
}
