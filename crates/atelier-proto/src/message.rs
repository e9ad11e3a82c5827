//! Tagged message union and validation.
//!
//! Six message kinds flow between host and guests. Direction is fixed by
//! role: guests originate `join` and `user`; the host originates `sync`,
//! `syncUsers`, `syncDiagram`, and `syncMode`. Each message is a
//! self-contained full-value snapshot, so duplicate or stale delivery
//! overwrites idempotently instead of accumulating.

use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};

use crate::{Diagram, User, errors::ProtocolError};

/// Opaque peer identity assigned by the transport at handle-open time.
///
/// The host's own identity doubles as the room id guests connect to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(String);

impl PeerId {
    /// Wrap a transport-assigned identity string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PeerId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Live directory of remote users, keyed by peer identity.
///
/// Sorted map so broadcast payloads and iteration order are deterministic.
pub type PresenceMap = BTreeMap<PeerId, User>;

/// Access mode for the shared document. Host-controlled, replicated to
/// guests so their UI can gate edit actions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Mode {
    /// Guests observe only
    #[default]
    Read,
    /// Editing enabled (UI-level; the engine stays host-authoritative)
    Edit,
}

/// All wire messages.
///
/// The `type` tag on the wire uses the original camelCase names. Unknown
/// tags fail validation; unknown sibling fields are tolerated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Message {
    /// Guest announces itself after its connection to the host opens
    Join {
        /// The joining guest's user
        user: User,
    },
    /// Host replies to a join with the full current state
    Sync {
        /// Current access mode
        mode: Mode,
        /// Current document snapshot
        diagram: Diagram,
        /// Current presence directory
        users: PresenceMap,
    },
    /// Host replaces the presence directory
    SyncUsers {
        /// New presence directory
        users: PresenceMap,
    },
    /// Host replaces the document snapshot
    SyncDiagram {
        /// New document snapshot
        diagram: Diagram,
    },
    /// Host replaces the access mode (bypasses coalescing)
    SyncMode {
        /// New access mode
        mode: Mode,
    },
    /// Guest reports its updated user (cursor moves, renames)
    User {
        /// The sender's user
        user: User,
    },
}

impl Message {
    /// The wire tag for this message, for logging.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Join { .. } => "join",
            Self::Sync { .. } => "sync",
            Self::SyncUsers { .. } => "syncUsers",
            Self::SyncDiagram { .. } => "syncDiagram",
            Self::SyncMode { .. } => "syncMode",
            Self::User { .. } => "user",
        }
    }

    /// Validate and decode an inbound payload.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Validation`] if the payload is not a
    /// well-formed message. The caller drops the payload and keeps the
    /// connection open.
    pub fn decode(payload: serde_json::Value) -> Result<Self, ProtocolError> {
        serde_json::from_value(payload).map_err(|e| ProtocolError::Validation(e.to_string()))
    }

    /// Encode for transmission.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Encode`] if serialization fails.
    pub fn encode(&self) -> Result<serde_json::Value, ProtocolError> {
        serde_json::to_value(self).map_err(|e| ProtocolError::Encode(e.to_string()))
    }
}
