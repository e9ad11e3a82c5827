//! Injected relay-credential provider contract.
//!
//! Relay/traversal server credentials are fetched from an external service
//! whose details (endpoint, API key) belong to the application, not to this
//! engine. The engine consumes the provider once during session start and
//! tolerates failure: a session without relays still works over direct
//! connectivity, it just reaches fewer network topologies.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One relay/traversal server descriptor, as handed to the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayDescriptor {
    /// Server URLs (a single logical server may expose several)
    pub urls: Vec<String>,
    /// Credential username, if the server requires one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Credential secret, if the server requires one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
}

/// Errors from a relay provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayError {
    /// The provider could not produce descriptors
    #[error("relay provider failed: {0}")]
    Provider(String),
}

/// Async source of relay descriptors.
#[async_trait]
pub trait RelayProvider: Send + Sync {
    /// Fetch the current relay descriptors.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError`] on failure; callers treat failure as an empty
    /// list via [`resolve_relays`].
    async fn fetch(&self) -> Result<Vec<RelayDescriptor>, RelayError>;
}

/// Fetch relay descriptors, degrading to an empty list on failure.
///
/// Provider failure is non-fatal: connectivity options shrink silently and
/// the event is logged for diagnostics only.
pub async fn resolve_relays(provider: &(impl RelayProvider + ?Sized)) -> Vec<RelayDescriptor> {
    match provider.fetch().await {
        Ok(relays) => relays,
        Err(error) => {
            tracing::warn!(%error, "relay provider failed, continuing without relays");
            Vec::new()
        },
    }
}
