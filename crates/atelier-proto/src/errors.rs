//! Error types for wire protocol encoding and validation.

use thiserror::Error;

/// Errors from message encoding or validation.
///
/// A `Validation` error on an inbound payload is never fatal for the
/// connection: the receiver drops the message, logs it, and keeps the
/// connection open.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Inbound payload failed schema validation
    #[error("invalid message: {0}")]
    Validation(String),

    /// Outbound message could not be serialized
    #[error("message encoding failed: {0}")]
    Encode(String),
}
