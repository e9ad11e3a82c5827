//! Error types for the session engine core.
//!
//! Malformed inbound messages are deliberately NOT represented here: per
//! the protocol contract they are dropped and logged without surfacing an
//! error to the caller or closing the connection. `SessionError` covers
//! misuse of the session API itself.

use thiserror::Error;

use crate::session::SessionState;

/// Errors from session state machine operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// Invalid state transition attempted
    #[error("invalid state transition: cannot {operation} from {state:?}")]
    InvalidState {
        /// Current state when the error occurred
        state: SessionState,
        /// Operation that was attempted
        operation: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_state_display_names_the_operation() {
        let err =
            SessionError::InvalidState { state: SessionState::Connected, operation: "start" };
        assert_eq!(err.to_string(), "invalid state transition: cannot start from Connected");
    }
}
