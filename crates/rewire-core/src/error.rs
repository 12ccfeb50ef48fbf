//! Error taxonomy for the interception core.
//!
//! Two channels exist and must not be confused:
//! - [`MockError`] — configuration/lifecycle misuse, surfaced immediately to
//!   the caller of a registry or session operation.
//! - [`CallError`] — the error slot of an intercepted call. It travels
//!   through the dispatch engine next to the result slot and is what an
//!   advice body sees, swallows, or replaces.

/// Error raised by or through an intercepted call.
///
/// Stands in for whatever the instrumented code throws; advice bodies can
/// also produce one, which then becomes the call's thrown error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct CallError {
    /// Human-readable description of the failure.
    pub message: String,
}

impl CallError {
    /// Create a call error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The conventional error for an advice body that assumed the wrong
    /// slot type (the moral equivalent of a failed cast).
    pub fn type_mismatch(expected: &str, got: &str) -> Self {
        Self::new(format!("expected {expected} value, got {got}"))
    }
}

/// Configuration and session-lifecycle errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MockError {
    /// An operation was attempted on a session that has been closed.
    #[error("mock session is already closed")]
    SessionClosed,

    /// A binding handle refers to a binding that is no longer registered.
    #[error("binding is no longer registered")]
    StaleBinding,

    /// Constructor advice failed while creating an instance.
    #[error("constructor advice failed: {0}")]
    Advice(#[from] CallError),
}
