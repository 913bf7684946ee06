// ── Core error types ──
//
// Errors surfaced by coolant-core. Store-level failures arrive as
// `coolant_api::Error` and are folded into `CoreError::Store` /
// `CoreError::Timeout` so callers never match on HTTP details.

use thiserror::Error;

/// Fatal problems in an architecture document.
///
/// Only the facility block can produce one of these from `build()`;
/// everything below it is downgraded to a `BuildWarning` and skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("architecture document has no `facility` block")]
    MissingFacility,

    #[error("{node} is missing required field `{field}`")]
    MissingField { node: &'static str, field: &'static str },

    #[error("{node} field `{field}` is invalid: {reason}")]
    InvalidField {
        node: &'static str,
        field: &'static str,
        reason: String,
    },

    #[error("uid `{uid}` is declared more than once")]
    DuplicateUid { uid: String },
}

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Model errors ─────────────────────────────────────────────────
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Entity not found: {entity_type} with uid {identifier}")]
    NotFound {
        entity_type: &'static str,
        identifier: String,
    },

    // ── Request errors ───────────────────────────────────────────────
    #[error("Validation failed: {message}")]
    Validation { message: String },

    // ── Store errors ─────────────────────────────────────────────────
    #[error("Store error: {message}")]
    Store {
        message: String,
        /// The store is unreachable or rejects us outright.
        terminal: bool,
        /// Worth trying again: a dropped connection, a 5xx or a 429.
        transient: bool,
    },

    #[error("Store call timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("{channel} write failed on batch {batch} after {attempts} attempt(s): {message}")]
    WriteFailed {
        channel: &'static str,
        batch: usize,
        attempts: u32,
        message: String,
    },
}

impl CoreError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Returns `true` if a read must abort instead of skipping the uid.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Store { terminal: true, .. })
    }

    /// Returns `true` if repeating the same store call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. } | Self::Store { transient: true, .. }
        )
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<coolant_api::Error> for CoreError {
    fn from(err: coolant_api::Error) -> Self {
        match err {
            coolant_api::Error::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            coolant_api::Error::Transport(ref e) if e.is_timeout() => {
                CoreError::Timeout { timeout_secs: 0 }
            }
            other => CoreError::Store {
                terminal: other.is_terminal(),
                transient: other.is_transient(),
                message: other.to_string(),
            },
        }
    }
}
