use thiserror::Error;

/// Top-level error type for the `coolant-api` crate.
///
/// Covers every failure mode of a time-series store round trip:
/// transport, authentication, query execution, and line-protocol writes.
/// `coolant-core` maps these into its own taxonomy.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Credentials rejected by the store (HTTP 401/403).
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request timed out.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// TLS handshake or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Store ───────────────────────────────────────────────────────
    /// Query rejected or failed inside the store.
    #[error("Query failed (HTTP {status}): {message}")]
    Query { status: u16, message: String },

    /// Write rejected by the store.
    #[error("Write failed (HTTP {status}): {message}")]
    Write { status: u16, message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Timeout { .. } => true,
            Self::Query { status, .. } | Self::Write { status, .. } => {
                *status >= 500 || *status == 429
            }
            _ => false,
        }
    }

    /// Returns `true` if the store itself is unusable: unreachable,
    /// misconfigured, or rejecting our credentials.
    ///
    /// Readers abort on these instead of recording a per-uid miss.
    pub fn is_terminal(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_connect() || e.is_builder(),
            Self::Authentication { .. } | Self::InvalidUrl(_) | Self::Tls(_) => true,
            _ => false,
        }
    }

    /// HTTP status attached to the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            Self::Query { status, .. } | Self::Write { status, .. } => Some(*status),
            _ => None,
        }
    }
}
