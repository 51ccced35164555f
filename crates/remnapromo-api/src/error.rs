use thiserror::Error;

/// Top-level error type for the `remnapromo-api` crate.
///
/// Covers every failure mode of the panel REST surface: authentication,
/// transport, HTTP-level rejections, and payload decoding.
/// `remnapromo-core` maps these into domain errors.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// The panel rejected the bearer token (HTTP 401/403).
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// The token could not be turned into a header value.
    #[error("Invalid API token: {message}")]
    InvalidToken { message: String },

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

    // ── Panel API ───────────────────────────────────────────────────
    /// Non-success HTTP response from the panel.
    #[error("Panel API error (HTTP {status}): {message}")]
    Panel {
        status: u16,
        message: String,
        code: Option<String>,
    },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    /// The response decoded but did not carry the expected record.
    #[error("Response did not contain {what}")]
    MissingPayload { what: &'static str },
}

impl Error {
    /// Returns `true` if the token was rejected.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::Authentication { .. } | Self::InvalidToken { .. })
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Timeout { .. } => true,
            Self::Panel { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Transport(e) => e.status() == Some(reqwest::StatusCode::NOT_FOUND),
            Self::Panel { status: 404, .. } => true,
            _ => false,
        }
    }

    /// The HTTP status attached to this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Panel { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
