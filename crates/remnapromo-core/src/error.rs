// ── Core error types ──
//
// User-facing errors from remnapromo-core. Consumers never see HTTP status
// codes or JSON parse failures directly: the `From<remnapromo_api::Error>`
// impl translates transport-layer errors into domain variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Validation errors (fail fast, no side effects) ───────────────
    #[error("Invalid campaign tag {tag:?}: {reason}")]
    InvalidTag { tag: String, reason: String },

    #[error("Invalid count {count}: must be between 1 and {max}")]
    InvalidCount { count: i64, max: u32 },

    #[error("Invalid traffic preset {gb} GB: choose one of {presets}")]
    InvalidTraffic { gb: i64, presets: String },

    // ── Conversation errors ──────────────────────────────────────────
    #[error("Operator {operator} is not allowed to manage campaigns")]
    Unauthorized { operator: u64 },

    #[error("No campaign draft in progress for operator {operator}")]
    NoSession { operator: u64 },

    #[error("Unexpected input: the campaign draft is waiting for {expected}")]
    UnexpectedInput { expected: &'static str },

    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to panel at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Panel request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── Data errors ──────────────────────────────────────────────────
    #[error("User not found: {identifier}")]
    UserNotFound { identifier: String },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("Panel API error: {message}")]
    Api {
        message: String,
        /// The panel's own error code, when it sends one.
        code: Option<String>,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Artifact errors ──────────────────────────────────────────────
    #[error("Could not write listing artifact: {message}")]
    Artifact { message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// `true` for errors raised before any panel call was made.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidTag { .. }
                | Self::InvalidCount { .. }
                | Self::InvalidTraffic { .. }
                | Self::UnexpectedInput { .. }
        )
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<remnapromo_api::Error> for CoreError {
    fn from(err: remnapromo_api::Error) -> Self {
        use remnapromo_api::Error as ApiError;

        let status = err.status();
        let not_found = err.is_not_found();
        match err {
            ApiError::Authentication { message } | ApiError::InvalidToken { message } => {
                CoreError::AuthenticationFailed { message }
            }
            ApiError::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout { timeout_secs: 0 }
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        code: None,
                        status,
                    }
                }
            }
            ApiError::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            ApiError::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            ApiError::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            ApiError::Panel { message, .. } if not_found => CoreError::UserNotFound {
                identifier: message,
            },
            ApiError::Panel { message, code, .. } => CoreError::Api {
                message,
                code,
                status,
            },
            ApiError::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
            ApiError::MissingPayload { what } => CoreError::Api {
                message: format!("response did not contain {what}"),
                code: None,
                status: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panel_404_becomes_user_not_found() {
        let err = CoreError::from(remnapromo_api::Error::Panel {
            status: 404,
            message: "User not found".into(),
            code: None,
        });
        assert!(matches!(err, CoreError::UserNotFound { .. }));
    }

    #[test]
    fn rejected_token_becomes_authentication_failure() {
        let err = CoreError::from(remnapromo_api::Error::Authentication {
            message: "HTTP 401".into(),
        });
        assert!(matches!(err, CoreError::AuthenticationFailed { .. }));
        assert!(!err.is_validation());
    }

    #[test]
    fn validation_errors_are_flagged() {
        assert!(CoreError::InvalidCount { count: 0, max: 100 }.is_validation());
        assert!(
            CoreError::InvalidTag {
                tag: "a b".into(),
                reason: "whitespace".into()
            }
            .is_validation()
        );
    }
}
