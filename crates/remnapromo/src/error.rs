//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use remnapromo_config::ConfigError;
use remnapromo_core::CoreError;

/// Process exit codes; success is 0.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not connect to panel at {url}")]
    #[diagnostic(
        code(remnapromo::connection_failed),
        help(
            "Check that the panel is running and reachable.\n\
             URL: {url}\n\
             Self-signed certificate? Try: remnapromo stats --insecure"
        )
    )]
    ConnectionFailed {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    // ── Authentication ───────────────────────────────────────────────

    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(remnapromo::auth_failed),
        help(
            "Verify the panel API token.\n\
             Run: remnapromo config set-token --profile {profile}"
        )
    )]
    AuthFailed { profile: String, message: String },

    #[error("No API token configured for profile '{profile}'")]
    #[diagnostic(
        code(remnapromo::no_credentials),
        help(
            "Configure a token with: remnapromo config init\n\
             Or pass --token / set REMNAPROMO_TOKEN."
        )
    )]
    NoCredentials { profile: String },

    #[error("Operator {operator} is not allowed to manage campaigns")]
    #[diagnostic(
        code(remnapromo::unauthorized),
        help("Add the operator id to [access] admin_ids in the config file.")
    )]
    Unauthorized { operator: u64 },

    // ── Resources ────────────────────────────────────────────────────

    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(code(remnapromo::not_found))]
    NotFound {
        resource_type: String,
        identifier: String,
    },

    // ── API ──────────────────────────────────────────────────────────

    #[error("Panel API error ({code}): {message}")]
    #[diagnostic(code(remnapromo::api_error))]
    ApiError { code: String, message: String },

    // ── Campaign outcomes ────────────────────────────────────────────

    #[error("None of the {requested} subscription(s) for '{tag}' could be created")]
    #[diagnostic(
        code(remnapromo::nothing_created),
        help("Run with -v to see why each create call was refused.")
    )]
    NothingCreated { tag: String, requested: u32 },

    #[error("Could not scan the panel for campaign '{tag}': {reason}")]
    #[diagnostic(
        code(remnapromo::scan_failed),
        help("Nothing was deleted. Check panel connectivity and try again.")
    )]
    ScanFailed { tag: String, reason: String },

    #[error("{message}")]
    #[diagnostic(code(remnapromo::artifact))]
    Artifact { message: String },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(remnapromo::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(remnapromo::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: remnapromo config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No panel configured")]
    #[diagnostic(
        code(remnapromo::no_config),
        help(
            "Create a config with: remnapromo config init\n\
             Expected at: {path}\n\
             Or pass --panel and --token."
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(remnapromo::config))]
    Config(ConfigError),

    // ── Interactive ──────────────────────────────────────────────────

    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(remnapromo::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── Timeout ──────────────────────────────────────────────────────

    #[error("Request timed out after {seconds}s")]
    #[diagnostic(
        code(remnapromo::timeout),
        help("Increase timeout with --timeout or check panel responsiveness.")
    )]
    Timeout { seconds: u64 },

    // ── IO ───────────────────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } | Self::Unauthorized { .. } => {
                exit_code::AUTH
            }
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. } | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        let reason = err.to_string();
        match err {
            CoreError::InvalidTag { .. } => CliError::Validation {
                field: "tag".into(),
                reason,
            },

            CoreError::InvalidCount { .. } => CliError::Validation {
                field: "count".into(),
                reason,
            },

            CoreError::InvalidTraffic { .. } => CliError::Validation {
                field: "traffic".into(),
                reason,
            },

            CoreError::NoSession { .. } | CoreError::UnexpectedInput { .. } => {
                CliError::Validation {
                    field: "wizard".into(),
                    reason,
                }
            }

            CoreError::Unauthorized { operator } => CliError::Unauthorized { operator },

            CoreError::ConnectionFailed { url, reason } => CliError::ConnectionFailed {
                url,
                source: reason.into(),
            },

            CoreError::AuthenticationFailed { message } => CliError::AuthFailed {
                profile: "current".into(),
                message,
            },

            CoreError::Timeout { timeout_secs } => CliError::Timeout {
                seconds: timeout_secs,
            },

            CoreError::UserNotFound { identifier } => CliError::NotFound {
                resource_type: "user".into(),
                identifier,
            },

            CoreError::Api { message, code, status } => CliError::ApiError {
                code: code
                    .or_else(|| status.map(|s| s.to_string()))
                    .unwrap_or_else(|| "unknown".into()),
                message,
            },

            CoreError::Artifact { .. } => CliError::Artifact { message: reason },

            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },

            CoreError::Internal(message) => CliError::ApiError {
                code: "internal".into(),
                message,
            },
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::UnknownProfile { name } => CliError::ProfileNotFound {
                name,
                available: "(see: remnapromo config profiles)".into(),
            },
            ConfigError::NoCredentials { profile } => CliError::NoCredentials { profile },
            other => CliError::Config(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_exit_with_usage_code() {
        let err = CliError::from(CoreError::InvalidCount { count: 0, max: 100 });
        assert_eq!(err.exit_code(), exit_code::USAGE);
        assert!(err.to_string().contains("count"));
    }

    #[test]
    fn core_errors_map_to_documented_exit_codes() {
        let cases = [
            (
                CoreError::AuthenticationFailed {
                    message: "bad token".into(),
                },
                exit_code::AUTH,
            ),
            (
                CoreError::ConnectionFailed {
                    url: "https://panel".into(),
                    reason: "refused".into(),
                },
                exit_code::CONNECTION,
            ),
            (CoreError::Timeout { timeout_secs: 5 }, exit_code::TIMEOUT),
            (
                CoreError::UserNotFound {
                    identifier: "x".into(),
                },
                exit_code::NOT_FOUND,
            ),
            (CoreError::Unauthorized { operator: 9 }, exit_code::AUTH),
            (
                CoreError::Api {
                    message: "boom".into(),
                    code: None,
                    status: Some(500),
                },
                exit_code::GENERAL,
            ),
        ];
        for (core, code) in cases {
            let shown = core.to_string();
            assert_eq!(CliError::from(core).exit_code(), code, "{shown}");
        }
    }

    #[test]
    fn api_error_code_falls_back_to_status() {
        let err = CliError::from(CoreError::Api {
            message: "boom".into(),
            code: None,
            status: Some(502),
        });
        assert_eq!(err.to_string(), "Panel API error (502): boom");
    }

    #[test]
    fn missing_token_is_an_auth_failure() {
        let err = CliError::from(ConfigError::NoCredentials {
            profile: "prod".into(),
        });
        assert_eq!(err.exit_code(), exit_code::AUTH);
    }
}
