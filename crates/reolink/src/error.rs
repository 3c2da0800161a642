//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors
//! with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use reolink_config::ConfigError;
use reolink_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const UNSUPPORTED: i32 = 5;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to camera at {url}")]
    #[diagnostic(
        code(reolink::connection_failed),
        help(
            "Check that the camera is powered and reachable.\n\
             Reason: {reason}\n\
             Try: reolink info --host <ip> --http"
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("Not connected to a camera")]
    #[diagnostic(code(reolink::disconnected))]
    Disconnected,

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(reolink::auth_failed),
        help(
            "Verify the username and password.\n\
             Store a password with: reolink config set-password --profile <name>\n\
             Or pass --ask-password, or set REOLINK_PASSWORD."
        )
    )]
    AuthFailed { message: String },

    #[error("No password configured for profile '{profile}'")]
    #[diagnostic(
        code(reolink::no_credentials),
        help(
            "Set REOLINK_PASSWORD, pass --ask-password,\n\
             or run: reolink config set-password --profile {profile}"
        )
    )]
    NoCredentials { profile: String },

    // ── Camera ───────────────────────────────────────────────────────
    #[error("{command} failed ({code}): {message}")]
    #[diagnostic(code(reolink::api_error))]
    Api {
        command: String,
        code: i64,
        message: String,
    },

    #[error("Not supported by this camera: {operation}")]
    #[diagnostic(
        code(reolink::unsupported),
        help("Run `reolink abilities` to see what this device reports.")
    )]
    Unsupported { operation: String },

    #[error("Unexpected response from camera: {message}")]
    #[diagnostic(code(reolink::invalid_response))]
    InvalidResponse { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(reolink::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(reolink::profile_not_found),
        help("Available profiles: {available}")
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No camera selected")]
    #[diagnostic(
        code(reolink::no_config),
        help(
            "Pass --host <ip>, set REOLINK_HOST, or add a profile to\n\
             {path}"
        )
    )]
    NoConfig { path: String },

    #[error("Configuration error: {message}")]
    #[diagnostic(code(reolink::config))]
    Config { message: String },

    // ── Timeout ──────────────────────────────────────────────────────
    #[error("Request timed out after {seconds}s")]
    #[diagnostic(
        code(reolink::timeout),
        help("Increase the timeout with --timeout or check the camera's network.")
    )]
    Timeout { seconds: u64 },

    // ── IO ───────────────────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::Disconnected => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. } | Self::NoConfig { .. } | Self::ProfileNotFound { .. } => {
                exit_code::USAGE
            }
            Self::Unsupported { .. } => exit_code::UNSUPPORTED,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => CliError::ConnectionFailed { url, reason },
            CoreError::AuthenticationFailed { message } => CliError::AuthFailed { message },
            CoreError::Disconnected => CliError::Disconnected,
            CoreError::Timeout { timeout_secs } => CliError::Timeout {
                seconds: timeout_secs,
            },
            CoreError::Unsupported { operation } => CliError::Unsupported { operation },
            CoreError::InvalidChannel { channel, available } => CliError::Validation {
                field: "channel".into(),
                reason: format!("{channel} is out of range; the device has {available} channel(s)"),
            },
            CoreError::InvalidArgument { message } => CliError::Validation {
                field: "argument".into(),
                reason: message,
            },
            CoreError::Api {
                command,
                message,
                code,
            } => CliError::Api {
                command,
                code,
                message,
            },
            CoreError::InvalidResponse { message } => CliError::InvalidResponse { message },
            CoreError::Config { message } => CliError::Config { message },
            CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::NoCredentials { profile } => CliError::NoCredentials { profile },
            ConfigError::ProfileNotFound { name, available } => CliError::ProfileNotFound {
                name,
                available: if available.is_empty() {
                    "(none)".into()
                } else {
                    available.join(", ")
                },
            },
            ConfigError::Io(e) => CliError::Io(e),
            other => CliError::Config {
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_errors_map_to_exit_codes() {
        let auth: CliError = CoreError::AuthenticationFailed {
            message: "rejected".into(),
        }
        .into();
        assert_eq!(auth.exit_code(), exit_code::AUTH);

        let channel: CliError = CoreError::InvalidChannel {
            channel: 4,
            available: 1,
        }
        .into();
        assert_eq!(channel.exit_code(), exit_code::USAGE);

        let timeout: CliError = CoreError::Timeout { timeout_secs: 5 }.into();
        assert_eq!(timeout.exit_code(), exit_code::TIMEOUT);
    }

    #[test]
    fn missing_profile_lists_alternatives() {
        let err: CliError = ConfigError::ProfileNotFound {
            name: "garage".into(),
            available: vec!["front".into(), "nvr".into()],
        }
        .into();
        match err {
            CliError::ProfileNotFound { available, .. } => assert_eq!(available, "front, nvr"),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
