// ── Core error types ──
//
// User-facing errors from reolink-core. Consumers never see HTTP status
// codes or JSON parse failures directly; the `From<reolink_api::Error>`
// impl translates protocol errors into these variants.

use thiserror::Error;

use reolink_api::ErrorCode;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to camera at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Not connected to a camera")]
    Disconnected,

    #[error("Camera request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── Operation errors ─────────────────────────────────────────────
    #[error("Operation not supported by this camera: {operation}")]
    Unsupported { operation: String },

    #[error("Invalid channel {channel}: camera has {available} channel(s)")]
    InvalidChannel { channel: u8, available: u8 },

    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("{command} failed: {message}")]
    Api {
        command: String,
        message: String,
        /// The camera's `rspCode`.
        code: i64,
    },

    #[error("Unexpected response from camera: {message}")]
    InvalidResponse { message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

// ── Conversion from protocol-layer errors ────────────────────────────

impl From<reolink_api::Error> for CoreError {
    fn from(err: reolink_api::Error) -> Self {
        use reolink_api::Error as Api;

        match err {
            Api::Connection { url, message } => CoreError::ConnectionFailed {
                url,
                reason: message,
            },
            Api::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            Api::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout { timeout_secs: 0 }
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map(ToString::to_string)
                            .unwrap_or_else(|| "<unknown>".into()),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::InvalidResponse {
                        message: e.to_string(),
                    }
                }
            }
            Api::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid camera address: {e}"),
            },
            Api::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            Api::InvalidResponse { message } => CoreError::InvalidResponse { message },
            Api::Deserialization { message, body: _ } => CoreError::InvalidResponse {
                message: format!("could not parse camera reply: {message}"),
            },
            Api::MissingResponse { command } => CoreError::InvalidResponse {
                message: format!("camera did not answer {command}"),
            },
            Api::InvalidCredentials { status, .. } => CoreError::AuthenticationFailed {
                message: format!("camera rejected the request (HTTP {status})"),
            },
            Api::Protocol(message) => CoreError::AuthenticationFailed { message },
            Api::Api {
                command,
                code,
                detail,
            } => match code {
                ErrorCode::AuthRequired | ErrorCode::LoginFailed | ErrorCode::TokenError => {
                    CoreError::AuthenticationFailed {
                        message: format!("{command}: {code}"),
                    }
                }
                ErrorCode::NotSupported | ErrorCode::AbilityError => CoreError::Unsupported {
                    operation: command,
                },
                _ => CoreError::Api {
                    command,
                    message: if detail.is_empty() {
                        code.to_string()
                    } else {
                        format!("{code}: {detail}")
                    },
                    code: code.code(),
                },
            },
        }
    }
}
