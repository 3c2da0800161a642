use thiserror::Error;

use crate::error_code::ErrorCode;

/// Top-level error type for the `reolink-api` crate.
///
/// Covers every failure mode of the command protocol: transport,
/// payload decoding, HTTP-level credential rejection, in-band command
/// errors and the digest/cipher handshake. `reolink-core` maps these into
/// user-facing diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// Connection refused, DNS failure, reset by peer.
    #[error("Cannot connect to {url}: {message}")]
    Connection { url: String, message: String },

    /// Request timed out.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// Any other HTTP transport error.
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS setup or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Payload ─────────────────────────────────────────────────────
    /// Malformed payload, unexpected content type, or HTTP 5xx.
    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },

    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    /// An otherwise successful batch did not contain the expected reply.
    #[error("No response for command {command}")]
    MissingResponse { command: String },

    // ── Authentication ──────────────────────────────────────────────
    /// HTTP 4xx from the camera. Carries the `WWW-Authenticate` header,
    /// if the camera offered a digest challenge.
    #[error("Invalid credentials or unauthorized (HTTP {status})")]
    InvalidCredentials {
        status: u16,
        challenge: Option<String>,
    },

    /// Digest challenge or cipher failure during encrypted login.
    #[error("Protocol error: {0}")]
    Protocol(String),

    // ── Command ─────────────────────────────────────────────────────
    /// In-band `{"error": {"rspCode", "detail"}}` entry for a command.
    #[error("{command} failed: {code}: {detail}")]
    Api {
        command: String,
        code: ErrorCode,
        detail: String,
    },
}

impl Error {
    /// Returns `true` for network-level failures a caller may retry.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Connection { .. } | Self::Timeout { .. } => true,
            _ => false,
        }
    }

    /// Returns `true` if re-authenticating might resolve this error.
    pub fn is_auth_required(&self) -> bool {
        match self {
            Self::InvalidCredentials { .. } => true,
            Self::Api { code, .. } => *code == ErrorCode::AuthRequired,
            _ => false,
        }
    }

    /// The in-band response code, if this is a command error.
    pub fn api_code(&self) -> Option<ErrorCode> {
        match self {
            Self::Api { code, .. } => Some(*code),
            _ => None,
        }
    }
}
