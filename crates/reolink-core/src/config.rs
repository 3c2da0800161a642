// ── Runtime connection configuration ──
//
// These types describe *how* to reach one camera. They carry credential
// data and connection tuning, but never touch disk. The CLI builds a
// `ClientConfig` from a profile and hands it in.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use reolink_api::transport::{TlsMode, TransportConfig};

/// Username/password pair for the camera's token login.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

impl Default for Credentials {
    fn default() -> Self {
        Self {
            username: "admin".into(),
            password: SecretString::from(String::new()),
        }
    }
}

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification. Cameras ship self-signed certificates.
    #[default]
    DangerAcceptInvalid,
}

/// Configuration for one camera session.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Hostname or IP address.
    pub host: String,
    /// HTTP(S) port; `None` uses the scheme default.
    pub port: Option<u16>,
    /// Force or forbid TLS; `None` lets the port decide.
    pub use_https: Option<bool>,
    /// `None` runs without logging in.
    pub credentials: Option<Credentials>,
    /// Attempt the digest handshake and encrypt payloads over plain HTTP.
    pub encrypted_login: bool,
    pub tls: TlsVerification,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "192.168.1.100".into(),
            port: None,
            use_https: None,
            credentials: Some(Credentials::default()),
            encrypted_login: true,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl ClientConfig {
    /// Minimal config for `host` with default credentials.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Self::default()
        }
    }

    pub(crate) fn transport(&self) -> TransportConfig {
        let tls = match &self.tls {
            TlsVerification::SystemDefaults => TlsMode::System,
            TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
            TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
        };
        TransportConfig {
            tls,
            timeout: self.timeout,
        }
    }
}
