// HTTP transport for the CGI endpoint.
//
// Owns the pooled `reqwest::Client` for one camera session, builds it from
// a shared `TransportConfig`, and normalizes HTTP status codes and
// reqwest failures into `Error` variants. Payload shape is not inspected
// here; that is the codec's job.

use std::path::PathBuf;
use std::sync::RwLock;
use std::time::Duration;

use bytes::Bytes;
use reqwest::header::{CONTENT_TYPE, HeaderMap, WWW_AUTHENTICATE};
use reqwest::{Method, StatusCode};
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;

/// TLS verification mode.
#[derive(Debug, Clone)]
pub enum TlsMode {
    /// Use the system certificate store.
    System,
    /// Use a custom CA certificate from the given PEM file.
    CustomCa(PathBuf),
    /// Accept any certificate (cameras ship self-signed certs).
    DangerAcceptInvalid,
}

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub tls: TlsMode,
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            tls: TlsMode::DangerAcceptInvalid,
            timeout: Duration::from_secs(30),
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("reolink-api/", env!("CARGO_PKG_VERSION")));

        match &self.tls {
            TlsMode::System => {}
            TlsMode::CustomCa(path) => {
                let cert_pem = std::fs::read(path)
                    .map_err(|e| Error::Tls(format!("failed to read CA cert: {e}")))?;
                let cert = reqwest::Certificate::from_pem(&cert_pem)
                    .map_err(|e| Error::Tls(format!("invalid CA cert: {e}")))?;
                builder = builder.add_root_certificate(cert);
            }
            TlsMode::DangerAcceptInvalid => {
                builder = builder.danger_accept_invalid_certs(true);
            }
        }

        builder
            .build()
            .map_err(|e| Error::Tls(format!("failed to build HTTP client: {e}")))
    }

    /// Same config with a different request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// A fully read HTTP response.
///
/// The underlying reqwest response is consumed inside [`Transport::send`],
/// so the connection goes back to the pool on every exit path.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl RawResponse {
    /// The `Content-Type` header, without parameters.
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim())
    }

    /// The `WWW-Authenticate` header, if the camera sent one.
    pub fn www_authenticate(&self) -> Option<&str> {
        self.headers
            .get(WWW_AUTHENTICATE)
            .and_then(|v| v.to_str().ok())
    }
}

/// Connection-pooled HTTP transport for one camera session.
pub struct Transport {
    config: TransportConfig,
    client: RwLock<Option<reqwest::Client>>,
}

impl Transport {
    /// Create a transport and open its client immediately.
    pub fn open(config: TransportConfig) -> Result<Self, Error> {
        let client = config.build_client()?;
        Ok(Self {
            config,
            client: RwLock::new(Some(client)),
        })
    }

    /// Wrap a pre-built client (tests, custom middleware).
    pub fn with_client(config: TransportConfig, client: reqwest::Client) -> Self {
        Self {
            config,
            client: RwLock::new(Some(client)),
        }
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Whether the pooled client is currently open.
    pub fn is_open(&self) -> bool {
        self.client.read().expect("transport lock poisoned").is_some()
    }

    /// Return the pooled client, rebuilding it if it was closed.
    pub fn ensure_open(&self) -> Result<reqwest::Client, Error> {
        if let Some(client) = self.client.read().expect("transport lock poisoned").as_ref() {
            return Ok(client.clone());
        }

        let mut guard = self.client.write().expect("transport lock poisoned");
        if let Some(client) = guard.as_ref() {
            return Ok(client.clone());
        }
        debug!("reopening HTTP client");
        let client = self.config.build_client()?;
        *guard = Some(client.clone());
        Ok(client)
    }

    /// Drop the pooled client. Idle connections close with it.
    pub fn close(&self) {
        if self
            .client
            .write()
            .expect("transport lock poisoned")
            .take()
            .is_some()
        {
            debug!("HTTP client closed");
        }
    }

    /// Send a request and read the whole body.
    ///
    /// Status mapping: `>= 500` is [`Error::InvalidResponse`],
    /// `400..500` is [`Error::InvalidCredentials`], anything else is
    /// returned as-is for the codec to validate.
    pub async fn send(
        &self,
        method: Method,
        url: Url,
        query: &[(String, String)],
        body: Option<String>,
        headers: HeaderMap,
    ) -> Result<RawResponse, Error> {
        let client = self.ensure_open()?;
        debug!(%method, path = url.path(), "sending request");

        let mut builder = client.request(method, url.clone()).headers(headers);
        if !query.is_empty() {
            builder = builder.query(query);
        }
        if let Some(body) = body {
            builder = builder.body(body);
        }

        let resp = builder.send().await.map_err(|e| self.map_send_error(&url, e))?;
        let status = resp.status();
        let headers = resp.headers().clone();
        trace!(%status, "response headers received");

        if status.is_server_error() {
            return Err(Error::InvalidResponse {
                message: format!("HTTP {status}"),
            });
        }
        if status.is_client_error() {
            let challenge = headers
                .get(WWW_AUTHENTICATE)
                .and_then(|v| v.to_str().ok())
                .map(String::from);
            return Err(Error::InvalidCredentials {
                status: status.as_u16(),
                challenge,
            });
        }

        let body = resp.bytes().await.map_err(|e| self.map_send_error(&url, e))?;
        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }

    fn map_send_error(&self, url: &Url, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Timeout {
                timeout_secs: self.config.timeout.as_secs(),
            }
        } else if err.is_connect() {
            Error::Connection {
                url: url.to_string(),
                message: err.to_string(),
            }
        } else {
            Error::Transport(err)
        }
    }
}
