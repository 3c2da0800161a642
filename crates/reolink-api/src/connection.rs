// Protocol session
//
// `Connection` owns the connect/disconnect lifecycle and the single
// `execute` choke point every accessor goes through. It knows nothing
// about login; the current token and cipher come from a `TokenProvider`
// supplied at construction, and auth-required replies are reported back
// to it.

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use bytes::Bytes;
use futures_util::future::BoxFuture;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::Method;
use tracing::{debug, info, warn};
use url::Url;

use crate::command::codec::{self, EncodedBatch};
use crate::command::{CommandRequest, CommandResponse};
use crate::crypto::{self, Cipher};
use crate::error::Error;
use crate::transport::{RawResponse, Transport, TransportConfig};

/// Path of the command endpoint on every camera.
pub const API_PATH: &str = "/cgi-bin/api.cgi";

/// Source of the credentials attached to outgoing batches.
pub trait TokenProvider: Send + Sync {
    /// The current session token, if logged in.
    fn token(&self) -> Option<String>;

    /// The payload cipher negotiated by an encrypted login, if any.
    fn cipher(&self) -> Option<Cipher>;

    /// Called when the camera reports that the token is no longer valid.
    fn invalidate(&self);
}

/// Provider for sessions that never log in.
#[derive(Debug, Default)]
pub struct Anonymous;

impl TokenProvider for Anonymous {
    fn token(&self) -> Option<String> {
        None
    }

    fn cipher(&self) -> Option<Cipher> {
        None
    }

    fn invalidate(&self) {}
}

/// Future returned by disconnect and logout callbacks.
pub type CallbackFuture = BoxFuture<'static, ()>;

/// A cleanup hook run when the session ends.
pub type Callback = Arc<dyn Fn() -> CallbackFuture + Send + Sync>;

/// Lifecycle phase of a [`Connection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

struct Session {
    base_url: Url,
    hostname: String,
    transport: Arc<Transport>,
    generation: u64,
}

struct Inner {
    phase: ConnectionState,
    connection_id: Option<u64>,
    session: Option<Session>,
    generations: u64,
}

/// One logical session with one camera.
pub struct Connection {
    inner: RwLock<Inner>,
    callbacks: Mutex<Vec<Callback>>,
    tokens: Arc<dyn TokenProvider>,
    transport_config: TransportConfig,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.read().expect("connection lock poisoned");
        f.debug_struct("Connection")
            .field("phase", &inner.phase)
            .field(
                "base_url",
                &inner.session.as_ref().map(|s| s.base_url.as_str()),
            )
            .finish_non_exhaustive()
    }
}

impl Connection {
    pub fn new(transport_config: TransportConfig, tokens: Arc<dyn TokenProvider>) -> Self {
        Self {
            inner: RwLock::new(Inner {
                phase: ConnectionState::Disconnected,
                connection_id: None,
                session: None,
                generations: 0,
            }),
            callbacks: Mutex::new(Vec::new()),
            tokens,
            transport_config,
        }
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Open a session to `hostname`.
    ///
    /// Calling this again with arguments that resolve to the same base URL
    /// is a no-op. Different arguments disconnect the current session
    /// first.
    pub async fn connect(
        &self,
        hostname: &str,
        port: Option<u16>,
        timeout: Option<Duration>,
        use_https: Option<bool>,
    ) -> Result<(), Error> {
        let base_url = build_base_url(hostname, port, use_https)?;
        let id = connection_id(&base_url);

        if self.connection_id() == Some(id) {
            debug!(%base_url, "already connected");
            return Ok(());
        }
        if self.has_session() {
            self.disconnect().await;
        }

        self.set_phase(ConnectionState::Connecting);
        let mut config = self.transport_config.clone();
        if let Some(timeout) = timeout {
            config = config.with_timeout(timeout);
        }
        let transport = match Transport::open(config) {
            Ok(transport) => transport,
            Err(e) => {
                self.set_phase(ConnectionState::Disconnected);
                return Err(e);
            }
        };

        let mut inner = self.inner.write().expect("connection lock poisoned");
        inner.generations += 1;
        inner.session = Some(Session {
            base_url: base_url.clone(),
            hostname: hostname.to_owned(),
            transport: Arc::new(transport),
            generation: inner.generations,
        });
        inner.connection_id = Some(id);
        inner.phase = ConnectionState::Connected;
        drop(inner);

        info!(%base_url, "connected");
        Ok(())
    }

    /// End the session.
    ///
    /// The connection identity is cleared first, then every disconnect
    /// callback runs to completion in registration order while the
    /// transport is still usable, then the transport is closed.
    pub async fn disconnect(&self) {
        {
            let mut inner = self.inner.write().expect("connection lock poisoned");
            if inner.session.is_none() {
                return;
            }
            inner.connection_id = None;
        }

        let callbacks: Vec<Callback> = self
            .callbacks
            .lock()
            .expect("callback lock poisoned")
            .clone();
        debug!(count = callbacks.len(), "running disconnect callbacks");
        for callback in callbacks {
            callback().await;
        }

        let session = {
            let mut inner = self.inner.write().expect("connection lock poisoned");
            inner.phase = ConnectionState::Disconnected;
            inner.session.take()
        };
        if let Some(session) = session {
            session.transport.close();
            info!(base_url = %session.base_url, "disconnected");
        }
    }

    /// Register a hook to run on every disconnect.
    pub fn on_disconnect<F>(&self, callback: F)
    where
        F: Fn() -> CallbackFuture + Send + Sync + 'static,
    {
        self.callbacks
            .lock()
            .expect("callback lock poisoned")
            .push(Arc::new(callback));
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn state(&self) -> ConnectionState {
        self.inner.read().expect("connection lock poisoned").phase
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Stable identity of the current session (hash of its base URL).
    pub fn connection_id(&self) -> Option<u64> {
        self.inner
            .read()
            .expect("connection lock poisoned")
            .connection_id
    }

    /// Incremented every time a new transport is opened.
    pub fn generation(&self) -> Option<u64> {
        self.with_session(|s| s.generation)
    }

    pub fn hostname(&self) -> Option<String> {
        self.with_session(|s| s.hostname.clone())
    }

    pub fn base_url(&self) -> Option<Url> {
        self.with_session(|s| s.base_url.clone())
    }

    /// Whether the session runs over TLS.
    pub fn is_https(&self) -> bool {
        self.with_session(|s| s.base_url.scheme() == "https")
            .unwrap_or(false)
    }

    fn has_session(&self) -> bool {
        self.with_session(|_| ()).is_some()
    }

    fn with_session<T>(&self, f: impl FnOnce(&Session) -> T) -> Option<T> {
        self.inner
            .read()
            .expect("connection lock poisoned")
            .session
            .as_ref()
            .map(f)
    }

    fn set_phase(&self, phase: ConnectionState) {
        self.inner.write().expect("connection lock poisoned").phase = phase;
    }

    fn endpoint(&self) -> Result<Option<(Url, Arc<Transport>)>, Error> {
        let Some((base, transport)) =
            self.with_session(|s| (s.base_url.clone(), Arc::clone(&s.transport)))
        else {
            return Ok(None);
        };
        Ok(Some((base.join(API_PATH)?, transport)))
    }

    // ── Execution ────────────────────────────────────────────────────

    /// Send a batch and decode one response per request, in order.
    ///
    /// Returns an empty `Vec` when not connected. Auth-required replies
    /// invalidate the token provider's token. Commands with a raw byte
    /// reply are rejected; they go through [`Connection::execute_binary`].
    pub async fn execute(&self, requests: &[CommandRequest]) -> Result<Vec<CommandResponse>, Error> {
        if requests.is_empty() {
            return Ok(Vec::new());
        }
        if let Some(streaming) = requests.iter().find(|r| r.is_binary()) {
            return Err(Error::Protocol(format!(
                "{} returns raw data; use execute_binary",
                streaming.command()
            )));
        }
        let Some((url, transport)) = self.endpoint()? else {
            debug!("execute called while not connected");
            return Ok(Vec::new());
        };

        let token = self.tokens.token();
        let cipher = self.tokens.cipher();
        let batch = codec::encode(requests, token.as_deref())?;
        let (method, query, body, headers) = prepare(batch, cipher.as_ref());

        debug!(
            commands = requests.len(),
            first = requests[0].command(),
            encrypted = cipher.is_some(),
            "executing batch"
        );
        let raw = transport.send(method, url, &query, body, headers).await?;
        let responses = decode_response(&raw, cipher.as_ref())?;
        self.intercept_auth_required(&responses);
        Ok(responses)
    }

    /// Execute a command whose reply is a raw byte payload.
    ///
    /// Returns `None` when not connected. If the camera answers with JSON
    /// instead, the command error it carries is raised.
    pub async fn execute_binary(&self, request: CommandRequest) -> Result<Option<Bytes>, Error> {
        let Some((url, transport)) = self.endpoint()? else {
            debug!("execute_binary called while not connected");
            return Ok(None);
        };

        let token = self.tokens.token();
        let batch = codec::encode(std::slice::from_ref(&request), token.as_deref())?;
        let raw = transport
            .send(batch.method, url, &batch.query, batch.body, HeaderMap::new())
            .await?;

        if !is_json_content(&raw) {
            return Ok(Some(raw.body));
        }

        let responses = codec::decode(raw.content_type(), &raw.body)?;
        self.intercept_auth_required(&responses);
        match responses.into_iter().next() {
            Some(response) => {
                response.into_value()?;
                Err(Error::InvalidResponse {
                    message: format!("{} returned JSON instead of data", request.command()),
                })
            }
            None => Err(Error::MissingResponse {
                command: request.command().to_owned(),
            }),
        }
    }

    /// Send `request` unauthenticated and in the clear, returning the
    /// `WWW-Authenticate` challenge if the camera offered one.
    pub async fn fetch_challenge(&self, request: &CommandRequest) -> Result<Option<String>, Error> {
        let Some((url, transport)) = self.endpoint()? else {
            return Ok(None);
        };
        let batch = codec::encode(std::slice::from_ref(request), None)?;
        match transport
            .send(batch.method, url, &batch.query, batch.body, HeaderMap::new())
            .await
        {
            Ok(raw) => Ok(raw.www_authenticate().map(String::from)),
            Err(Error::InvalidCredentials { challenge, .. }) => Ok(challenge),
            Err(e) => Err(e),
        }
    }

    fn intercept_auth_required(&self, responses: &[CommandResponse]) {
        if let Some(response) = responses.iter().find(|r| r.is_auth_required()) {
            warn!(
                command = response.command().unwrap_or_default(),
                "camera reports login required; dropping token"
            );
            self.tokens.invalidate();
        }
    }
}

/// Apply payload encryption to an encoded batch.
fn prepare(
    batch: EncodedBatch,
    cipher: Option<&Cipher>,
) -> (Method, Vec<(String, String)>, Option<String>, HeaderMap) {
    let EncodedBatch {
        method,
        mut query,
        body,
    } = batch;
    let mut headers = HeaderMap::new();

    let body = match (body, cipher) {
        (Some(body), Some(cipher)) => {
            query.push(("encrypt".to_owned(), "1".to_owned()));
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
            Some(crypto::encrypt_payload(Some(cipher), body))
        }
        (Some(body), None) => {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            Some(body)
        }
        (None, _) => None,
    };
    (method, query, body, headers)
}

fn decode_response(raw: &RawResponse, cipher: Option<&Cipher>) -> Result<Vec<CommandResponse>, Error> {
    let plain = crypto::decrypt_payload(cipher, &raw.body)?;
    // Decrypted bodies carry whatever content type the camera felt like.
    let content_type = if plain.as_slice() == raw.body.as_ref() {
        raw.content_type()
    } else {
        None
    };
    codec::decode(content_type, &plain)
}

fn is_json_content(raw: &RawResponse) -> bool {
    match raw.content_type() {
        Some(ct) if ct.eq_ignore_ascii_case("application/json") => true,
        Some(ct) if ct.eq_ignore_ascii_case("text/html") => true,
        Some(_) => false,
        None => raw
            .body
            .iter()
            .find(|b| !b.is_ascii_whitespace())
            .is_some_and(|b| *b == b'[' || *b == b'{'),
    }
}

/// Resolve the scheme for a `(port, use_https)` pair.
///
/// Port 443 always means https and port 80 means http unless https is
/// explicitly requested; otherwise `use_https` decides, defaulting to http.
pub fn resolve_https(port: Option<u16>, use_https: Option<bool>) -> bool {
    match (port, use_https) {
        (Some(443), _) => true,
        (Some(80), explicit) => explicit == Some(true),
        (_, explicit) => explicit.unwrap_or(false),
    }
}

/// Build the session base URL.
pub fn build_base_url(hostname: &str, port: Option<u16>, use_https: Option<bool>) -> Result<Url, Error> {
    let scheme = if resolve_https(port, use_https) {
        "https"
    } else {
        "http"
    };
    let host = if hostname.contains(':') && !hostname.starts_with('[') {
        format!("[{hostname}]")
    } else {
        hostname.to_owned()
    };
    let url = match port {
        Some(port) => format!("{scheme}://{host}:{port}/"),
        None => format!("{scheme}://{host}/"),
    };
    Ok(Url::parse(&url)?)
}

fn connection_id(base_url: &Url) -> u64 {
    let mut hasher = DefaultHasher::new();
    base_url.as_str().hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn connection() -> Connection {
        Connection::new(TransportConfig::default(), Arc::new(Anonymous))
    }

    #[test]
    fn scheme_rules() {
        assert!(resolve_https(Some(443), None));
        assert!(resolve_https(Some(443), Some(false)));
        assert!(!resolve_https(Some(80), None));
        assert!(!resolve_https(Some(80), Some(false)));
        assert!(resolve_https(Some(80), Some(true)));
        assert!(resolve_https(Some(8443), Some(true)));
        assert!(!resolve_https(Some(8000), None));
        assert!(!resolve_https(None, None));
        assert!(resolve_https(None, Some(true)));
    }

    #[test]
    fn base_url_shapes() {
        assert_eq!(
            build_base_url("cam.local", None, None).expect("url").as_str(),
            "http://cam.local/"
        );
        assert_eq!(
            build_base_url("10.0.0.5", Some(443), None).expect("url").as_str(),
            "https://10.0.0.5/"
        );
        assert_eq!(
            build_base_url("10.0.0.5", Some(8000), None).expect("url").as_str(),
            "http://10.0.0.5:8000/"
        );
        assert_eq!(
            build_base_url("fe80::1", Some(8000), None).expect("url").as_str(),
            "http://[fe80::1]:8000/"
        );
    }

    #[tokio::test]
    async fn identical_connect_is_a_no_op() {
        let conn = connection();
        let disconnects = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&disconnects);
        conn.on_disconnect(move || {
            let counter = Arc::clone(&counter);
            Box::pin(async move {
                counter.fetch_add(1, Ordering::SeqCst);
            })
        });

        conn.connect("10.0.0.5", Some(80), None, None)
            .await
            .expect("connects");
        let generation = conn.generation();
        let id = conn.connection_id();

        conn.connect("10.0.0.5", Some(80), None, None)
            .await
            .expect("connects");
        assert_eq!(conn.generation(), generation);
        assert_eq!(conn.connection_id(), id);
        assert_eq!(disconnects.load(Ordering::SeqCst), 0);

        conn.connect("10.0.0.6", Some(80), None, None)
            .await
            .expect("connects");
        assert_ne!(conn.generation(), generation);
        assert_ne!(conn.connection_id(), id);
        assert_eq!(disconnects.load(Ordering::SeqCst), 1);
        assert_eq!(conn.hostname().as_deref(), Some("10.0.0.6"));
    }

    #[tokio::test]
    async fn disconnect_runs_callbacks_in_order() {
        let conn = connection();
        let log = Arc::new(Mutex::new(Vec::new()));
        for name in ["auth", "cache"] {
            let log = Arc::clone(&log);
            conn.on_disconnect(move || {
                let log = Arc::clone(&log);
                Box::pin(async move {
                    tokio::task::yield_now().await;
                    log.lock().expect("lock").push(name);
                })
            });
        }

        conn.connect("cam", None, None, None).await.expect("connects");
        assert!(conn.is_connected());
        conn.disconnect().await;
        conn.disconnect().await;

        assert_eq!(*log.lock().expect("lock"), vec!["auth", "cache"]);
        assert_eq!(conn.state(), ConnectionState::Disconnected);
        assert_eq!(conn.connection_id(), None);
        assert_eq!(conn.generation(), None);
    }

    #[tokio::test]
    async fn execute_without_session_returns_nothing() {
        let conn = connection();
        let responses = conn
            .execute(&[crate::command::requests::get_dev_info()])
            .await
            .expect("no error");
        assert!(responses.is_empty());
        assert!(
            conn.execute_binary(crate::command::requests::snap(0, "x"))
                .await
                .expect("no error")
                .is_none()
        );
    }

    #[tokio::test]
    async fn execute_refuses_streaming_commands() {
        use crate::command::requests;

        let conn = connection();
        conn.connect("10.0.0.5", Some(80), None, None)
            .await
            .expect("connects");

        for batch in [
            vec![requests::snap(0, "x")],
            vec![requests::get_time(), requests::snap(0, "x")],
        ] {
            let result = conn.execute(&batch).await;
            assert!(
                matches!(&result, Err(Error::Protocol(msg)) if msg.contains("Snap")),
                "{result:?}"
            );
        }
    }

    #[test]
    fn prepare_encrypts_post_bodies() {
        let batch = EncodedBatch {
            method: Method::POST,
            query: vec![("cmd".into(), "GetDevInfo".into())],
            body: Some(r#"[{"cmd":"GetDevInfo","action":0}]"#.into()),
        };
        let cipher = Cipher::new(*b"0123456789ABCDEF");
        let (_, query, body, headers) = prepare(batch.clone(), Some(&cipher));
        assert!(query.contains(&("encrypt".to_owned(), "1".to_owned())));
        assert_eq!(headers.get(CONTENT_TYPE).expect("ct"), "text/plain");
        let body = body.expect("body");
        assert!(!body.starts_with('['));
        assert_eq!(
            cipher.decrypt(&body).expect("decrypts"),
            batch.body.clone().expect("body")
        );

        let (_, query, body, _) = prepare(batch.clone(), None);
        assert_eq!(query.len(), 1);
        assert_eq!(body, batch.body);
    }
}
