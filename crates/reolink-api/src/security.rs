// Authentication manager
//
// `AuthState` holds the token, its expiry and the payload cipher, and is
// the `TokenProvider` the `Connection` consults on every batch.
// `Security` drives login and logout on top of it: plaintext or
// digest-encrypted login, identity-change detection, and logout hooks.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, RwLock, Weak};
use std::time::{Duration, Instant};

use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info, warn};

use crate::command::requests::{self, cmd};
use crate::command::{self, CommandRequest, CommandResponse};
use crate::connection::{API_PATH, Callback, CallbackFuture, Connection, TokenProvider};
use crate::crypto::{self, Cipher, DigestChallenge};
use crate::error::Error;
use crate::error_code::ErrorCode;
use crate::models::LoginValue;

/// Tokens with less than this left are treated as expired.
const EXPIRY_GRACE: Duration = Duration::from_secs(1);

// ── Auth state ───────────────────────────────────────────────────────

#[derive(Default)]
struct AuthInner {
    token: String,
    expires_at: Option<Instant>,
    authentication_id: Option<u64>,
    cipher: Option<Cipher>,
}

/// Shared token, expiry and cipher for one session.
#[derive(Default)]
pub struct AuthState {
    inner: RwLock<AuthInner>,
}

impl AuthState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Time left before the token expires (zero when logged out).
    pub fn authentication_timeout(&self) -> Duration {
        self.inner
            .read()
            .expect("auth lock poisoned")
            .expires_at
            .map_or(Duration::ZERO, |at| {
                at.saturating_duration_since(Instant::now())
            })
    }

    /// A token is held and has more than one second left.
    pub fn authenticated(&self) -> bool {
        let has_token = !self.inner.read().expect("auth lock poisoned").token.is_empty();
        has_token && self.authentication_timeout() > EXPIRY_GRACE
    }

    /// Whether payloads are currently encrypted.
    pub fn is_encrypted(&self) -> bool {
        self.inner.read().expect("auth lock poisoned").cipher.is_some()
    }

    fn authentication_id(&self) -> Option<u64> {
        self.inner
            .read()
            .expect("auth lock poisoned")
            .authentication_id
    }

    fn store(&self, token: String, lease: Duration, identity: u64, cipher: Option<Cipher>) {
        let mut inner = self.inner.write().expect("auth lock poisoned");
        inner.token = token;
        inner.expires_at = Some(Instant::now() + lease);
        inner.authentication_id = Some(identity);
        inner.cipher = cipher;
    }

    fn clear(&self) {
        let mut inner = self.inner.write().expect("auth lock poisoned");
        inner.token.clear();
        inner.expires_at = None;
        inner.cipher = None;
    }
}

impl TokenProvider for AuthState {
    fn token(&self) -> Option<String> {
        let inner = self.inner.read().expect("auth lock poisoned");
        (!inner.token.is_empty()).then(|| inner.token.clone())
    }

    fn cipher(&self) -> Option<Cipher> {
        self.inner.read().expect("auth lock poisoned").cipher.clone()
    }

    fn invalidate(&self) {
        self.clear();
    }
}

/// Identity of a login: the username together with the password.
fn identity_hash(username: &str, password: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    username.hash(&mut hasher);
    password.hash(&mut hasher);
    hasher.finish()
}

// ── Security ─────────────────────────────────────────────────────────

/// Login/logout state machine for one [`Connection`].
pub struct Security {
    connection: Arc<Connection>,
    state: Arc<AuthState>,
    encrypted_login: bool,
    login_lock: tokio::sync::Mutex<()>,
    logout_callbacks: Mutex<Vec<Callback>>,
}

impl Security {
    /// Build the manager and register its logout as a disconnect hook.
    ///
    /// `state` must be the same provider the `connection` was built with.
    pub fn new(connection: Arc<Connection>, state: Arc<AuthState>, encrypted_login: bool) -> Arc<Self> {
        let security = Arc::new(Self {
            connection: Arc::clone(&connection),
            state,
            encrypted_login,
            login_lock: tokio::sync::Mutex::new(()),
            logout_callbacks: Mutex::new(Vec::new()),
        });

        let weak: Weak<Self> = Arc::downgrade(&security);
        connection.on_disconnect(move || -> CallbackFuture {
            let weak = weak.clone();
            Box::pin(async move {
                if let Some(security) = weak.upgrade() {
                    security.logout().await;
                }
            })
        });
        security
    }

    pub fn authenticated(&self) -> bool {
        self.state.authenticated()
    }

    pub fn authentication_timeout(&self) -> Duration {
        self.state.authentication_timeout()
    }

    pub fn is_encrypted(&self) -> bool {
        self.state.is_encrypted()
    }

    /// Install a token obtained elsewhere for `username` / `password`.
    pub fn store_token(
        &self,
        username: &str,
        password: &SecretString,
        token: impl Into<String>,
        lease: Duration,
    ) {
        let identity = identity_hash(username, password.expose_secret());
        self.state.store(token.into(), lease, identity, None);
    }

    /// Register a hook to run after each logout.
    pub fn on_logout<F>(&self, callback: F)
    where
        F: Fn() -> CallbackFuture + Send + Sync + 'static,
    {
        self.logout_callbacks
            .lock()
            .expect("callback lock poisoned")
            .push(Arc::new(callback));
    }

    /// Log in, returning `false` when the camera rejects the credentials.
    ///
    /// Logging in with different credentials (another user, or the same
    /// user with another password) logs the current session out first.
    /// Already holding a valid token for the same credentials is a no-op.
    pub async fn login(&self, username: &str, password: &SecretString) -> Result<bool, Error> {
        let _guard = self.login_lock.lock().await;
        let identity = identity_hash(username, password.expose_secret());

        if self.state.authentication_id().is_some_and(|id| id != identity) {
            debug!("login identity changed");
            self.logout_locked().await;
        } else if self.state.authenticated() {
            return Ok(true);
        }
        self.state.clear();

        let password = password.expose_secret();
        if self.encrypted_login
            && !self.connection.is_https()
            && let Some(ok) = self.digest_login(username, password, identity).await?
        {
            return Ok(ok);
        }

        self.submit_login(requests::login(username, password), identity, None)
            .await
    }

    async fn digest_login(
        &self,
        username: &str,
        password: &str,
        identity: u64,
    ) -> Result<Option<bool>, Error> {
        let probe = requests::login_probe(username);
        let Some(header) = self.connection.fetch_challenge(&probe).await? else {
            warn!("camera sent no digest challenge; using plaintext login");
            return Ok(None);
        };

        let challenge = match DigestChallenge::parse(&header, username, "POST", API_PATH) {
            Ok(challenge) => challenge,
            Err(e) => {
                warn!(error = %e, "unusable digest challenge; using plaintext login");
                return Ok(None);
            }
        };

        let digest = crypto::compute_digest_response(&challenge, password);
        let cipher = Cipher::new(digest.key);
        let request = requests::login_digest(&challenge, &digest);
        self.submit_login(request, identity, Some(cipher))
            .await
            .map(Some)
    }

    async fn submit_login(
        &self,
        request: CommandRequest,
        identity: u64,
        cipher: Option<Cipher>,
    ) -> Result<bool, Error> {
        let responses = self.connection.execute(&[request]).await?;
        let value = match command::take_value(&responses, 0, cmd::LOGIN) {
            Ok(value) => value,
            Err(Error::Api {
                code: ErrorCode::LoginFailed,
                ..
            }) => {
                info!("login rejected by camera");
                return Ok(false);
            }
            Err(e) => return Err(e),
        };

        let login: LoginValue = command::parse_value(&value, None)?;
        let encrypted = cipher.is_some();
        self.state.store(
            login.token.name,
            Duration::from_secs(login.token.lease_time),
            identity,
            cipher,
        );
        info!(
            lease_secs = login.token.lease_time,
            encrypted, "logged in"
        );
        Ok(true)
    }

    /// Log out. Local state is cleared even if the camera call fails.
    pub async fn logout(&self) {
        let _guard = self.login_lock.lock().await;
        self.logout_locked().await;
    }

    async fn logout_locked(&self) {
        if !self.state.authenticated() {
            self.state.clear();
            return;
        }

        match self.connection.execute(&[requests::logout()]).await {
            Ok(responses) => {
                if let Some(CommandResponse::Error { error, .. }) =
                    responses.iter().find(|r| r.is_error())
                {
                    debug!(code = %error.code, "logout refused by camera");
                }
            }
            Err(e) => warn!(error = %e, "logout request failed; clearing local state"),
        }

        let callbacks: Vec<Callback> = self
            .logout_callbacks
            .lock()
            .expect("callback lock poisoned")
            .clone();
        for callback in callbacks {
            callback().await;
        }

        self.state.clear();
        info!("logged out");
    }
}
