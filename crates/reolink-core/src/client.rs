// ── Client facade ──
//
// Composition root: one connection, one auth manager, one derived-state
// cache and the facets built on them. Disconnect hooks run in
// registration order, so the token is dropped (with a logout) before
// the cache is wiped.

use std::sync::Arc;

use futures_util::FutureExt;
use tracing::info;

use reolink_api::command::{CommandRequest, CommandResponse};
use reolink_api::connection::CallbackFuture;
use reolink_api::{AuthState, Connection, ConnectionState, Security, TokenProvider};

use crate::cache::{DerivedCache, DeviceTime};
use crate::config::ClientConfig;
use crate::error::CoreError;
use crate::network::Network;
use crate::session::Session;
use crate::system::System;

struct ClientInner {
    config: ClientConfig,
    connection: Arc<Connection>,
    security: Arc<Security>,
    session: Arc<Session>,
    cache: Arc<DerivedCache>,
    system: Arc<System>,
    network: Arc<Network>,
}

/// Typed client for one camera or NVR. Cheap to clone.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl Client {
    pub fn new(config: ClientConfig) -> Self {
        let auth = Arc::new(AuthState::new());
        let tokens: Arc<dyn TokenProvider> = auth.clone();
        let connection = Arc::new(Connection::new(config.transport(), tokens));
        let security = Security::new(Arc::clone(&connection), auth, config.encrypted_login);
        let cache = Arc::new(DerivedCache::new());

        let on_disconnect = Arc::clone(&cache);
        connection.on_disconnect(move || -> CallbackFuture {
            on_disconnect.invalidate();
            async {}.boxed()
        });
        let on_logout = Arc::clone(&cache);
        security.on_logout(move || -> CallbackFuture {
            on_logout.clear_abilities();
            async {}.boxed()
        });

        let session = Arc::new(Session::new(
            Arc::clone(&connection),
            Arc::clone(&security),
            config.credentials.clone(),
        ));
        let system = Arc::new(System::new(Arc::clone(&session), Arc::clone(&cache)));
        let network = Arc::new(Network::new(
            Arc::clone(&session),
            Arc::clone(&cache),
            Arc::clone(&system),
        ));

        Self {
            inner: Arc::new(ClientInner {
                config,
                connection,
                security,
                session,
                cache,
                system,
                network,
            }),
        }
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Open the session and log in with the configured credentials.
    pub async fn connect(&self) -> Result<(), CoreError> {
        let config = &self.inner.config;
        self.inner
            .connection
            .connect(&config.host, config.port, Some(config.timeout), config.use_https)
            .await?;
        if let Err(e) = self.inner.session.ensure_login().await {
            self.disconnect().await;
            return Err(e);
        }
        info!(host = %config.host, "client ready");
        Ok(())
    }

    /// Log out, drop cached state, close the transport.
    pub async fn disconnect(&self) {
        self.inner.connection.disconnect().await;
    }

    /// Log in with the configured credentials if not already authenticated.
    pub async fn login(&self) -> Result<(), CoreError> {
        self.inner.session.ensure_login().await
    }

    pub async fn logout(&self) {
        self.inner.security.logout().await;
    }

    /// Connect, run `f`, disconnect.
    pub async fn oneshot<F, Fut, T>(config: ClientConfig, f: F) -> Result<T, CoreError>
    where
        F: FnOnce(Client) -> Fut,
        Fut: std::future::Future<Output = Result<T, CoreError>>,
    {
        let client = Client::new(config);
        client.connect().await?;
        let result = f(client.clone()).await;
        client.disconnect().await;
        result
    }

    /// Run an arbitrary batch through the authenticated executor.
    pub async fn execute(&self, requests: &[CommandRequest]) -> Result<Vec<CommandResponse>, CoreError> {
        self.inner.session.execute(requests).await
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.inner.connection.state()
    }

    pub fn is_connected(&self) -> bool {
        self.inner.connection.is_connected()
    }

    pub fn authenticated(&self) -> bool {
        self.inner.security.authenticated()
    }

    /// Whether the current session encrypts payloads.
    pub fn is_encrypted(&self) -> bool {
        self.inner.security.is_encrypted()
    }

    pub fn system(&self) -> &System {
        &self.inner.system
    }

    pub fn network(&self) -> &Network {
        &self.inner.network
    }

    pub fn cache(&self) -> &DerivedCache {
        &self.inner.cache
    }

    pub(crate) fn session(&self) -> &Session {
        &self.inner.session
    }

    /// Shortcut for [`System::get_time`].
    pub async fn device_time(&self) -> Result<DeviceTime, CoreError> {
        self.inner.system.get_time().await
    }
}
