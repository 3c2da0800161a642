// ── Authenticated executor ──
//
// Wraps a `Connection` and its `Security` with the configured
// credentials: logs in on demand, and when a batch comes back with
// "login required", logs in again and retries that batch once.

use std::sync::Arc;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use reolink_api::command::{self, CommandRequest, CommandResponse};
use reolink_api::{Connection, ErrorCode, Security};

use crate::config::Credentials;
use crate::error::CoreError;

pub struct Session {
    connection: Arc<Connection>,
    security: Arc<Security>,
    credentials: Option<Credentials>,
}

impl Session {
    pub fn new(
        connection: Arc<Connection>,
        security: Arc<Security>,
        credentials: Option<Credentials>,
    ) -> Self {
        Self {
            connection,
            security,
            credentials,
        }
    }

    pub fn connection(&self) -> &Arc<Connection> {
        &self.connection
    }

    pub fn security(&self) -> &Arc<Security> {
        &self.security
    }

    /// The configured login user, if any.
    pub fn username(&self) -> Option<&str> {
        self.credentials.as_ref().map(|c| c.username.as_str())
    }

    /// Log in with the configured credentials unless already authenticated.
    pub async fn ensure_login(&self) -> Result<(), CoreError> {
        let Some(credentials) = &self.credentials else {
            return Ok(());
        };
        if self.security.authenticated() {
            return Ok(());
        }
        debug!(username = %credentials.username, "logging in");
        if self
            .security
            .login(&credentials.username, &credentials.password)
            .await?
        {
            Ok(())
        } else {
            Err(CoreError::AuthenticationFailed {
                message: format!("camera rejected the password for {}", credentials.username),
            })
        }
    }

    fn require_connected(&self) -> Result<(), CoreError> {
        if self.connection.is_connected() {
            Ok(())
        } else {
            Err(CoreError::Disconnected)
        }
    }

    /// Execute a batch, re-authenticating once if the token was rejected.
    pub async fn execute(&self, requests: &[CommandRequest]) -> Result<Vec<CommandResponse>, CoreError> {
        self.require_connected()?;
        self.ensure_login().await?;

        let responses = self.connection.execute(requests).await?;
        if self.credentials.is_some() && responses.iter().any(CommandResponse::is_auth_required) {
            info!("token rejected; logging in again");
            self.ensure_login().await?;
            return Ok(self.connection.execute(requests).await?);
        }
        Ok(responses)
    }

    /// Execute one command and deserialize `value[key]`.
    pub async fn fetch<T: DeserializeOwned>(
        &self,
        request: CommandRequest,
        key: Option<&str>,
    ) -> Result<T, CoreError> {
        let name = request.command().to_owned();
        let responses = self.execute(std::slice::from_ref(&request)).await?;
        let value = command::take_value(&responses, 0, &name)?;
        Ok(command::parse_value(&value, key)?)
    }

    /// Execute one command and only check that it succeeded.
    pub async fn run(&self, request: CommandRequest) -> Result<(), CoreError> {
        let name = request.command().to_owned();
        let responses = self.execute(std::slice::from_ref(&request)).await?;
        command::take_value(&responses, 0, &name)?;
        Ok(())
    }

    /// Execute a command with a raw byte reply.
    pub async fn execute_binary(&self, request: CommandRequest) -> Result<Bytes, CoreError> {
        self.require_connected()?;
        self.ensure_login().await?;

        match self.connection.execute_binary(request.clone()).await {
            Err(e) if e.api_code() == Some(ErrorCode::AuthRequired) && self.credentials.is_some() => {
                info!("token rejected; logging in again");
                self.ensure_login().await?;
                self.connection
                    .execute_binary(request)
                    .await?
                    .ok_or(CoreError::Disconnected)
            }
            other => other?.ok_or(CoreError::Disconnected),
        }
    }
}
