//! The Montage client.
//!
//! [`Montage`] binds a [`Transport`] to a [`ClientConfig`] and the API token. It is the entry
//! point for authentication, schema and file access, and it is itself a [`Transport`]: every
//! request made through it carries the `Authorization` header once a token is known.
//!
//! # Example
//!
//! ```ignore
//! use montage::prelude::*;
//!
//! let client = Montage::new(transport, ClientConfig::new("higley"));
//! client.auth("user@example.com", "secret").await?;
//!
//! let mut movies = client.schema("movies").documents().iter();
//! while let Some(movie) = movies.try_next().await? {
//!     println!("Movie Title: {}", movie["title"]);
//! }
//! ```

use async_trait::async_trait;
use mea::rwlock::RwLock;
use serde_json::Value;
use tracing::{info, warn};

use crate::{
    config::ClientConfig,
    endpoint::{Endpoint, url_for},
    error::{MontageError, MontageResult},
    schema::Schema,
    transport::{Method, RequestArgs, Transport},
};

/// A client for one Montage account.
#[derive(Debug)]
pub struct Montage<T: Transport> {
    transport: T,
    config: ClientConfig,
    token: RwLock<Option<String>>,
}

impl<T: Transport> Montage<T> {
    /// Creates a client. A token present in `config` is used right away.
    pub fn new(transport: T, config: ClientConfig) -> Self {
        let token = config.token.clone();

        Self {
            transport,
            config,
            token: RwLock::new(token),
        }
    }

    /// The configuration this client was created with.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// The API version used in endpoint paths.
    pub fn version(&self) -> u32 {
        self.config.version
    }

    /// The current API token, if any.
    pub async fn token(&self) -> Option<String> {
        self.token.read().await.clone()
    }

    /// Replaces the API token.
    pub async fn set_token(&self, token: Option<String>) {
        *self.token.write().await = token;
    }

    /// Renders the versioned path of the endpoint named `key`.
    ///
    /// # Errors
    ///
    /// Returns [`MontageError::UnknownEndpoint`] for an unknown key.
    pub fn url(
        &self,
        key: &str,
        schema: Option<&str>,
        document_id: Option<&str>,
        file_id: Option<&str>,
    ) -> MontageResult<String> {
        url_for(self.config.version, key, schema, document_id, file_id)
    }

    pub(crate) fn endpoint_url(
        &self,
        endpoint: Endpoint,
        schema: Option<&str>,
        document_id: Option<&str>,
        file_id: Option<&str>,
    ) -> MontageResult<String> {
        endpoint.url(self.config.version, schema, document_id, file_id)
    }

    /// Authenticates with a username and password and stores the returned token.
    ///
    /// Does nothing when a token is already known.
    ///
    /// # Errors
    ///
    /// Returns [`MontageError::Auth`] when either credential is empty or the service rejects
    /// them.
    pub async fn auth(&self, username: &str, password: &str) -> MontageResult<&Self> {
        if self.token.read().await.is_some() {
            return Ok(self);
        }

        if username.is_empty() || password.is_empty() {
            return Err(MontageError::Auth("Must provide a username and password.".into()));
        }

        let args = RequestArgs::new()
            .with_form("username", username)
            .with_form("password", password);

        let body = match self
            .request(Method::Post, &self.endpoint_url(Endpoint::Auth, None, None, None)?, args)
            .await
        {
            Ok(body) => body,
            Err(MontageError::Service { .. }) => {
                return Err(MontageError::Auth("Could not authenticate with Montage.".into()));
            }
            Err(other) => return Err(other),
        };

        let token = body
            .pointer("/data/token")
            .and_then(Value::as_str)
            .ok_or_else(|| MontageError::Auth("Authentication response did not contain a token.".into()))?
            .to_string();

        *self.token.write().await = Some(token);
        info!(subdomain = %self.config.subdomain, "authenticated with Montage");

        Ok(self)
    }

    async fn require_token(&self) -> MontageResult<String> {
        self.token
            .read()
            .await
            .clone()
            .ok_or_else(|| MontageError::Auth("Must provide a token before getting a user.".into()))
    }

    /// Returns the user the current token belongs to.
    ///
    /// # Errors
    ///
    /// Returns [`MontageError::Auth`] when no token is known or the service rejects it.
    pub async fn user(&self) -> MontageResult<Value> {
        let token = self.require_token().await?;

        match self
            .request(Method::Get, &self.endpoint_url(Endpoint::User, None, None, None)?, RequestArgs::new())
            .await
        {
            Ok(body) => Ok(response_data(body)),
            Err(MontageError::Service { .. }) => Err(MontageError::Auth(format!(
                "Could not retrieve a user with token {token}"
            ))),
            Err(other) => Err(other),
        }
    }

    /// Lists the schemas visible to the current token.
    pub async fn schemas(&self) -> MontageResult<Value> {
        let url = self.endpoint_url(Endpoint::SchemaList, None, None, None)?;

        Ok(response_data(self.request(Method::Get, &url, RequestArgs::new()).await?))
    }

    /// Returns a handle for the schema called `name`. No request is made.
    pub fn schema(&self, name: impl Into<String>) -> Schema<'_, T> {
        Schema::new(name.into(), self)
    }

    /// Lists the files of the account.
    pub async fn files(&self) -> MontageResult<Value> {
        let url = self.endpoint_url(Endpoint::FileList, None, None, None)?;

        Ok(response_data(self.request(Method::Get, &url, RequestArgs::new()).await?))
    }

    /// Returns the metadata of one file.
    pub async fn file(&self, file_id: &str) -> MontageResult<Value> {
        let url = self.endpoint_url(Endpoint::FileDetail, None, None, Some(file_id))?;

        Ok(response_data(self.request(Method::Get, &url, RequestArgs::new()).await?))
    }

    /// Deletes one file.
    pub async fn delete_file(&self, file_id: &str) -> MontageResult<()> {
        let url = self.endpoint_url(Endpoint::FileDetail, None, None, Some(file_id))?;
        self.request(Method::Delete, &url, RequestArgs::new()).await?;

        Ok(())
    }

    /// Shuts down the underlying transport.
    pub async fn shutdown(self) -> MontageResult<()> {
        self.transport.shutdown().await
    }
}

#[async_trait]
impl<T: Transport> Transport for Montage<T> {
    async fn request(&self, method: Method, path: &str, args: RequestArgs) -> MontageResult<Value> {
        let token = self.token.read().await.clone();
        let args = match token {
            Some(token) => args.with_header("Authorization", format!("Token {token}")),
            None => args,
        };

        self.transport
            .request(method, path, args)
            .await
            .inspect_err(|e| warn!(%method, path, error = %e, "Montage request failed"))
    }

    async fn shutdown(self) -> MontageResult<()> {
        self.transport.shutdown().await
    }
}

/// Unwraps the `data` member of a response envelope, or returns the body unchanged.
pub(crate) fn response_data(body: Value) -> Value {
    match body {
        Value::Object(mut map) => match map.remove("data") {
            Some(data) => data,
            None => Value::Object(map),
        },
        other => other,
    }
}
