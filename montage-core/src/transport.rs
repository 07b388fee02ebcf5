//! Transport abstraction for talking to the Montage service.
//!
//! The client never opens connections itself. Every request goes through a [`Transport`],
//! which turns a method, a versioned path and a set of [`RequestArgs`] into the decoded JSON
//! body of the response.
//!
//! # Traits
//!
//! - [`Transport`]: the request capability used by the client
//! - [`TransportBuilder`]: factory trait for creating transport instances
//!
//! # Examples
//!
//! ```ignore
//! use montage::transport::{Method, RequestArgs, Transport};
//!
//! let body = transport
//!     .request(
//!         Method::Get,
//!         "api/v1/schemas/movies/query/",
//!         RequestArgs::new().with_query("cursor", "tok1"),
//!     )
//!     .await?;
//! ```

use async_trait::async_trait;
use serde_json::Value;
use std::{collections::BTreeMap, fmt, fmt::Debug, sync::Arc};

use crate::error::MontageResult;

/// HTTP method of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// `GET`
    Get,
    /// `POST`
    Post,
    /// `DELETE`
    Delete,
}

impl Method {
    /// Returns the upper-case method name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Arguments of a single request.
///
/// `query` becomes the URL query string, `form` a url-encoded body and `body` a raw JSON
/// body. `headers` are added on top of the transport's default headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestArgs {
    /// Query string parameters.
    pub query: BTreeMap<String, String>,
    /// Raw JSON request body.
    pub body: Option<String>,
    /// Form parameters, sent url-encoded.
    pub form: BTreeMap<String, String>,
    /// Extra request headers.
    pub headers: BTreeMap<String, String>,
}

impl RequestArgs {
    /// Creates an empty set of arguments.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a query string parameter.
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    /// Sets the raw JSON body.
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Adds a form parameter.
    pub fn with_form(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.form.insert(key.into(), value.into());
        self
    }

    /// Adds a request header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Returns a query string parameter.
    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(String::as_str)
    }
}

/// Abstract request capability used by the client.
///
/// # Error Handling
///
/// Any non-success outcome must be reported as
/// [`MontageError::Service`](crate::error::MontageError::Service). The client propagates
/// these errors unchanged and never retries.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; one transport is shared by every schema handle
/// and document sequence created from a client.
#[async_trait]
pub trait Transport: Send + Sync + Debug {
    /// Issues one request and returns the decoded JSON response body.
    ///
    /// An empty response body decodes to [`Value::Null`].
    ///
    /// # Arguments
    ///
    /// * `method` - The HTTP method
    /// * `path` - The versioned endpoint path, relative to the service base URL
    /// * `args` - Query, form, body and header arguments
    async fn request(&self, method: Method, path: &str, args: RequestArgs) -> MontageResult<Value>;

    /// Releases the transport's resources.
    ///
    /// The default implementation is a no-op.
    async fn shutdown(self) -> MontageResult<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

#[async_trait]
impl<T> Transport for &T
where
    T: Transport + ?Sized,
{
    async fn request(&self, method: Method, path: &str, args: RequestArgs) -> MontageResult<Value> {
        (**self).request(method, path, args).await
    }
}

#[async_trait]
impl<T> Transport for Arc<T>
where
    T: Transport + ?Sized,
{
    async fn request(&self, method: Method, path: &str, args: RequestArgs) -> MontageResult<Value> {
        (**self).request(method, path, args).await
    }
}

#[async_trait]
impl<T> Transport for Box<T>
where
    T: Transport + ?Sized,
{
    async fn request(&self, method: Method, path: &str, args: RequestArgs) -> MontageResult<Value> {
        (**self).request(method, path, args).await
    }
}

/// Factory trait for creating transport instances.
#[async_trait]
pub trait TransportBuilder {
    /// The transport produced by this builder.
    type Transport: Transport;

    /// Builds the transport.
    async fn build(self) -> MontageResult<Self::Transport>;
}
