//! `reqwest`-backed transport.

use async_trait::async_trait;
use reqwest::{
    Client, StatusCode,
    header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue},
};
use serde_json::Value;
use tracing::debug;

use montage_core::{
    config::ClientConfig,
    error::{MontageError, MontageResult},
    transport::{Method, RequestArgs, Transport, TransportBuilder},
};

/// Sends Montage requests over HTTP.
///
/// Paths are resolved against the configured base URL, e.g.
/// `http://higley.dev.montagehot.club/api/v1/schemas/`. The `Accept`, `User-Agent` and
/// `X-Requested-With` headers are sent with every request.
///
/// Any non-2xx response becomes [`MontageError::Service`] carrying the status code; network
/// failures carry no status.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
    debug: bool,
}

impl HttpTransport {
    /// Creates a transport for `config`.
    ///
    /// # Errors
    ///
    /// Returns [`MontageError::Initialization`] when a default header is invalid or the HTTP
    /// client cannot be created.
    pub fn new(config: &ClientConfig) -> MontageResult<Self> {
        let mut headers = HeaderMap::new();

        for (name, value) in config.default_headers() {
            headers.insert(
                HeaderName::from_bytes(name.as_bytes())
                    .map_err(|e| MontageError::Initialization(e.to_string()))?,
                HeaderValue::from_str(&value)
                    .map_err(|e| MontageError::Initialization(e.to_string()))?,
            );
        }

        let mut builder = Client::builder().default_headers(headers);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder
                .build()
                .map_err(|e| MontageError::Initialization(e.to_string()))?,
            base_url: config.base_url(),
            debug: config.debug,
        })
    }

    /// Creates a builder for `config`.
    pub fn builder(config: ClientConfig) -> HttpTransportBuilder {
        HttpTransportBuilder::new(config)
    }

    /// The URL every path is resolved against.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

fn http_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Delete => reqwest::Method::DELETE,
    }
}

/// Decodes a response body; an empty body is `null`.
fn decode_body(text: &str) -> MontageResult<Value> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }

    Ok(serde_json::from_str(text)?)
}

/// Error message for a failed response: the body when there is one, else the status reason.
fn failure_message(status: StatusCode, text: &str) -> String {
    match text.trim() {
        "" => status
            .canonical_reason()
            .map_or_else(|| status.to_string(), str::to_string),
        body => body.to_string(),
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn request(&self, method: Method, path: &str, args: RequestArgs) -> MontageResult<Value> {
        let url = self.url(path);
        debug!(%method, %url, "sending Montage request");

        let mut request = self.client.request(http_method(method), &url);

        if !args.query.is_empty() {
            request = request.query(&args.query);
        }
        if !args.form.is_empty() {
            request = request.form(&args.form);
        }
        if let Some(body) = args.body {
            request = request.header(CONTENT_TYPE, "application/json").body(body);
        }
        for (name, value) in &args.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request
            .send()
            .await
            .map_err(|e| MontageError::service(e.status().map(|s| s.as_u16()), e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| MontageError::service(Some(status.as_u16()), e.to_string()))?;

        if self.debug {
            debug!(%method, %url, status = status.as_u16(), body = %text, "Montage response");
        }

        if !status.is_success() {
            return Err(MontageError::service(
                Some(status.as_u16()),
                failure_message(status, &text),
            ));
        }

        decode_body(&text)
    }
}

/// Builder for [`HttpTransport`].
#[derive(Debug, Clone)]
pub struct HttpTransportBuilder {
    config: ClientConfig,
}

impl HttpTransportBuilder {
    /// Creates a builder for a transport configured by `config`.
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl TransportBuilder for HttpTransportBuilder {
    type Transport = HttpTransport;

    async fn build(self) -> MontageResult<Self::Transport> {
        HttpTransport::new(&self.config)
    }
}
