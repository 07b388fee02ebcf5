//! Client configuration.
//!
//! A [`ClientConfig`] is an explicit value handed to a transport builder and to the client.
//! Nothing about the connection is kept in process-wide state.
//!
//! # Example
//!
//! ```ignore
//! use montage::config::ClientConfig;
//! use std::time::Duration;
//!
//! let config = ClientConfig::builder("higley")
//!     .with_version(1)
//!     .with_timeout(Duration::from_secs(10))
//!     .build();
//!
//! assert_eq!(config.base_url(), "http://higley.dev.montagehot.club/");
//! ```

use serde::Deserialize;
use std::time::Duration;

/// Domain the service is hosted under when none is configured.
pub const DEFAULT_DOMAIN: &str = "dev.montagehot.club";

/// Connection and identity settings for a Montage client.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientConfig {
    /// Account subdomain, e.g. `higley` for `higley.dev.montagehot.club`.
    pub subdomain: String,
    /// Service domain.
    #[serde(default = "default_domain")]
    pub domain: String,
    /// URL scheme.
    #[serde(default = "default_scheme")]
    pub scheme: String,
    /// API version used in every endpoint path.
    #[serde(default = "default_version")]
    pub version: u32,
    /// API token, when one is already known.
    #[serde(default)]
    pub token: Option<String>,
    /// Log request and response bodies.
    #[serde(default)]
    pub debug: bool,
    /// Per-request timeout enforced by the transport.
    #[serde(default)]
    pub timeout: Option<Duration>,
}

fn default_domain() -> String {
    DEFAULT_DOMAIN.to_string()
}

fn default_scheme() -> String {
    "http".to_string()
}

fn default_version() -> u32 {
    1
}

impl ClientConfig {
    /// Creates a configuration for `subdomain` with every other setting at its default.
    pub fn new(subdomain: impl Into<String>) -> Self {
        Self {
            subdomain: subdomain.into(),
            domain: default_domain(),
            scheme: default_scheme(),
            version: default_version(),
            token: None,
            debug: false,
            timeout: None,
        }
    }

    /// Creates a builder for `subdomain`.
    pub fn builder(subdomain: impl Into<String>) -> ClientConfigBuilder {
        ClientConfigBuilder::new(subdomain)
    }

    /// The base URL every endpoint path is joined onto.
    pub fn base_url(&self) -> String {
        format!("{}://{}.{}/", self.scheme, self.subdomain, self.domain)
    }

    /// The `User-Agent` header value.
    pub fn user_agent(&self) -> String {
        format!("Montage Rust v{}", self.version)
    }

    /// Headers sent with every request, independent of authentication.
    pub fn default_headers(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Accept", "application/json".to_string()),
            ("User-Agent", self.user_agent()),
            ("X-Requested-With", "XMLHttpRequest".to_string()),
        ]
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug, Clone)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Creates a builder for `subdomain` with defaults for everything else.
    pub fn new(subdomain: impl Into<String>) -> Self {
        Self { config: ClientConfig::new(subdomain) }
    }

    /// Sets the service domain.
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.config.domain = domain.into();
        self
    }

    /// Sets the URL scheme (`http` or `https`).
    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.config.scheme = scheme.into();
        self
    }

    /// Sets the API version.
    pub fn with_version(mut self, version: u32) -> Self {
        self.config.version = version;
        self
    }

    /// Sets a known API token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.config.token = Some(token.into());
        self
    }

    /// Enables or disables body logging.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.config.debug = debug;
        self
    }

    /// Sets the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }

    /// Builds and returns the final [`ClientConfig`].
    pub fn build(self) -> ClientConfig {
        self.config
    }
}
