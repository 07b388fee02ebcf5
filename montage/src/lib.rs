//! An async client for the Montage document store HTTP API.
//!
//! This crate is the primary entry point for users of the Montage client. It re-exports the
//! core types from `montage-core` and gives access to the available transports.
//!
//! # Features
//!
//! - **Lazy pagination** - Iterate over every document of a query; pages are requested only
//!   as they are consumed
//! - **Immutable queries** - Query builders return new values and can be shared and reused
//! - **Typed documents** - Decode documents into your own Serde types
//! - **Pluggable transports** - HTTP by default, plus an in-memory service for tests
//!
//! # Quick Start
//!
//! ```ignore
//! use montage::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> MontageResult<()> {
//!     let client = montage::connect(ClientConfig::new("higley")).await?;
//!     client.auth("user@example.com", "secret").await?;
//!
//!     let movies = client
//!         .schema("movies")
//!         .documents()
//!         .filter([("genre", "drama")])
//!         .order_by("year", "desc")?;
//!
//!     let mut sequence = movies.iter();
//!     while let Some(movie) = sequence.try_next().await? {
//!         println!("Movie Title: {}", movie["title"]);
//!     }
//!
//!     client.shutdown().await
//! }
//! ```
//!
//! # Typed Documents
//!
//! ```ignore
//! use montage::prelude::*;
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Serialize, Deserialize)]
//! pub struct Movie {
//!     pub id: Option<String>,
//!     pub title: String,
//!     pub year: u32,
//! }
//!
//! let movies = client.schema("movies");
//! let saved = movies.save_typed(&Movie { id: None, title: "Ran".into(), year: 1985 }).await?;
//!
//! let all: Vec<Movie> = movies.documents().typed::<Movie>().try_collect_all().await?;
//! ```
//!
//! # Transports
//!
//! - [`memory`] - In-memory service for development and testing
//! - [`http`] - `reqwest`-backed HTTP transport (requires the default `http` feature)

pub mod prelude;

pub use montage_core::{
    client, config, endpoint, error, fetcher, page, query, schema, sequence, transport,
};

// Re-export JSON types for convenience
pub use serde_json;

/// In-memory service implementation.
pub mod memory {
    pub use montage_memory::{InMemoryService, InMemoryServiceBuilder, RecordedRequest};
}

/// HTTP transport implementation.
///
/// This module is only available when the `http` feature is enabled.
#[cfg(feature = "http")]
pub mod http {
    pub use montage_http::{HttpTransport, HttpTransportBuilder};
}

/// Creates a client that talks to the service described by `config` over HTTP.
///
/// # Errors
///
/// Returns [`MontageError::Initialization`](error::MontageError::Initialization) when the
/// HTTP transport cannot be created.
#[cfg(feature = "http")]
pub async fn connect(
    config: config::ClientConfig,
) -> error::MontageResult<client::Montage<http::HttpTransport>> {
    use crate::transport::TransportBuilder;

    let transport = http::HttpTransportBuilder::new(config.clone()).build().await?;

    Ok(client::Montage::new(transport, config))
}
