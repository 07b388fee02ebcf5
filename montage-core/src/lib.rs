//! Core of an async client for the Montage document store HTTP API.
//!
//! This crate holds everything that does not depend on a particular HTTP stack:
//!
//! - **Client** ([`client`]) - Authentication, schema and file access over any transport
//! - **Configuration** ([`config`]) - Account, host and API version settings
//! - **Endpoints** ([`endpoint`]) - The versioned endpoint table of the service
//! - **Query descriptors** ([`query`]) - Immutable construction of document queries
//! - **Pages** ([`page`]) - The `{data, cursors.next}` response shape of query endpoints
//! - **Page fetching** ([`fetcher`]) - First-page and cursor requests against a schema
//! - **Document sequences** ([`sequence`]) - Lazy iteration across every page of a query
//! - **Schemas** ([`schema`]) - Per-schema queries and single-document requests
//! - **Transport** ([`transport`]) - The request seam implemented by backends
//! - **Error handling** ([`error`]) - Error and result types
//!
//! # Example
//!
//! ```ignore
//! use montage_core::{client::Montage, config::ClientConfig};
//!
//! let client = Montage::new(transport, ClientConfig::new("higley"));
//! client.auth("user@example.com", "secret").await?;
//!
//! let movies = client
//!     .schema("movies")
//!     .documents()
//!     .order_by("year", "desc")?
//!     .limit(10)
//!     .try_collect_all()
//!     .await?;
//! ```

#[allow(unused_extern_crates)]
extern crate self as montage_core;

pub mod client;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod fetcher;
pub mod page;
pub mod query;
pub mod schema;
pub mod sequence;
pub mod transport;

#[cfg(test)]
mod testing;
