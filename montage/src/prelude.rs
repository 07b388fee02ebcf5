//! Convenient re-exports of commonly used types from montage.
//!
//! ```ignore
//! use montage::prelude::*;
//! ```
//!
//! This provides access to:
//! - The client and its configuration
//! - Query construction and document sequences
//! - Schema and document handles
//! - The transport traits and error types

pub use montage_core::{
    client::Montage,
    config::{ClientConfig, ClientConfigBuilder},
    endpoint::Endpoint,
    error::{MontageError, MontageResult},
    fetcher::PageFetcher,
    page::{Document, Page},
    query::{Descriptor, QueryBuilder, SortDirection},
    schema::{Documents, Schema},
    sequence::{DocumentSequence, TypedDocumentSequence},
    transport::{Method, RequestArgs, Transport, TransportBuilder},
};
