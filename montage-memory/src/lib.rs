//! In-memory Montage service for development and testing.
//!
//! This crate provides [`InMemoryService`], a [`Transport`](montage_core::transport::Transport)
//! that serves the Montage API from process memory instead of forwarding requests over HTTP.
//!
//! # Features
//!
//! - **Same wire contract** - Versioned paths, `{data}` envelopes and `cursors.next` paging
//! - **Query evaluation** - Equality filters, ordering, offset, limit and batch sizes
//! - **Accounts** - Username/password login and optional token enforcement
//! - **Test hooks** - Request recording and failure injection
//!
//! # Quick Start
//!
//! ```ignore
//! use montage::prelude::*;
//! use montage::memory::InMemoryService;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let service = InMemoryService::builder().with_schema("movies").build().await?;
//!     let client = Montage::new(service, ClientConfig::new("higley"));
//!
//!     let mut document = Document::new();
//!     document.insert("title".into(), "Alien".into());
//!     client.schema("movies").save(document).await?;
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as montage_memory;

mod evaluator;
pub mod service;

pub use service::{InMemoryService, InMemoryServiceBuilder, RecordedRequest};
