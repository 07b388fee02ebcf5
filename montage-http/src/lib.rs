//! HTTP transport for the Montage client.
//!
//! This crate provides [`HttpTransport`], a [`Transport`](montage_core::transport::Transport)
//! built on `reqwest`. It is enabled in the `montage` crate through the default `http`
//! feature.
//!
//! # Example
//!
//! ```ignore
//! use montage::{prelude::*, http::HttpTransport};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::builder("higley").with_version(1).build();
//!     let client = Montage::new(HttpTransport::new(&config)?, config);
//!
//!     client.auth("user@example.com", "secret").await?;
//!     println!("{}", client.user().await?);
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as montage_http;

pub mod transport;

pub use transport::{HttpTransport, HttpTransportBuilder};
