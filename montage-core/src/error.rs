//! Error types and result types for Montage client operations.
//!
//! Every fallible operation in the client returns [`MontageResult<T>`]. Errors raised by a
//! transport are carried through the query builder, page fetcher and document sequence
//! without being caught or translated.

use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// Represents all possible errors that can occur when talking to the Montage service.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MontageError {
    /// A builder or descriptor argument was outside its allowed set (e.g. a sort direction
    /// other than `asc` or `desc`). The value being built is left unchanged.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    /// The transport reported a non-success outcome for a request.
    /// `status` is the HTTP status code when one was received.
    #[error("Service error{}: {message}", .status.map(|s| format!(" ({s})")).unwrap_or_default())]
    Service {
        /// HTTP status code, if the request reached the service.
        status: Option<u16>,
        /// Failure detail reported by the transport.
        message: String,
    },
    /// An endpoint key outside the known endpoint table was requested.
    #[error("Unknown endpoint \"{0}\" requested.")]
    UnknownEndpoint(String),
    /// Authentication failed, credentials were missing, or a token was required but absent.
    #[error("Authentication error: {0}")]
    Auth(String),
    /// Serialization/deserialization error when encoding a request or decoding a response.
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// Error during transport construction.
    #[error("Initialization error: {0}")]
    Initialization(String),
}

impl MontageError {
    /// Shorthand for a [`MontageError::Service`] error.
    pub fn service(status: Option<u16>, message: impl Into<String>) -> Self {
        MontageError::Service { status, message: message.into() }
    }

    /// Returns the HTTP status carried by a service error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            MontageError::Service { status, .. } => *status,
            _ => None,
        }
    }
}

/// A specialized `Result` type for Montage client operations.
pub type MontageResult<T> = Result<T, MontageError>;

impl From<SerdeJsonError> for MontageError {
    fn from(err: SerdeJsonError) -> Self {
        MontageError::Serialization(err.to_string())
    }
}
