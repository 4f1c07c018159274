//! Error types for the session engine and its collaborators.
//!
//! # Design
//! "Not found" is deliberately absent from `SessionError`: a 404 on fetch is
//! reported as `Ok(None)` so callers can tell "no such resource" apart from
//! "the request failed". Each remote operation gets its own failure variant
//! carrying the status code and reason phrase the server returned.

use thiserror::Error;

/// Errors returned by `Session` operations and the `ResourceClient` parsers.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The model type was never registered with the `MappingRegistry`.
    #[error("{0} is not a mapped model type")]
    UnmappedType(&'static str),

    /// `create` was called on a model whose id is already assigned.
    #[error("model {resource_type} [{id}] has already been created")]
    AlreadyPersisted { resource_type: String, id: String },

    /// `delete` was called on a model that has no id yet.
    #[error("model {resource_type} has not been created")]
    NotPersisted { resource_type: String },

    /// The server answered a fetch with a different resource than requested.
    #[error("expected {expected}, server returned {returned}")]
    UnexpectedResource { expected: String, returned: String },

    #[error("create failed: HTTP {status} {reason}")]
    RemoteCreateFailed { status: u16, reason: String },

    #[error("fetch failed: HTTP {status} {reason}")]
    RemoteFetchFailed { status: u16, reason: String },

    #[error("delete failed: HTTP {status} {reason}")]
    RemoteDeleteFailed { status: u16, reason: String },

    /// The create response carried no usable `Location` header.
    #[error("invalid location header: {0:?}")]
    InvalidLocation(String),

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The response body could not be deserialized into a resource document.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// The session's cancellation token fired before the response arrived.
    #[error("operation cancelled")]
    Cancelled,
}

/// Failures below the HTTP response level. A non-2xx status is a response,
/// not a `TransportError`.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request to {url} failed: {message}")]
    Request { url: String, message: String },

    #[error("could not read response body: {0}")]
    Body(String),
}

/// Rejected model bindings.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MappingError {
    #[error("{0} has no id property mapped")]
    MissingId(&'static str),

    #[error("{model} maps attribute {attribute:?} more than once")]
    DuplicateAttribute { model: &'static str, attribute: String },

    #[error("{0} has an empty resource type name")]
    EmptyResourceType(&'static str),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variable {0} is not set")]
    Missing(&'static str),

    #[error("environment variable {name} has invalid value {value:?}")]
    Invalid { name: &'static str, value: String },

    #[error("could not build HTTP client: {0}")]
    Client(String),
}
