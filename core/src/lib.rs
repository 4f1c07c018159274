//! Client-side session engine for JSON:API resources.
//!
//! # Overview
//! Maps typed models onto remote JSON:API resources. A `Session` creates,
//! fetches and deletes models over an injected `HttpTransport`, keeps an
//! identity map of every resource it has seen, and serves attribute reads
//! from that map. Every response can also be reported to asynchronous
//! observers without holding up the caller.
//!
//! # Design
//! - `ResourceClient` is stateless: `build_*` produces an `HttpRequest`,
//!   `parse_*` consumes an `HttpResponse`. The session runs the round-trip in
//!   between.
//! - `MappingRegistry` holds one `ModelBinding` per model type and is shared
//!   read-only by every session of a `SessionFactory`.
//! - `ResourceCache` is owned by exactly one session.
//! - `ObservedTransport` fans responses out to `ResponseObservers` on
//!   detached tasks.

pub mod cache;
pub mod client;
pub mod config;
pub mod document;
pub mod error;
pub mod factory;
pub mod http;
pub mod mapping;
pub mod observe;
pub mod session;
pub mod transport;

pub use cache::ResourceCache;
pub use client::ResourceClient;
pub use config::TransportConfig;
pub use document::{
    Attributes, ResourceCreate, ResourceDocument, ResourceId, ResourceRootCollection, ResourceRootCreate,
    ResourceRootSingle,
};
pub use error::{ConfigError, MappingError, SessionError, TransportError};
pub use factory::SessionFactory;
pub use http::{HttpMethod, HttpRequest, HttpResponse, HttpTransport, JSONAPI_MEDIA_TYPE};
pub use mapping::{MappingRegistry, Model, ModelBinding};
pub use observe::{ObservedResponse, ObservedTransport, Observer, ResponseObservers};
pub use session::Session;
pub use tokio_util::sync::CancellationToken;
pub use transport::ReqwestTransport;
