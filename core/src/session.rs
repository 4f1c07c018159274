//! The session engine: typed create/get/delete over an identity-mapped cache.
//!
//! # Design
//! A `Session` is a cheap `Clone` handle. Model instances returned by the
//! session keep a clone so their accessors can call `get_attribute` /
//! `set_attribute`; the session never holds on to models.
//!
//! The cache is write-through: a successful create or fetch installs the
//! document before the model is handed back, and a successful delete evicts
//! it. Nothing touches the cache until a response has been received and
//! parsed, so a failed or cancelled operation leaves it as it was.

use std::any::type_name;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::cache::ResourceCache;
use crate::client::ResourceClient;
use crate::document::{ResourceCreate, ResourceDocument, ResourceId, ResourceRootCreate};
use crate::error::SessionError;
use crate::http::{HttpRequest, HttpResponse, HttpTransport};
use crate::mapping::{MappingRegistry, Model, ModelBinding};

#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    registry: Arc<MappingRegistry>,
    transport: Arc<dyn HttpTransport>,
    client: ResourceClient,
    cache: ResourceCache,
    cancel: CancellationToken,
}

impl Session {
    pub(crate) fn new(
        registry: Arc<MappingRegistry>,
        transport: Arc<dyn HttpTransport>,
        client: ResourceClient,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                registry,
                transport,
                client,
                cache: ResourceCache::new(),
                cancel,
            }),
        }
    }

    /// Creates `model` remotely and returns a bound instance carrying the
    /// server-assigned id.
    ///
    /// Fails with `AlreadyPersisted` without any network call when the
    /// model's id is already set.
    #[tracing::instrument(skip_all, fields(model = type_name::<M>()))]
    pub async fn create<M: Model>(&self, model: &M) -> Result<M, SessionError> {
        let binding = self.inner.registry.binding::<M>()?;
        let existing = binding.id_of(model);
        if !existing.is_nil() {
            return Err(SessionError::AlreadyPersisted {
                resource_type: binding.resource_type().to_string(),
                id: existing.to_string(),
            });
        }

        let root = ResourceRootCreate {
            data: ResourceCreate {
                resource_type: binding.resource_type().to_string(),
                attributes: binding.attributes_of(model),
            },
        };
        let request = self.inner.client.build_create(&root)?;
        let response = self.send(request).await?;
        let id = self.inner.client.parse_create(&response)?;

        self.inner.cache.put(id, ResourceDocument::from_create(id, root.data));
        debug!(%id, resource_type = binding.resource_type(), "resource created");
        Ok(self.bind(binding, id))
    }

    /// Returns the model for `id`, serving it from the cache when possible.
    /// A 404 yields `Ok(None)` and caches nothing, as does a response
    /// describing some other resource (`UnexpectedResource`).
    #[tracing::instrument(skip_all, fields(model = type_name::<M>(), %id))]
    pub async fn get<M: Model>(&self, id: ResourceId) -> Result<Option<M>, SessionError> {
        let binding = self.inner.registry.binding::<M>()?;
        if self.inner.cache.contains(&id) {
            debug!("cache hit");
            return Ok(Some(self.bind(binding, id)));
        }

        debug!("cache miss");
        let request = self.inner.client.build_fetch(binding.resource_type(), id);
        let response = self.send(request).await?;
        let Some(document) = self.inner.client.parse_fetch(&response)? else {
            debug!("resource not found");
            return Ok(None);
        };
        if document.id != id || document.resource_type != binding.resource_type() {
            warn!(
                returned = %document.id,
                returned_type = %document.resource_type,
                "server returned a different resource"
            );
            return Err(SessionError::UnexpectedResource {
                expected: format!("{}/{id}", binding.resource_type()),
                returned: format!("{}/{}", document.resource_type, document.id),
            });
        }
        self.inner.cache.put(id, document);
        Ok(Some(self.bind(binding, id)))
    }

    /// Deletes the resource behind `model`.
    ///
    /// A model that was never created has nothing on the server to delete
    /// and fails with `NotPersisted` without any network call.
    pub async fn delete<M: Model>(&self, model: &M) -> Result<(), SessionError> {
        let id = self.inner.registry.binding::<M>()?.id_of(model);
        self.delete_by_id::<M>(id).await
    }

    /// Deletes resource `id` of `M`'s resource type and evicts it. On failure
    /// the cache is left untouched. The nil id is rejected with
    /// `NotPersisted`.
    #[tracing::instrument(skip_all, fields(model = type_name::<M>(), %id))]
    pub async fn delete_by_id<M: Model>(&self, id: ResourceId) -> Result<(), SessionError> {
        let binding = self.inner.registry.binding::<M>()?;
        if id.is_nil() {
            return Err(SessionError::NotPersisted {
                resource_type: binding.resource_type().to_string(),
            });
        }
        let request = self.inner.client.build_delete(binding.resource_type(), id);
        let response = self.send(request).await?;
        self.inner.client.parse_delete(&response)?;
        self.inner.cache.evict(&id);
        debug!("resource deleted");
        Ok(())
    }

    /// Reads attribute `name` of cached resource `id`.
    ///
    /// Returns `T::default()` when the resource is not cached, the attribute
    /// is missing, or the stored value does not deserialize into `T`. Never
    /// fetches.
    pub fn get_attribute<T: DeserializeOwned + Default>(&self, id: ResourceId, name: &str) -> T {
        let value = self
            .inner
            .cache
            .read(&id, |doc| doc.attributes.get(name).cloned());
        match value {
            None => {
                debug!(%id, attribute = name, "attribute read on uncached resource");
                T::default()
            }
            Some(None) => T::default(),
            Some(Some(value)) => serde_json::from_value(value).unwrap_or_else(|e| {
                warn!(%id, attribute = name, error = %e, "attribute has unexpected type");
                T::default()
            }),
        }
    }

    /// Stages a new value for attribute `name` on cached resource `id`.
    ///
    /// Only the in-memory document changes; nothing is sent. A null value
    /// removes the attribute. Uncached ids are ignored.
    pub fn set_attribute<T: Serialize>(&self, id: ResourceId, name: &str, value: T) -> Result<(), SessionError> {
        let value = serde_json::to_value(value).map_err(|e| SessionError::Serialization(e.to_string()))?;
        let staged = self.inner.cache.update(&id, |doc| {
            if value.is_null() {
                doc.attributes.remove(name);
            } else {
                doc.attributes.insert(name.to_string(), value);
            }
        });
        if staged.is_none() {
            debug!(%id, attribute = name, "attribute write on uncached resource ignored");
        }
        Ok(())
    }

    pub fn is_cached(&self, id: ResourceId) -> bool {
        self.inner.cache.contains(&id)
    }

    /// A copy of the cached document for `id`.
    pub fn cached(&self, id: ResourceId) -> Option<ResourceDocument> {
        self.inner.cache.get(&id)
    }

    /// Cancelling this token aborts in-flight and future network operations
    /// of the session with `SessionError::Cancelled`.
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.inner.cancel
    }

    pub fn registry(&self) -> &MappingRegistry {
        &self.inner.registry
    }

    fn bind<M: Model>(&self, binding: &ModelBinding<M>, id: ResourceId) -> M {
        let mut model = M::attach(self.clone());
        binding.assign_id(&mut model, id);
        model
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, SessionError> {
        tokio::select! {
            biased;
            _ = self.inner.cancel.cancelled() => Err(SessionError::Cancelled),
            response = self.inner.transport.send(request) => Ok(response?),
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("base_url", &self.inner.client.base_url())
            .field("cached", &self.inner.cache.len())
            .field("cancelled", &self.inner.cancel.is_cancelled())
            .finish()
    }
}
