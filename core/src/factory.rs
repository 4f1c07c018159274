//! Builds sessions that share one mapping registry and one transport.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::client::ResourceClient;
use crate::config::TransportConfig;
use crate::error::ConfigError;
use crate::http::HttpTransport;
use crate::mapping::MappingRegistry;
use crate::observe::{ObservedTransport, ResponseObservers};
use crate::session::Session;
use crate::transport::ReqwestTransport;

/// Holds everything sessions have in common. Each `open` call returns a
/// session with its own, empty identity map.
#[derive(Clone)]
pub struct SessionFactory {
    registry: Arc<MappingRegistry>,
    transport: Arc<dyn HttpTransport>,
    client: ResourceClient,
}

impl SessionFactory {
    pub fn new<T: HttpTransport + 'static>(registry: Arc<MappingRegistry>, base_url: &str, transport: T) -> Self {
        Self {
            registry,
            transport: Arc::new(transport),
            client: ResourceClient::new(base_url),
        }
    }

    /// A factory over `ReqwestTransport`.
    pub fn from_config(registry: Arc<MappingRegistry>, config: &TransportConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(registry, &config.base_url, ReqwestTransport::new(config)?))
    }

    /// Routes every response of every session through `observers`.
    pub fn with_observers(mut self, observers: ResponseObservers) -> Self {
        if !observers.is_empty() {
            self.transport = Arc::new(ObservedTransport::new(self.transport, observers));
        }
        self
    }

    pub fn open(&self) -> Session {
        self.open_with_cancellation(CancellationToken::new())
    }

    /// Opens a session whose network operations stop when `token` is
    /// cancelled.
    pub fn open_with_cancellation(&self, token: CancellationToken) -> Session {
        Session::new(
            Arc::clone(&self.registry),
            Arc::clone(&self.transport),
            self.client.clone(),
            token,
        )
    }

    pub fn registry(&self) -> &Arc<MappingRegistry> {
        &self.registry
    }
}

impl std::fmt::Debug for SessionFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionFactory")
            .field("registry", &self.registry)
            .field("base_url", &self.client.base_url())
            .finish()
    }
}
