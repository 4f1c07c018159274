//! Fire-and-forget observation of HTTP responses.
//!
//! # Design
//! `ObservedTransport` wraps any `HttpTransport`. When a response comes back
//! it picks the observers registered for the request method (plus the
//! method-independent "response received" set) and, if there are any, spawns
//! one detached task that in turn spawns a task per observer over its own
//! `ObservedResponse`: a copy of the response together with the request that
//! produced it. The response is returned to the caller without waiting on any
//! of it.
//!
//! Observer failures stay inside the detached task: returned errors and
//! panics are logged with `tracing::warn!` and dropped.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinSet;

use crate::error::TransportError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, HttpTransport};

type ObserverFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>;

/// What an observer receives: the request as it was sent and a copy of the
/// response it got. A `DELETE` answer carries no body, so the request URL is
/// the only way to tell which resource it was about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedResponse {
    pub request: HttpRequest,
    pub response: HttpResponse,
}

/// A registered response callback.
pub type Observer = Arc<dyn Fn(ObservedResponse) -> ObserverFuture + Send + Sync>;

fn boxed<F, Fut>(f: F) -> Observer
where
    F: Fn(ObservedResponse) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(move |observed: ObservedResponse| -> ObserverFuture { Box::pin(f(observed)) })
}

/// Observer sets keyed by method category.
#[derive(Clone, Default)]
pub struct ResponseObservers {
    created: Vec<Observer>,
    updated: Vec<Observer>,
    retrieved: Vec<Observer>,
    deleted: Vec<Observer>,
    received: Vec<Observer>,
}

impl ResponseObservers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called for every `POST` response.
    pub fn on_created<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(ObservedResponse) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.created.push(boxed(f));
        self
    }

    /// Called for every `PATCH` response.
    pub fn on_updated<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(ObservedResponse) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.updated.push(boxed(f));
        self
    }

    /// Called for every `GET` response.
    pub fn on_retrieved<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(ObservedResponse) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.retrieved.push(boxed(f));
        self
    }

    /// Called for every `DELETE` response.
    pub fn on_deleted<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(ObservedResponse) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.deleted.push(boxed(f));
        self
    }

    /// Called for every response regardless of method.
    pub fn on_response<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(ObservedResponse) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.received.push(boxed(f));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.created.is_empty()
            && self.updated.is_empty()
            && self.retrieved.is_empty()
            && self.deleted.is_empty()
            && self.received.is_empty()
    }

    /// Observers that apply to a response to a `method` request.
    pub fn for_method(&self, method: HttpMethod) -> Vec<Observer> {
        let by_method = match method {
            HttpMethod::Post => &self.created,
            HttpMethod::Patch => &self.updated,
            HttpMethod::Get => &self.retrieved,
            HttpMethod::Delete => &self.deleted,
        };
        self.received.iter().chain(by_method).cloned().collect()
    }
}

impl std::fmt::Debug for ResponseObservers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseObservers")
            .field("created", &self.created.len())
            .field("updated", &self.updated.len())
            .field("retrieved", &self.retrieved.len())
            .field("deleted", &self.deleted.len())
            .field("received", &self.received.len())
            .finish()
    }
}

/// An `HttpTransport` that reports every response to `ResponseObservers`
/// without delaying it.
pub struct ObservedTransport<T> {
    inner: T,
    observers: ResponseObservers,
}

impl<T: HttpTransport> ObservedTransport<T> {
    pub fn new(inner: T, observers: ResponseObservers) -> Self {
        Self { inner, observers }
    }

    pub fn observers(&self) -> &ResponseObservers {
        &self.observers
    }
}

fn dispatch(observers: Vec<Observer>, observed: ObservedResponse) {
    tokio::spawn(async move {
        let method = observed.request.method;
        let url = observed.request.url.clone();
        let mut tasks = JoinSet::new();
        for observer in observers {
            tasks.spawn(observer(observed.clone()));
        }
        while let Some(outcome) = tasks.join_next().await {
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(error)) => {
                    tracing::warn!(%method, %url, error = %error, "response observer failed")
                }
                Err(error) => {
                    tracing::warn!(%method, %url, error = %error, "response observer panicked")
                }
            }
        }
    });
}

#[async_trait]
impl<T: HttpTransport> HttpTransport for ObservedTransport<T> {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let observers = self.observers.for_method(request.method);
        if observers.is_empty() {
            return self.inner.send(request).await;
        }
        let sent = request.clone();
        let response = self.inner.send(request).await?;
        dispatch(
            observers,
            ObservedResponse {
                request: sent,
                response: response.clone(),
            },
        );
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use tokio::sync::{mpsc, Notify};

    use super::*;

    struct FixedTransport(u16);

    #[async_trait]
    impl HttpTransport for FixedTransport {
        async fn send(&self, _request: HttpRequest) -> Result<HttpResponse, TransportError> {
            Ok(HttpResponse::new(self.0))
        }
    }

    fn request(method: HttpMethod) -> HttpRequest {
        HttpRequest {
            method,
            url: "http://host/widget".to_string(),
            headers: Vec::new(),
            body: None,
        }
    }

    #[test]
    fn for_method_selects_category_and_catch_all() {
        let noop = |_: ObservedResponse| async { Ok::<(), anyhow::Error>(()) };
        let observers = ResponseObservers::new()
            .on_created(noop)
            .on_created(noop)
            .on_retrieved(noop)
            .on_response(noop);
        assert_eq!(observers.for_method(HttpMethod::Post).len(), 3);
        assert_eq!(observers.for_method(HttpMethod::Get).len(), 2);
        assert_eq!(observers.for_method(HttpMethod::Patch).len(), 1);
        assert_eq!(observers.for_method(HttpMethod::Delete).len(), 1);
        assert!(ResponseObservers::new().for_method(HttpMethod::Get).is_empty());
        assert!(ResponseObservers::new().is_empty());
    }

    #[tokio::test]
    async fn observers_receive_the_request_with_a_copy_of_the_response() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let observers = ResponseObservers::new().on_deleted(move |observed: ObservedResponse| {
            let tx = tx.clone();
            async move {
                tx.send(observed)?;
                Ok::<(), anyhow::Error>(())
            }
        });
        let transport = ObservedTransport::new(FixedTransport(204), observers);
        let response = transport.send(request(HttpMethod::Delete)).await.unwrap();
        assert_eq!(response.status, 204);

        let observed = rx.recv().await.unwrap();
        assert_eq!(observed.request, request(HttpMethod::Delete));
        assert_eq!(observed.response, response);
    }

    #[tokio::test]
    async fn unobserved_methods_pass_straight_through() {
        let observers = ResponseObservers::new().on_created(|_| async {
            Err::<(), _>(anyhow::anyhow!("must not run for GET"))
        });
        let transport = ObservedTransport::new(FixedTransport(200), observers);
        let response = transport.send(request(HttpMethod::Get)).await.unwrap();
        assert_eq!(response, HttpResponse::new(200));
    }

    #[tokio::test]
    async fn slow_observer_does_not_delay_the_caller() {
        let release = Arc::new(Notify::new());
        let finished = Arc::new(AtomicUsize::new(0));
        let observers = {
            let release = Arc::clone(&release);
            let finished = Arc::clone(&finished);
            ResponseObservers::new().on_response(move |_| {
                let release = Arc::clone(&release);
                let finished = Arc::clone(&finished);
                async move {
                    release.notified().await;
                    finished.fetch_add(1, Ordering::SeqCst);
                    Ok::<(), anyhow::Error>(())
                }
            })
        };
        let transport = ObservedTransport::new(FixedTransport(200), observers);

        let response = tokio::time::timeout(Duration::from_secs(1), transport.send(request(HttpMethod::Get)))
            .await
            .expect("send must not wait on observers")
            .unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(finished.load(Ordering::SeqCst), 0);
        release.notify_one();
    }

    #[tokio::test]
    async fn failing_and_panicking_observers_are_isolated() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let observers = ResponseObservers::new()
            .on_created(|_| async { Err::<(), _>(anyhow::anyhow!("boom")) })
            .on_created(|observed: ObservedResponse| async move {
                if observed.response.status == 201 {
                    panic!("observer panic");
                }
                Ok::<(), anyhow::Error>(())
            })
            .on_response(move |_| {
                let tx = tx.clone();
                async move {
                    tx.send(())?;
                    Ok::<(), anyhow::Error>(())
                }
            });
        let transport = ObservedTransport::new(FixedTransport(201), observers);
        let response = transport.send(request(HttpMethod::Post)).await.unwrap();
        assert_eq!(response.status, 201);
        assert_eq!(rx.recv().await, Some(()));
    }
}
