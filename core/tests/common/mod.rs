//! Shared fixtures: a `Widget` model bound to the `widget` resource type and
//! a scripted transport that replays canned responses.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use jsonapi_core::{
    HttpMethod, HttpRequest, HttpResponse, HttpTransport, MappingRegistry, Model, ModelBinding, ResourceId, Session,
    SessionFactory, TransportError,
};
use serde_json::json;

pub const BASE_URL: &str = "http://host";
pub const WIDGET_ID: &str = "3fa85f64-5717-4562-b3fc-2c963f66afa6";

#[derive(Debug, Default)]
pub struct Widget {
    pub id: ResourceId,
    pub name: Option<String>,
    pub size: Option<i64>,
    session: Option<Session>,
}

impl Widget {
    pub fn new(name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            ..Default::default()
        }
    }

    /// Reads through the session once the widget is bound to one.
    pub fn name(&self) -> Option<String> {
        match &self.session {
            Some(session) => session.get_attribute(self.id, "name"),
            None => self.name.clone(),
        }
    }

    pub fn size(&self) -> Option<i64> {
        match &self.session {
            Some(session) => session.get_attribute(self.id, "size"),
            None => self.size,
        }
    }

    pub fn set_name(&mut self, name: &str) {
        match &self.session {
            Some(session) => session.set_attribute(self.id, "name", name).unwrap(),
            None => self.name = Some(name.to_string()),
        }
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }
}

impl Model for Widget {
    fn attach(session: Session) -> Self {
        Self {
            session: Some(session),
            ..Default::default()
        }
    }
}

/// Registered nowhere.
#[derive(Debug, Default)]
pub struct Orphan {
    pub id: ResourceId,
}

impl Model for Orphan {
    fn attach(_session: Session) -> Self {
        Self::default()
    }
}

pub fn registry() -> Arc<MappingRegistry> {
    let mut registry = MappingRegistry::new();
    registry
        .register(
            ModelBinding::of_type("widget")
                .with_id(|w: &Widget| w.id, |w, id| w.id = id)
                .with_attribute("name", |w: &Widget| json!(w.name))
                .with_attribute("size", |w: &Widget| json!(w.size)),
        )
        .unwrap();
    Arc::new(registry)
}

pub fn widget_id() -> ResourceId {
    WIDGET_ID.parse().unwrap()
}

pub fn created(id: &str) -> HttpResponse {
    HttpResponse::new(201).with_header("Location", &format!("{BASE_URL}/widget/{id}"))
}

pub fn fetched(id: &str, attributes: serde_json::Value) -> HttpResponse {
    let body = json!({ "data": { "id": id, "type": "widget", "attributes": attributes } });
    HttpResponse::new(200).with_body(body.to_string())
}

/// Replays queued responses in order and records every request.
#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push(&self, response: HttpResponse) -> &Self {
        self.responses.lock().unwrap().push_back(Ok(response));
        self
    }

    pub fn push_err(&self, error: TransportError) -> &Self {
        self.responses.lock().unwrap().push_back(Err(error));
        self
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = request.url.clone();
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(TransportError::Request {
                    url,
                    message: "no scripted response left".to_string(),
                })
            })
    }
}

/// Answers like a server holding one widget: `GET` returns it, `DELETE`
/// succeeds. Both wait `delay` first so concurrent calls overlap.
pub struct RoutedTransport {
    pub delay: Duration,
}

#[async_trait]
impl HttpTransport for RoutedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        tokio::time::sleep(self.delay).await;
        Ok(match request.method {
            HttpMethod::Get => fetched(WIDGET_ID, json!({ "name": "foo", "size": 2 })),
            HttpMethod::Delete => HttpResponse::new(204),
            _ => HttpResponse::new(405),
        })
    }
}

/// Never answers.
pub struct PendingTransport;

#[async_trait]
impl HttpTransport for PendingTransport {
    async fn send(&self, _request: HttpRequest) -> Result<HttpResponse, TransportError> {
        std::future::pending().await
    }
}

pub fn factory(transport: &Arc<ScriptedTransport>) -> SessionFactory {
    SessionFactory::new(registry(), BASE_URL, Arc::clone(transport))
}
