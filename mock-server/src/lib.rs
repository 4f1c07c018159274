//! In-memory JSON:API server for any resource type.
//!
//! Resources live in a map keyed by `(type, id)`. Creates answer `201` with a
//! `Location` header ending in the new id, fetches of unknown ids answer
//! `404`, and deletes answer `204`.

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const MEDIA_TYPE: &str = "application/vnd.api+json";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub resource_type: String,
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct NewResource {
    #[serde(rename = "type")]
    pub resource_type: String,
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Document<T> {
    pub data: T,
}

pub type Db = Arc<RwLock<HashMap<(String, Uuid), Resource>>>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(HashMap::new()));
    Router::new()
        .route("/{resource_type}", get(list_resources).post(create_resource))
        .route(
            "/{resource_type}/{id}",
            get(get_resource).patch(update_resource).delete(delete_resource),
        )
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn jsonapi<T: Serialize>(status: StatusCode, data: T) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, HeaderValue::from_static(MEDIA_TYPE))],
        Json(Document { data }),
    )
        .into_response()
}

async fn list_resources(State(db): State<Db>, Path(resource_type): Path<String>) -> Response {
    let resources = db.read().await;
    let data: Vec<Resource> = resources
        .values()
        .filter(|r| r.resource_type == resource_type)
        .cloned()
        .collect();
    jsonapi(StatusCode::OK, data)
}

async fn create_resource(
    State(db): State<Db>,
    Path(resource_type): Path<String>,
    Json(input): Json<Document<NewResource>>,
) -> Result<Response, StatusCode> {
    if input.data.resource_type != resource_type {
        return Err(StatusCode::CONFLICT);
    }
    let resource = Resource {
        id: Uuid::new_v4(),
        resource_type,
        attributes: input.data.attributes,
    };
    let location = format!("/{}/{}", resource.resource_type, resource.id);
    let location_value = HeaderValue::from_str(&location).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    db.write()
        .await
        .insert((resource.resource_type.clone(), resource.id), resource.clone());
    tracing::debug!(%location, "resource created");

    let mut response = jsonapi(StatusCode::CREATED, resource);
    response.headers_mut().insert(header::LOCATION, location_value);
    Ok(response)
}

async fn get_resource(
    State(db): State<Db>,
    Path((resource_type, id)): Path<(String, Uuid)>,
) -> Result<Response, StatusCode> {
    let resources = db.read().await;
    resources
        .get(&(resource_type, id))
        .map(|r| jsonapi(StatusCode::OK, r.clone()))
        .ok_or(StatusCode::NOT_FOUND)
}

/// Merges the given attributes into the stored resource; null removes one.
async fn update_resource(
    State(db): State<Db>,
    Path((resource_type, id)): Path<(String, Uuid)>,
    Json(input): Json<Document<NewResource>>,
) -> Result<Response, StatusCode> {
    let mut resources = db.write().await;
    let resource = resources
        .get_mut(&(resource_type, id))
        .ok_or(StatusCode::NOT_FOUND)?;
    for (name, value) in input.data.attributes {
        if value.is_null() {
            resource.attributes.remove(&name);
        } else {
            resource.attributes.insert(name, value);
        }
    }
    Ok(jsonapi(StatusCode::OK, resource.clone()))
}

async fn delete_resource(
    State(db): State<Db>,
    Path((resource_type, id)): Path<(String, Uuid)>,
) -> Result<StatusCode, StatusCode> {
    let mut resources = db.write().await;
    resources
        .remove(&(resource_type, id))
        .map(|_| StatusCode::NO_CONTENT)
        .ok_or(StatusCode::NOT_FOUND)
}

/// Header map helper for tests that need the `Location` value as text.
pub fn location(headers: &HeaderMap) -> Option<&str> {
    headers.get(header::LOCATION).and_then(|v| v.to_str().ok())
}
