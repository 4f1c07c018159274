//! Stateless HTTP request builder and response parser for JSON:API resources.
//!
//! # Design
//! `ResourceClient` holds only a `base_url` and carries no mutable state
//! between calls. Each remote operation is split into a `build_*` method that
//! produces an `HttpRequest` and a `parse_*` method that consumes an
//! `HttpResponse`. The session engine runs the round-trip in between through
//! its transport, so everything here stays deterministic and I/O free.

use crate::document::{ResourceDocument, ResourceId, ResourceRootCreate, ResourceRootSingle};
use crate::error::SessionError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, JSONAPI_MEDIA_TYPE};

/// Length of the canonical hyphenated UUID text form.
const ID_TEXT_LEN: usize = 36;

#[derive(Debug, Clone)]
pub struct ResourceClient {
    base_url: String,
}

impl ResourceClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build_create(&self, root: &ResourceRootCreate) -> Result<HttpRequest, SessionError> {
        Ok(HttpRequest {
            method: HttpMethod::Post,
            url: format!("{}/{}", self.base_url, root.data.resource_type),
            headers: vec![("content-type".to_string(), JSONAPI_MEDIA_TYPE.to_string())],
            body: Some(root.to_json()?),
        })
    }

    pub fn build_fetch(&self, resource_type: &str, id: ResourceId) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            url: format!("{}/{resource_type}/{id}", self.base_url),
            headers: vec![("accept".to_string(), JSONAPI_MEDIA_TYPE.to_string())],
            body: None,
        }
    }

    pub fn build_delete(&self, resource_type: &str, id: ResourceId) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Delete,
            url: format!("{}/{resource_type}/{id}", self.base_url),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Extracts the new resource's id from the trailing 36 characters of the
    /// `Location` header.
    pub fn parse_create(&self, response: &HttpResponse) -> Result<ResourceId, SessionError> {
        if !response.is_success() {
            return Err(SessionError::RemoteCreateFailed {
                status: response.status,
                reason: response.reason.clone(),
            });
        }
        let location = response
            .header("location")
            .ok_or_else(|| SessionError::InvalidLocation(String::new()))?;
        location
            .len()
            .checked_sub(ID_TEXT_LEN)
            .and_then(|start| location.get(start..))
            .and_then(|tail| tail.parse().ok())
            .ok_or_else(|| SessionError::InvalidLocation(location.to_string()))
    }

    /// `Ok(None)` on 404.
    pub fn parse_fetch(&self, response: &HttpResponse) -> Result<Option<ResourceDocument>, SessionError> {
        if response.status == 404 {
            return Ok(None);
        }
        if !response.is_success() {
            return Err(SessionError::RemoteFetchFailed {
                status: response.status,
                reason: response.reason.clone(),
            });
        }
        ResourceRootSingle::from_json(&response.body).map(|root| Some(root.data))
    }

    pub fn parse_delete(&self, response: &HttpResponse) -> Result<(), SessionError> {
        if response.is_success() {
            return Ok(());
        }
        Err(SessionError::RemoteDeleteFailed {
            status: response.status,
            reason: response.reason.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::document::{Attributes, ResourceCreate};

    const ID: &str = "3fa85f64-5717-4562-b3fc-2c963f66afa6";

    fn client() -> ResourceClient {
        ResourceClient::new("http://localhost:3000")
    }

    fn id() -> ResourceId {
        ID.parse().unwrap()
    }

    #[test]
    fn build_create_posts_to_collection() {
        let mut attributes = Attributes::new();
        attributes.insert("name".to_string(), json!("foo"));
        let root = ResourceRootCreate {
            data: ResourceCreate {
                resource_type: "widget".to_string(),
                attributes,
            },
        };
        let req = client().build_create(&root).unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.url, "http://localhost:3000/widget");
        assert_eq!(
            req.headers,
            vec![("content-type".to_string(), "application/vnd.api+json".to_string())]
        );
        let body: serde_json::Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body["data"]["type"], "widget");
        assert_eq!(body["data"]["attributes"]["name"], "foo");
        assert!(body["data"].get("id").is_none());
    }

    #[test]
    fn build_fetch_targets_resource() {
        let req = client().build_fetch("widget", id());
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.url, format!("http://localhost:3000/widget/{ID}"));
        assert!(req.body.is_none());
    }

    #[test]
    fn build_delete_targets_resource() {
        let req = client().build_delete("widget", id());
        assert_eq!(req.method, HttpMethod::Delete);
        assert_eq!(req.url, format!("http://localhost:3000/widget/{ID}"));
        assert!(req.headers.is_empty());
    }

    #[test]
    fn trailing_slash_is_stripped() {
        let client = ResourceClient::new("http://localhost:3000/");
        assert_eq!(client.build_fetch("widget", id()).url, format!("http://localhost:3000/widget/{ID}"));
    }

    #[test]
    fn parse_create_reads_location_suffix() {
        let response = HttpResponse::new(201).with_header("Location", &format!("http://host/widget/{ID}"));
        assert_eq!(client().parse_create(&response).unwrap(), id());
    }

    #[test]
    fn parse_create_accepts_bare_id_location() {
        let response = HttpResponse::new(201).with_header("location", ID);
        assert_eq!(client().parse_create(&response).unwrap(), id());
    }

    #[test]
    fn parse_create_rejects_short_or_missing_location() {
        let err = client().parse_create(&HttpResponse::new(201)).unwrap_err();
        assert!(matches!(err, SessionError::InvalidLocation(_)));

        let response = HttpResponse::new(201).with_header("Location", "/widget/42");
        let err = client().parse_create(&response).unwrap_err();
        assert!(matches!(err, SessionError::InvalidLocation(loc) if loc == "/widget/42"));
    }

    #[test]
    fn parse_create_wrong_status() {
        let err = client().parse_create(&HttpResponse::new(422)).unwrap_err();
        assert!(matches!(
            err,
            SessionError::RemoteCreateFailed { status: 422, ref reason } if reason == "Unprocessable Entity"
        ));
    }

    #[test]
    fn parse_fetch_not_found_is_absent() {
        assert_eq!(client().parse_fetch(&HttpResponse::new(404)).unwrap(), None);
    }

    #[test]
    fn parse_fetch_success() {
        let response = HttpResponse::new(200).with_body(format!(
            r#"{{"data":{{"id":"{ID}","type":"widget","attributes":{{"name":"foo"}}}}}}"#
        ));
        let doc = client().parse_fetch(&response).unwrap().unwrap();
        assert_eq!(doc.id, id());
        assert_eq!(doc.attributes["name"], "foo");
    }

    #[test]
    fn parse_fetch_server_error() {
        let err = client().parse_fetch(&HttpResponse::new(500)).unwrap_err();
        assert!(matches!(err, SessionError::RemoteFetchFailed { status: 500, .. }));
    }

    #[test]
    fn parse_fetch_bad_json() {
        let response = HttpResponse::new(200).with_body("not json");
        let err = client().parse_fetch(&response).unwrap_err();
        assert!(matches!(err, SessionError::Deserialization(_)));
    }

    #[test]
    fn parse_delete_accepts_any_success() {
        assert!(client().parse_delete(&HttpResponse::new(200)).is_ok());
        assert!(client().parse_delete(&HttpResponse::new(204)).is_ok());
        let err = client().parse_delete(&HttpResponse::new(404)).unwrap_err();
        assert!(matches!(err, SessionError::RemoteDeleteFailed { status: 404, .. }));
    }
}
