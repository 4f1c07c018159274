//! JSON:API resource documents.
//!
//! # Design
//! Attributes are kept as an untyped `serde_json::Map` so the session can
//! store whatever the server sends and hand typed values out on demand. With
//! the `preserve_order` feature the map keeps insertion order, so a create
//! payload serializes its attributes in binding order.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SessionError;

/// Attribute name → JSON value, in insertion order.
pub type Attributes = serde_json::Map<String, serde_json::Value>;

/// Server-assigned identifier of a resource. The nil UUID marks a model that
/// has not been persisted yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(Uuid);

impl ResourceId {
    pub fn new(value: Uuid) -> Self {
        Self(value)
    }

    pub fn nil() -> Self {
        Self(Uuid::nil())
    }

    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for ResourceId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for ResourceId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// A single resource as cached by the session and returned by fetches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceDocument {
    pub id: ResourceId,
    #[serde(rename = "type")]
    pub resource_type: String,
    #[serde(default)]
    pub attributes: Attributes,
}

impl ResourceDocument {
    /// Attaches the server-assigned id to a create payload.
    pub fn from_create(id: ResourceId, create: ResourceCreate) -> Self {
        Self {
            id,
            resource_type: create.resource_type,
            attributes: create.attributes,
        }
    }
}

/// A resource about to be created; it has no id yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceCreate {
    #[serde(rename = "type")]
    pub resource_type: String,
    #[serde(default)]
    pub attributes: Attributes,
}

/// `{ "data": { "id", "type", "attributes" } }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRootSingle {
    pub data: ResourceDocument,
}

impl ResourceRootSingle {
    pub fn from_resource(resource: ResourceDocument) -> Self {
        Self { data: resource }
    }
}

/// `{ "data": [ ... ] }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRootCollection {
    #[serde(default)]
    pub data: Vec<ResourceDocument>,
}

/// `{ "data": { "type", "attributes" } }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRootCreate {
    pub data: ResourceCreate,
}

macro_rules! json_document {
    ($($name:ident),+ $(,)?) => {
        $(
            impl $name {
                pub fn to_json(&self) -> Result<String, SessionError> {
                    serde_json::to_string(self).map_err(|e| SessionError::Serialization(e.to_string()))
                }

                pub fn from_json(json: &str) -> Result<Self, SessionError> {
                    serde_json::from_str(json).map_err(|e| SessionError::Deserialization(e.to_string()))
                }
            }
        )+
    };
}

json_document!(ResourceRootSingle, ResourceRootCollection, ResourceRootCreate);
