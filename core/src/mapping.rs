//! Static model-to-resource bindings.
//!
//! # Design
//! A `ModelBinding<M>` is a plain list of accessor closures: one id getter and
//! setter, plus an ordered list of attribute name → value accessors. Model
//! types call back into the `Session` for attribute reads instead of being
//! instrumented. Bindings are collected once into a `MappingRegistry` keyed by
//! `TypeId`; the registry is immutable afterwards and shared behind an `Arc`
//! by every session built from the same factory.

use std::any::{type_name, Any, TypeId};
use std::collections::{HashMap, HashSet};

use serde_json::Value;

use crate::document::{Attributes, ResourceId};
use crate::error::{MappingError, SessionError};
use crate::session::Session;

/// A model type the session can hand back to callers.
///
/// `attach` builds an instance that refers to `session`; the session then
/// assigns the resource id through the binding's id setter.
pub trait Model: Sized + Send + Sync + 'static {
    fn attach(session: Session) -> Self;
}

type IdGetter<M> = Box<dyn Fn(&M) -> ResourceId + Send + Sync>;
type IdSetter<M> = Box<dyn Fn(&mut M, ResourceId) + Send + Sync>;
type AttributeAccessor<M> = Box<dyn Fn(&M) -> Value + Send + Sync>;

struct AttributeBinding<M> {
    name: String,
    accessor: AttributeAccessor<M>,
}

/// How one model type maps onto a JSON:API resource type.
pub struct ModelBinding<M> {
    resource_type: String,
    id: Option<(IdGetter<M>, IdSetter<M>)>,
    attributes: Vec<AttributeBinding<M>>,
}

impl<M: 'static> ModelBinding<M> {
    pub fn of_type(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            id: None,
            attributes: Vec::new(),
        }
    }

    pub fn with_id(
        mut self,
        get: impl Fn(&M) -> ResourceId + Send + Sync + 'static,
        set: impl Fn(&mut M, ResourceId) + Send + Sync + 'static,
    ) -> Self {
        self.id = Some((Box::new(get), Box::new(set)));
        self
    }

    pub fn with_attribute(
        mut self,
        name: impl Into<String>,
        accessor: impl Fn(&M) -> Value + Send + Sync + 'static,
    ) -> Self {
        self.attributes.push(AttributeBinding {
            name: name.into(),
            accessor: Box::new(accessor),
        });
        self
    }

    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.iter().map(|a| a.name.as_str())
    }

    /// The model's current id, nil when it has never been persisted.
    pub fn id_of(&self, model: &M) -> ResourceId {
        match &self.id {
            Some((get, _)) => get(model),
            None => ResourceId::nil(),
        }
    }

    pub fn assign_id(&self, model: &mut M, id: ResourceId) {
        if let Some((_, set)) = &self.id {
            set(model, id);
        }
    }

    /// Pulls every mapped attribute off `model`, in binding order, dropping
    /// null values.
    pub fn attributes_of(&self, model: &M) -> Attributes {
        self.attributes
            .iter()
            .filter_map(|a| match (a.accessor)(model) {
                Value::Null => None,
                value => Some((a.name.clone(), value)),
            })
            .collect()
    }

    fn validate(&self) -> Result<(), MappingError> {
        let model = type_name::<M>();
        if self.resource_type.is_empty() {
            return Err(MappingError::EmptyResourceType(model));
        }
        if self.id.is_none() {
            return Err(MappingError::MissingId(model));
        }
        let mut seen = HashSet::new();
        for attribute in &self.attributes {
            if !seen.insert(attribute.name.as_str()) {
                return Err(MappingError::DuplicateAttribute {
                    model,
                    attribute: attribute.name.clone(),
                });
            }
        }
        Ok(())
    }
}

impl<M> std::fmt::Debug for ModelBinding<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelBinding")
            .field("resource_type", &self.resource_type)
            .field("attributes", &self.attributes.iter().map(|a| &a.name).collect::<Vec<_>>())
            .finish()
    }
}

/// Lookup from model type to its binding.
#[derive(Default)]
pub struct MappingRegistry {
    bindings: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl MappingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the binding for `M`, replacing any earlier one.
    pub fn register<M: Model>(&mut self, binding: ModelBinding<M>) -> Result<&mut Self, MappingError> {
        binding.validate()?;
        self.bindings.insert(TypeId::of::<M>(), Box::new(binding));
        Ok(self)
    }

    pub fn binding<M: 'static>(&self) -> Result<&ModelBinding<M>, SessionError> {
        self.bindings
            .get(&TypeId::of::<M>())
            .and_then(|b| b.downcast_ref::<ModelBinding<M>>())
            .ok_or(SessionError::UnmappedType(type_name::<M>()))
    }

    pub fn is_mapped<M: 'static>(&self) -> bool {
        self.bindings.contains_key(&TypeId::of::<M>())
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl std::fmt::Debug for MappingRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MappingRegistry")
            .field("bindings", &self.bindings.len())
            .finish()
    }
}
