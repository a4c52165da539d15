use std::{
    any::{Any, TypeId},
    collections::HashMap,
    fmt::Debug,
};

use thiserror::Error;

/// A resource that can live in a [`Stack`]. Kinds are opaque strings of the
/// form `Mesh::<Entity>`; the stack itself never interprets them.
pub trait StackResource: Any + Debug + Send + Sync {
    const KIND: &'static str;

    fn id(&self) -> &str;
}

#[derive(Error, Debug, PartialEq)]
pub enum StackError {
    #[error("resource {kind} {id} not found in stack")]
    NotFound { kind: &'static str, id: String },
}

/// Typed store of intended mesh resources for a single reconcile. Entries
/// are kept per kind in insertion order; adding a resource with an id that
/// already exists for its kind replaces the previous entry in place.
#[derive(Debug, Default)]
pub struct Stack {
    entries: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl Stack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<R: StackResource>(&mut self, resource: R) {
        let entries = self
            .entries
            .entry(TypeId::of::<R>())
            .or_insert_with(|| Box::new(Vec::<R>::new()))
            .downcast_mut::<Vec<R>>()
            .expect("entry downcasts to the vector it was inserted as");
        if let Some(existing) = entries.iter_mut().find(|r| r.id() == resource.id()) {
            *existing = resource;
        } else {
            entries.push(resource);
        }
    }

    pub fn get<R: StackResource>(&self, id: &str) -> Result<&R, StackError> {
        self.list::<R>().into_iter().find(|r| r.id() == id).ok_or(StackError::NotFound {
            kind: R::KIND,
            id: id.to_owned(),
        })
    }

    pub fn get_mut<R: StackResource>(&mut self, id: &str) -> Result<&mut R, StackError> {
        self.list_mut::<R>().into_iter().find(|r| r.id() == id).ok_or(StackError::NotFound {
            kind: R::KIND,
            id: id.to_owned(),
        })
    }

    pub fn list<R: StackResource>(&self) -> Vec<&R> {
        self.entries
            .get(&TypeId::of::<R>())
            .and_then(|entries| entries.downcast_ref::<Vec<R>>())
            .map(|entries| entries.iter().collect())
            .unwrap_or_default()
    }

    pub fn list_mut<R: StackResource>(&mut self) -> Vec<&mut R> {
        self.entries
            .get_mut(&TypeId::of::<R>())
            .and_then(|entries| entries.downcast_mut::<Vec<R>>())
            .map(|entries| entries.iter_mut().collect())
            .unwrap_or_default()
    }
}
