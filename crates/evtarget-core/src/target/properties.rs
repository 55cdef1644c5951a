//! Dynamic member access for wrapped objects.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::{Map, Value};

/// Dynamically named members of a source object.
///
/// [`EventTarget`](crate::EventTarget) forwards every non-reserved member
/// read, and every write, delete and enumeration, to this trait. Sources
/// that are read-only keep the default `set_property`/`delete_property`.
pub trait Properties {
    /// Read a member. `None` when the member does not exist.
    fn get_property(&self, name: &str) -> Option<Value>;

    /// Names of all members, in the source's own order.
    fn property_names(&self) -> Vec<String>;

    /// Write a member. Returns whether the write was accepted.
    fn set_property(&self, _name: &str, _value: Value) -> bool {
        false
    }

    /// Delete a member, returning its previous value.
    fn delete_property(&self, _name: &str) -> Option<Value> {
        None
    }
}

/// A thread-safe bag of JSON members.
#[derive(Debug, Default)]
pub struct PropertyMap {
    values: RwLock<Map<String, Value>>,
}

impl PropertyMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a member while building the map.
    pub fn with(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.write().insert(name.into(), value.into());
        self
    }

    /// Copy of all members as a JSON object.
    pub fn to_json(&self) -> Value {
        Value::Object(self.read().clone())
    }

    fn read(&self) -> RwLockReadGuard<'_, Map<String, Value>> {
        self.values.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Map<String, Value>> {
        self.values.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl From<Map<String, Value>> for PropertyMap {
    fn from(values: Map<String, Value>) -> Self {
        Self {
            values: RwLock::new(values),
        }
    }
}

impl Properties for PropertyMap {
    fn get_property(&self, name: &str) -> Option<Value> {
        self.read().get(name).cloned()
    }

    fn property_names(&self) -> Vec<String> {
        self.read().keys().cloned().collect()
    }

    fn set_property(&self, name: &str, value: Value) -> bool {
        self.write().insert(name.to_string(), value);
        true
    }

    fn delete_property(&self, name: &str) -> Option<Value> {
        self.write().remove(name)
    }
}
