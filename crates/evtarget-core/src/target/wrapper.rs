//! Forwarding facade over a source object.

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Weak};

use serde_json::Value;
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::config::TargetConfig;
use crate::error::{EventError, EventResult};
use crate::events::{Event, Listener, ListenerRegistry};
use crate::target::Properties;

/// Member names the facade answers itself instead of forwarding.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, IntoStaticStr,
)]
pub enum ReservedMethod {
    #[strum(serialize = "addEventListener")]
    AddEventListener,
    #[strum(serialize = "removeEventListener")]
    RemoveEventListener,
    #[strum(serialize = "dispatchEvent")]
    DispatchEvent,
}

/// Arguments for invoking a [`BoundMethod`].
pub enum MethodArgs<'a, T> {
    AddEventListener {
        event_type: String,
        listener: Listener<T>,
    },
    RemoveEventListener {
        event_type: &'a str,
        listener: &'a Listener<T>,
    },
    DispatchEvent(&'a mut Event<T>),
}

impl<T> MethodArgs<'_, T> {
    /// The reserved method these arguments belong to.
    pub fn method(&self) -> ReservedMethod {
        match self {
            Self::AddEventListener { .. } => ReservedMethod::AddEventListener,
            Self::RemoveEventListener { .. } => ReservedMethod::RemoveEventListener,
            Self::DispatchEvent(_) => ReservedMethod::DispatchEvent,
        }
    }
}

/// A reserved event method bound to the target it was read from.
pub struct BoundMethod<T> {
    target: EventTarget<T>,
    method: ReservedMethod,
}

impl<T> BoundMethod<T> {
    pub fn method(&self) -> ReservedMethod {
        self.method
    }

    pub fn target(&self) -> &EventTarget<T> {
        &self.target
    }

    /// Call the method on its target.
    ///
    /// Returns `Some(result)` of the dispatch for `dispatchEvent` and `None`
    /// for the listener methods. Fails with [`EventError::MethodArguments`]
    /// when `args` belong to a different method.
    pub fn invoke(&self, args: MethodArgs<'_, T>) -> EventResult<Option<bool>> {
        if args.method() != self.method {
            return Err(EventError::MethodArguments {
                method: self.method,
                found: args.method(),
            });
        }

        match args {
            MethodArgs::AddEventListener {
                event_type,
                listener,
            } => {
                self.target.add_event_listener(event_type, listener);
                Ok(None)
            }
            MethodArgs::RemoveEventListener {
                event_type,
                listener,
            } => {
                self.target.remove_event_listener(event_type, listener);
                Ok(None)
            }
            MethodArgs::DispatchEvent(event) => self.target.dispatch_event(event).map(Some),
        }
    }
}

impl<T> Clone for BoundMethod<T> {
    fn clone(&self) -> Self {
        Self {
            target: self.target.clone(),
            method: self.method,
        }
    }
}

impl<T> PartialEq for BoundMethod<T> {
    fn eq(&self, other: &Self) -> bool {
        self.method == other.method && self.target.ptr_eq(&other.target)
    }
}

impl<T> fmt::Debug for BoundMethod<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundMethod")
            .field("method", &self.method)
            .field("target", &self.target)
            .finish()
    }
}

/// Result of reading a member through an [`EventTarget`].
pub enum Member<T> {
    /// One of the reserved event methods, bound to the target.
    Method(BoundMethod<T>),
    /// A member forwarded from the source object.
    Value(Value),
    /// The source object has no such member.
    Missing,
}

impl<T> Member<T> {
    /// The forwarded value, if this member is one.
    pub fn into_value(self) -> Option<Value> {
        match self {
            Self::Value(value) => Some(value),
            _ => None,
        }
    }

    /// The reserved method, if this member is one.
    pub fn method(&self) -> Option<ReservedMethod> {
        match self {
            Self::Method(bound) => Some(bound.method()),
            _ => None,
        }
    }

    pub fn into_method(self) -> Option<BoundMethod<T>> {
        match self {
            Self::Method(bound) => Some(bound),
            _ => None,
        }
    }
}

impl<T> Clone for Member<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Method(bound) => Self::Method(bound.clone()),
            Self::Value(value) => Self::Value(value.clone()),
            Self::Missing => Self::Missing,
        }
    }
}

impl<T> PartialEq for Member<T> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Method(a), Self::Method(b)) => a == b,
            (Self::Value(a), Self::Value(b)) => a == b,
            (Self::Missing, Self::Missing) => true,
            _ => false,
        }
    }
}

impl<T> fmt::Debug for Member<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Method(bound) => f.debug_tuple("Method").field(bound).finish(),
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Missing => f.write_str("Missing"),
        }
    }
}

struct TargetInner<T> {
    source: Weak<T>,
    registry: ListenerRegistry<T>,
}

/// Event target wrapping a shared source object.
///
/// Cloning yields another handle to the same target. The target holds its
/// source weakly: forwarding fails with [`EventError::SourceDropped`] once the
/// last strong reference to the source is gone, while listener registration
/// and dispatch keep working.
pub struct EventTarget<T> {
    inner: Arc<TargetInner<T>>,
}

impl<T> EventTarget<T> {
    pub(crate) fn new(source: &Arc<T>, config: TargetConfig) -> Self {
        Self {
            inner: Arc::new(TargetInner {
                source: Arc::downgrade(source),
                registry: ListenerRegistry::new(config),
            }),
        }
    }

    /// Register `listener` for events of `event_type`.
    pub fn add_event_listener(&self, event_type: impl Into<String>, listener: Listener<T>) {
        self.inner.registry.add(event_type, listener);
    }

    /// Unregister every registration of `listener` for `event_type`.
    pub fn remove_event_listener(&self, event_type: &str, listener: &Listener<T>) {
        self.inner.registry.remove(event_type, listener);
    }

    /// Synchronously dispatch `event` to the listeners of its type.
    ///
    /// Returns `Ok(true)` unless a listener called
    /// [`Event::prevent_default`]. Fails with [`EventError::MissingEventType`]
    /// for an event without a type, and with a listener error according to
    /// the configured [`FailurePolicy`](crate::config::FailurePolicy).
    pub fn dispatch_event(&self, event: &mut Event<T>) -> EventResult<bool> {
        self.inner.registry.dispatch(self, event)
    }

    pub fn has_listeners(&self, event_type: &str) -> bool {
        self.inner.registry.has_listeners(event_type)
    }

    pub fn listener_count(&self, event_type: &str) -> usize {
        self.inner.registry.listener_count(event_type)
    }

    pub fn event_types(&self) -> Vec<String> {
        self.inner.registry.event_types()
    }

    /// Strong reference to the source object.
    pub fn source(&self) -> EventResult<Arc<T>> {
        self.inner.source.upgrade().ok_or(EventError::SourceDropped)
    }

    /// Run `f` against the source object.
    pub fn with_source<R>(&self, f: impl FnOnce(&T) -> R) -> EventResult<R> {
        let source = self.source()?;
        Ok(f(&source))
    }

    pub fn is_source_alive(&self) -> bool {
        self.inner.source.strong_count() > 0
    }

    /// Whether this target wraps `source`.
    pub fn wraps(&self, source: &Arc<T>) -> bool {
        std::ptr::eq(self.inner.source.as_ptr(), Arc::as_ptr(source))
    }

    /// Whether both handles refer to the same target.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T: Properties> EventTarget<T> {
    /// Read a member by name.
    ///
    /// The reserved event method names resolve to a [`BoundMethod`] on this
    /// target even after the source is dropped; everything else is read from
    /// the source.
    pub fn member(&self, name: &str) -> EventResult<Member<T>> {
        if let Ok(method) = ReservedMethod::from_str(name) {
            return Ok(Member::Method(BoundMethod {
                target: self.clone(),
                method,
            }));
        }

        let value = self.with_source(|source| source.get_property(name))?;
        Ok(value.map_or(Member::Missing, Member::Value))
    }

    /// Write a member on the source. Reserved names are not intercepted.
    pub fn set_property(&self, name: &str, value: impl Into<Value>) -> EventResult<bool> {
        let value = value.into();
        self.with_source(|source| source.set_property(name, value))
    }

    /// Delete a member on the source. Reserved names are not intercepted.
    pub fn delete_property(&self, name: &str) -> EventResult<Option<Value>> {
        self.with_source(|source| source.delete_property(name))
    }

    /// Member names of the source. Reserved names are not added.
    pub fn property_names(&self) -> EventResult<Vec<String>> {
        self.with_source(|source| source.property_names())
    }
}

impl<T> Clone for EventTarget<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> PartialEq for EventTarget<T> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl<T> Eq for EventTarget<T> {}

impl<T> fmt::Debug for EventTarget<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventTarget")
            .field("source", &self.inner.source.as_ptr())
            .field("source_alive", &self.is_source_alive())
            .field("event_types", &self.event_types())
            .finish()
    }
}
