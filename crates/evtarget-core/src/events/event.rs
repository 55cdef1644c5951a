//! Event values passed through dispatch.

use std::fmt;

use serde_json::Value;

use crate::target::EventTarget;

/// An event dispatched to the listeners of an [`EventTarget`].
///
/// Callers build the event with a type and an optional JSON `detail`
/// payload. Dispatch fills in [`target`](Event::target), which is read-only
/// for callers and overwritten by every later dispatch. Listeners may call
/// [`prevent_default`](Event::prevent_default) to tell the dispatching code
/// that its default action should be skipped.
pub struct Event<T> {
    event_type: String,
    detail: Value,
    target: Option<EventTarget<T>>,
    default_prevented: bool,
}

impl<T> Event<T> {
    /// Create an event of the given type with a null detail.
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            detail: Value::Null,
            target: None,
            default_prevented: false,
        }
    }

    /// Attach a detail payload.
    pub fn with_detail(mut self, detail: impl Into<Value>) -> Self {
        self.detail = detail.into();
        self
    }

    /// Event type used to select listeners. Empty when unspecified.
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn detail(&self) -> &Value {
        &self.detail
    }

    pub fn detail_mut(&mut self) -> &mut Value {
        &mut self.detail
    }

    /// Target of the most recent dispatch that reached a listener.
    pub fn target(&self) -> Option<&EventTarget<T>> {
        self.target.as_ref()
    }

    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }

    pub(crate) fn set_target(&mut self, target: EventTarget<T>) {
        self.target = Some(target);
    }
}

impl<T> Default for Event<T> {
    /// An event without a type. Dispatching it fails.
    fn default() -> Self {
        Self::new(String::new())
    }
}

impl<T> Clone for Event<T> {
    fn clone(&self) -> Self {
        Self {
            event_type: self.event_type.clone(),
            detail: self.detail.clone(),
            target: self.target.clone(),
            default_prevented: self.default_prevented,
        }
    }
}

impl<T> fmt::Debug for Event<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("event_type", &self.event_type)
            .field("detail", &self.detail)
            .field("target", &self.target)
            .field("default_prevented", &self.default_prevented)
            .finish()
    }
}
