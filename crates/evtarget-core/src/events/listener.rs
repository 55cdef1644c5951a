//! Listener callbacks.

use std::fmt;
use std::sync::Arc;

use crate::error::ListenerError;
use crate::events::Event;
use crate::target::EventTarget;

type Callback<T> =
    dyn Fn(&EventTarget<T>, &mut Event<T>) -> Result<(), ListenerError> + Send + Sync;

/// A callback registered on an [`EventTarget`].
///
/// Listeners are compared by reference: clones of one `Listener` are the same
/// listener, while two `Listener::new` calls over identical closures are not.
/// The callback receives the target being dispatched on and the event.
pub struct Listener<T> {
    callback: Arc<Callback<T>>,
}

impl<T> Listener<T> {
    /// Wrap a closure as a listener.
    ///
    /// The closure is owned by the target it is registered on. Capturing the
    /// target's source `Arc` or a clone of the target creates a cycle through
    /// the target cache; reach the source with `target.source()` instead.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&EventTarget<T>, &mut Event<T>) -> Result<(), ListenerError> + Send + Sync + 'static,
    {
        Self {
            callback: Arc::new(callback),
        }
    }

    /// Whether both handles refer to the same listener.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        // Compare data pointers only; vtable pointers are not unique.
        std::ptr::eq(
            Arc::as_ptr(&self.callback) as *const (),
            Arc::as_ptr(&other.callback) as *const (),
        )
    }

    pub(crate) fn call(
        &self,
        target: &EventTarget<T>,
        event: &mut Event<T>,
    ) -> Result<(), ListenerError> {
        (self.callback)(target, event)
    }
}

impl<T> Clone for Listener<T> {
    fn clone(&self) -> Self {
        Self {
            callback: Arc::clone(&self.callback),
        }
    }
}

impl<T> PartialEq for Listener<T> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl<T> Eq for Listener<T> {}

impl<T> fmt::Debug for Listener<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("callback", &Arc::as_ptr(&self.callback))
            .finish()
    }
}
