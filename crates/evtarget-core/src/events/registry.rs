//! Per-target listener registry
//!
//! Maps event types to ordered listener sequences and performs synchronous
//! dispatch. Dispatch iterates a snapshot taken at dispatch start and holds no
//! lock while listeners run, so listeners may re-enter the registry.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::config::{FailurePolicy, TargetConfig};
use crate::error::{EventError, EventResult, ListenerFailure};
use crate::events::{Event, Listener};
use crate::target::EventTarget;

/// Listener store for one event target.
pub struct ListenerRegistry<T> {
    listeners: RwLock<HashMap<String, Vec<Listener<T>>>>,
    config: TargetConfig,
}

impl<T> ListenerRegistry<T> {
    /// Create an empty registry.
    pub fn new(config: TargetConfig) -> Self {
        Self {
            listeners: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// Append a listener for `event_type`.
    ///
    /// The same listener may be added more than once and then runs once per
    /// registration.
    pub fn add(&self, event_type: impl Into<String>, listener: Listener<T>) {
        let event_type = event_type.into();
        let mut listeners = self.write();
        let entry = listeners.entry(event_type.clone()).or_default();
        entry.push(listener);

        let count = entry.len();
        let max = self.config.max_listeners;
        // Warn once, when the threshold is first crossed.
        if max > 0 && count == max + 1 {
            tracing::warn!(
                event_type = %event_type,
                count,
                max,
                "Possible listener leak: more listeners than max_listeners"
            );
        } else {
            tracing::debug!(event_type = %event_type, count, "Added listener");
        }
    }

    /// Remove every registration of `listener` for `event_type`.
    ///
    /// Unknown types and unregistered listeners are ignored. The type's entry
    /// is dropped once its last listener is removed.
    pub fn remove(&self, event_type: &str, listener: &Listener<T>) {
        let mut listeners = self.write();
        let Some(extant) = listeners.get_mut(event_type) else {
            return;
        };

        let before = extant.len();
        extant.retain(|l| !l.ptr_eq(listener));
        let removed = before - extant.len();

        if extant.is_empty() {
            listeners.remove(event_type);
        }

        if removed > 0 {
            tracing::debug!(event_type, removed, "Removed listener");
        }
    }

    /// Dispatch `event` to the listeners of its type, on behalf of `target`.
    ///
    /// Returns `Ok(false)` when a listener prevented the default action.
    pub fn dispatch(&self, target: &EventTarget<T>, event: &mut Event<T>) -> EventResult<bool> {
        if event.event_type().is_empty() {
            return Err(EventError::MissingEventType);
        }

        let snapshot = match self.read().get(event.event_type()) {
            Some(listeners) => listeners.clone(),
            None => return Ok(true),
        };

        let event_type = event.event_type().to_owned();
        event.set_target(target.clone());

        match self.config.failure_policy {
            FailurePolicy::FailFast => {
                for (index, listener) in snapshot.iter().enumerate() {
                    tracing::trace!(event_type = %event_type, index, "Invoking listener");
                    if let Err(source) = listener.call(target, event) {
                        tracing::warn!(event_type = %event_type, index, error = %source, "Listener failed");
                        return Err(EventError::listener(event_type, index, source));
                    }
                }
            }
            FailurePolicy::Isolate => {
                let mut failures = Vec::new();
                for (index, listener) in snapshot.iter().enumerate() {
                    tracing::trace!(event_type = %event_type, index, "Invoking listener");
                    if let Err(source) = listener.call(target, event) {
                        tracing::warn!(event_type = %event_type, index, error = %source, "Listener failed");
                        failures.push(ListenerFailure { index, source });
                    }
                }
                if !failures.is_empty() {
                    return Err(EventError::ListenerFailures {
                        event_type,
                        failures,
                    });
                }
            }
        }

        Ok(!event.default_prevented())
    }

    /// Whether any listener is registered for `event_type`.
    pub fn has_listeners(&self, event_type: &str) -> bool {
        self.read().contains_key(event_type)
    }

    /// Number of registrations for `event_type`.
    pub fn listener_count(&self, event_type: &str) -> usize {
        self.read().get(event_type).map_or(0, Vec::len)
    }

    /// Event types with at least one listener, sorted.
    pub fn event_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.read().keys().cloned().collect();
        types.sort();
        types
    }

    pub fn config(&self) -> &TargetConfig {
        &self.config
    }

    // Listeners never run under the lock, so a poisoned map is still consistent.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Vec<Listener<T>>>> {
        self.listeners.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Vec<Listener<T>>>> {
        self.listeners.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> Default for ListenerRegistry<T> {
    fn default() -> Self {
        Self::new(TargetConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    fn counting(counter: &Arc<AtomicUsize>) -> Listener<()> {
        let counter = Arc::clone(counter);
        Listener::new(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }

    fn target() -> (Arc<()>, EventTarget<()>) {
        let source = Arc::new(());
        let target = EventTarget::new(&source, TargetConfig::default());
        (source, target)
    }

    #[test]
    fn test_add_preserves_duplicates() {
        let registry = ListenerRegistry::default();
        let counter = Arc::new(AtomicUsize::new(0));
        let listener = counting(&counter);

        registry.add("ping", listener.clone());
        registry.add("ping", listener);
        assert_eq!(registry.listener_count("ping"), 2);
    }

    #[test]
    fn test_remove_drops_all_occurrences_and_entry() {
        let registry = ListenerRegistry::default();
        let counter = Arc::new(AtomicUsize::new(0));
        let listener = counting(&counter);
        let other = counting(&counter);

        registry.add("ping", listener.clone());
        registry.add("ping", other.clone());
        registry.add("ping", listener.clone());

        registry.remove("ping", &listener);
        assert_eq!(registry.listener_count("ping"), 1);

        registry.remove("ping", &other);
        assert!(!registry.has_listeners("ping"));
        assert!(registry.event_types().is_empty());
    }

    #[test]
    fn test_remove_unknown_is_noop() {
        let registry = ListenerRegistry::default();
        let counter = Arc::new(AtomicUsize::new(0));
        let registered = counting(&counter);
        registry.add("ping", registered);

        registry.remove("pong", &counting(&counter));
        registry.remove("ping", &counting(&counter));
        assert_eq!(registry.listener_count("ping"), 1);
    }

    #[test]
    fn test_dispatch_runs_in_insertion_order() {
        let (_source, target) = target();
        let registry = ListenerRegistry::default();
        let order = Arc::new(Mutex::new(Vec::new()));

        for n in 0..3 {
            let order = Arc::clone(&order);
            registry.add(
                "ping",
                Listener::new(move |_, _| {
                    order.lock().unwrap().push(n);
                    Ok(())
                }),
            );
        }

        let mut event = Event::new("ping");
        assert!(registry.dispatch(&target, &mut event).unwrap());
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
        assert!(event.target().unwrap().ptr_eq(&target));
    }

    #[test]
    fn test_dispatch_without_listeners_skips_target() {
        let (_source, target) = target();
        let registry = ListenerRegistry::default();

        let mut event = Event::new("ping");
        assert!(registry.dispatch(&target, &mut event).unwrap());
        assert!(event.target().is_none());
    }

    #[test]
    fn test_dispatch_requires_type() {
        let (_source, target) = target();
        let registry = ListenerRegistry::default();

        let mut event = Event::default();
        let err = registry.dispatch(&target, &mut event).unwrap_err();
        assert!(matches!(err, EventError::MissingEventType));
    }

    #[test]
    fn test_fail_fast_skips_remaining_listeners() {
        let (_source, target) = target();
        let registry = ListenerRegistry::default();
        let counter = Arc::new(AtomicUsize::new(0));

        registry.add("ping", counting(&counter));
        registry.add("ping", Listener::new(|_, _| Err("boom".into())));
        registry.add("ping", counting(&counter));

        let err = registry.dispatch(&target, &mut Event::new("ping")).unwrap_err();
        match err {
            EventError::ListenerFailure {
                event_type, index, ..
            } => {
                assert_eq!(event_type, "ping");
                assert_eq!(index, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_isolate_runs_every_listener() {
        let (_source, target) = target();
        let config = TargetConfig::builder()
            .failure_policy(FailurePolicy::Isolate)
            .build();
        let registry = ListenerRegistry::new(config);
        let counter = Arc::new(AtomicUsize::new(0));

        registry.add("ping", Listener::new(|_, _| Err("first".into())));
        registry.add("ping", counting(&counter));
        registry.add("ping", Listener::new(|_, _| Err("second".into())));

        let err = registry.dispatch(&target, &mut Event::new("ping")).unwrap_err();
        match err {
            EventError::ListenerFailures { failures, .. } => {
                let indexes: Vec<usize> = failures.iter().map(|f| f.index).collect();
                assert_eq!(indexes, vec![0, 2]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_dispatch_uses_snapshot() {
        let (_source, target) = target();
        let counter = Arc::new(AtomicUsize::new(0));
        let late = counting(&counter);
        let late_for_remover = late.clone();

        // The first listener removes the second and registers a third; neither
        // change affects the dispatch already in progress.
        let remover = Listener::new(move |t: &EventTarget<()>, _: &mut Event<()>| {
            t.remove_event_listener("ping", &late_for_remover);
            t.add_event_listener("ping", Listener::new(|_, _| Err("too early".into())));
            Ok(())
        });
        target.add_event_listener("ping", remover);
        target.add_event_listener("ping", late);

        assert!(target.dispatch_event(&mut Event::new("ping")).unwrap());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(target.listener_count("ping"), 2);
    }

    #[test]
    fn test_recovers_from_poisoned_lock() {
        let (_source, target) = target();
        let registry = Arc::new(ListenerRegistry::default());
        let counter = Arc::new(AtomicUsize::new(0));
        registry.add("ping", counting(&counter));

        let poisoner = Arc::clone(&registry);
        let joined = std::thread::spawn(move || {
            let _guard = poisoner.listeners.write().unwrap();
            panic!("panic while holding the listener map");
        })
        .join();
        assert!(joined.is_err());
        assert!(registry.listeners.is_poisoned());

        registry.add("ping", counting(&counter));
        assert_eq!(registry.listener_count("ping"), 2);
        assert!(registry.dispatch(&target, &mut Event::new("ping")).unwrap());
        assert_eq!(counter.load(Ordering::SeqCst), 2);

        let first = counting(&counter);
        registry.add("pong", first.clone());
        registry.remove("pong", &first);
        assert!(!registry.has_listeners("pong"));
    }

    #[test]
    fn test_max_listeners_threshold_does_not_limit() {
        let config = TargetConfig::builder().max_listeners(1).build();
        let registry = ListenerRegistry::new(config);
        let counter = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            registry.add("ping", counting(&counter));
        }
        assert_eq!(registry.listener_count("ping"), 3);
    }
}
