//! Identity-keyed cache of event targets
//!
//! Each source object maps to exactly one [`EventTarget`] for as long as the
//! source is alive. Entries and targets hold the source weakly, so the cache
//! itself never extends its lifetime; entries for dropped sources are pruned
//! on access.
//!
//! The cache does hold each target strongly, and a target owns its listeners.
//! A listener that captures the source `Arc` (or a clone of its own target)
//! therefore keeps the source (or the target) alive for as long as the entry
//! exists, and `purge` can never remove it. Listeners should reach the source
//! through the receiver instead: `receiver.source()` upgrades on demand and
//! holds nothing between dispatches.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use once_cell::sync::Lazy;

use crate::config::TargetConfig;
use crate::target::EventTarget;

static GLOBAL_CACHE: Lazy<TargetCache> = Lazy::new(|| TargetCache::new(TargetConfig::from_env()));

/// Event target for `source` from the process-wide cache.
///
/// Repeated calls with the same `Arc` (or clones of it) return the same
/// target. The global cache is configured from the environment on first use;
/// see [`TargetConfig::from_env`].
///
/// Listeners must not capture `source` itself: the global cache would then keep
/// it alive forever. Use `receiver.source()` inside the listener.
pub fn event_target<T>(source: &Arc<T>) -> EventTarget<T>
where
    T: Send + Sync + 'static,
{
    GLOBAL_CACHE.get_or_create(source)
}

/// The process-wide cache used by [`event_target`].
pub fn global_cache() -> &'static TargetCache {
    &GLOBAL_CACHE
}

/// Allocation identity of a source. The entry's `Weak` pins the allocation,
/// so an address is never reused while its entry exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct SourceKey {
    type_id: TypeId,
    addr: usize,
}

impl SourceKey {
    fn of<T: 'static>(source: &Arc<T>) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            addr: Arc::as_ptr(source) as *const () as usize,
        }
    }
}

trait CacheSlot: Send + Sync {
    fn is_alive(&self) -> bool;

    fn as_any(&self) -> &dyn Any;
}

struct Slot<T> {
    source: Weak<T>,
    target: EventTarget<T>,
}

impl<T: Send + Sync + 'static> CacheSlot for Slot<T> {
    fn is_alive(&self) -> bool {
        self.source.strong_count() > 0
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Cache mapping source objects to their event targets.
///
/// Sources are never kept alive by the cache, unless one of their listeners
/// captures a strong reference to the source or to its target.
pub struct TargetCache {
    config: TargetConfig,
    slots: Mutex<HashMap<SourceKey, Box<dyn CacheSlot>>>,
}

impl TargetCache {
    /// Create an empty cache whose targets use `config`.
    pub fn new(config: TargetConfig) -> Self {
        Self {
            config,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Return the target for `source`, creating it on first request.
    ///
    /// Lookup and insertion happen under one lock, so concurrent callers for
    /// the same source always observe the same target.
    pub fn get_or_create<T>(&self, source: &Arc<T>) -> EventTarget<T>
    where
        T: Send + Sync + 'static,
    {
        let key = SourceKey::of(source);
        let mut slots = self.slots();
        Self::prune(&mut slots);

        if let Some(slot) = slots.get(&key) {
            if let Some(slot) = slot.as_any().downcast_ref::<Slot<T>>() {
                return slot.target.clone();
            }
        }

        let target = EventTarget::new(source, self.config.clone());
        slots.insert(
            key,
            Box::new(Slot {
                source: Arc::downgrade(source),
                target: target.clone(),
            }),
        );
        tracing::debug!(
            source_type = std::any::type_name::<T>(),
            cached = slots.len(),
            "Created event target"
        );

        target
    }

    /// Return the cached target for `source` without creating one.
    pub fn get<T>(&self, source: &Arc<T>) -> Option<EventTarget<T>>
    where
        T: Send + Sync + 'static,
    {
        let slots = self.slots();
        slots
            .get(&SourceKey::of(source))
            .filter(|slot| slot.is_alive())
            .and_then(|slot| slot.as_any().downcast_ref::<Slot<T>>())
            .map(|slot| slot.target.clone())
    }

    /// Drop entries whose source has been dropped. Returns how many were removed.
    pub fn purge(&self) -> usize {
        Self::prune(&mut self.slots())
    }

    /// Number of entries, including ones not yet pruned.
    pub fn len(&self) -> usize {
        self.slots().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn config(&self) -> &TargetConfig {
        &self.config
    }

    fn prune(slots: &mut HashMap<SourceKey, Box<dyn CacheSlot>>) -> usize {
        let before = slots.len();
        slots.retain(|_, slot| slot.is_alive());
        let removed = before - slots.len();
        if removed > 0 {
            tracing::debug!(removed, remaining = slots.len(), "Pruned event targets");
        }
        removed
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<SourceKey, Box<dyn CacheSlot>>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for TargetCache {
    fn default() -> Self {
        Self::new(TargetConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FailurePolicy;
    use crate::events::{Event, Listener};
    use crate::target::{Properties, PropertyMap};
    use std::thread;

    #[test]
    fn test_same_source_same_target() {
        let cache = TargetCache::default();
        let source = Arc::new(String::from("source"));

        let first = cache.get_or_create(&source);
        let second = cache.get_or_create(&Arc::clone(&source));
        assert!(first.ptr_eq(&second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_distinct_sources_distinct_targets() {
        let cache = TargetCache::default();
        let a = Arc::new(String::from("same"));
        let b = Arc::new(String::from("same"));

        assert!(!cache.get_or_create(&a).ptr_eq(&cache.get_or_create(&b)));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_get_does_not_create() {
        let cache = TargetCache::default();
        let source = Arc::new(1_u32);

        assert!(cache.get(&source).is_none());
        let target = cache.get_or_create(&source);
        assert!(cache.get(&source).unwrap().ptr_eq(&target));
    }

    #[test]
    fn test_cache_does_not_keep_source_alive() {
        let cache = TargetCache::default();
        let source = Arc::new(vec![1, 2, 3]);
        let _target = cache.get_or_create(&source);
        assert_eq!(Arc::strong_count(&source), 1);

        drop(source);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.purge(), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_listener_reaching_source_through_receiver_releases_it() {
        let cache = TargetCache::default();
        let source = Arc::new(PropertyMap::new().with("hits", 0));
        let weak = Arc::downgrade(&source);
        let target = cache.get_or_create(&source);

        target.add_event_listener(
            "hit",
            Listener::new(|receiver: &EventTarget<PropertyMap>, _: &mut Event<PropertyMap>| {
                let source = receiver.source()?;
                let hits = source.get_property("hits").and_then(|v| v.as_u64()).unwrap_or(0);
                source.set_property("hits", (hits + 1).into());
                Ok(())
            }),
        );
        assert!(target.dispatch_event(&mut Event::new("hit")).unwrap());
        assert_eq!(source.get_property("hits"), Some(1.into()));

        drop(target);
        drop(source);
        assert!(weak.upgrade().is_none());
        assert_eq!(cache.purge(), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_dead_entries_pruned_on_access() {
        let cache = TargetCache::default();
        let dropped = Arc::new(0_u8);
        cache.get_or_create(&dropped);
        drop(dropped);

        let live = Arc::new(1_u8);
        cache.get_or_create(&live);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_targets_inherit_cache_config() {
        let config = TargetConfig::builder()
            .failure_policy(FailurePolicy::Isolate)
            .build();
        let cache = TargetCache::new(config.clone());
        assert_eq!(cache.config(), &config);
    }

    #[test]
    fn test_concurrent_get_or_create() {
        let cache = Arc::new(TargetCache::default());
        let source = Arc::new(String::from("shared"));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let source = Arc::clone(&source);
                thread::spawn(move || cache.get_or_create(&source))
            })
            .collect();

        let targets: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(targets.windows(2).all(|w| w[0].ptr_eq(&w[1])));
        assert_eq!(cache.len(), 1);
    }
}
