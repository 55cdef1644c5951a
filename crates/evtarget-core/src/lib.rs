//! evtarget-core - Core library for evtarget.
//!
//! This crate turns any shared object into a browser-style event target:
//! a wrapper exposing `add_event_listener`, `remove_event_listener` and
//! `dispatch_event`, while forwarding every other member to the object.
//! Wrappers are memoized per object identity.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use evtarget_core::{event_target, Event, Listener, Member, PropertyMap};
//!
//! let source = Arc::new(PropertyMap::new().with("x", 1));
//! let target = event_target(&source);
//!
//! target.add_event_listener(
//!     "ping",
//!     Listener::new(|_, event: &mut Event<PropertyMap>| {
//!         event.prevent_default();
//!         Ok(())
//!     }),
//! );
//!
//! let mut event = Event::new("ping");
//! assert!(!target.dispatch_event(&mut event)?);
//! assert!(event.target().unwrap().ptr_eq(&event_target(&source)));
//! assert_eq!(target.member("x")?, Member::Value(1.into()));
//! # Ok::<(), evtarget_core::EventError>(())
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod target;

// Re-export commonly used types
pub use config::{FailurePolicy, TargetConfig};
pub use error::{ErrorCode, EventError, EventResult, ListenerError, ListenerFailure};
pub use events::{Event, Listener, ListenerRegistry};
pub use target::{
    event_target, global_cache, BoundMethod, EventTarget, Member, MethodArgs, Properties,
    PropertyMap, ReservedMethod, TargetCache,
};
