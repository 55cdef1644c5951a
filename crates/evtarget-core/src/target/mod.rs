//! Event targets over shared source objects
//!
//! This module provides:
//! - The forwarding facade exposing the three event methods
//! - Dynamic member access through the `Properties` trait
//! - The identity-keyed target cache and the process-wide `event_target`

mod cache;
mod properties;
mod wrapper;

pub use cache::{event_target, global_cache, TargetCache};
pub use properties::{Properties, PropertyMap};
pub use wrapper::{BoundMethod, EventTarget, Member, MethodArgs, ReservedMethod};
