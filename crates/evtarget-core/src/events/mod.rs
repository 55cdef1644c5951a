//! Event system for event targets
//!
//! This module provides:
//! - Event values carrying a type, a JSON detail and the dispatch target
//! - Listener callbacks compared by reference
//! - The per-target listener registry performing synchronous dispatch

mod event;
mod listener;
mod registry;

pub use event::Event;
pub use listener::Listener;
pub use registry::ListenerRegistry;
