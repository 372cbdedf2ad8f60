// Listener registry components
//
// This module provides the observer-pattern core: listeners registered
// against named events and an emitter that fans out to all of them.

// Public API - what other modules can use
pub use capacity::Capacity;
pub use errors::RegistryError;
pub use event_registry::EventRegistry;
pub use listener::{same_listener, Listener, ListenerError, ListenerFn, ListenerRef, Payload};
pub use shared::SharedEventRegistry;

// Internal modules
mod capacity;
mod dispatch;
mod errors;
mod event_registry;
mod listener;
mod shared;
