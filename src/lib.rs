// Library crate for the listener registry
// This file exposes the public API for embedding applications and integration tests

pub mod config;
pub mod registry;

// Re-export commonly used types for easier access
pub use config::RegistryConfig;
pub use registry::{
    same_listener, Capacity, EventRegistry, Listener, ListenerError, ListenerFn, ListenerRef,
    Payload, RegistryError, SharedEventRegistry,
};
