use std::sync::Once;

use listener_registry::{Capacity, EventRegistry, ListenerRef, SharedEventRegistry};

use super::mocks::Args;

// ============================================================================
// Test Setup Infrastructure
// ============================================================================

static TRACING: Once = Once::new();

/// Installs a fmt subscriber once per test binary; honours RUST_LOG
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "listener_registry=debug".into()),
            )
            .with_test_writer()
            .try_init();
    });
}

pub struct RegistryBuilder {
    max_listeners: Capacity,
    listeners: Vec<(String, ListenerRef<Args>, bool)>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        init_tracing();
        Self {
            max_listeners: Capacity::DEFAULT,
            listeners: Vec::new(),
        }
    }

    pub fn with_max_listeners(mut self, max_listeners: Capacity) -> Self {
        self.max_listeners = max_listeners;
        self
    }

    pub fn with_listener(mut self, event: &str, listener: ListenerRef<Args>) -> Self {
        self.listeners.push((event.to_string(), listener, false));
        self
    }

    pub fn with_once_listener(mut self, event: &str, listener: ListenerRef<Args>) -> Self {
        self.listeners.push((event.to_string(), listener, true));
        self
    }

    pub fn build(self) -> EventRegistry<Args> {
        let mut registry = EventRegistry::with_max_listeners(self.max_listeners);
        for (event, listener, once) in self.listeners {
            if once {
                registry.once(&event, listener).unwrap();
            } else {
                registry.on(&event, listener).unwrap();
            }
        }
        registry
    }

    pub fn build_shared(self) -> SharedEventRegistry<Args> {
        self.build().into()
    }
}
