use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use super::{
    capacity::Capacity,
    dispatch::settle_all,
    errors::RegistryError,
    event_registry::EventRegistry,
    listener::{ListenerRef, Payload},
};

/// Cloneable handle to one [`EventRegistry`] shared across tasks
///
/// `EventRegistry` does no locking of its own. This handle wraps it in an
/// `RwLock` so several tasks (and the listeners themselves) can register,
/// remove and emit on the same registry. The lock is released while
/// listeners run, so a listener holding a clone may change the registry
/// mid-emission:
/// - listeners added during an emission are not invoked by it and are not
///   part of its one-shot cleanup
/// - one-shot listeners removed during an emission are simply skipped by
///   the cleanup
pub struct SharedEventRegistry<A: Payload> {
    inner: Arc<RwLock<EventRegistry<A>>>,
}

impl<A: Payload> Clone for SharedEventRegistry<A> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<A: Payload> SharedEventRegistry<A> {
    pub fn new(registry: EventRegistry<A>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(registry)),
        }
    }

    pub async fn max_listeners(&self) -> Capacity {
        self.inner.read().await.max_listeners()
    }

    pub async fn set_max_listeners(&self, max_listeners: Capacity) -> Result<&Self, RegistryError> {
        self.inner.write().await.set_max_listeners(max_listeners)?;
        Ok(self)
    }

    /// Validates a raw capacity value before taking the lock
    pub async fn try_set_max_listeners<C>(&self, max_listeners: C) -> Result<&Self, RegistryError>
    where
        C: TryInto<Capacity, Error = RegistryError>,
    {
        let max_listeners = max_listeners.try_into()?;
        self.set_max_listeners(max_listeners).await
    }

    pub async fn add_listener(
        &self,
        event: &str,
        listener: ListenerRef<A>,
    ) -> Result<&Self, RegistryError> {
        self.inner.write().await.add_listener(event, listener)?;
        Ok(self)
    }

    pub async fn on(&self, event: &str, listener: ListenerRef<A>) -> Result<&Self, RegistryError> {
        self.add_listener(event, listener).await
    }

    pub async fn prepend_listener(
        &self,
        event: &str,
        listener: ListenerRef<A>,
    ) -> Result<&Self, RegistryError> {
        self.inner.write().await.prepend_listener(event, listener)?;
        Ok(self)
    }

    pub async fn once(
        &self,
        event: &str,
        listener: ListenerRef<A>,
    ) -> Result<&Self, RegistryError> {
        self.inner.write().await.once(event, listener)?;
        Ok(self)
    }

    pub async fn prepend_once_listener(
        &self,
        event: &str,
        listener: ListenerRef<A>,
    ) -> Result<&Self, RegistryError> {
        self.inner
            .write()
            .await
            .prepend_once_listener(event, listener)?;
        Ok(self)
    }

    pub async fn remove_listener(
        &self,
        event: &str,
        listener: &ListenerRef<A>,
    ) -> Result<&Self, RegistryError> {
        self.inner.write().await.remove_listener(event, listener)?;
        Ok(self)
    }

    pub async fn off(
        &self,
        event: &str,
        listener: &ListenerRef<A>,
    ) -> Result<&Self, RegistryError> {
        self.remove_listener(event, listener).await
    }

    pub async fn remove_all_listeners(&self, event: Option<&str>) -> Result<&Self, RegistryError> {
        self.inner.write().await.remove_all_listeners(event)?;
        Ok(self)
    }

    /// Owned copy of the registered event names
    pub async fn event_names(&self) -> HashSet<String> {
        self.inner
            .read()
            .await
            .event_names()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    pub async fn listener_count(
        &self,
        event: &str,
        listener: Option<&ListenerRef<A>>,
    ) -> Result<usize, RegistryError> {
        self.inner.read().await.listener_count(event, listener)
    }

    pub async fn listeners(&self, event: &str) -> Result<Vec<ListenerRef<A>>, RegistryError> {
        self.inner.read().await.listeners(event)
    }

    pub async fn raw_listeners(&self, event: &str) -> Result<Vec<ListenerRef<A>>, RegistryError> {
        self.inner.read().await.raw_listeners(event)
    }

    /// Same contract as [`EventRegistry::emit`], without holding the lock
    /// while listeners run
    ///
    /// Dropping the returned future before it resolves (a caller-side
    /// timeout, `select!`) skips the one-shot cleanup: the snapshot's
    /// one-shot listeners stay registered and fire again on the next emit.
    pub async fn emit(&self, event: &str, args: A) -> Result<bool, RegistryError> {
        let snapshot = self.inner.read().await.snapshot(event)?;
        let Some(snapshot) = snapshot else {
            debug!(event = %event.trim(), "No listeners for event");
            return Ok(false);
        };

        let settled = settle_all(&snapshot.event, &snapshot.listeners, &args).await;
        debug!(
            event = %snapshot.event,
            succeeded = settled.succeeded,
            failed = settled.failed,
            "Shared emission settled"
        );

        self.inner.write().await.finish_emission(snapshot);
        Ok(true)
    }
}

impl<A: Payload> fmt::Debug for SharedEventRegistry<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedEventRegistry")
            .finish_non_exhaustive()
    }
}

impl<A: Payload> Default for SharedEventRegistry<A> {
    fn default() -> Self {
        Self::new(EventRegistry::new())
    }
}

impl<A: Payload> From<EventRegistry<A>> for SharedEventRegistry<A> {
    fn from(registry: EventRegistry<A>) -> Self {
        Self::new(registry)
    }
}
