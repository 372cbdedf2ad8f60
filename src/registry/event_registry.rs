use std::collections::{HashMap, HashSet};
use std::fmt;
use tracing::{debug, instrument, warn};

use super::{
    capacity::Capacity,
    dispatch::settle_all,
    errors::{validate_event_name, RegistryError},
    listener::{same_listener, ListenerRef, Payload},
};
use crate::config::RegistryConfig;

/// One registration of a callback against an event
///
/// `id` tells records apart during one-shot cleanup; matching and removal
/// go through the callback reference only.
struct ListenerRecord<A: Payload> {
    id: u64,
    callback: ListenerRef<A>,
    once: bool,
}

/// Listeners captured at the start of an emission
///
/// The one-shot cleanup after the emission only ever touches `once_ids`:
/// records added while listeners run are left alone, and records that
/// disappeared in the meantime are skipped.
pub(crate) struct EmissionSnapshot<A: Payload> {
    pub event: String,
    pub listeners: Vec<ListenerRef<A>>,
    once_ids: Vec<u64>,
}

/// Registry of listeners keyed by event name
///
/// Listeners for an event are delivered in insertion order; `prepend_*`
/// variants insert at the head. Every registration is checked against the
/// per-event [`Capacity`] so runaway subscriptions fail loudly instead of
/// leaking.
///
/// ```
/// use listener_registry::{EventRegistry, ListenerFn, ListenerRef};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut registry: EventRegistry<String> = EventRegistry::new();
/// let log: ListenerRef<String> = ListenerFn::arc("log", |line: String| async move {
///     println!("{}", line);
///     Ok(())
/// });
///
/// registry.on("line", log.clone())?.once("line", log)?;
/// assert_eq!(registry.listener_count("line", None)?, 2);
///
/// assert!(registry.emit("line", "hello".to_string()).await?);
/// assert_eq!(registry.listener_count("line", None)?, 1);
/// # Ok(())
/// # }
/// ```
pub struct EventRegistry<A: Payload> {
    events: HashMap<String, Vec<ListenerRecord<A>>>,
    max_listeners: Capacity,
    next_record_id: u64,
}

impl<A: Payload> EventRegistry<A> {
    /// Creates an empty registry with the default capacity of 10
    pub fn new() -> Self {
        Self::with_max_listeners(Capacity::DEFAULT)
    }

    /// Creates an empty registry with the given per-event capacity
    pub fn with_max_listeners(max_listeners: Capacity) -> Self {
        Self {
            events: HashMap::new(),
            max_listeners,
            next_record_id: 0,
        }
    }

    /// Creates an empty registry from a raw capacity value (`i64`, `f64`, `&str`)
    pub fn try_with_max_listeners<C>(max_listeners: C) -> Result<Self, RegistryError>
    where
        C: TryInto<Capacity, Error = RegistryError>,
    {
        Ok(Self::with_max_listeners(max_listeners.try_into()?))
    }

    /// Creates an empty registry from loaded configuration
    pub fn from_config(config: &RegistryConfig) -> Self {
        Self::with_max_listeners(config.max_listeners)
    }

    pub fn max_listeners(&self) -> Capacity {
        self.max_listeners
    }

    /// Replaces the per-event capacity
    ///
    /// Fails without changing anything if some event already holds more
    /// listeners than `max_listeners` allows.
    pub fn set_max_listeners(
        &mut self,
        max_listeners: Capacity,
    ) -> Result<&mut Self, RegistryError> {
        if let Some((event, records)) = self
            .events
            .iter()
            .find(|(_, records)| !max_listeners.allows(records.len()))
        {
            warn!(
                event = %event,
                listeners = records.len(),
                max = %max_listeners,
                "Rejected capacity below current listener count"
            );
            return Err(RegistryError::CapacityViolation {
                event: event.clone(),
                count: records.len(),
                max: max_listeners,
            });
        }

        debug!(old = %self.max_listeners, new = %max_listeners, "Max listeners updated");
        self.max_listeners = max_listeners;
        Ok(self)
    }

    /// Validates a raw capacity value, then behaves like [`Self::set_max_listeners`]
    pub fn try_set_max_listeners<C>(&mut self, max_listeners: C) -> Result<&mut Self, RegistryError>
    where
        C: TryInto<Capacity, Error = RegistryError>,
    {
        let max_listeners = max_listeners.try_into()?;
        self.set_max_listeners(max_listeners)
    }

    /// Appends a permanent listener
    pub fn add_listener(
        &mut self,
        event: &str,
        listener: ListenerRef<A>,
    ) -> Result<&mut Self, RegistryError> {
        self.register(event, listener, false, false)
    }

    /// Synonym for [`Self::add_listener`]
    pub fn on(
        &mut self,
        event: &str,
        listener: ListenerRef<A>,
    ) -> Result<&mut Self, RegistryError> {
        self.add_listener(event, listener)
    }

    /// Inserts a permanent listener ahead of every existing one
    pub fn prepend_listener(
        &mut self,
        event: &str,
        listener: ListenerRef<A>,
    ) -> Result<&mut Self, RegistryError> {
        self.register(event, listener, true, false)
    }

    /// Appends a listener that is removed after the next emission it takes part in
    pub fn once(
        &mut self,
        event: &str,
        listener: ListenerRef<A>,
    ) -> Result<&mut Self, RegistryError> {
        self.register(event, listener, false, true)
    }

    /// Inserts a one-shot listener ahead of every existing one
    pub fn prepend_once_listener(
        &mut self,
        event: &str,
        listener: ListenerRef<A>,
    ) -> Result<&mut Self, RegistryError> {
        self.register(event, listener, true, true)
    }

    fn register(
        &mut self,
        event: &str,
        listener: ListenerRef<A>,
        prepend: bool,
        once: bool,
    ) -> Result<&mut Self, RegistryError> {
        let event = validate_event_name(event)?;

        let current = self.events.get(event).map_or(0, Vec::len);
        if !self.max_listeners.allows(current + 1) {
            warn!(
                event = %event,
                listeners = current,
                max = %self.max_listeners,
                listener = listener.name(),
                "Possible memory leak detected, refusing listener"
            );
            return Err(RegistryError::CapacityViolation {
                event: event.to_string(),
                count: current + 1,
                max: self.max_listeners,
            });
        }

        let record = ListenerRecord {
            id: self.next_record_id,
            callback: listener,
            once,
        };
        self.next_record_id += 1;

        debug!(
            event = %event,
            listener = record.callback.name(),
            prepend = prepend,
            once = once,
            "Registering listener"
        );

        let records = self.events.entry(event.to_string()).or_default();
        if prepend {
            records.insert(0, record);
        } else {
            records.push(record);
        }
        Ok(self)
    }

    /// Removes the first record registered with `listener`
    ///
    /// Unknown events and unregistered listeners are a no-op.
    pub fn remove_listener(
        &mut self,
        event: &str,
        listener: &ListenerRef<A>,
    ) -> Result<&mut Self, RegistryError> {
        let event = validate_event_name(event)?;

        if let Some(records) = self.events.get_mut(event) {
            if let Some(position) = records
                .iter()
                .position(|record| same_listener(&record.callback, listener))
            {
                records.remove(position);
                debug!(event = %event, listener = listener.name(), "Removed listener");

                if records.is_empty() {
                    self.events.remove(event);
                }
            }
        }
        Ok(self)
    }

    /// Synonym for [`Self::remove_listener`]
    pub fn off(
        &mut self,
        event: &str,
        listener: &ListenerRef<A>,
    ) -> Result<&mut Self, RegistryError> {
        self.remove_listener(event, listener)
    }

    /// Removes every listener of `event`, or of every event when `None`
    pub fn remove_all_listeners(
        &mut self,
        event: Option<&str>,
    ) -> Result<&mut Self, RegistryError> {
        match event {
            None => {
                debug!(events = self.events.len(), "Clearing all listeners");
                self.events.clear();
            }
            Some(event) => {
                let event = validate_event_name(event)?;
                if let Some(records) = self.events.remove(event) {
                    debug!(event = %event, listeners = records.len(), "Cleared event listeners");
                }
            }
        }
        Ok(self)
    }

    /// Names of events that currently have listeners, in no particular order
    pub fn event_names(&self) -> HashSet<&str> {
        self.events.keys().map(String::as_str).collect()
    }

    /// Number of records for `event`, or only those registered with `listener`
    ///
    /// One-shot records are included.
    pub fn listener_count(
        &self,
        event: &str,
        listener: Option<&ListenerRef<A>>,
    ) -> Result<usize, RegistryError> {
        let event = validate_event_name(event)?;
        let Some(records) = self.events.get(event) else {
            return Ok(0);
        };

        Ok(match listener {
            None => records.len(),
            Some(listener) => records
                .iter()
                .filter(|record| same_listener(&record.callback, listener))
                .count(),
        })
    }

    /// Permanent listeners of `event` in delivery order
    pub fn listeners(&self, event: &str) -> Result<Vec<ListenerRef<A>>, RegistryError> {
        self.collect_listeners(event, false)
    }

    /// All listeners of `event`, one-shot ones included, in delivery order
    pub fn raw_listeners(&self, event: &str) -> Result<Vec<ListenerRef<A>>, RegistryError> {
        self.collect_listeners(event, true)
    }

    fn collect_listeners(
        &self,
        event: &str,
        include_once: bool,
    ) -> Result<Vec<ListenerRef<A>>, RegistryError> {
        let event = validate_event_name(event)?;
        Ok(self
            .events
            .get(event)
            .map(|records| {
                records
                    .iter()
                    .filter(|record| include_once || !record.once)
                    .map(|record| record.callback.clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    /// Invokes every listener of `event` with `args`
    ///
    /// Returns `Ok(false)` when the event has no listeners. Otherwise all
    /// listeners run concurrently and the call resolves once every one of
    /// them has settled; listener failures and panics are logged, never
    /// returned. One-shot listeners are removed afterwards.
    ///
    /// The removal happens after every listener has settled. If the returned
    /// future is dropped before it resolves (a caller-side timeout,
    /// `select!`), the one-shot listeners it captured stay registered and
    /// fire again on the next emit.
    #[instrument(skip(self, args))]
    pub async fn emit(&mut self, event: &str, args: A) -> Result<bool, RegistryError> {
        let Some(snapshot) = self.snapshot(event)? else {
            debug!("No listeners for event");
            return Ok(false);
        };

        let settled = settle_all(&snapshot.event, &snapshot.listeners, &args).await;
        debug!(
            succeeded = settled.succeeded,
            failed = settled.failed,
            "Emission settled"
        );

        self.finish_emission(snapshot);
        Ok(true)
    }

    /// Validates `event` and captures its current listeners, if any
    pub(crate) fn snapshot(
        &self,
        event: &str,
    ) -> Result<Option<EmissionSnapshot<A>>, RegistryError> {
        let event = validate_event_name(event)?;
        let Some(records) = self.events.get(event) else {
            return Ok(None);
        };

        Ok(Some(EmissionSnapshot {
            event: event.to_string(),
            listeners: records
                .iter()
                .map(|record| record.callback.clone())
                .collect(),
            once_ids: records
                .iter()
                .filter(|record| record.once)
                .map(|record| record.id)
                .collect(),
        }))
    }

    /// Drops the snapshot's one-shot records, and the event key if it emptied
    pub(crate) fn finish_emission(&mut self, snapshot: EmissionSnapshot<A>) {
        if snapshot.once_ids.is_empty() {
            return;
        }

        let Some(records) = self.events.get_mut(&snapshot.event) else {
            return;
        };

        let before = records.len();
        records.retain(|record| !snapshot.once_ids.contains(&record.id));
        debug!(
            event = %snapshot.event,
            consumed = before - records.len(),
            "Removed one-shot listeners"
        );

        if records.is_empty() {
            self.events.remove(&snapshot.event);
        }
    }
}

impl<A: Payload> Default for EventRegistry<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: Payload> fmt::Debug for EventRegistry<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: HashMap<&str, usize> = self
            .events
            .iter()
            .map(|(event, records)| (event.as_str(), records.len()))
            .collect();
        f.debug_struct("EventRegistry")
            .field("max_listeners", &self.max_listeners)
            .field("listeners", &counts)
            .finish()
    }
}
