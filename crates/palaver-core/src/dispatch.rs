//! Named-event subscription and dispatch.
//!
//! Handlers register against event names through weak handles, so the
//! dispatcher never keeps a handler alive artificially — handlers are
//! typically owned by short-lived command objects, and a handler whose
//! owner has been dropped is skipped silently at dispatch time.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{PalaverError, Result};
use crate::event::ChatEvent;

/// Lifecycle events every engine knows about. Subscribing to any other
/// name creates an ad hoc custom event.
pub const BUILTIN_EVENTS: &[&str] = &[
    "bond",
    "dispose",
    "start",
    "stop",
    "message",
    "attachment",
    "join",
    "leave",
    "enter",
    "exit",
    "inbound",
];

/// Context handed to every handler on dispatch.
#[derive(Debug, Clone, Default)]
pub struct EventContext {
    /// The classified chat item that triggered the event, when any.
    pub received: Option<ChatEvent>,
    /// Free-form extra fields.
    pub data: Map<String, Value>,
}

impl EventContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_received(received: ChatEvent) -> Self {
        Self {
            received: Some(received),
            data: Map::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }
}

/// Implemented by anything that wants lifecycle or custom events.
pub trait EventHandler: Send + Sync {
    /// Event names this handler is prepared to receive. Subscribing it
    /// to any other name is a configuration error.
    fn handled_events(&self) -> Vec<String>;

    /// Invoked once per dispatch of a subscribed event. An error here
    /// propagates to the dispatching caller.
    fn on_event(&self, event: &str, context: &EventContext) -> Result<()>;
}

/// The event hub: event name → list of weak subscriber handles.
pub struct Dispatcher {
    registered: Mutex<HashMap<String, Vec<Weak<dyn EventHandler>>>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        let mut registered = HashMap::new();
        for event in BUILTIN_EVENTS {
            registered.insert(event.to_string(), Vec::new());
        }
        Self {
            registered: Mutex::new(registered),
        }
    }

    /// Registers a handler for one event.
    ///
    /// The handler must list the event among its
    /// [`EventHandler::handled_events`] — a mismatch is a fatal
    /// configuration error. A previously unknown event name gets a
    /// fresh subscriber list, which is how custom events come to exist.
    pub fn subscribe<H>(&self, event: &str, handler: &Arc<H>) -> Result<()>
    where
        H: EventHandler + 'static,
    {
        if event.is_empty() {
            return Err(PalaverError::UnknownEvent(String::new()));
        }
        if !handler.handled_events().iter().any(|name| name == event) {
            return Err(PalaverError::UnsupportedEvent(event.to_string()));
        }

        let mut registered = self.registered.lock();
        let subscribers = registered.entry(event.to_string()).or_default();
        subscribers.push(Arc::downgrade(handler) as Weak<dyn EventHandler>);
        debug!(
            event,
            subscribers = subscribers.len(),
            "registered event handler"
        );
        Ok(())
    }

    /// Invokes every still-alive handler of one event, in registration
    /// order.
    ///
    /// Dispatching a name that was never registered is a fatal
    /// configuration error. A dead weak handle is skipped and pruned;
    /// a handler failure propagates to the caller.
    pub fn dispatch(&self, event: &str, context: &EventContext) -> Result<()> {
        let subscribers = {
            let registered = self.registered.lock();
            registered
                .get(event)
                .ok_or_else(|| PalaverError::UnknownEvent(event.to_string()))?
                .clone()
        };

        if subscribers.is_empty() {
            debug!(event, "dispatching, nothing to do");
            return Ok(());
        }
        debug!(event, subscribers = subscribers.len(), "dispatching");

        let mut dropped = 0;
        for weak in &subscribers {
            match weak.upgrade() {
                Some(handler) => {
                    handler
                        .on_event(event, context)
                        .map_err(|error| PalaverError::Handler {
                            event: event.to_string(),
                            reason: error.to_string(),
                        })?;
                }
                None => {
                    dropped += 1;
                    debug!(event, "registered handler no longer exists");
                }
            }
        }

        if dropped > 0 {
            let mut registered = self.registered.lock();
            if let Some(subscribers) = registered.get_mut(event) {
                subscribers.retain(|weak| weak.strong_count() > 0);
            }
        }
        Ok(())
    }

    /// Number of live subscribers for one event, mostly for tests.
    pub fn subscriber_count(&self, event: &str) -> usize {
        self.registered
            .lock()
            .get(event)
            .map(|subscribers| {
                subscribers
                    .iter()
                    .filter(|weak| weak.strong_count() > 0)
                    .count()
            })
            .unwrap_or(0)
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}
