//! Application context
//!
//! Holds the listeners detected while objects are built and publishes
//! application events to them.

use crate::hook::ApplicationListener;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, PoisonError, RwLock};
use uuid::Uuid;

pub const CONTEXT_REFRESHED: &str = "context-refreshed";

#[derive(Debug, Clone, Serialize)]
pub struct ApplicationEvent {
    pub name: String,
    pub payload: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl ApplicationEvent {
    pub fn new(name: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            payload,
            timestamp: Utc::now(),
        }
    }
}

pub struct ApplicationContext {
    id: Uuid,
    listeners: RwLock<Vec<(String, Arc<dyn ApplicationListener>)>>,
}

impl Default for ApplicationContext {
    fn default() -> Self {
        Self::new()
    }
}

impl ApplicationContext {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            listeners: RwLock::new(Vec::new()),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Register `listener`, replacing one already registered under `name`.
    pub fn add_listener(&self, name: impl Into<String>, listener: Arc<dyn ApplicationListener>) {
        let name = name.into();
        let mut listeners = self.listeners.write().unwrap_or_else(PoisonError::into_inner);
        match listeners.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = listener,
            None => listeners.push((name, listener)),
        }
    }

    pub fn remove_listener(&self, name: &str) -> bool {
        let mut listeners = self.listeners.write().unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|(existing, _)| existing != name);
        listeners.len() != before
    }

    pub fn listener_names(&self) -> Vec<String> {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Deliver `event` to every listener in registration order.
    ///
    /// Returns the number of listeners notified.
    pub fn publish(&self, event: &ApplicationEvent) -> usize {
        // Listeners may register further listeners; deliver to a snapshot.
        let listeners: Vec<Arc<dyn ApplicationListener>> = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        tracing::debug!(event = %event.name, listeners = listeners.len(), "Publishing event");
        for listener in &listeners {
            listener.on_application_event(event);
        }
        listeners.len()
    }
}
