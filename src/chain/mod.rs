//! Instance hook chain
//!
//! The chain is assembled once during bootstrap and consulted on every object
//! build afterwards. Readers take a snapshot and never lock; appends copy the
//! entries and swap the new vector in.

mod listener;
mod sentinel;

pub use listener::{LISTENER_DETECTOR_NAME, ListenerDetector};
pub use sentinel::{BootstrapSentinel, SENTINEL_NAME, SentinelState};

use crate::error::{BootstrapError, Result};
use crate::hook::{InstanceHook, Object};
use crate::phase::Phase;
use arc_swap::ArcSwap;
use std::sync::Arc;

/// An installed hook and the name it was installed under.
#[derive(Clone)]
pub struct ChainEntry {
    pub name: String,
    pub hook: Arc<dyn InstanceHook>,
}

pub struct HookChain {
    entries: ArcSwap<Vec<ChainEntry>>,
}

impl HookChain {
    pub fn new() -> Self {
        Self {
            entries: ArcSwap::from_pointee(Vec::new()),
        }
    }

    /// Append `hook`; a hook already installed under `name` is moved to the end.
    pub fn add(&self, name: impl Into<String>, hook: Arc<dyn InstanceHook>) {
        let name = name.into();
        self.entries.rcu(|current| {
            let mut next: Vec<ChainEntry> = current
                .iter()
                .filter(|entry| entry.name != name)
                .cloned()
                .collect();
            next.push(ChainEntry {
                name: name.clone(),
                hook: Arc::clone(&hook),
            });
            next
        });
        tracing::debug!(hook = %name, "Installed instance hook");
    }

    pub fn len(&self) -> usize {
        self.entries.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.load().is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.entries
            .load()
            .iter()
            .map(|entry| entry.name.clone())
            .collect()
    }

    pub fn snapshot(&self) -> Arc<Vec<ChainEntry>> {
        self.entries.load_full()
    }

    /// Run every hook's `before_initialization` in installation order.
    ///
    /// A hook answering `None` ends the walk; the object it was given is the result.
    pub fn apply_before(&self, object: Object, name: &str) -> Result<Object> {
        self.apply(object, name, Phase::BeforeInitialization)
    }

    /// Run every hook's `after_initialization` in installation order.
    ///
    /// Runs regardless of how `apply_before` ended for the same object.
    pub fn apply_after(&self, object: Object, name: &str) -> Result<Object> {
        self.apply(object, name, Phase::AfterInitialization)
    }

    fn apply(&self, object: Object, name: &str, phase: Phase) -> Result<Object> {
        let entries = self.entries.load_full();
        let mut current = object;
        for entry in entries.iter() {
            let outcome = match phase {
                Phase::BeforeInitialization => {
                    entry.hook.before_initialization(Arc::clone(&current), name)
                }
                _ => entry.hook.after_initialization(Arc::clone(&current), name),
            };
            match outcome.map_err(|source| BootstrapError::hook_failed(&entry.name, phase, source))? {
                Some(next) => current = next,
                None => {
                    tracing::trace!(object = name, hook = %entry.name, %phase, "Hook chain stopped");
                    return Ok(current);
                }
            }
        }
        Ok(current)
    }
}

impl Default for HookChain {
    fn default() -> Self {
        Self::new()
    }
}
