use crate::hook::{HookResult, InstanceHook, Object};
use crate::registry::{Capability, ObjectRegistry, Role};
use std::sync::{Mutex, PoisonError, Weak};

pub const SENTINEL_NAME: &str = "meshestra.bootstrapSentinel";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SentinelState {
    /// No object has been reported yet.
    Armed,
    /// Objects built before every intended hook was installed, in build order.
    Tripped(Vec<String>),
}

/// Reports objects built while the instance hook chain is still incomplete.
///
/// Such objects miss some interception (for example they will not be wrapped
/// by a hook installed later). The sentinel only logs; it never changes or
/// rejects the object.
pub struct BootstrapSentinel {
    registry: Weak<dyn ObjectRegistry>,
    target_count: usize,
    tripped: Mutex<Vec<String>>,
}

impl BootstrapSentinel {
    pub fn new(registry: Weak<dyn ObjectRegistry>, target_count: usize) -> Self {
        Self {
            registry,
            target_count,
            tripped: Mutex::new(Vec::new()),
        }
    }

    pub fn target_count(&self) -> usize {
        self.target_count
    }

    pub fn state(&self) -> SentinelState {
        let tripped = self.tripped.lock().unwrap_or_else(PoisonError::into_inner);
        if tripped.is_empty() {
            SentinelState::Armed
        } else {
            SentinelState::Tripped(tripped.clone())
        }
    }

    pub fn tripped(&self) -> Vec<String> {
        self.tripped
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Judged from the registration, so a hook wrapped by an earlier hook still
    /// counts as a hook.
    fn is_premature(&self, registry: &dyn ObjectRegistry, name: &str) -> bool {
        !registry.is_type_match(name, Capability::InterceptsInstance)
            && !is_infrastructure(registry, name)
            && registry.installed_hook_count() < self.target_count
    }
}

fn is_infrastructure(registry: &dyn ObjectRegistry, name: &str) -> bool {
    registry.contains_definition(name)
        && registry
            .definition(name)
            .is_ok_and(|definition| definition.role() == Role::Infrastructure)
}

impl InstanceHook for BootstrapSentinel {
    fn after_initialization(&self, object: Object, name: &str) -> HookResult<Option<Object>> {
        if let Some(registry) = self.registry.upgrade() {
            if self.is_premature(registry.as_ref(), name) {
                tracing::info!(
                    object = name,
                    installed = registry.installed_hook_count(),
                    target = self.target_count,
                    "Object '{}' is not eligible for getting processed by all instance hooks",
                    name
                );
                self.tripped
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(name.to_string());
            }
        }
        Ok(Some(object))
    }
}
