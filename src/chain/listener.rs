use crate::context::ApplicationContext;
use crate::hook::{Facet, HookResult, InstanceHook, Object};
use crate::registry::{Capability, ObjectRegistry};
use std::sync::{Arc, Weak};

pub const LISTENER_DETECTOR_NAME: &str = "meshestra.listenerDetector";

/// Registers listener-shaped objects with the [`ApplicationContext`].
///
/// Installed last so it looks at each object in its final, fully wrapped form.
/// A listener wrapped by an earlier hook is still registered: the registry
/// views it through the object its factory returned.
pub struct ListenerDetector {
    registry: Weak<dyn ObjectRegistry>,
    context: Arc<ApplicationContext>,
}

impl ListenerDetector {
    pub fn new(registry: Weak<dyn ObjectRegistry>, context: Arc<ApplicationContext>) -> Self {
        Self { registry, context }
    }
}

impl InstanceHook for ListenerDetector {
    fn after_initialization(&self, object: Object, name: &str) -> HookResult<Option<Object>> {
        let Some(registry) = self.registry.upgrade() else {
            return Ok(Some(object));
        };
        let Some(facet) = registry.facet(name, &object, Capability::Listens) else {
            if registry.is_type_match(name, Capability::Listens) {
                tracing::warn!(
                    listener = name,
                    "Object is registered as a listener but exposes no listener facet; it will receive no events"
                );
            }
            return Ok(Some(object));
        };
        if let Facet::Listener(listener) = facet {
            let singleton = registry
                .definition(name)
                .is_ok_and(|definition| definition.is_singleton());
            if singleton {
                tracing::debug!(listener = name, "Detected application listener");
                self.context.add_listener(name, listener);
            } else {
                // Prototype listeners have no single instance the context could keep.
                tracing::warn!(
                    listener = name,
                    "Non-singleton object implements the listener capability but cannot be registered"
                );
            }
        }
        Ok(Some(object))
    }
}
