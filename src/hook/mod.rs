//! Hook capabilities
//!
//! A hook is any object whose registration exposes one or more of these traits.
//! The container discovers hooks by capability and hands them out as facets,
//! so a single object may at once mutate the registry, customize the factory
//! and intercept instances.

use crate::context::ApplicationEvent;
use crate::registry::{Definition, ObjectRegistry};
use std::any::Any;
use std::sync::Arc;

/// A type-erased object built by the container.
pub type Object = Arc<dyn Any + Send + Sync>;

/// Result type returned by hook entry points.
pub type HookResult<T = ()> = anyhow::Result<T>;

/// Customizes the factory once definitions have reached their final shape.
///
/// # Example
///
/// ```rust,ignore
/// struct AutowireByType;
///
/// impl FactoryCustomizer for AutowireByType {
///     fn customize_factory(&self, registry: &dyn ObjectRegistry) -> HookResult {
///         registry.update_definition("b", &mut |definition| {
///             definition.set_property("autowire", "by-type");
///         })?;
///         Ok(())
///     }
/// }
/// ```
pub trait FactoryCustomizer: Send + Sync + 'static {
    fn customize_factory(&self, registry: &dyn ObjectRegistry) -> HookResult;
}

/// Adds, replaces or edits definitions before any ordinary object is built.
///
/// Every registry mutator is also a factory customizer; its
/// [`FactoryCustomizer::customize_factory`] runs after all registry mutation
/// in the whole system has finished.
pub trait RegistryMutator: FactoryCustomizer {
    fn mutate_registry(&self, registry: &dyn ObjectRegistry) -> HookResult;
}

/// Intercepts every object the container builds after the hook is installed.
///
/// Returning `Ok(None)` stops the walk over the chain: the object handed to this
/// hook becomes the final result and no later hook sees it.
pub trait InstanceHook: Send + Sync + 'static {
    /// Called before the object is initialized.
    fn before_initialization(&self, object: Object, _name: &str) -> HookResult<Option<Object>> {
        Ok(Some(object))
    }

    /// Called after the object is initialized.
    fn after_initialization(&self, object: Object, _name: &str) -> HookResult<Option<Object>> {
        Ok(Some(object))
    }

    /// Offered the definition right before its factory runs.
    ///
    /// Edits reach the factory of this build only; the registered definition is
    /// left unchanged. An error aborts the build.
    fn merge_definition(&self, _definition: &mut Definition, _name: &str) -> HookResult {
        Ok(())
    }
}

/// Receives application events once detected by the listener detector.
pub trait ApplicationListener: Send + Sync + 'static {
    fn on_application_event(&self, event: &ApplicationEvent);
}

/// A capability view of a built object.
#[derive(Clone)]
pub enum Facet {
    Mutator(Arc<dyn RegistryMutator>),
    Customizer(Arc<dyn FactoryCustomizer>),
    Instance(Arc<dyn InstanceHook>),
    Listener(Arc<dyn ApplicationListener>),
}

impl Facet {
    pub fn into_mutator(self) -> Option<Arc<dyn RegistryMutator>> {
        match self {
            Facet::Mutator(hook) => Some(hook),
            _ => None,
        }
    }

    pub fn into_customizer(self) -> Option<Arc<dyn FactoryCustomizer>> {
        match self {
            Facet::Customizer(hook) => Some(hook),
            _ => None,
        }
    }

    pub fn into_instance_hook(self) -> Option<Arc<dyn InstanceHook>> {
        match self {
            Facet::Instance(hook) => Some(hook),
            _ => None,
        }
    }

    pub fn into_listener(self) -> Option<Arc<dyn ApplicationListener>> {
        match self {
            Facet::Listener(listener) => Some(listener),
            _ => None,
        }
    }
}

/// A hook handed to the bootstrap by the embedding application instead of
/// being discovered from a definition.
#[derive(Clone)]
pub enum ExternalHook {
    Mutator {
        name: String,
        hook: Arc<dyn RegistryMutator>,
    },
    Customizer {
        name: String,
        hook: Arc<dyn FactoryCustomizer>,
    },
}

impl ExternalHook {
    pub fn mutator<H: RegistryMutator>(name: impl Into<String>, hook: H) -> Self {
        Self::Mutator {
            name: name.into(),
            hook: Arc::new(hook),
        }
    }

    pub fn customizer<H: FactoryCustomizer>(name: impl Into<String>, hook: H) -> Self {
        Self::Customizer {
            name: name.into(),
            hook: Arc::new(hook),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Mutator { name, .. } | Self::Customizer { name, .. } => name,
        }
    }
}
