//! Object registry contract
//!
//! The bootstrap never reaches into a concrete store. Everything it needs from
//! the runtime, discovering hooks by capability, classifying them, building them
//! and installing the instance hook chain, goes through [`ObjectRegistry`].
//! [`Container`] is the in-memory implementation shipped with the crate.

mod builder;
mod container;
mod definition;
mod injectable;

pub use builder::ContainerBuilder;
pub use container::Container;
pub use definition::{Definition, DefinitionBuilder, Role, Scope};
pub use injectable::Injectable;

use crate::error::{BootstrapError, Result};
use crate::hook::{Facet, InstanceHook, Object};
use crate::tier::Placement;
use serde::Serialize;
use std::sync::Arc;
use strum_macros::Display;

/// What a registered object can do, as declared on its definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum Capability {
    MutatesRegistry,
    CustomizesFactory,
    InterceptsInstance,
    /// Internal marker for instance hooks that finalize definition metadata;
    /// they are moved to the end of the chain during registration.
    MergesDefinitionMetadata,
    Listens,
}

pub trait ObjectRegistry: Send + Sync {
    /// Names of instantiable definitions exposing `capability`, in registration order.
    fn names_for_capability(
        &self,
        capability: Capability,
        include_non_singletons: bool,
        allow_eager_init: bool,
    ) -> Vec<String>;

    fn is_type_match(&self, name: &str, capability: Capability) -> bool;

    /// Tier and rank carried by the registration.
    ///
    /// # Errors
    /// Returns [`BootstrapError::Classification`] for names it cannot resolve.
    fn placement(&self, name: &str) -> Result<Placement>;

    /// Return the object registered under `name`, building it if necessary.
    ///
    /// Building runs the installed hook chain, so this may reenter the chain
    /// while it is still being assembled.
    fn get_or_build(&self, name: &str) -> Result<Object>;

    /// View `object`, registered under `name`, through `capability`.
    fn facet(&self, name: &str, object: &Object, capability: Capability) -> Option<Facet>;

    fn definition(&self, name: &str) -> Result<Definition>;

    fn contains_definition(&self, name: &str) -> bool;

    fn definition_names(&self) -> Vec<String>;

    fn register_definition(&self, definition: Definition) -> Result<()>;

    fn update_definition(&self, name: &str, update: &mut dyn FnMut(&mut Definition)) -> Result<()>;

    /// Append `hook` to the instance hook chain, moving it to the end if a hook
    /// with the same name is already installed.
    fn add_instance_hook(&self, name: &str, hook: Arc<dyn InstanceHook>);

    fn installed_hook_count(&self) -> usize;

    fn installed_hook_names(&self) -> Vec<String>;

    fn invalidate_derived_metadata_cache(&self);

    /// Build `name` and view it through `capability`.
    fn build_facet(&self, name: &str, capability: Capability) -> Result<Facet> {
        let object = self.get_or_build(name)?;
        self.facet(name, &object, capability).ok_or_else(|| {
            BootstrapError::definition(name, format!("built object does not expose {capability}"))
        })
    }
}

/// Typed lookup: build (or fetch) `name` and downcast it to `T`.
///
/// # Errors
/// Fails when the object cannot be built or is not a `T`, which also happens
/// when an instance hook replaced it with a wrapper of another type.
pub fn resolve<T: Send + Sync + 'static>(registry: &dyn ObjectRegistry, name: &str) -> Result<Arc<T>> {
    registry
        .get_or_build(name)?
        .downcast::<T>()
        .map_err(|_| BootstrapError::DowncastFailed {
            name: name.to_string(),
            type_name: std::any::type_name::<T>().to_string(),
        })
}
