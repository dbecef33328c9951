use crate::chain::HookChain;
use crate::error::{BootstrapError, Result};
use crate::hook::{Facet, InstanceHook, Object};
use crate::phase::Phase;
use crate::registry::{Capability, Definition, ObjectRegistry, resolve};
use crate::tier::Placement;
use dashmap::DashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

type CapabilityQuery = (Capability, bool, bool);

/// Thread-safe in-memory object registry.
///
/// Capabilities are declared on definitions, so capability queries never have to
/// build anything; `allow_eager_init` is accepted for contract compatibility and
/// only separates cache entries.
///
/// Map guards are never held while a factory or hook runs: both may call back
/// into the container.
pub struct Container {
    definitions: DashMap<String, Definition>,
    registration_order: RwLock<Vec<String>>,
    singletons: DashMap<String, Object>,
    /// Objects as their factories returned them, while they pass through the
    /// chain and afterwards for singletons a hook replaced.
    targets: DashMap<String, Object>,
    in_creation: Mutex<Vec<String>>,
    chain: HookChain,
    capability_cache: DashMap<CapabilityQuery, Arc<Vec<String>>>,
    allow_overriding: bool,
}

impl Container {
    pub fn new() -> Self {
        Self {
            definitions: DashMap::new(),
            registration_order: RwLock::new(Vec::new()),
            singletons: DashMap::new(),
            targets: DashMap::new(),
            in_creation: Mutex::new(Vec::new()),
            chain: HookChain::new(),
            capability_cache: DashMap::new(),
            allow_overriding: false,
        }
    }

    pub fn with_definition_overriding(mut self, allow: bool) -> Self {
        self.allow_overriding = allow;
        self
    }

    pub fn hook_chain(&self) -> &HookChain {
        &self.chain
    }

    pub fn resolve<T: Send + Sync + 'static>(&self, name: &str) -> Result<Arc<T>> {
        resolve::<T>(self, name)
    }

    pub fn contains_singleton(&self, name: &str) -> bool {
        self.singletons.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Build every non-lazy, non-abstract singleton not built yet, in registration order.
    ///
    /// Returns how many objects were built.
    pub fn pre_instantiate_singletons(&self) -> Result<usize> {
        let mut built = 0;
        for name in self.ordered_names() {
            let eligible = self
                .definitions
                .get(&name)
                .is_some_and(|d| d.is_singleton() && !d.is_abstract() && !d.is_lazy_init());
            if eligible && !self.contains_singleton(&name) {
                self.get_or_build(&name)?;
                built += 1;
            }
        }
        tracing::debug!("Pre-instantiated {} singletons", built);
        Ok(built)
    }

    fn ordered_names(&self) -> Vec<String> {
        self.registration_order
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn begin_creation(&self, name: &str) -> Result<()> {
        let mut in_creation = self.in_creation.lock().unwrap_or_else(PoisonError::into_inner);
        if in_creation.iter().any(|n| n == name) {
            let mut cycle = in_creation.clone();
            cycle.push(name.to_string());
            return Err(BootstrapError::CircularDependency {
                cycle: cycle.join(" -> "),
            });
        }
        in_creation.push(name.to_string());
        Ok(())
    }

    fn end_creation(&self, name: &str) {
        self.in_creation
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|n| n != name);
    }

    /// Build one object from `definition`, a per-build copy that chain hooks
    /// may finalize before the factory sees it.
    fn create(&self, name: &str, definition: &mut Definition) -> Result<Object> {
        let chain = self.chain.snapshot();
        for entry in chain.iter() {
            entry
                .hook
                .merge_definition(definition, name)
                .map_err(|source| BootstrapError::hook_failed(&entry.name, Phase::DefinitionMerge, source))?;
        }

        let object = definition.instantiate(self).map_err(|source| {
            // A nested build failure keeps pointing at the hook that raised it.
            match source.downcast::<BootstrapError>() {
                Ok(inner) => inner,
                Err(source) => BootstrapError::hook_failed(name, Phase::Instantiation, source),
            }
        })?;

        self.targets.insert(name.to_string(), Arc::clone(&object));
        let object = self.chain.apply_before(object, name)?;
        self.chain.apply_after(object, name)
    }

    /// Drop the unwrapped form of `name` unless a hook replaced a singleton.
    fn settle_target(&self, name: &str, built: Option<&Object>, singleton: bool) {
        let replaced = built.is_some_and(|object| {
            self.targets
                .get(name)
                .is_some_and(|target| !Arc::ptr_eq(target.value(), object))
        });
        if !(singleton && replaced) {
            self.targets.remove(name);
        }
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectRegistry for Container {
    fn names_for_capability(
        &self,
        capability: Capability,
        include_non_singletons: bool,
        allow_eager_init: bool,
    ) -> Vec<String> {
        let query = (capability, include_non_singletons, allow_eager_init);
        if let Some(cached) = self.capability_cache.get(&query) {
            return cached.as_ref().clone();
        }

        let names: Vec<String> = self
            .ordered_names()
            .into_iter()
            .filter(|name| {
                self.definitions.get(name).is_some_and(|d| {
                    !d.is_abstract()
                        && (include_non_singletons || d.is_singleton())
                        && d.has_capability(capability)
                })
            })
            .collect();

        self.capability_cache.insert(query, Arc::new(names.clone()));
        names
    }

    fn is_type_match(&self, name: &str, capability: Capability) -> bool {
        self.definitions
            .get(name)
            .is_some_and(|d| d.has_capability(capability))
    }

    fn placement(&self, name: &str) -> Result<Placement> {
        self.definitions
            .get(name)
            .map(|d| d.placement())
            .ok_or_else(|| BootstrapError::Classification {
                name: name.to_string(),
            })
    }

    fn get_or_build(&self, name: &str) -> Result<Object> {
        if let Some(object) = self.singletons.get(name) {
            return Ok(Arc::clone(object.value()));
        }

        let mut definition = self.definition(name)?;
        if definition.is_abstract() {
            return Err(BootstrapError::definition(
                name,
                "abstract definitions cannot be built",
            ));
        }

        self.begin_creation(name)?;
        let built = self.create(name, &mut definition);
        self.end_creation(name);
        self.settle_target(name, built.as_ref().ok(), definition.is_singleton());
        let object = built?;

        if definition.is_singleton() {
            self.singletons.insert(name.to_string(), Arc::clone(&object));
        }
        tracing::trace!(object = name, "Built object");
        Ok(object)
    }

    fn facet(&self, name: &str, object: &Object, capability: Capability) -> Option<Facet> {
        let definition = self.definitions.get(name)?;
        definition.cast(object, capability).or_else(|| {
            let target = self.targets.get(name).map(|t| Arc::clone(t.value()))?;
            definition.cast(&target, capability)
        })
    }

    fn definition(&self, name: &str) -> Result<Definition> {
        self.definitions
            .get(name)
            .map(|d| d.value().clone())
            .ok_or_else(|| BootstrapError::definition(name, "no definition registered under this name"))
    }

    fn contains_definition(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    fn definition_names(&self) -> Vec<String> {
        self.ordered_names()
    }

    fn register_definition(&self, definition: Definition) -> Result<()> {
        let name = definition.name().to_string();
        if name.is_empty() {
            return Err(BootstrapError::definition(name, "definition name must not be empty"));
        }

        if self.definitions.contains_key(&name) {
            if !self.allow_overriding {
                return Err(BootstrapError::definition(
                    name,
                    "a definition with this name is already registered",
                ));
            }
            tracing::debug!(definition = %name, "Overriding definition");
            self.singletons.remove(&name);
            self.targets.remove(&name);
        } else {
            self.registration_order
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .push(name.clone());
        }

        self.definitions.insert(name, definition);
        self.invalidate_derived_metadata_cache();
        Ok(())
    }

    fn update_definition(&self, name: &str, update: &mut dyn FnMut(&mut Definition)) -> Result<()> {
        // Edit a copy: the closure may read the registry.
        let mut definition = self.definition(name)?;
        update(&mut definition);
        self.definitions.insert(name.to_string(), definition);
        self.invalidate_derived_metadata_cache();
        Ok(())
    }

    fn add_instance_hook(&self, name: &str, hook: Arc<dyn InstanceHook>) {
        self.chain.add(name, hook);
    }

    fn installed_hook_count(&self) -> usize {
        self.chain.len()
    }

    fn installed_hook_names(&self) -> Vec<String> {
        self.chain.names()
    }

    fn invalidate_derived_metadata_cache(&self) {
        self.capability_cache.clear();
    }
}
