use crate::hook::{
    ApplicationListener, Facet, FactoryCustomizer, InstanceHook, Object, RegistryMutator,
};
use crate::registry::{Capability, Injectable, ObjectRegistry};
use crate::tier::{Placement, Tier};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use strum_macros::Display;

type FactoryFn =
    Arc<dyn Fn(&dyn ObjectRegistry, &Definition) -> anyhow::Result<Object> + Send + Sync>;

/// Views a type-erased object through one capability; `None` when the object is
/// no longer of the registered type (e.g. a hook replaced it with a wrapper).
type CasterFn = Arc<dyn Fn(Object) -> Option<Facet> + Send + Sync>;

/// Who a definition is for. `Infrastructure` objects are never reported by the
/// bootstrap sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Application,
    Support,
    Infrastructure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Built once and cached by the registry.
    #[default]
    Singleton,
    /// Built on every lookup.
    Prototype,
}

/// Declarative description of how one object is built.
#[derive(Clone)]
pub struct Definition {
    name: String,
    type_name: &'static str,
    role: Role,
    scope: Scope,
    placement: Placement,
    lazy_init: bool,
    is_abstract: bool,
    properties: BTreeMap<String, String>,
    capabilities: BTreeSet<Capability>,
    casters: HashMap<Capability, CasterFn>,
    factory: FactoryFn,
}

impl Definition {
    /// Start a definition whose objects are produced by `factory`.
    ///
    /// The factory receives the registry, so it may look up other objects, and
    /// the definition in its current (possibly customized) state.
    pub fn builder<T, F>(name: impl Into<String>, factory: F) -> DefinitionBuilder<T>
    where
        T: Send + Sync + 'static,
        F: Fn(&dyn ObjectRegistry, &Definition) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        let factory: FactoryFn =
            Arc::new(move |registry: &dyn ObjectRegistry, definition: &Definition| {
                factory(registry, definition).map(|value| Arc::new(value) as Object)
            });

        DefinitionBuilder {
            definition: Definition {
                name: name.into(),
                type_name: std::any::type_name::<T>(),
                role: Role::default(),
                scope: Scope::default(),
                placement: Placement::PLAIN,
                lazy_init: false,
                is_abstract: false,
                properties: BTreeMap::new(),
                capabilities: BTreeSet::new(),
                casters: HashMap::new(),
                factory,
            },
            _marker: PhantomData,
        }
    }

    /// Definition built with `T::default()`.
    pub fn of<T: Default + Send + Sync + 'static>(name: impl Into<String>) -> DefinitionBuilder<T> {
        Self::builder(name, |_, _| Ok(T::default()))
    }

    /// Definition built through [`Injectable::inject`].
    pub fn injectable<T: Injectable>(name: impl Into<String>) -> DefinitionBuilder<T> {
        Self::builder(name, T::inject)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn set_role(&mut self, role: Role) {
        self.role = role;
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn is_singleton(&self) -> bool {
        self.scope == Scope::Singleton
    }

    pub fn placement(&self) -> Placement {
        self.placement
    }

    pub fn set_placement(&mut self, placement: Placement) {
        self.placement = placement;
    }

    pub fn is_lazy_init(&self) -> bool {
        self.lazy_init
    }

    pub fn set_lazy_init(&mut self, lazy_init: bool) {
        self.lazy_init = lazy_init;
    }

    /// Abstract definitions are templates and can never be built.
    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(key.into(), value.into());
    }

    pub fn has_capability(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    pub fn capabilities(&self) -> impl Iterator<Item = Capability> + '_ {
        self.capabilities.iter().copied()
    }

    pub(crate) fn instantiate(&self, registry: &dyn ObjectRegistry) -> anyhow::Result<Object> {
        (self.factory)(registry, self)
    }

    pub(crate) fn cast(&self, object: &Object, capability: Capability) -> Option<Facet> {
        let caster = self.casters.get(&capability)?;
        caster(Arc::clone(object))
    }
}

impl fmt::Debug for Definition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Definition")
            .field("name", &self.name)
            .field("type_name", &self.type_name)
            .field("role", &self.role)
            .field("scope", &self.scope)
            .field("placement", &self.placement)
            .field("lazy_init", &self.lazy_init)
            .field("is_abstract", &self.is_abstract)
            .field("properties", &self.properties)
            .field("capabilities", &self.capabilities)
            .finish_non_exhaustive()
    }
}

/// Typed builder for a [`Definition`].
///
/// Capabilities can only be declared when `T` actually implements the matching
/// hook trait, so a registration never promises a facet it cannot deliver.
///
/// # Example
///
/// ```rust,ignore
/// let definition = Definition::builder("scanner", |_, _| Ok(ComponentScanner::default()))
///     .highest(0)
///     .role(Role::Infrastructure)
///     .mutates_registry()
///     .build();
/// ```
pub struct DefinitionBuilder<T> {
    definition: Definition,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> DefinitionBuilder<T> {
    pub fn role(mut self, role: Role) -> Self {
        self.definition.role = role;
        self
    }

    pub fn scope(mut self, scope: Scope) -> Self {
        self.definition.scope = scope;
        self
    }

    pub fn prototype(self) -> Self {
        self.scope(Scope::Prototype)
    }

    pub fn placement(mut self, placement: Placement) -> Self {
        self.definition.placement = placement;
        self
    }

    pub fn highest(self, rank: i32) -> Self {
        self.placement(Placement::highest(rank))
    }

    pub fn ordered(self, rank: i32) -> Self {
        self.placement(Placement::ordered(rank))
    }

    /// Plain tier with an explicit rank.
    pub fn ranked(self, rank: i32) -> Self {
        self.placement(Placement {
            tier: Tier::Plain,
            rank: Some(rank),
        })
    }

    pub fn lazy_init(mut self) -> Self {
        self.definition.lazy_init = true;
        self
    }

    pub fn abstract_definition(mut self) -> Self {
        self.definition.is_abstract = true;
        self
    }

    pub fn property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.definition.set_property(key, value);
        self
    }

    fn expose<C>(mut self, capability: Capability, cast: C) -> Self
    where
        C: Fn(Arc<T>) -> Facet + Send + Sync + 'static,
    {
        let caster: CasterFn = Arc::new(move |object: Object| object.downcast::<T>().ok().map(&cast));
        self.definition.casters.insert(capability, caster);
        self.definition.capabilities.insert(capability);
        self
    }

    pub fn build(self) -> Definition {
        self.definition
    }
}

impl<T: RegistryMutator> DefinitionBuilder<T> {
    /// Expose the object as a registry mutator (and therefore as a factory customizer).
    pub fn mutates_registry(self) -> Self {
        self.expose(Capability::MutatesRegistry, |hook| {
            Facet::Mutator(hook as Arc<dyn RegistryMutator>)
        })
        .expose(Capability::CustomizesFactory, |hook| {
            Facet::Customizer(hook as Arc<dyn FactoryCustomizer>)
        })
    }
}

impl<T: FactoryCustomizer> DefinitionBuilder<T> {
    pub fn customizes_factory(self) -> Self {
        self.expose(Capability::CustomizesFactory, |hook| {
            Facet::Customizer(hook as Arc<dyn FactoryCustomizer>)
        })
    }
}

impl<T: InstanceHook> DefinitionBuilder<T> {
    pub fn intercepts_instance(self) -> Self {
        self.expose(Capability::InterceptsInstance, |hook| {
            Facet::Instance(hook as Arc<dyn InstanceHook>)
        })
    }

    /// Mark the hook as finalizing definition metadata; implies `intercepts_instance`.
    pub fn merges_definition_metadata(mut self) -> Self {
        self.definition
            .capabilities
            .insert(Capability::MergesDefinitionMetadata);
        self.intercepts_instance()
    }
}

impl<T: ApplicationListener> DefinitionBuilder<T> {
    pub fn listens(self) -> Self {
        self.expose(Capability::Listens, |listener| {
            Facet::Listener(listener as Arc<dyn ApplicationListener>)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hook::HookResult;
    use crate::registry::Container;

    #[derive(Default)]
    struct Noop;

    impl FactoryCustomizer for Noop {
        fn customize_factory(&self, _registry: &dyn ObjectRegistry) -> HookResult {
            Ok(())
        }
    }

    impl RegistryMutator for Noop {
        fn mutate_registry(&self, _registry: &dyn ObjectRegistry) -> HookResult {
            Ok(())
        }
    }

    #[test]
    fn test_mutator_also_customizes_factory() {
        let definition = Definition::of::<Noop>("noop").highest(3).mutates_registry().build();
        assert!(definition.has_capability(Capability::MutatesRegistry));
        assert!(definition.has_capability(Capability::CustomizesFactory));
        assert!(!definition.has_capability(Capability::InterceptsInstance));
        assert_eq!(definition.placement(), Placement::highest(3));
        assert_eq!(definition.role(), Role::Application);
        assert!(definition.is_singleton());
    }

    #[test]
    fn test_cast_rejects_foreign_object() {
        let definition = Definition::of::<Noop>("noop").mutates_registry().build();
        let container = Container::new();

        let object = definition.instantiate(&container).unwrap();
        assert!(definition.cast(&object, Capability::MutatesRegistry).is_some());
        assert!(definition.cast(&object, Capability::Listens).is_none());

        let foreign: Object = Arc::new(42_u32);
        assert!(definition.cast(&foreign, Capability::MutatesRegistry).is_none());
    }

    #[test]
    fn test_factory_sees_properties() {
        let definition = Definition::builder("greeting", |_, definition: &Definition| {
            Ok(definition.property("text").unwrap_or("none").to_string())
        })
        .property("text", "hello")
        .build();
        let container = Container::new();

        let object = definition.instantiate(&container).unwrap();
        assert_eq!(object.downcast_ref::<String>().unwrap(), "hello");
        assert_eq!(definition.type_name(), std::any::type_name::<String>());
    }
}
