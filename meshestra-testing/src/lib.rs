//! # Meshestra Testing
//!
//! Recording hooks for exercising bootstraps in tests. Every hook writes what
//! it sees into a shared [`Journal`], so a test can assert on the exact order
//! of hook invocations.

use meshestra_bootstrap::hook::{
    ApplicationListener, FactoryCustomizer, HookResult, InstanceHook, Object, RegistryMutator,
};
use meshestra_bootstrap::registry::{Definition, DefinitionBuilder, ObjectRegistry};
use meshestra_bootstrap::context::ApplicationEvent;
use std::sync::{Arc, Mutex, PoisonError};

pub type Action = Arc<dyn Fn(&dyn ObjectRegistry) -> HookResult + Send + Sync>;

/// Shared, ordered log of hook invocations.
#[derive(Clone, Default)]
pub struct Journal {
    entries: Arc<Mutex<Vec<String>>>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, entry: impl Into<String>) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Entries starting with `prefix`, in order.
    pub fn starting_with(&self, prefix: &str) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|entry| entry.starts_with(prefix))
            .collect()
    }

    /// Instance hook entries about the object named `object`.
    pub fn about(&self, object: &str) -> Vec<String> {
        let suffix = format!(":{object}");
        self.entries()
            .into_iter()
            .filter(|entry| entry.ends_with(&suffix))
            .collect()
    }

    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

/// Registry mutator that journals `mutate:<name>` and `customize:<name>`.
pub struct RecordingMutator {
    label: String,
    journal: Journal,
    on_mutate: Option<Action>,
}

impl RecordingMutator {
    pub fn new(label: impl Into<String>, journal: &Journal) -> Self {
        Self {
            label: label.into(),
            journal: journal.clone(),
            on_mutate: None,
        }
    }

    pub fn with_action(mut self, action: Action) -> Self {
        self.on_mutate = Some(action);
        self
    }

    pub fn definition(name: &str, journal: &Journal) -> DefinitionBuilder<Self> {
        Self::definition_with(name, journal, None)
    }

    /// A mutator that registers `definitions` when invoked.
    pub fn registering(name: &str, journal: &Journal, definitions: Vec<Definition>) -> DefinitionBuilder<Self> {
        let action: Action = Arc::new(move |registry: &dyn ObjectRegistry| -> HookResult {
            for definition in &definitions {
                registry.register_definition(definition.clone())?;
            }
            Ok(())
        });
        Self::definition_with(name, journal, Some(action))
    }

    pub fn definition_with(name: &str, journal: &Journal, action: Option<Action>) -> DefinitionBuilder<Self> {
        let label = name.to_string();
        let journal = journal.clone();
        Definition::builder(name, move |_, _| {
            Ok(RecordingMutator {
                label: label.clone(),
                journal: journal.clone(),
                on_mutate: action.clone(),
            })
        })
        .mutates_registry()
    }
}

impl FactoryCustomizer for RecordingMutator {
    fn customize_factory(&self, _registry: &dyn ObjectRegistry) -> HookResult {
        self.journal.record(format!("customize:{}", self.label));
        Ok(())
    }
}

impl RegistryMutator for RecordingMutator {
    fn mutate_registry(&self, registry: &dyn ObjectRegistry) -> HookResult {
        self.journal.record(format!("mutate:{}", self.label));
        match &self.on_mutate {
            Some(action) => action(registry),
            None => Ok(()),
        }
    }
}

/// Factory customizer that journals `customize:<name>`.
pub struct RecordingCustomizer {
    label: String,
    journal: Journal,
}

impl RecordingCustomizer {
    pub fn new(label: impl Into<String>, journal: &Journal) -> Self {
        Self {
            label: label.into(),
            journal: journal.clone(),
        }
    }

    pub fn definition(name: &str, journal: &Journal) -> DefinitionBuilder<Self> {
        let label = name.to_string();
        let journal = journal.clone();
        Definition::builder(name, move |_, _| Ok(RecordingCustomizer::new(label.clone(), &journal)))
            .customizes_factory()
    }
}

impl FactoryCustomizer for RecordingCustomizer {
    fn customize_factory(&self, _registry: &dyn ObjectRegistry) -> HookResult {
        self.journal.record(format!("customize:{}", self.label));
        Ok(())
    }
}

/// What a [`RecordingInstanceHook`] does with the objects it sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behaviour {
    Pass,
    /// Return `None` before and after initialization, ending the chain walk.
    Stop,
    /// Replace the object with a [`Wrapper`] around it after initialization.
    Wrap,
}

/// A replacement object produced by a wrapping hook.
pub struct Wrapper {
    pub by: String,
    pub inner: Object,
}

/// Labels of the wrappers around `object`, outermost first.
pub fn layers(object: &Object) -> Vec<String> {
    let mut layers = Vec::new();
    let mut current = Arc::clone(object);
    while let Ok(wrapper) = current.clone().downcast::<Wrapper>() {
        layers.push(wrapper.by.clone());
        current = Arc::clone(&wrapper.inner);
    }
    layers
}

/// Instance hook that journals `before:<hook>:<object>` and
/// `after:<hook>:<object>`.
pub struct RecordingInstanceHook {
    label: String,
    journal: Journal,
    behaviour: Behaviour,
}

impl RecordingInstanceHook {
    pub fn new(label: impl Into<String>, journal: &Journal, behaviour: Behaviour) -> Self {
        Self {
            label: label.into(),
            journal: journal.clone(),
            behaviour,
        }
    }

    pub fn definition(name: &str, journal: &Journal, behaviour: Behaviour) -> DefinitionBuilder<Self> {
        let label = name.to_string();
        let journal = journal.clone();
        Definition::builder(name, move |_, _| {
            Ok(RecordingInstanceHook::new(label.clone(), &journal, behaviour))
        })
        .intercepts_instance()
    }
}

impl InstanceHook for RecordingInstanceHook {
    fn before_initialization(&self, object: Object, name: &str) -> HookResult<Option<Object>> {
        self.journal.record(format!("before:{}:{}", self.label, name));
        match self.behaviour {
            Behaviour::Stop => Ok(None),
            Behaviour::Pass | Behaviour::Wrap => Ok(Some(object)),
        }
    }

    fn after_initialization(&self, object: Object, name: &str) -> HookResult<Option<Object>> {
        self.journal.record(format!("after:{}:{}", self.label, name));
        match self.behaviour {
            Behaviour::Pass => Ok(Some(object)),
            Behaviour::Stop => Ok(None),
            Behaviour::Wrap => Ok(Some(Arc::new(Wrapper {
                by: self.label.clone(),
                inner: object,
            }))),
        }
    }
}

/// Listener that journals `event:<listener>:<event>`.
pub struct RecordingListener {
    label: String,
    journal: Journal,
}

impl RecordingListener {
    pub fn definition(name: &str, journal: &Journal) -> DefinitionBuilder<Self> {
        let label = name.to_string();
        let journal = journal.clone();
        Definition::builder(name, move |_, _| {
            Ok(RecordingListener {
                label: label.clone(),
                journal: journal.clone(),
            })
        })
        .listens()
    }
}

impl ApplicationListener for RecordingListener {
    fn on_application_event(&self, event: &ApplicationEvent) {
        self.journal
            .record(format!("event:{}:{}", self.label, event.name));
    }
}

/// A plain object with no hook capability.
#[derive(Debug, Default)]
pub struct Plain;

pub fn plain(name: &str) -> DefinitionBuilder<Plain> {
    Definition::of::<Plain>(name)
}
