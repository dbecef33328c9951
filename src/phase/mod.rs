//! Bootstrap phases
//!
//! # Phase Order
//!
//! ```text
//! 1. Registry mutation        ← externally supplied mutators, then discovered
//!    ↓                          ones tier by tier until a fixed point
//! 2. Factory customization    ← mutators' customization entry point, then the
//!    ↓                          remaining customizers, tier by tier
//! 3. Instance hook registration
//!    ↓                          sentinel, tiers, metadata mergers, listener detector
//! 4. Object builds            ← every build walks the installed chain
//! ```
//!
//! Each phase is synchronous and fails fast: the first hook error aborts the
//! bootstrap with the hook's name and the phase it failed in.

mod factory_phase;
mod instance_phase;
mod registry_phase;

pub use factory_phase::{FactoryPhase, FactoryPhaseOutcome};
pub use instance_phase::{InstanceHookRegistrar, RegistrationOutcome};
pub use registry_phase::{RegistryPhase, RegistryPhaseOutcome};

use crate::config::BootstrapConfig;
use crate::context::ApplicationContext;
use crate::error::{BootstrapError, Result};
use crate::hook::{FactoryCustomizer, InstanceHook, RegistryMutator};
use crate::registry::{Capability, ObjectRegistry};
use crate::tier::Tier;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use strum_macros::Display;

/// Where in the bootstrap or build pipeline something happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    RegistryMutation,
    FactoryCustomization,
    InstanceHookRegistration,
    Instantiation,
    DefinitionMerge,
    BeforeInitialization,
    AfterInitialization,
}

/// Names of hooks already invoked for registry mutation.
///
/// Scoped to a single bootstrap run; independent runs never share one.
#[derive(Debug, Default, Clone, Serialize)]
pub struct ProcessedSet {
    names: HashSet<String>,
}

impl ProcessedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if `name` was already processed.
    pub fn insert(&mut self, name: impl Into<String>) -> bool {
        self.names.insert(name.into())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

/// One discovery pass of the registry mutation phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscoveryPass {
    Highest,
    Ordered,
    /// Repeated until a pass finds no unprocessed hook; numbered from 1.
    Reiteration(usize),
}

impl DiscoveryPass {
    pub fn admits(self, tier: Tier) -> bool {
        match self {
            DiscoveryPass::Highest => tier == Tier::Highest,
            DiscoveryPass::Ordered => tier.is_ordered(),
            DiscoveryPass::Reiteration(_) => true,
        }
    }
}

impl fmt::Display for DiscoveryPass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscoveryPass::Highest => write!(f, "highest"),
            DiscoveryPass::Ordered => write!(f, "ordered"),
            DiscoveryPass::Reiteration(round) => write!(f, "reiteration-{round}"),
        }
    }
}

/// Hooks invoked during one discovery pass, in invocation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoundTrace {
    pub pass: DiscoveryPass,
    pub invoked: Vec<String>,
}

/// Run the registry mutation phase to a fixed point.
pub fn run_registry_phase(
    registry: &dyn ObjectRegistry,
    external_hooks: &[crate::hook::ExternalHook],
    config: &BootstrapConfig,
) -> Result<RegistryPhaseOutcome> {
    RegistryPhase::new(config.clone()).run(registry, external_hooks)
}

/// Run the remaining factory customizers once.
pub fn run_factory_phase(
    registry: &dyn ObjectRegistry,
    processed: &ProcessedSet,
    config: &BootstrapConfig,
) -> Result<FactoryPhaseOutcome> {
    FactoryPhase::new(config.clone()).run(registry, processed)
}

/// Install the instance hook chain.
pub fn run_instance_hook_registration(
    registry: &Arc<dyn ObjectRegistry>,
    context: &Arc<ApplicationContext>,
    config: &BootstrapConfig,
) -> Result<RegistrationOutcome> {
    InstanceHookRegistrar::new(config.clone()).run(registry, context)
}

pub(crate) fn build_mutator(
    registry: &dyn ObjectRegistry,
    name: &str,
    phase: Phase,
) -> Result<Arc<dyn RegistryMutator>> {
    registry
        .build_facet(name, Capability::MutatesRegistry)
        .map_err(|e| during(e, name, phase))?
        .into_mutator()
        .ok_or_else(|| facet_mismatch(name, Capability::MutatesRegistry))
}

pub(crate) fn build_customizer(
    registry: &dyn ObjectRegistry,
    name: &str,
    phase: Phase,
) -> Result<Arc<dyn FactoryCustomizer>> {
    registry
        .build_facet(name, Capability::CustomizesFactory)
        .map_err(|e| during(e, name, phase))?
        .into_customizer()
        .ok_or_else(|| facet_mismatch(name, Capability::CustomizesFactory))
}

pub(crate) fn build_instance_hook(
    registry: &dyn ObjectRegistry,
    name: &str,
    phase: Phase,
) -> Result<Arc<dyn InstanceHook>> {
    registry
        .build_facet(name, Capability::InterceptsInstance)
        .map_err(|e| during(e, name, phase))?
        .into_instance_hook()
        .ok_or_else(|| facet_mismatch(name, Capability::InterceptsInstance))
}

/// Report a hook whose own factory failed against the phase that needed it.
/// Failures of other objects it depends on keep their own name and phase.
fn during(error: BootstrapError, name: &str, phase: Phase) -> BootstrapError {
    match error {
        BootstrapError::HookExecution {
            hook,
            phase: Phase::Instantiation,
            source,
        } if hook == name => {
            tracing::error!(hook = name, "Hook could not be built during {}: {}", phase, source);
            BootstrapError::HookExecution { hook, phase, source }
        }
        other => other,
    }
}

fn facet_mismatch(name: &str, capability: Capability) -> BootstrapError {
    BootstrapError::definition(name, format!("registry returned the wrong facet for {capability}"))
}

pub(crate) fn invoke_mutation<H>(registry: &dyn ObjectRegistry, name: &str, hook: &H) -> Result<()>
where
    H: RegistryMutator + ?Sized,
{
    tracing::debug!(hook = name, "Mutating registry");
    hook.mutate_registry(registry).map_err(|source| {
        tracing::error!(hook = name, "Registry mutation failed: {}", source);
        BootstrapError::hook_failed(name, Phase::RegistryMutation, source)
    })
}

pub(crate) fn invoke_customization<H>(
    registry: &dyn ObjectRegistry,
    name: &str,
    hook: &H,
) -> Result<()>
where
    H: FactoryCustomizer + ?Sized,
{
    tracing::debug!(hook = name, "Customizing factory");
    hook.customize_factory(registry).map_err(|source| {
        tracing::error!(hook = name, "Factory customization failed: {}", source);
        BootstrapError::hook_failed(name, Phase::FactoryCustomization, source)
    })
}
