use super::{
    DiscoveryPass, Phase, ProcessedSet, RoundTrace, build_mutator, invoke_customization,
    invoke_mutation,
};
use crate::config::BootstrapConfig;
use crate::error::Result;
use crate::hook::{ExternalHook, FactoryCustomizer, RegistryMutator};
use crate::registry::{Capability, ObjectRegistry};
use crate::tier::{Ranked, classify, sort_ranked};
use std::sync::Arc;

#[derive(Debug, Default, Clone)]
pub struct RegistryPhaseOutcome {
    /// Every hook invoked for registry mutation; handed on to the factory phase.
    pub processed: ProcessedSet,
    pub rounds: Vec<RoundTrace>,
    pub mutation_order: Vec<String>,
    pub customization_order: Vec<String>,
}

/// Drives registry-mutating hooks to a fixed point.
///
/// # Example
///
/// ```rust,ignore
/// let outcome = RegistryPhase::new(BootstrapConfig::default())
///     .run(&container, &[ExternalHook::mutator("scanner", ComponentScanner::new("app"))])?;
/// assert!(outcome.processed.contains("configurationParser"));
/// ```
pub struct RegistryPhase {
    config: BootstrapConfig,
}

impl RegistryPhase {
    pub fn new(config: BootstrapConfig) -> Self {
        Self { config }
    }

    /// Invoke every registry mutator exactly once, then every factory
    /// customization entry point collected on the way exactly once.
    ///
    /// Order: external mutators as supplied, then discovered mutators pass by
    /// pass (`Highest`, `Ordered`, reiterations), then external customizers.
    pub fn run(
        &self,
        registry: &dyn ObjectRegistry,
        external_hooks: &[ExternalHook],
    ) -> Result<RegistryPhaseOutcome> {
        tracing::info!("Calling registry mutation hooks...");

        let mut outcome = RegistryPhaseOutcome::default();
        let mut mutators: Vec<(String, Arc<dyn RegistryMutator>)> = Vec::new();
        let mut customizers: Vec<(String, Arc<dyn FactoryCustomizer>)> = Vec::new();

        for external in external_hooks {
            match external {
                ExternalHook::Mutator { name, hook } => {
                    invoke_mutation(registry, name, hook.as_ref())?;
                    outcome.mutation_order.push(name.clone());
                    mutators.push((name.clone(), Arc::clone(hook)));
                }
                ExternalHook::Customizer { name, hook } => {
                    customizers.push((name.clone(), Arc::clone(hook)));
                }
            }
        }

        self.discover(registry, DiscoveryPass::Highest, &mut mutators, &mut outcome)?;
        self.discover(registry, DiscoveryPass::Ordered, &mut mutators, &mut outcome)?;

        let mut round = 0;
        loop {
            round += 1;
            let found = self.discover(
                registry,
                DiscoveryPass::Reiteration(round),
                &mut mutators,
                &mut outcome,
            )?;
            if found == 0 {
                break;
            }
        }

        for (name, hook) in &mutators {
            invoke_customization(registry, name, hook.as_ref())?;
            outcome.customization_order.push(name.clone());
        }
        for (name, hook) in &customizers {
            invoke_customization(registry, name, hook.as_ref())?;
            outcome.customization_order.push(name.clone());
        }

        tracing::info!(
            "Registry mutation complete ({} hooks executed, {} reiterations)",
            outcome.mutation_order.len(),
            round
        );
        Ok(outcome)
    }

    /// One discovery pass; returns how many new hooks it invoked.
    fn discover(
        &self,
        registry: &dyn ObjectRegistry,
        pass: DiscoveryPass,
        mutators: &mut Vec<(String, Arc<dyn RegistryMutator>)>,
        outcome: &mut RegistryPhaseOutcome,
    ) -> Result<usize> {
        let names = registry.names_for_capability(
            Capability::MutatesRegistry,
            self.config.include_non_singletons,
            self.config.allow_eager_init,
        );

        let mut batch = Vec::new();
        for name in names {
            if outcome.processed.contains(&name) {
                continue;
            }
            let placement = classify(registry, &name);
            if !pass.admits(placement.tier) {
                continue;
            }
            // Building may register further definitions; they are seen next pass.
            let hook = build_mutator(registry, &name, Phase::RegistryMutation)?;
            outcome.processed.insert(name.clone());
            batch.push(Ranked::new(name, placement, hook));
        }
        sort_ranked(&mut batch);

        for ranked in &batch {
            invoke_mutation(registry, &ranked.name, ranked.hook.as_ref())?;
        }

        let invoked: Vec<String> = batch.iter().map(|ranked| ranked.name.clone()).collect();
        tracing::debug!(%pass, hooks = ?invoked, "Discovery pass finished");
        outcome.mutation_order.extend(invoked.iter().cloned());
        outcome.rounds.push(RoundTrace {
            pass,
            invoked,
        });

        let found = batch.len();
        mutators.extend(batch.into_iter().map(|ranked| (ranked.name, ranked.hook)));
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BootstrapError;
    use crate::hook::HookResult;
    use crate::phase::Phase;
    use crate::registry::{Container, Definition};
    use std::sync::Mutex;

    type Log = Arc<Mutex<Vec<String>>>;
    type Action = Arc<dyn Fn(&dyn ObjectRegistry) -> HookResult + Send + Sync>;

    struct Recording {
        label: String,
        log: Log,
        on_mutate: Option<Action>,
    }

    impl FactoryCustomizer for Recording {
        fn customize_factory(&self, _registry: &dyn ObjectRegistry) -> HookResult {
            self.log.lock().unwrap().push(format!("customize:{}", self.label));
            Ok(())
        }
    }

    impl RegistryMutator for Recording {
        fn mutate_registry(&self, registry: &dyn ObjectRegistry) -> HookResult {
            self.log.lock().unwrap().push(format!("mutate:{}", self.label));
            match &self.on_mutate {
                Some(action) => action(registry),
                None => Ok(()),
            }
        }
    }

    fn recording(name: &str, log: &Log, on_mutate: Option<Action>) -> crate::registry::DefinitionBuilder<Recording> {
        let label = name.to_string();
        let log = Arc::clone(log);
        Definition::builder(name, move |_, _| {
            Ok(Recording {
                label: label.clone(),
                log: Arc::clone(&log),
                on_mutate: on_mutate.clone(),
            })
        })
    }

    fn entries(log: &Log) -> Vec<String> {
        log.lock().unwrap().clone()
    }

    #[test]
    fn test_tiers_run_in_order() {
        let log: Log = Arc::default();
        let container = Container::new();
        container
            .register_definition(recording("plain", &log, None).mutates_registry().build())
            .unwrap();
        container
            .register_definition(recording("ordered", &log, None).ordered(1).mutates_registry().build())
            .unwrap();
        container
            .register_definition(recording("highest", &log, None).highest(1).mutates_registry().build())
            .unwrap();

        let outcome = RegistryPhase::new(BootstrapConfig::default())
            .run(&container, &[])
            .unwrap();

        assert_eq!(outcome.mutation_order, vec!["highest", "ordered", "plain"]);
        assert_eq!(
            entries(&log),
            vec![
                "mutate:highest",
                "mutate:ordered",
                "mutate:plain",
                "customize:highest",
                "customize:ordered",
                "customize:plain",
            ]
        );
    }

    #[test]
    fn test_late_highest_hook_runs_in_ordered_pass() {
        let log: Log = Arc::default();
        let container = Container::new();
        let late_log = Arc::clone(&log);
        let adds_late: Action = Arc::new(move |registry: &dyn ObjectRegistry| -> HookResult {
            registry.register_definition(
                recording("late", &late_log, None).highest(0).mutates_registry().build(),
            )?;
            Ok(())
        });
        container
            .register_definition(
                recording("first", &log, Some(adds_late)).highest(5).mutates_registry().build(),
            )
            .unwrap();

        let outcome = RegistryPhase::new(BootstrapConfig::default())
            .run(&container, &[])
            .unwrap();

        assert_eq!(outcome.rounds[0].invoked, vec!["first"]);
        assert_eq!(outcome.rounds[1].pass, DiscoveryPass::Ordered);
        assert_eq!(outcome.rounds[1].invoked, vec!["late"]);
    }

    #[test]
    fn test_fixed_point_takes_two_reiterations() {
        let log: Log = Arc::default();
        let container = Container::new();
        let chained_log = Arc::clone(&log);
        let adds_one: Action = Arc::new(move |registry: &dyn ObjectRegistry| -> HookResult {
            registry.register_definition(
                recording("second", &chained_log, None).mutates_registry().build(),
            )?;
            Ok(())
        });
        container
            .register_definition(recording("first", &log, Some(adds_one)).mutates_registry().build())
            .unwrap();

        let outcome = RegistryPhase::new(BootstrapConfig::default())
            .run(&container, &[])
            .unwrap();

        let passes: Vec<DiscoveryPass> = outcome.rounds.iter().map(|r| r.pass).collect();
        assert_eq!(
            passes,
            vec![
                DiscoveryPass::Highest,
                DiscoveryPass::Ordered,
                DiscoveryPass::Reiteration(1),
                DiscoveryPass::Reiteration(2),
                DiscoveryPass::Reiteration(3),
            ]
        );
        assert_eq!(outcome.rounds[2].invoked, vec!["first"]);
        assert_eq!(outcome.rounds[3].invoked, vec!["second"]);
        assert!(outcome.rounds[4].invoked.is_empty());
        assert_eq!(outcome.processed.len(), 2);
        assert_eq!(
            entries(&log),
            vec!["mutate:first", "mutate:second", "customize:first", "customize:second"]
        );
    }

    #[test]
    fn test_external_hooks_order() {
        let log: Log = Arc::default();
        let container = Container::new();
        container
            .register_definition(recording("discovered", &log, None).mutates_registry().build())
            .unwrap();

        let external_mutator = Recording {
            label: "external-mutator".into(),
            log: Arc::clone(&log),
            on_mutate: None,
        };
        let external_customizer = Recording {
            label: "external-customizer".into(),
            log: Arc::clone(&log),
            on_mutate: None,
        };
        let hooks = vec![
            ExternalHook::customizer("external-customizer", external_customizer),
            ExternalHook::mutator("external-mutator", external_mutator),
        ];

        let outcome = RegistryPhase::new(BootstrapConfig::default())
            .run(&container, &hooks)
            .unwrap();

        assert_eq!(
            entries(&log),
            vec![
                "mutate:external-mutator",
                "mutate:discovered",
                "customize:external-mutator",
                "customize:discovered",
                "customize:external-customizer",
            ]
        );
        // External hooks are not registry entries and never enter the processed set.
        assert!(!outcome.processed.contains("external-mutator"));
    }

    #[test]
    fn test_failure_aborts_with_hook_and_phase() {
        let log: Log = Arc::default();
        let container = Container::new();
        let fails: Action = Arc::new(|_: &dyn ObjectRegistry| -> HookResult { Err(anyhow::anyhow!("cannot scan")) });
        container
            .register_definition(recording("broken", &log, Some(fails)).highest(0).mutates_registry().build())
            .unwrap();
        container
            .register_definition(recording("never", &log, None).mutates_registry().build())
            .unwrap();

        let err = RegistryPhase::new(BootstrapConfig::default())
            .run(&container, &[])
            .unwrap_err();

        assert!(matches!(err, BootstrapError::HookExecution { .. }));
        assert_eq!(err.hook_name(), Some("broken"));
        assert_eq!(err.phase(), Some(Phase::RegistryMutation));
        assert_eq!(entries(&log), vec!["mutate:broken"]);
    }

    #[test]
    fn test_unbuildable_mutator_reports_mutation_phase() {
        let container = Container::new();
        container
            .register_definition(
                Definition::builder::<Recording, _>("unbuildable", |_, _| Err(anyhow::anyhow!("missing credentials")))
                    .mutates_registry()
                    .build(),
            )
            .unwrap();

        let err = RegistryPhase::new(BootstrapConfig::default())
            .run(&container, &[])
            .unwrap_err();

        assert_eq!(err.hook_name(), Some("unbuildable"));
        assert_eq!(err.phase(), Some(Phase::RegistryMutation));
    }
}
