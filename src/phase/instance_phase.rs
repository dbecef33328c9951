use super::{Phase, build_instance_hook};
use crate::chain::{BootstrapSentinel, LISTENER_DETECTOR_NAME, ListenerDetector, SENTINEL_NAME};
use crate::config::BootstrapConfig;
use crate::context::ApplicationContext;
use crate::error::Result;
use crate::hook::InstanceHook;
use crate::registry::{Capability, ObjectRegistry};
use crate::tier::{Placement, Ranked, Tier, classify, sort_ranked};
use std::sync::Arc;

type RankedHook = Ranked<Arc<dyn InstanceHook>>;

pub struct RegistrationOutcome {
    pub target_count: usize,
    /// Installed hook names in invocation order.
    pub chain: Vec<String>,
    pub sentinel: Arc<BootstrapSentinel>,
}

/// Installs the instance hook chain used for every later object build.
///
/// Resulting order: sentinel, `Highest`, `Ordered`, `Plain`, then the
/// metadata-merging hooks moved to the end, then the listener detector.
pub struct InstanceHookRegistrar {
    config: BootstrapConfig,
}

impl InstanceHookRegistrar {
    pub fn new(config: BootstrapConfig) -> Self {
        Self { config }
    }

    pub fn run(
        &self,
        registry: &Arc<dyn ObjectRegistry>,
        context: &Arc<ApplicationContext>,
    ) -> Result<RegistrationOutcome> {
        tracing::info!("Registering instance hooks...");

        let names = registry.names_for_capability(
            Capability::InterceptsInstance,
            self.config.include_non_singletons,
            self.config.allow_eager_init,
        );

        let target_count = registry.installed_hook_count() + 1 + names.len();
        let sentinel = Arc::new(BootstrapSentinel::new(Arc::downgrade(registry), target_count));
        registry.add_instance_hook(SENTINEL_NAME, sentinel.clone());

        let mut mergers: Vec<RankedHook> = Vec::new();
        let mut highest: Vec<RankedHook> = Vec::new();
        let mut ordered = Vec::new();
        let mut plain = Vec::new();
        for name in names {
            let placement = classify(registry.as_ref(), &name);
            match placement.tier {
                Tier::Highest => {
                    highest.push(build(registry.as_ref(), name, placement, &mut mergers)?);
                }
                Tier::Ordered => ordered.push((name, placement)),
                Tier::Plain => plain.push((name, placement)),
            }
        }

        install(registry.as_ref(), highest);
        let ordered = build_tier(registry.as_ref(), ordered, &mut mergers)?;
        install(registry.as_ref(), ordered);
        let plain = build_tier(registry.as_ref(), plain, &mut mergers)?;
        install(registry.as_ref(), plain);

        // Metadata mergers finalize state once every other hook is in place.
        install(registry.as_ref(), mergers);

        registry.add_instance_hook(
            LISTENER_DETECTOR_NAME,
            Arc::new(ListenerDetector::new(
                Arc::downgrade(registry),
                Arc::clone(context),
            )),
        );

        let chain = registry.installed_hook_names();
        tracing::info!(
            "Instance hook registration complete ({} hooks installed, target {})",
            chain.len(),
            target_count
        );
        Ok(RegistrationOutcome {
            target_count,
            chain,
            sentinel,
        })
    }
}

fn build(
    registry: &dyn ObjectRegistry,
    name: String,
    placement: Placement,
    mergers: &mut Vec<RankedHook>,
) -> Result<RankedHook> {
    let hook = build_instance_hook(registry, &name, Phase::InstanceHookRegistration)?;
    if registry.is_type_match(&name, Capability::MergesDefinitionMetadata) {
        mergers.push(Ranked::new(name.clone(), placement, Arc::clone(&hook)));
    }
    Ok(Ranked::new(name, placement, hook))
}

fn build_tier(
    registry: &dyn ObjectRegistry,
    names: Vec<(String, Placement)>,
    mergers: &mut Vec<RankedHook>,
) -> Result<Vec<RankedHook>> {
    names
        .into_iter()
        .map(|(name, placement)| build(registry, name, placement, mergers))
        .collect()
}

fn install(registry: &dyn ObjectRegistry, mut hooks: Vec<RankedHook>) {
    sort_ranked(&mut hooks);
    for ranked in hooks {
        registry.add_instance_hook(&ranked.name, ranked.hook);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::SentinelState;
    use crate::error::BootstrapError;
    use crate::hook::{HookResult, Object};
    use crate::phase::Phase;
    use crate::registry::{Container, Definition, Role};

    #[derive(Default)]
    struct Passive;

    impl InstanceHook for Passive {}

    #[derive(Default)]
    struct Service;

    fn registrar() -> InstanceHookRegistrar {
        InstanceHookRegistrar::new(BootstrapConfig::default())
    }

    #[test]
    fn test_merger_moves_behind_ordinary_hooks() {
        let container = Arc::new(Container::new());
        container
            .register_definition(
                Definition::of::<Passive>("merger")
                    .highest(0)
                    .merges_definition_metadata()
                    .build(),
            )
            .unwrap();
        container
            .register_definition(Definition::of::<Passive>("ordered").ordered(0).intercepts_instance().build())
            .unwrap();
        let registry: Arc<dyn ObjectRegistry> = container.clone();

        let outcome = registrar()
            .run(&registry, &Arc::new(ApplicationContext::new()))
            .unwrap();

        assert_eq!(
            outcome.chain,
            vec![SENTINEL_NAME, "ordered", "merger", LISTENER_DETECTOR_NAME]
        );
        assert_eq!(outcome.target_count, 3);
        assert_eq!(container.hook_chain().names(), outcome.chain);
    }

    #[test]
    fn test_tier_and_rank_order() {
        let container = Arc::new(Container::new());
        for (name, placement) in [
            ("plain", Placement::PLAIN),
            ("ordered-7", Placement::ordered(7)),
            ("highest-2", Placement::highest(2)),
            ("ordered-1", Placement::ordered(1)),
            ("highest-1", Placement::highest(1)),
        ] {
            container
                .register_definition(
                    Definition::of::<Passive>(name)
                        .placement(placement)
                        .intercepts_instance()
                        .build(),
                )
                .unwrap();
        }
        let registry: Arc<dyn ObjectRegistry> = container.clone();

        let outcome = registrar()
            .run(&registry, &Arc::new(ApplicationContext::new()))
            .unwrap();

        assert_eq!(
            outcome.chain,
            vec![
                SENTINEL_NAME,
                "highest-1",
                "highest-2",
                "ordered-1",
                "ordered-7",
                "plain",
                LISTENER_DETECTOR_NAME
            ]
        );
    }

    /// An ordered hook whose construction needs an ordinary object: that object is
    /// built while only the sentinel and the highest tier are installed.
    struct NeedsService;

    impl InstanceHook for NeedsService {
        fn after_initialization(&self, object: Object, _name: &str) -> HookResult<Option<Object>> {
            Ok(Some(object))
        }
    }

    #[test]
    fn test_sentinel_reports_premature_objects() {
        let container = Arc::new(Container::new());
        container
            .register_definition(Definition::of::<Service>("service").build())
            .unwrap();
        container
            .register_definition(
                Definition::of::<Service>("infra")
                    .role(Role::Infrastructure)
                    .build(),
            )
            .unwrap();
        container
            .register_definition(
                Definition::builder("needy", |registry: &dyn ObjectRegistry, _: &Definition| {
                    registry.get_or_build("service")?;
                    registry.get_or_build("infra")?;
                    Ok(NeedsService)
                })
                .ordered(0)
                .intercepts_instance()
                .build(),
            )
            .unwrap();
        container
            .register_definition(Definition::of::<Passive>("late").intercepts_instance().build())
            .unwrap();
        let registry: Arc<dyn ObjectRegistry> = container.clone();

        let outcome = registrar()
            .run(&registry, &Arc::new(ApplicationContext::new()))
            .unwrap();

        // The hook objects themselves are never reported, nor is infrastructure.
        assert_eq!(
            outcome.sentinel.state(),
            SentinelState::Tripped(vec!["service".to_string()])
        );

        // Built after registration: the chain is complete, nothing is reported.
        container
            .register_definition(Definition::of::<Service>("after").build())
            .unwrap();
        container.get_or_build("after").unwrap();
        assert_eq!(outcome.sentinel.tripped(), vec!["service"]);
    }

    #[test]
    fn test_sentinel_stays_armed_without_premature_builds() {
        let container = Arc::new(Container::new());
        container
            .register_definition(Definition::of::<Passive>("hook").intercepts_instance().build())
            .unwrap();
        let registry: Arc<dyn ObjectRegistry> = container.clone();

        let outcome = registrar()
            .run(&registry, &Arc::new(ApplicationContext::new()))
            .unwrap();
        container
            .register_definition(Definition::of::<Service>("service").build())
            .unwrap();
        container.get_or_build("service").unwrap();

        assert_eq!(outcome.sentinel.state(), SentinelState::Armed);
    }

    #[test]
    fn test_unbuildable_hook_reports_registration_phase() {
        let container = Arc::new(Container::new());
        container
            .register_definition(
                Definition::builder::<Passive, _>("badHook", |_, _| Err(anyhow::anyhow!("no config")))
                    .intercepts_instance()
                    .build(),
            )
            .unwrap();
        let registry: Arc<dyn ObjectRegistry> = container.clone();

        let err = registrar()
            .run(&registry, &Arc::new(ApplicationContext::new()))
            .err()
            .unwrap();

        assert!(matches!(err, BootstrapError::HookExecution { .. }));
        assert_eq!(err.hook_name(), Some("badHook"));
        assert_eq!(err.phase(), Some(Phase::InstanceHookRegistration));
    }

    #[test]
    fn test_failing_dependency_keeps_its_own_name() {
        let container = Arc::new(Container::new());
        container
            .register_definition(
                Definition::builder::<Service, _>("database", |_, _| Err(anyhow::anyhow!("offline"))).build(),
            )
            .unwrap();
        container
            .register_definition(
                Definition::builder("auditing", |registry: &dyn ObjectRegistry, _: &Definition| {
                    registry.get_or_build("database")?;
                    Ok(Passive)
                })
                .intercepts_instance()
                .build(),
            )
            .unwrap();
        let registry: Arc<dyn ObjectRegistry> = container.clone();

        let err = registrar()
            .run(&registry, &Arc::new(ApplicationContext::new()))
            .err()
            .unwrap();

        assert_eq!(err.hook_name(), Some("database"));
        assert_eq!(err.phase(), Some(Phase::Instantiation));
    }

    struct Enclosed(#[allow(dead_code)] Object);

    /// Wraps every object built after it is installed.
    #[derive(Default)]
    struct Enclose;

    impl InstanceHook for Enclose {
        fn after_initialization(&self, object: Object, _name: &str) -> HookResult<Option<Object>> {
            Ok(Some(Arc::new(Enclosed(object))))
        }
    }

    #[test]
    fn test_wrapped_hooks_are_installed_and_not_reported() {
        let container = Arc::new(Container::new());
        container
            .register_definition(Definition::of::<Enclose>("enclose").highest(0).intercepts_instance().build())
            .unwrap();
        container
            .register_definition(Definition::of::<Passive>("first").ordered(0).intercepts_instance().build())
            .unwrap();
        container
            .register_definition(Definition::of::<Passive>("second").ordered(1).intercepts_instance().build())
            .unwrap();
        let registry: Arc<dyn ObjectRegistry> = container.clone();

        let outcome = registrar()
            .run(&registry, &Arc::new(ApplicationContext::new()))
            .unwrap();

        let first = container.get_or_build("first").unwrap();
        assert!(first.downcast::<Enclosed>().is_ok());
        assert_eq!(
            outcome.chain,
            vec![SENTINEL_NAME, "enclose", "first", "second", LISTENER_DETECTOR_NAME]
        );
        assert_eq!(outcome.sentinel.state(), SentinelState::Armed);
    }
}
