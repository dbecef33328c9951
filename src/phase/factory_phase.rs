use super::{Phase, ProcessedSet, build_customizer, invoke_customization};
use crate::config::BootstrapConfig;
use crate::error::Result;
use crate::hook::FactoryCustomizer;
use crate::registry::{Capability, ObjectRegistry};
use crate::tier::{Placement, Ranked, Tier, classify, sort_ranked};
use std::sync::Arc;

#[derive(Debug, Default, Clone)]
pub struct FactoryPhaseOutcome {
    pub customization_order: Vec<String>,
}

/// Invokes the factory customizers the registry phase did not handle.
///
/// Runs once, tier by tier. Customizers registered by another customizer are
/// not picked up.
pub struct FactoryPhase {
    config: BootstrapConfig,
}

impl FactoryPhase {
    pub fn new(config: BootstrapConfig) -> Self {
        Self { config }
    }

    pub fn run(
        &self,
        registry: &dyn ObjectRegistry,
        processed: &ProcessedSet,
    ) -> Result<FactoryPhaseOutcome> {
        tracing::info!("Calling factory customization hooks...");

        let names = registry.names_for_capability(
            Capability::CustomizesFactory,
            self.config.include_non_singletons,
            self.config.allow_eager_init,
        );

        let mut highest = Vec::new();
        let mut ordered = Vec::new();
        let mut plain = Vec::new();
        for name in names {
            if processed.contains(&name) {
                continue;
            }
            let placement = classify(registry, &name);
            match placement.tier {
                Tier::Highest => {
                    let hook = build_customizer(registry, &name, Phase::FactoryCustomization)?;
                    highest.push(Ranked::new(name, placement, hook));
                }
                Tier::Ordered => ordered.push((name, placement)),
                Tier::Plain => plain.push((name, placement)),
            }
        }

        let mut outcome = FactoryPhaseOutcome::default();
        invoke_tier(registry, highest, &mut outcome)?;
        // Lower tiers are built only after the tier above has customized the factory.
        let ordered = build_tier(registry, ordered)?;
        invoke_tier(registry, ordered, &mut outcome)?;
        let plain = build_tier(registry, plain)?;
        invoke_tier(registry, plain, &mut outcome)?;

        // Customizers may have rewritten definition contents.
        registry.invalidate_derived_metadata_cache();

        tracing::info!(
            "Factory customization complete ({} hooks executed)",
            outcome.customization_order.len()
        );
        Ok(outcome)
    }
}

fn build_tier(
    registry: &dyn ObjectRegistry,
    names: Vec<(String, Placement)>,
) -> Result<Vec<Ranked<Arc<dyn FactoryCustomizer>>>> {
    names
        .into_iter()
        .map(|(name, placement)| {
            let hook = build_customizer(registry, &name, Phase::FactoryCustomization)?;
            Ok(Ranked::new(name, placement, hook))
        })
        .collect()
}

fn invoke_tier(
    registry: &dyn ObjectRegistry,
    mut hooks: Vec<Ranked<Arc<dyn FactoryCustomizer>>>,
    outcome: &mut FactoryPhaseOutcome,
) -> Result<()> {
    sort_ranked(&mut hooks);
    for ranked in &hooks {
        invoke_customization(registry, &ranked.name, ranked.hook.as_ref())?;
        outcome.customization_order.push(ranked.name.clone());
    }
    Ok(())
}
