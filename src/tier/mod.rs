//! Hook tiering
//!
//! Hooks are invoked tier by tier: every `Highest` hook of a batch runs before any
//! `Ordered` hook, which runs before any `Plain` hook. Inside a tier the optional
//! rank decides (lower first) and discovery order breaks ties.

use crate::registry::ObjectRegistry;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};

/// Coarse priority bucket of a hook registration.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Highest,
    Ordered,
    Plain,
}

impl Tier {
    /// Whether the tier takes part in the `Ordered` discovery pass.
    ///
    /// `Highest` implies ordered, so a highest-tier hook that only showed up
    /// during the `Highest` pass is still picked up one pass later.
    pub fn is_ordered(self) -> bool {
        matches!(self, Tier::Highest | Tier::Ordered)
    }
}

/// Tier plus optional rank, carried alongside a hook registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub tier: Tier,
    pub rank: Option<i32>,
}

impl Placement {
    pub const PLAIN: Placement = Placement {
        tier: Tier::Plain,
        rank: None,
    };

    pub fn highest(rank: i32) -> Self {
        Self {
            tier: Tier::Highest,
            rank: Some(rank),
        }
    }

    pub fn ordered(rank: i32) -> Self {
        Self {
            tier: Tier::Ordered,
            rank: Some(rank),
        }
    }

    /// Unranked hooks sort after every ranked hook of the same tier. The tier
    /// still decides first, so within a mixed batch an unranked `Ordered` hook
    /// runs before every `Plain` hook rather than tying with them.
    pub fn sort_key(&self) -> (Tier, i32) {
        (self.tier, self.rank.unwrap_or(i32::MAX))
    }
}

impl Default for Placement {
    fn default() -> Self {
        Self::PLAIN
    }
}

/// Resolve the placement of the hook registered under `name`.
///
/// A name the registry cannot classify falls back to [`Placement::PLAIN`].
pub fn classify(registry: &dyn ObjectRegistry, name: &str) -> Placement {
    match registry.placement(name) {
        Ok(placement) => placement,
        Err(err) => {
            tracing::warn!(hook = name, error = %err, "Treating unclassifiable hook as plain");
            Placement::PLAIN
        }
    }
}

/// A built hook together with the name and placement it was discovered under.
pub struct Ranked<T> {
    pub name: String,
    pub placement: Placement,
    pub hook: T,
}

impl<T> Ranked<T> {
    pub fn new(name: impl Into<String>, placement: Placement, hook: T) -> Self {
        Self {
            name: name.into(),
            placement,
            hook,
        }
    }
}

/// Stable sort by `(tier, rank)`; equal keys keep discovery order.
pub fn sort_ranked<T>(hooks: &mut [Ranked<T>]) {
    hooks.sort_by_key(|ranked| ranked.placement.sort_key());
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_tier_order() {
        let tiers: Vec<Tier> = Tier::iter().collect();
        assert_eq!(tiers, vec![Tier::Highest, Tier::Ordered, Tier::Plain]);
        assert!(Tier::Highest < Tier::Ordered);
        assert!(Tier::Highest.is_ordered());
        assert!(!Tier::Plain.is_ordered());
        assert_eq!(Tier::Ordered.to_string(), "ordered");
    }

    #[test]
    fn test_sort_is_stable_within_rank() {
        let mut hooks = vec![
            Ranked::new("plain", Placement::PLAIN, ()),
            Ranked::new("ordered-5", Placement::ordered(5), ()),
            Ranked::new("highest-a", Placement::highest(1), ()),
            Ranked::new("ordered-1", Placement::ordered(1), ()),
            Ranked::new("highest-b", Placement::highest(1), ()),
            Ranked::new("ordered-unranked", Placement { tier: Tier::Ordered, rank: None }, ()),
        ];
        sort_ranked(&mut hooks);
        let names: Vec<&str> = hooks.iter().map(|h| h.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "highest-a",
                "highest-b",
                "ordered-1",
                "ordered-5",
                "ordered-unranked",
                "plain"
            ]
        );
    }
}
