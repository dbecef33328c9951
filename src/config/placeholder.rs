use super::ConfigService;
use crate::hook::{FactoryCustomizer, HookResult};
use crate::registry::{Definition, DefinitionBuilder, ObjectRegistry, Role};
use anyhow::{anyhow, bail};

pub const PLACEHOLDER_CONFIGURER_NAME: &str = "meshestra.placeholderConfigurer";

const PREFIX: &str = "${";
const SUFFIX: char = '}';
const DEFAULT_SEPARATOR: char = ':';

/// Factory customizer that resolves `${key}` and `${key:default}` in
/// definition properties against a [`ConfigService`].
///
/// Resolved values may themselves contain placeholders; these are resolved
/// too. A key without a value or default fails the customization.
pub struct PlaceholderConfigurer {
    config: ConfigService,
}

impl PlaceholderConfigurer {
    pub fn new(config: ConfigService) -> Self {
        Self { config }
    }

    /// Registration for the configurer: infrastructure, `Highest` tier, last rank.
    pub fn definition(config: ConfigService) -> DefinitionBuilder<PlaceholderConfigurer> {
        Definition::builder(PLACEHOLDER_CONFIGURER_NAME, move |_, _| {
            Ok(PlaceholderConfigurer::new(config.clone()))
        })
        .role(Role::Infrastructure)
        .highest(i32::MAX)
        .customizes_factory()
    }

    pub fn resolve(&self, value: &str) -> anyhow::Result<String> {
        self.resolve_nested(value, &mut Vec::new())
    }

    fn resolve_nested(&self, value: &str, visiting: &mut Vec<String>) -> anyhow::Result<String> {
        let mut resolved = String::with_capacity(value.len());
        let mut rest = value;

        while let Some(start) = rest.find(PREFIX) {
            resolved.push_str(&rest[..start]);
            let body_start = start + PREFIX.len();
            let Some(end) = find_closing(&rest[body_start..]) else {
                bail!("unterminated placeholder in '{value}'");
            };
            let body = &rest[body_start..body_start + end];
            // Keys may contain placeholders themselves.
            let body = self.resolve_nested(body, visiting)?;
            let (key, default) = match body.split_once(DEFAULT_SEPARATOR) {
                Some((key, default)) => (key, Some(default)),
                None => (body.as_str(), None),
            };

            if visiting.iter().any(|k| k == key) {
                bail!("circular placeholder reference '{key}'");
            }
            let replacement = match (self.config.get(key), default) {
                (Some(found), _) => {
                    visiting.push(key.to_string());
                    let nested = self.resolve_nested(&found, visiting);
                    visiting.pop();
                    nested?
                }
                (None, Some(default)) => default.to_string(),
                (None, None) => return Err(anyhow!("could not resolve placeholder '{key}'")),
            };
            resolved.push_str(&replacement);
            rest = &rest[body_start + end + 1..];
        }

        resolved.push_str(rest);
        Ok(resolved)
    }
}

/// Byte offset of the `}` closing a placeholder body, honouring nesting.
fn find_closing(body: &str) -> Option<usize> {
    let mut depth = 0usize;
    let bytes = body.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i..].starts_with(PREFIX.as_bytes()) {
            depth += 1;
            i += PREFIX.len();
            continue;
        }
        if bytes[i] == SUFFIX as u8 {
            if depth == 0 {
                return Some(i);
            }
            depth -= 1;
        }
        i += 1;
    }
    None
}

impl FactoryCustomizer for PlaceholderConfigurer {
    fn customize_factory(&self, registry: &dyn ObjectRegistry) -> HookResult {
        let mut rewritten = 0;
        for name in registry.definition_names() {
            let definition = registry.definition(&name)?;
            let mut changes = Vec::new();
            for (key, value) in definition.properties() {
                if !value.contains(PREFIX) {
                    continue;
                }
                let resolved = self
                    .resolve(value)
                    .map_err(|e| e.context(format!("property '{key}' of '{name}'")))?;
                if resolved != *value {
                    changes.push((key.clone(), resolved));
                }
            }
            if changes.is_empty() {
                continue;
            }

            rewritten += changes.len();
            registry.update_definition(&name, &mut |definition| {
                for (key, value) in &changes {
                    definition.set_property(key.clone(), value.clone());
                }
            })?;
        }

        tracing::debug!(properties = rewritten, "Resolved definition placeholders");
        Ok(())
    }
}
