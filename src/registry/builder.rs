use crate::error::Result;
use crate::registry::{Container, Definition, ObjectRegistry};

/// Builder for constructing a [`Container`] with its initial definitions
///
/// Definitions added here are what the registry phase starts discovering hooks from.
///
/// # Example
/// ```rust,ignore
/// let container = ContainerBuilder::new()
///     .register(Definition::of::<ComponentScanner>("scanner").highest(0).mutates_registry().build())
///     .register(Definition::of::<UserService>("userService").build())
///     .build()?;
/// ```
pub struct ContainerBuilder {
    container: Container,
    definitions: Vec<Definition>,
}

impl ContainerBuilder {
    /// Create a new container builder
    pub fn new() -> Self {
        Self {
            container: Container::new(),
            definitions: Vec::new(),
        }
    }

    /// Allow later definitions to replace earlier ones with the same name
    pub fn allow_definition_overriding(mut self, allow: bool) -> Self {
        self.container = self.container.with_definition_overriding(allow);
        self
    }

    /// Queue a definition for registration
    pub fn register(mut self, definition: Definition) -> Self {
        self.definitions.push(definition);
        self
    }

    /// Build the container
    ///
    /// # Errors
    /// Fails on the first definition the container rejects.
    pub fn build(self) -> Result<Container> {
        for definition in self.definitions {
            self.container.register_definition(definition)?;
        }
        Ok(self.container)
    }
}

impl Default for ContainerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
