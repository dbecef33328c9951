use crate::error::Result;
use crate::registry::ObjectRegistry;

/// Trait for application modules
///
/// A module groups the definitions of one feature, hooks included, and
/// registers them in one go.
///
/// # Example
/// ```rust,ignore
/// pub struct PersistenceModule;
///
/// impl Module for PersistenceModule {
///     fn register(registry: &dyn ObjectRegistry) -> Result<()> {
///         registry.register_definition(Definition::injectable::<UserRepository>("userRepository").build())?;
///         registry.register_definition(
///             Definition::of::<AuditHook>("auditHook").ordered(10).intercepts_instance().build(),
///         )
///     }
/// }
/// ```
pub trait Module {
    /// Register all definitions of this module
    fn register(registry: &dyn ObjectRegistry) -> Result<()>;
}
