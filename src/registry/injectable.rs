use crate::registry::{Definition, ObjectRegistry};

/// Trait for types that build themselves from the registry
///
/// Register such a type with [`Definition::injectable`]; its dependencies are looked
/// up by name while the registry builds it, so they pass through the instance
/// hook chain installed at that moment.
///
/// # Example
/// ```rust,ignore
/// use meshestra_bootstrap::prelude::*;
///
/// pub struct UserService {
///     repository: Arc<UserRepository>,
///     table: String,
/// }
///
/// impl Injectable for UserService {
///     fn inject(registry: &dyn ObjectRegistry, definition: &Definition) -> anyhow::Result<Self> {
///         Ok(Self {
///             repository: resolve(registry, "userRepository")?,
///             table: definition.property("table").unwrap_or("users").to_string(),
///         })
///     }
/// }
/// ```
pub trait Injectable: Sized + Send + Sync + 'static {
    /// Create an instance by resolving dependencies from the registry
    ///
    /// # Errors
    /// Returns an error if any required dependency cannot be built.
    fn inject(registry: &dyn ObjectRegistry, definition: &Definition) -> anyhow::Result<Self>;
}
