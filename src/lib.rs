//! # Meshestra Bootstrap
//!
//! Container bootstrap orchestration for Meshestra: the hook phases that run
//! between "definitions registered" and "objects ready".
//!
//! ## Features
//!
//! - **Registry mutation to a fixed point**: hooks may register further hooks;
//!   discovery repeats until a pass finds nothing new
//! - **Tiered ordering**: `Highest`, `Ordered` and `Plain` tiers with a rank inside
//!   each, stable for equal ranks
//! - **Instance hook chain**: every object build walks the chain, which may wrap,
//!   replace or short-circuit the object
//! - **Bootstrap sentinel**: reports objects built before every hook was installed
//! - **Listener detection**: singleton listeners receive application events
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use meshestra_bootstrap::prelude::*;
//!
//! #[derive(Default)]
//! struct Timing;
//!
//! impl InstanceHook for Timing {
//!     fn after_initialization(&self, object: Object, name: &str) -> HookResult<Option<Object>> {
//!         tracing::debug!("built {}", name);
//!         Ok(Some(object))
//!     }
//! }
//!
//! #[derive(Default)]
//! struct UserService;
//!
//! let app = Application::builder()
//!     .definition(Definition::of::<Timing>("timing").ordered(0).intercepts_instance().build())
//!     .definition(Definition::of::<UserService>("userService").build())
//!     .build()?;
//!
//! let users = app.resolve::<UserService>("userService")?;
//! ```

pub mod chain;
pub mod config;
pub mod context;
pub mod error;
pub mod hook;
pub mod lifecycle;
pub mod module;
pub mod phase;
pub mod registry;
pub mod tier;

// Re-export core types
pub use chain::{BootstrapSentinel, HookChain, SentinelState};
pub use config::{BootstrapConfig, ConfigService, PlaceholderConfigurer};
pub use context::{ApplicationContext, ApplicationEvent};
pub use error::{BootstrapError, Result};
pub use hook::{
    ApplicationListener, ExternalHook, FactoryCustomizer, HookResult, InstanceHook, Object,
    RegistryMutator,
};
pub use lifecycle::{Application, ApplicationBuilder, BootstrapReport};
pub use module::Module;
pub use phase::{
    Phase, ProcessedSet, run_factory_phase, run_instance_hook_registration, run_registry_phase,
};
pub use registry::{
    Capability, Container, ContainerBuilder, Definition, Injectable, ObjectRegistry, Role, Scope,
};
pub use tier::{Placement, Tier};

/// Prelude module for convenient imports
///
/// ```
/// use meshestra_bootstrap::prelude::*;
/// ```
pub mod prelude {
    pub use crate::chain::{BootstrapSentinel, HookChain, SentinelState};
    pub use crate::config::{BootstrapConfig, ConfigService, PlaceholderConfigurer};
    pub use crate::context::{ApplicationContext, ApplicationEvent};
    pub use crate::error::{BootstrapError, Result};
    pub use crate::hook::{
        ApplicationListener, ExternalHook, Facet, FactoryCustomizer, HookResult, InstanceHook,
        Object, RegistryMutator,
    };
    pub use crate::lifecycle::{Application, ApplicationBuilder, BootstrapReport};
    pub use crate::module::Module;
    pub use crate::phase::Phase;
    pub use crate::registry::{
        Capability, Container, ContainerBuilder, Definition, Injectable, ObjectRegistry, Role,
        Scope, resolve,
    };
    pub use crate::tier::{Placement, Tier};
    pub use std::sync::Arc;
}
