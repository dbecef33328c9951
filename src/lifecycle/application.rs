//! Application Bootstrap
//!
//! Provides a high-level API for bootstrapping a container with all of its
//! hook phases.

use super::BootstrapReport;
use crate::chain::BootstrapSentinel;
use crate::config::{BootstrapConfig, ConfigService, PlaceholderConfigurer};
use crate::context::{ApplicationContext, ApplicationEvent, CONTEXT_REFRESHED};
use crate::error::Result;
use crate::hook::ExternalHook;
use crate::module::Module;
use crate::phase::{run_factory_phase, run_instance_hook_registration, run_registry_phase};
use crate::registry::{Container, Definition, ObjectRegistry};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

type ModuleRegistration = fn(&dyn ObjectRegistry) -> Result<()>;

/// A bootstrapped application
///
/// # Example
///
/// ```rust,ignore
/// let app = Application::builder()
///     .definition(Definition::injectable::<UserService>("userService").build())
///     .build()?;
///
/// let users = app.resolve::<UserService>("userService")?;
/// ```
pub struct Application {
    container: Arc<Container>,
    context: Arc<ApplicationContext>,
    sentinel: Arc<BootstrapSentinel>,
    report: BootstrapReport,
}

impl Application {
    /// Create a new application builder
    pub fn builder() -> ApplicationBuilder {
        ApplicationBuilder::new()
    }

    /// Get a reference to the container
    pub fn container(&self) -> &Arc<Container> {
        &self.container
    }

    pub fn context(&self) -> &Arc<ApplicationContext> {
        &self.context
    }

    pub fn report(&self) -> &BootstrapReport {
        &self.report
    }

    pub fn resolve<T: Send + Sync + 'static>(&self, name: &str) -> Result<Arc<T>> {
        self.container.resolve::<T>(name)
    }

    /// Objects built before the hook chain was complete, including those built
    /// after the report was taken.
    pub fn premature_objects(&self) -> Vec<String> {
        self.sentinel.tripped()
    }

    /// Publish `event` to every detected listener.
    pub fn publish(&self, event: &ApplicationEvent) -> usize {
        self.context.publish(event)
    }
}

/// Builder for Application
pub struct ApplicationBuilder {
    container: Option<Container>,
    definitions: Vec<Definition>,
    modules: Vec<ModuleRegistration>,
    external_hooks: Vec<ExternalHook>,
    placeholders: Option<ConfigService>,
    config: BootstrapConfig,
}

impl Default for ApplicationBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ApplicationBuilder {
    /// Create a new application builder
    pub fn new() -> Self {
        Self {
            container: None,
            definitions: Vec::new(),
            modules: Vec::new(),
            external_hooks: Vec::new(),
            placeholders: None,
            config: BootstrapConfig::default(),
        }
    }

    /// Bootstrap an existing container instead of an empty one
    pub fn container(mut self, container: Container) -> Self {
        self.container = Some(container);
        self
    }

    pub fn definition(mut self, definition: Definition) -> Self {
        self.definitions.push(definition);
        self
    }

    /// Register a module's definitions before the first phase
    pub fn module<M: Module>(mut self) -> Self {
        self.modules.push(M::register);
        self
    }

    /// Supply a hook that is not itself a registry entry
    pub fn external_hook(mut self, hook: ExternalHook) -> Self {
        self.external_hooks.push(hook);
        self
    }

    /// Resolve `${key}` placeholders in definition properties against `config`
    pub fn placeholders(mut self, config: ConfigService) -> Self {
        self.placeholders = Some(config);
        self
    }

    pub fn config(mut self, config: BootstrapConfig) -> Self {
        self.config = config;
        self
    }

    /// Build and bootstrap the application
    ///
    /// # Errors
    ///
    /// Returns the first error raised by a registration or a hook; nothing
    /// after the failing step runs.
    pub fn build(self) -> Result<Application> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("bootstrap", %run_id);
        let _entered = span.enter();

        tracing::info!("Starting application bootstrap...");
        let application = self.refresh(run_id).inspect_err(|e| {
            tracing::error!("Application bootstrap failed: {}", e);
        })?;
        tracing::info!(
            "Application bootstrap complete ({} ms)",
            application.report.duration().num_milliseconds()
        );
        Ok(application)
    }

    fn refresh(self, run_id: Uuid) -> Result<Application> {
        let started_at = Utc::now();
        let config = self.config;

        let mut container = self.container.unwrap_or_default();
        if config.allow_definition_overriding {
            container = container.with_definition_overriding(true);
        }
        let container = Arc::new(container);
        let registry: Arc<dyn ObjectRegistry> = container.clone();
        let context = Arc::new(ApplicationContext::new());

        if let Some(placeholders) = self.placeholders {
            registry.register_definition(PlaceholderConfigurer::definition(placeholders).build())?;
        }
        for definition in self.definitions {
            registry.register_definition(definition)?;
        }
        for register in &self.modules {
            register(registry.as_ref())?;
        }

        let registry_outcome = run_registry_phase(registry.as_ref(), &self.external_hooks, &config)?;
        let factory_outcome = run_factory_phase(registry.as_ref(), &registry_outcome.processed, &config)?;
        let registration = run_instance_hook_registration(&registry, &context, &config)?;

        let pre_instantiated = if config.pre_instantiate_singletons {
            container.pre_instantiate_singletons()?
        } else {
            0
        };

        let event = ApplicationEvent::new(
            CONTEXT_REFRESHED,
            serde_json::json!({ "run_id": run_id, "context_id": context.id() }),
        );
        context.publish(&event);

        let mut customization_order = registry_outcome.customization_order;
        customization_order.extend(factory_outcome.customization_order);

        let report = BootstrapReport {
            run_id,
            context_id: context.id(),
            started_at,
            completed_at: Utc::now(),
            rounds: registry_outcome.rounds,
            mutation_order: registry_outcome.mutation_order,
            customization_order,
            hook_chain: registration.chain,
            target_count: registration.target_count,
            premature_objects: registration.sentinel.tripped(),
            pre_instantiated,
            listeners: context.listener_names(),
        };

        Ok(Application {
            container,
            context,
            sentinel: registration.sentinel,
            report,
        })
    }
}
