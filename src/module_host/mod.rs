pub mod manager;

pub use manager::ModuleManager;

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::config::{ConfigDependent, ConfigLifecycle, DependentId, ServerConfig};
use crate::events::dispatcher::EventHandle;
use crate::extensible::ExtensionRegistry;
use crate::pipeline::EventPipeline;

/// Identity of a loaded feature unit. Extensions and listener bindings are
/// tagged with it so they can be removed together on unload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(String);

impl ModuleId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Owner used for state registered by the core itself.
    pub fn core() -> Self {
        Self("core".into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Host services handed to a feature unit while it initialises.
pub struct ModuleContext<'h> {
    id: ModuleId,
    pub extensions: &'h ExtensionRegistry,
    pub pipeline: &'h EventPipeline,
    pub config: Arc<ConfigLifecycle>,
    pub events: EventHandle,
    dependents: Vec<DependentId>,
}

impl<'h> ModuleContext<'h> {
    pub(crate) fn new(
        id: ModuleId,
        extensions: &'h ExtensionRegistry,
        pipeline: &'h EventPipeline,
        config: Arc<ConfigLifecycle>,
    ) -> Self {
        Self {
            id,
            extensions,
            pipeline,
            config,
            events: crate::events::dispatcher::handle(),
            dependents: Vec::new(),
        }
    }

    pub fn id(&self) -> &ModuleId {
        &self.id
    }

    /// The snapshot current at load time.
    pub fn current_config(&self) -> Arc<ServerConfig> {
        self.config.current()
    }

    /// Subscribe a reload dependent; it is removed again when the unit
    /// unloads or its load is rolled back.
    pub fn add_config_dependent(&mut self, dependent: Arc<dyn ConfigDependent>) {
        let id = self.config.add_dependent(dependent);
        self.dependents.push(id);
    }

    pub(crate) fn into_dependents(self) -> Vec<DependentId> {
        self.dependents
    }
}

/// Trait that all feature units implement.
pub trait Module: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    /// Register extensions, bind listeners and subscribe to reloads.
    /// Returning an error rolls back everything registered so far.
    fn init(&mut self, ctx: &mut ModuleContext<'_>) -> anyhow::Result<()>;

    /// Called before the host removes the unit's extensions and bindings.
    fn on_unload(&mut self) {}

    /// Lets the host hand out the concrete type, see [`ModuleManager::module`].
    fn as_any(&self) -> &dyn Any;
}

/// Trait implemented by hosts that accept feature units.
pub trait ModuleRegistrar {
    fn register_module(&mut self, module: Box<dyn Module>) -> anyhow::Result<()>;
}
