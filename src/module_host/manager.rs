use std::sync::Arc;

use anyhow::{bail, Context};
use indexmap::IndexMap;

use super::{Module, ModuleContext, ModuleId, ModuleRegistrar};
use crate::config::{ConfigLifecycle, DependentId};
use crate::events::dispatcher::{emit, meta};
use crate::events::model::{LogEvent, LogLevel, ModuleEvent};
use crate::extensible::{EntityWalker, Extensible, ExtensionRegistry};
use crate::pipeline::EventPipeline;

struct Loaded {
    module: Box<dyn Module>,
    dependents: Vec<DependentId>,
}

pub struct ModuleManager {
    extensions: Arc<ExtensionRegistry>,
    pipeline: Arc<EventPipeline>,
    config: Arc<ConfigLifecycle>,
    modules: IndexMap<String, Loaded>,
}

impl ModuleManager {
    pub fn new(
        extensions: Arc<ExtensionRegistry>,
        pipeline: Arc<EventPipeline>,
        config: Arc<ConfigLifecycle>,
    ) -> Self {
        Self {
            extensions,
            pipeline,
            config,
            modules: IndexMap::new(),
        }
    }

    pub fn extensions(&self) -> &Arc<ExtensionRegistry> {
        &self.extensions
    }

    pub fn pipeline(&self) -> &Arc<EventPipeline> {
        &self.pipeline
    }

    pub fn config(&self) -> &Arc<ConfigLifecycle> {
        &self.config
    }

    /// Initialise `module`. On failure nothing it registered survives.
    pub fn load(&mut self, mut module: Box<dyn Module>) -> anyhow::Result<()> {
        let name = module.name().to_string();
        if self.modules.contains_key(&name) {
            bail!("module '{}' is already loaded", name);
        }
        let id = ModuleId::new(name.clone());
        let mut ctx = ModuleContext::new(
            id.clone(),
            &self.extensions,
            &self.pipeline,
            self.config.clone(),
        );
        let result = module.init(&mut ctx);
        let dependents = ctx.into_dependents();
        if let Err(e) = result {
            // Nothing outside the unit can hold its payloads yet.
            let mut no_entities: Vec<Extensible> = Vec::new();
            self.release(&id, &dependents, &mut no_entities);
            emit_module(LogLevel::Error, &name, "load_failed", Some(format!("{:#}", e)));
            return Err(e).with_context(|| format!("failed to load module '{}'", name));
        }
        emit_module(
            LogLevel::Info,
            &name,
            "loaded",
            Some(module.description().to_string()).filter(|d| !d.is_empty()),
        );
        self.modules.insert(name, Loaded { module, dependents });
        Ok(())
    }

    /// Unload a feature unit, sweeping its extension payloads from every
    /// entity reachable through `entities`.
    pub fn unload(&mut self, name: &str, entities: &mut dyn EntityWalker) -> anyhow::Result<()> {
        let Some(mut loaded) = self.modules.shift_remove(name) else {
            bail!("module '{}' is not loaded", name);
        };
        loaded.module.on_unload();
        let id = ModuleId::new(name);
        let (extensions, bindings) = self.release(&id, &loaded.dependents, entities);
        emit_module(
            LogLevel::Info,
            name,
            "unloaded",
            Some(format!("extensions={} bindings={}", extensions, bindings)),
        );
        Ok(())
    }

    fn release(
        &self,
        id: &ModuleId,
        dependents: &[DependentId],
        entities: &mut dyn EntityWalker,
    ) -> (usize, usize) {
        let extensions = self.extensions.unregister_owner(id, entities).len();
        let bindings = self.pipeline.unbind_owner(id);
        for dep in dependents {
            self.config.remove_dependent(*dep);
        }
        (extensions, bindings)
    }

    /// A loaded module downcast to its concrete type.
    pub fn module<M: Module + 'static>(&self, name: &str) -> Option<&M> {
        self.modules.get(name)?.module.as_any().downcast_ref::<M>()
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    /// Loaded module names in load order.
    pub fn names(&self) -> Vec<String> {
        self.modules.keys().cloned().collect()
    }
}

impl ModuleRegistrar for ModuleManager {
    fn register_module(&mut self, module: Box<dyn Module>) -> anyhow::Result<()> {
        self.load(module)
    }
}

fn emit_module(level: LogLevel, module: &str, action: &str, detail: Option<String>) {
    emit(LogEvent::Module(ModuleEvent {
        meta: meta("modules", level),
        module: module.to_string(),
        action: action.to_string(),
        detail,
    }));
}
