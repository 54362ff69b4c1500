// src/config/lifecycle.rs
// Build, cross-check and atomically publish configuration snapshots.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::{Mutex, RwLock};

use super::error::ConfigError;
use super::parser::{parse, ConfigSource};
use super::snapshot::ServerConfig;
use crate::emit_config_event;
use crate::events::model::LogLevel;

/// A long-lived object that caches values derived from the configuration.
///
/// During a reload every dependent first gets to veto the candidate via
/// `validate`, then re-derives its state in `apply` before the candidate is
/// published. `apply` must not fail; anything that can fail belongs in
/// `validate`.
pub trait ConfigDependent: Send + Sync {
    fn name(&self) -> &str;

    fn validate(&self, _candidate: &ServerConfig) -> Vec<ConfigError> {
        Vec::new()
    }

    fn apply(&self, candidate: &Arc<ServerConfig>);
}

/// Handle returned by [`ConfigLifecycle::add_dependent`]; removes exactly
/// that registration regardless of the dependent's display name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DependentId(u64);

/// Owner of the "current" snapshot.
///
/// Readers call [`ConfigLifecycle::current`] and keep the returned `Arc` for
/// as long as they need consistent values; a concurrent reload never changes
/// what they observe.
pub struct ConfigLifecycle {
    current: ArcSwap<ServerConfig>,
    reload_lock: Mutex<()>,
    dependents: RwLock<Vec<(DependentId, Arc<dyn ConfigDependent>)>>,
    next_dependent: AtomicU64,
    generation: AtomicU64,
}

impl ConfigLifecycle {
    /// Load the startup configuration. There is no last-good snapshot to
    /// fall back to, so callers should treat an error as fatal.
    pub fn startup(source: &ConfigSource) -> Result<Self, Vec<ConfigError>> {
        let snapshot = match build_snapshot(source) {
            Ok(s) => s,
            Err(errors) => {
                emit_config_event!(
                    LogLevel::Error,
                    "startup_rejected",
                    Some(source.name().to_string()),
                    &errors,
                    None
                );
                return Err(errors);
            }
        };
        emit_config_event!(
            LogLevel::Info,
            "installed",
            Some(source.name().to_string()),
            Vec::<String>::new(),
            Some("generation=1".to_string())
        );
        Ok(Self::from_snapshot(snapshot))
    }

    pub fn from_snapshot(snapshot: ServerConfig) -> Self {
        Self {
            current: ArcSwap::from_pointee(snapshot),
            reload_lock: Mutex::new(()),
            dependents: RwLock::new(Vec::new()),
            next_dependent: AtomicU64::new(1),
            generation: AtomicU64::new(1),
        }
    }

    /// The published snapshot.
    pub fn current(&self) -> Arc<ServerConfig> {
        self.current.load_full()
    }

    /// Number of snapshots published so far (startup counts as 1).
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn add_dependent(&self, dependent: Arc<dyn ConfigDependent>) -> DependentId {
        let id = DependentId(self.next_dependent.fetch_add(1, Ordering::Relaxed));
        self.dependents.write().push((id, dependent));
        id
    }

    /// Remove the registration behind `id`; false if it was already gone.
    pub fn remove_dependent(&self, id: DependentId) -> bool {
        let mut deps = self.dependents.write();
        let before = deps.len();
        deps.retain(|(d, _)| *d != id);
        before != deps.len()
    }

    pub fn dependent_count(&self) -> usize {
        self.dependents.read().len()
    }

    /// Parse, validate and publish `source`.
    ///
    /// On any error the current snapshot stays in place and every error found
    /// is returned. A reload attempted while another one is running fails
    /// immediately with [`ConfigError::ReloadInProgress`].
    pub fn reload(&self, source: &ConfigSource) -> Result<(), Vec<ConfigError>> {
        let Some(_guard) = self.reload_lock.try_lock() else {
            emit_config_event!(
                LogLevel::Warn,
                "reload_refused",
                Some(source.name().to_string()),
                Vec::<String>::new(),
                Some("another reload is in flight".to_string())
            );
            return Err(vec![ConfigError::ReloadInProgress]);
        };

        let candidate = build_snapshot(source).and_then(|candidate| {
            let errors: Vec<ConfigError> = self
                .dependents
                .read()
                .iter()
                .flat_map(|(_, d)| d.validate(&candidate))
                .collect();
            if errors.is_empty() {
                Ok(candidate)
            } else {
                Err(errors)
            }
        });
        let candidate = match candidate {
            Ok(c) => Arc::new(c),
            Err(errors) => {
                emit_config_event!(
                    LogLevel::Error,
                    "reload_rejected",
                    Some(source.name().to_string()),
                    &errors,
                    None
                );
                return Err(errors);
            }
        };

        // Clone the list so a dependent may (un)register others from `apply`.
        let dependents = self.dependents.read().clone();
        for (_, dep) in &dependents {
            dep.apply(&candidate);
        }
        self.current.store(candidate);
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        emit_config_event!(
            LogLevel::Info,
            "installed",
            Some(source.name().to_string()),
            Vec::<String>::new(),
            Some(format!("generation={}", generation))
        );
        Ok(())
    }
}

fn build_snapshot(source: &ConfigSource) -> Result<ServerConfig, Vec<ConfigError>> {
    let store = parse(source)?;
    ServerConfig::build(store)
}
