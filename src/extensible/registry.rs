// src/extensible/registry.rs
// Process-wide catalog of extension descriptors.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use super::codec::{ErasedCodec, SyncValue, TypedCodec};
use super::entity::{EntityWalker, Extensible, Payload};
use super::error::{DecodeError, ExtensionError};
use super::item::ExtensionItem;
use super::EntityKind;
use crate::emit_extension_event;
use crate::events::model::LogLevel;
use crate::module_host::ModuleId;

/// Process-local identity of a descriptor. Never reused, never sent to peers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExtensionId(u64);

pub struct ExtensionDescriptor {
    id: ExtensionId,
    name: String,
    kind: EntityKind,
    owner: ModuleId,
    type_id: TypeId,
    type_name: &'static str,
    codec: Option<Box<dyn ErasedCodec>>,
    registered: AtomicBool,
}

/// Shared reference to a registered descriptor.
pub type ExtensionHandle = Arc<ExtensionDescriptor>;

impl ExtensionDescriptor {
    pub fn id(&self) -> ExtensionId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn owner(&self) -> &ModuleId {
        &self.owner
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Whether values of this extension are propagated to linked servers.
    pub fn is_syncable(&self) -> bool {
        self.codec.is_some()
    }

    pub fn is_registered(&self) -> bool {
        self.registered.load(Ordering::Acquire)
    }

    pub(crate) fn encode_payload(&self, value: &(dyn Any + Send + Sync)) -> Option<String> {
        self.codec.as_ref()?.encode(value)
    }

    pub(crate) fn decode_payload(&self, raw: &str) -> Option<Result<Payload, DecodeError>> {
        self.codec.as_ref().map(|c| c.decode(raw))
    }

    pub(crate) fn check_kind(&self, entity: &Extensible) -> Result<(), ExtensionError> {
        if entity.kind() != self.kind {
            return Err(ExtensionError::WrongEntityKind {
                name: self.name.clone(),
                expected: self.kind,
                actual: entity.kind(),
            });
        }
        if !self.is_registered() {
            return Err(ExtensionError::Unregistered {
                name: self.name.clone(),
            });
        }
        Ok(())
    }
}

impl std::fmt::Debug for ExtensionDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionDescriptor")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("owner", &self.owner)
            .field("type", &self.type_name)
            .field("syncable", &self.is_syncable())
            .field("registered", &self.is_registered())
            .finish()
    }
}

#[derive(Default)]
pub struct ExtensionRegistry {
    by_name: RwLock<HashMap<String, ExtensionHandle>>,
    next_id: AtomicU64,
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a local-only extension.
    pub fn register<T: Send + Sync + 'static>(
        &self,
        name: &str,
        kind: EntityKind,
        owner: &ModuleId,
    ) -> Result<ExtensionItem<T>, ExtensionError> {
        self.insert::<T>(name, kind, owner, None)
    }

    /// Register an extension whose values are propagated to peers.
    pub fn register_synced<T: SyncValue>(
        &self,
        name: &str,
        kind: EntityKind,
        owner: &ModuleId,
    ) -> Result<ExtensionItem<T>, ExtensionError> {
        self.insert::<T>(name, kind, owner, Some(Box::new(TypedCodec::<T>::new())))
    }

    fn insert<T: Send + Sync + 'static>(
        &self,
        name: &str,
        kind: EntityKind,
        owner: &ModuleId,
        codec: Option<Box<dyn ErasedCodec>>,
    ) -> Result<ExtensionItem<T>, ExtensionError> {
        let mut map = self.by_name.write();
        if let Some(existing) = map.get(name) {
            emit_extension_event!(
                LogLevel::Warn,
                "collision",
                name,
                Some(owner.to_string()),
                Some(format!("already owned by {}", existing.owner()))
            );
            return Err(ExtensionError::NameCollision {
                name: name.to_string(),
                owner: existing.owner().to_string(),
            });
        }
        let descriptor = Arc::new(ExtensionDescriptor {
            id: ExtensionId(self.next_id.fetch_add(1, Ordering::Relaxed)),
            name: name.to_string(),
            kind,
            owner: owner.clone(),
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            codec,
            registered: AtomicBool::new(true),
        });
        map.insert(name.to_string(), descriptor.clone());
        emit_extension_event!(
            LogLevel::Debug,
            "registered",
            name,
            Some(owner.to_string()),
            Some(format!("kind={} syncable={}", kind, descriptor.is_syncable()))
        );
        Ok(ExtensionItem::bind(descriptor))
    }

    pub fn find_by_name(&self, name: &str) -> Option<ExtensionHandle> {
        self.by_name.read().get(name).cloned()
    }

    /// Typed accessor for an extension registered elsewhere.
    pub fn item<T: Send + Sync + 'static>(
        &self,
        name: &str,
    ) -> Result<ExtensionItem<T>, ExtensionError> {
        let handle = self
            .find_by_name(name)
            .ok_or_else(|| ExtensionError::NotFound {
                name: name.to_string(),
            })?;
        if handle.type_id != TypeId::of::<T>() {
            return Err(ExtensionError::TypeMismatch {
                name: name.to_string(),
                stored: handle.type_name,
                requested: std::any::type_name::<T>(),
            });
        }
        Ok(ExtensionItem::bind(handle))
    }

    /// Remove a descriptor and sweep its payload from every entity.
    /// Returns the number of payloads released; `None` if it was not registered.
    pub fn unregister(
        &self,
        handle: &ExtensionHandle,
        entities: &mut dyn EntityWalker,
    ) -> Option<usize> {
        {
            let mut map = self.by_name.write();
            match map.get(handle.name()) {
                Some(current) if Arc::ptr_eq(current, handle) => {
                    map.remove(handle.name());
                }
                _ => return None,
            }
        }
        handle.registered.store(false, Ordering::Release);
        let id = handle.id();
        let mut swept = 0usize;
        entities.walk(handle.kind(), &mut |ext: &mut Extensible| {
            if ext.unset_raw(id).is_some() {
                swept += 1;
            }
        });
        emit_extension_event!(
            LogLevel::Debug,
            "unregistered",
            handle.name(),
            Some(handle.owner().to_string()),
            Some(format!("swept={}", swept))
        );
        Some(swept)
    }

    /// Unregister everything owned by `owner` (feature-unit unload).
    /// Returns the names that were removed.
    pub fn unregister_owner(
        &self,
        owner: &ModuleId,
        entities: &mut dyn EntityWalker,
    ) -> Vec<String> {
        let owned: Vec<ExtensionHandle> = self
            .by_name
            .read()
            .values()
            .filter(|d| d.owner() == owner)
            .cloned()
            .collect();
        owned
            .into_iter()
            .filter_map(|h| self.unregister(&h, entities).map(|_| h.name().to_string()))
            .collect()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.by_name.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Names of peer-syncable extensions, sorted.
    pub fn syncable_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .by_name
            .read()
            .values()
            .filter(|d| d.is_syncable())
            .map(|d| d.name().to_string())
            .collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.by_name.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
