use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use super::registry::{ExtensionDescriptor, ExtensionId};
use super::EntityKind;

pub(crate) type Payload = Box<dyn Any + Send + Sync>;

struct Slot {
    descriptor: Arc<ExtensionDescriptor>,
    value: Payload,
}

/// Side-channel storage embedded in every extensible runtime object.
///
/// The entity is the sole owner of its payloads; dropping the entity (or
/// unsetting a slot) releases them. Payloads whose descriptor has been
/// unregistered are invisible even before the sweep removes them.
pub struct Extensible {
    kind: EntityKind,
    slots: HashMap<ExtensionId, Slot>,
}

impl Extensible {
    pub fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            slots: HashMap::new(),
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Number of live payloads.
    pub fn len(&self) -> usize {
        self.slots
            .values()
            .filter(|s| s.descriptor.is_registered())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Names of the extensions currently set, sorted.
    pub fn extension_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .slots
            .values()
            .filter(|s| s.descriptor.is_registered())
            .map(|s| s.descriptor.name())
            .collect();
        names.sort_unstable();
        names
    }

    /// Drop every payload.
    pub fn clear(&mut self) {
        self.slots.clear();
    }

    pub(crate) fn get_raw(&self, id: ExtensionId) -> Option<&(dyn Any + Send + Sync)> {
        self.slots
            .get(&id)
            .filter(|s| s.descriptor.is_registered())
            .map(|s| &*s.value)
    }

    pub(crate) fn set_raw(
        &mut self,
        descriptor: &Arc<ExtensionDescriptor>,
        value: Payload,
    ) -> Option<Payload> {
        self.slots
            .insert(
                descriptor.id(),
                Slot {
                    descriptor: descriptor.clone(),
                    value,
                },
            )
            .map(|old| old.value)
    }

    pub(crate) fn unset_raw(&mut self, id: ExtensionId) -> Option<Payload> {
        self.slots.remove(&id).map(|s| s.value)
    }

    /// Live payloads with their descriptors, for peer-sync encoding.
    pub(crate) fn entries(
        &self,
    ) -> impl Iterator<Item = (&Arc<ExtensionDescriptor>, &(dyn Any + Send + Sync))> {
        self.slots
            .values()
            .filter(|s| s.descriptor.is_registered())
            .map(|s| (&s.descriptor, &*s.value))
    }
}

impl std::fmt::Debug for Extensible {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Extensible")
            .field("kind", &self.kind)
            .field("extensions", &self.extension_names())
            .finish()
    }
}

/// Anything that can visit every live entity of a kind. The registry uses
/// this to sweep payloads when an extension is unregistered.
pub trait EntityWalker {
    fn walk(&mut self, kind: EntityKind, visit: &mut dyn FnMut(&mut Extensible));
}

impl EntityWalker for [Extensible] {
    fn walk(&mut self, kind: EntityKind, visit: &mut dyn FnMut(&mut Extensible)) {
        for ext in self.iter_mut().filter(|e| e.kind() == kind) {
            visit(ext);
        }
    }
}

impl EntityWalker for Vec<Extensible> {
    fn walk(&mut self, kind: EntityKind, visit: &mut dyn FnMut(&mut Extensible)) {
        self.as_mut_slice().walk(kind, visit)
    }
}
