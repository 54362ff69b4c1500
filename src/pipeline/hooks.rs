// src/pipeline/hooks.rs
// Per-kind binding lists behind a type-erased map.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use super::{Decision, Event, Listener, Verdict};
use crate::events::dispatcher::{emit, meta};
use crate::events::model::{HookEvent, LogEvent, LogLevel};
use crate::module_host::ModuleId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingId(u64);

struct Binding<E: Event> {
    id: BindingId,
    owner: ModuleId,
    priority: i32,
    listener: Arc<dyn Listener<E>>,
}

impl<E: Event> Clone for Binding<E> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            owner: self.owner.clone(),
            priority: self.priority,
            listener: self.listener.clone(),
        }
    }
}

/// Copy-on-write binding list for one event kind.
struct HookList<E: Event> {
    bindings: RwLock<Arc<Vec<Binding<E>>>>,
}

impl<E: Event> HookList<E> {
    fn new() -> Self {
        Self {
            bindings: RwLock::new(Arc::new(Vec::new())),
        }
    }

    fn snapshot(&self) -> Arc<Vec<Binding<E>>> {
        self.bindings.read().clone()
    }

    fn insert(&self, binding: Binding<E>) {
        let mut guard = self.bindings.write();
        let mut next: Vec<Binding<E>> = guard.as_ref().clone();
        // Ids grow monotonically, so placing after every binding of equal or
        // higher priority keeps registration order among equals.
        let pos = next.partition_point(|b| b.priority >= binding.priority);
        next.insert(pos, binding);
        *guard = Arc::new(next);
    }

    fn retain(&self, keep: impl Fn(&Binding<E>) -> bool) -> usize {
        let mut guard = self.bindings.write();
        let before = guard.len();
        if guard.iter().all(&keep) {
            return 0;
        }
        let next: Vec<Binding<E>> = guard.iter().filter(|b| keep(*b)).cloned().collect();
        let removed = before - next.len();
        *guard = Arc::new(next);
        removed
    }
}

trait ErasedHooks: Send + Sync {
    fn name(&self) -> &'static str;
    fn len(&self) -> usize;
    fn remove_binding(&self, id: BindingId) -> bool;
    fn remove_owner(&self, owner: &ModuleId) -> usize;
    fn as_any(&self) -> &dyn Any;
}

impl<E: Event> ErasedHooks for HookList<E> {
    fn name(&self) -> &'static str {
        E::NAME
    }

    fn len(&self) -> usize {
        self.bindings.read().len()
    }

    fn remove_binding(&self, id: BindingId) -> bool {
        self.retain(|b| b.id != id) > 0
    }

    fn remove_owner(&self, owner: &ModuleId) -> usize {
        self.retain(|b| &b.owner != owner)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Registry of listener lists, one per event kind.
#[derive(Default)]
pub struct EventPipeline {
    hooks: RwLock<HashMap<TypeId, Arc<dyn ErasedHooks>>>,
    next_id: AtomicU64,
}

impl EventPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `listener` to `E`. Higher priorities run first; equal priorities
    /// run in bind order.
    pub fn bind<E: Event>(
        &self,
        owner: &ModuleId,
        priority: i32,
        listener: Arc<dyn Listener<E>>,
    ) -> BindingId {
        let id = BindingId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let list = {
            let mut hooks = self.hooks.write();
            hooks
                .entry(TypeId::of::<E>())
                .or_insert_with(|| Arc::new(HookList::<E>::new()) as Arc<dyn ErasedHooks>)
                .clone()
        };
        if let Some(list) = list.as_any().downcast_ref::<HookList<E>>() {
            list.insert(Binding {
                id,
                owner: owner.clone(),
                priority,
                listener,
            });
        }
        emit_hook(LogLevel::Debug, E::NAME, "bound", Some(owner), Some(format!("priority={}", priority)));
        id
    }

    /// Remove one binding. Returns false if it was already gone.
    pub fn unbind(&self, id: BindingId) -> bool {
        let lists: Vec<Arc<dyn ErasedHooks>> = self.hooks.read().values().cloned().collect();
        for list in lists {
            if list.remove_binding(id) {
                emit_hook(LogLevel::Debug, list.name(), "unbound", None, None);
                return true;
            }
        }
        false
    }

    /// Remove every binding made by `owner`; returns how many were removed.
    pub fn unbind_owner(&self, owner: &ModuleId) -> usize {
        let lists: Vec<Arc<dyn ErasedHooks>> = self.hooks.read().values().cloned().collect();
        let mut removed = 0;
        for list in lists {
            let n = list.remove_owner(owner);
            if n > 0 {
                emit_hook(LogLevel::Debug, list.name(), "unbound", Some(owner), Some(format!("count={}", n)));
            }
            removed += n;
        }
        removed
    }

    pub fn listener_count<E: Event>(&self) -> usize {
        self.hooks
            .read()
            .get(&TypeId::of::<E>())
            .map(|l| l.len())
            .unwrap_or(0)
    }

    /// Names of event kinds that currently have listeners, sorted.
    pub fn kinds(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self
            .hooks
            .read()
            .values()
            .filter(|l| l.len() > 0)
            .map(|l| l.name())
            .collect();
        names.sort_unstable();
        names
    }

    fn snapshot<E: Event>(&self) -> Option<Arc<Vec<Binding<E>>>> {
        let list = self.hooks.read().get(&TypeId::of::<E>())?.clone();
        let snapshot = list.as_any().downcast_ref::<HookList<E>>()?.snapshot();
        Some(snapshot)
    }

    /// Run the listeners bound to `E` over `payload`.
    pub fn raise<'a, E: Event>(&self, payload: &mut E::Payload<'a>) -> Decision {
        let Some(bindings) = self.snapshot::<E>() else {
            return Decision::Passthru;
        };
        for binding in bindings.iter() {
            match binding.listener.on_event(payload) {
                Verdict::Continue => {}
                Verdict::Override(next) => *payload = next,
                Verdict::Allow => return Decision::Allow,
                Verdict::Deny => {
                    emit_hook(LogLevel::Debug, E::NAME, "denied", Some(&binding.owner), None);
                    return Decision::Deny;
                }
            }
        }
        Decision::Passthru
    }
}

fn emit_hook(
    level: LogLevel,
    event: &'static str,
    action: &str,
    owner: Option<&ModuleId>,
    detail: Option<String>,
) {
    emit(LogEvent::Hook(HookEvent {
        meta: meta("hooks", level),
        event,
        action: action.to_string(),
        owner: owner.map(ToString::to_string),
        detail,
    }));
}
