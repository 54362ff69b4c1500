use std::marker::PhantomData;

use super::entity::Extensible;
use super::error::ExtensionError;
use super::registry::ExtensionHandle;

/// Typed view of one registered extension.
///
/// Only the registry hands these out, so the stored payload type always
/// matches `T`; the downcast in `get`/`unset` is the single checked point
/// where the opaque slot becomes typed again.
pub struct ExtensionItem<T> {
    handle: ExtensionHandle,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for ExtensionItem<T> {
    fn clone(&self) -> Self {
        Self {
            handle: self.handle.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> std::fmt::Debug for ExtensionItem<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ExtensionItem").field(&self.handle).finish()
    }
}

impl<T: Send + Sync + 'static> ExtensionItem<T> {
    pub(crate) fn bind(handle: ExtensionHandle) -> Self {
        Self {
            handle,
            _marker: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        self.handle.name()
    }

    pub fn handle(&self) -> &ExtensionHandle {
        &self.handle
    }

    pub fn get<'e>(&self, entity: &'e Extensible) -> Option<&'e T> {
        entity.get_raw(self.handle.id())?.downcast_ref::<T>()
    }

    /// Store `value`, dropping whatever was there before.
    pub fn set(&self, entity: &mut Extensible, value: T) -> Result<(), ExtensionError> {
        self.handle.check_kind(entity)?;
        entity.set_raw(&self.handle, Box::new(value));
        Ok(())
    }

    /// Remove the payload and hand ownership back to the caller.
    pub fn unset(&self, entity: &mut Extensible) -> Option<T> {
        let raw = entity.unset_raw(self.handle.id())?;
        if !self.handle.is_registered() {
            return None;
        }
        raw.downcast::<T>().ok().map(|b| *b)
    }
}
