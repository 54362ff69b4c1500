//! Typed side-channel state attached to core runtime entities.
//!
//! Feature units register named [`ExtensionItem`]s with the
//! [`ExtensionRegistry`] at load time and use them to attach payloads to
//! [`Extensible`] entities at runtime. Syncable items also define how their
//! payload travels to linked servers (see [`sync`]).

pub mod codec;
pub mod entity;
pub mod error;
pub mod item;
pub mod registry;
pub mod sync;

use std::fmt;

pub use codec::SyncValue;
pub use entity::{EntityWalker, Extensible};
pub use error::{DecodeError, ExtensionError};
pub use item::ExtensionItem;
pub use registry::{ExtensionDescriptor, ExtensionHandle, ExtensionId, ExtensionRegistry};
pub use sync::{SyncOutcome, SyncToken};

/// Which kind of runtime object an extension may attach to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    User,
    Channel,
    Membership,
    Server,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EntityKind::User => "user",
            EntityKind::Channel => "channel",
            EntityKind::Membership => "membership",
            EntityKind::Server => "server",
        };
        f.write_str(s)
    }
}
