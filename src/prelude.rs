//! ircd-core public prelude (curated stable-intent exports).
//! Import with: `use ircd_core::prelude::*;`
//!
//! Items here are considered *stable-intent* prior to 1.0.0. Their shape may
//! still adjust minimally until the first tagged release.

pub use crate::config::{
    ConfigDependent, ConfigError, ConfigLifecycle, ConfigSource, ConfigTag, ServerConfig,
};
pub use crate::entities::{Channel, Directory, Membership, Replies, Reply, Server, User};
pub use crate::extensible::{
    DecodeError, EntityKind, Extensible, ExtensionError, ExtensionItem, ExtensionRegistry,
    SyncValue,
};
pub use crate::module_host::{Module, ModuleContext, ModuleId, ModuleManager};
pub use crate::pipeline::{Decision, Event, EventPipeline, Listener, Verdict};
