//! Administrator configuration: the tagged key/value format, immutable
//! snapshots derived from it, and the reload lifecycle that swaps them.

pub mod error;
pub mod lifecycle;
pub mod parser;
pub mod snapshot;
pub mod store;
pub mod tag;

pub use error::{ConfigError, SourceLocation};
pub use lifecycle::{ConfigDependent, ConfigLifecycle, DependentId};
pub use parser::{parse, ConfigSource};
pub use snapshot::{
    AdminInfo, CloneRanges, ConnectClass, DisabledCommands, LoggingConfig, OperInfo, OperType,
    Performance, ServerConfig, ServerIdentity, ServerLimits, ServerOptions, WhoWasLimits,
};
pub use store::ConfigStore;
pub use tag::ConfigTag;
