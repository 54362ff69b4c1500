//! # ircd-core
//!
//! Core state of an IRC server daemon: administrator configuration, typed
//! extension state on runtime entities, and the hook pipeline through which
//! feature units take part in core decisions.
//!
//! ## Design Principles
//! * Readers never block: the current configuration is an immutable snapshot
//!   swapped atomically on reload.
//! * Feature units own what they register. Unloading one removes its
//!   extensions (sweeping every entity) and its listener bindings.
//! * Peer servers are not trusted to run identical code. Malformed or
//!   unknown peer-sync tokens are logged and dropped, never fatal.
//! * Event-driven instrumentation (JSON line log + console).
//!
//! ## Key Modules
//! * `config` – Tagged configuration format, snapshots and reload lifecycle.
//! * `extensible` – Extension registry, typed items and peer-sync encoding.
//! * `pipeline` – Priority-ordered listeners with Continue/Deny/Allow/Override verdicts.
//! * `module_host` – Loading and unloading of feature units.
//! * `entities` – Users, channels, memberships, servers and reply records.
//! * `modules` – Feature units shipped with the core (`sslinfo`).
//! * `events` – Structured logging/events dispatcher.

pub mod config;
pub mod constants;
pub mod entities;
pub mod events;
pub mod extensible;
pub mod module_host;
pub mod modules;
pub mod pipeline;
pub mod prelude; // curated stable-intent re-exports
