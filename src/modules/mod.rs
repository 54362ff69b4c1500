//! Feature units shipped with the core.

pub mod sslinfo;

pub use sslinfo::SslInfoModule;
