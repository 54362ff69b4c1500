//! Central place for application-wide constants and default values.

/// Left padding used to align console log lines.
pub const ICON_PLACEHOLDER: &str = "   ";

/// Name used when the configuration does not provide a network name.
pub const DEFAULT_NETWORK_NAME: &str = "Network";

/// Default configuration file read by the daemon binaries.
pub const DEFAULT_CONFIG_PATH: &str = "conf/ircd.conf";

/// Peer-sync protocol version advertised in EXTSYNC (bump when the token format changes).
pub const SYNC_PROTOCOL_VERSION: u32 = 1;

/// Maximum nesting of `<include>` tags before the parser gives up.
pub const MAX_INCLUDE_DEPTH: usize = 16;

/// Application / crate version (populated from Cargo.toml via env! macro)
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Human friendly composite version string used in logs.
pub fn full_version() -> String {
    format!("v{} (sync={})", APP_VERSION, SYNC_PROTOCOL_VERSION)
}
