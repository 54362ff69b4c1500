// src/config/snapshot.rs
// Immutable, validated server configuration built from a ConfigStore.

use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Arc;

use indexmap::IndexMap;

use super::error::{ConfigError, SourceLocation};
use super::store::ConfigStore;
use super::tag::ConfigTag;
use crate::constants::DEFAULT_NETWORK_NAME;
use crate::events::model::LogLevel;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerIdentity {
    pub name: String,
    pub description: String,
    pub network: String,
    /// Three character server id: a digit followed by two digits/uppercase letters.
    pub sid: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminInfo {
    pub name: String,
    pub email: String,
    pub nick: String,
}

/// Length limits on user-supplied protocol fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerLimits {
    pub max_nick: usize,
    pub max_chan: usize,
    pub max_modes: usize,
    pub max_ident: usize,
    pub max_quit: usize,
    pub max_topic: usize,
    pub max_kick: usize,
    pub max_real: usize,
    pub max_away: usize,
}

impl Default for ServerLimits {
    fn default() -> Self {
        Self {
            max_nick: 31,
            max_chan: 64,
            max_modes: 20,
            max_ident: 12,
            max_quit: 255,
            max_topic: 307,
            max_kick: 255,
            max_real: 128,
            max_away: 200,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CloneRanges {
    pub ipv4: u8,
    pub ipv6: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WhoWasLimits {
    pub group_size: u32,
    pub max_groups: u32,
    pub max_keep_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Performance {
    pub soft_limit: u32,
    pub max_conn: u32,
}

/// Commands hidden from non-opers. `fake_nonexistent` and `notify_opers` are
/// independent toggles; neither is implied by the list being non-empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisabledCommands {
    pub commands: Vec<String>,
    pub fake_nonexistent: bool,
    pub notify_opers: bool,
}

impl DisabledCommands {
    pub fn is_disabled(&self, command: &str) -> bool {
        self.commands.iter().any(|c| c.eq_ignore_ascii_case(command))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerOptions {
    pub hide_splits: bool,
    pub hide_bans: bool,
    pub generic_oper: bool,
    pub syntax_hints: bool,
    pub cycle_hosts: bool,
    pub default_modes: String,
    pub prefix_quit: String,
    pub suffix_quit: String,
    pub fixed_quit: String,
}

/// Event sink settings read from `<log>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub console: bool,
    pub level: LogLevel,
    /// JSON lines event log; disabled when unset.
    pub json_path: Option<String>,
    pub max_bytes: u64,
    pub rotate: u32,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            console: true,
            level: LogLevel::Info,
            json_path: None,
            max_bytes: 5 * 1024 * 1024,
            rotate: 3,
        }
    }
}

/// A `<connect>` class with its parent's keys already folded in.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectClass {
    pub name: String,
    pub parent: Option<String>,
    pub soft_sendq: u64,
    pub hard_sendq: u64,
    /// Effective tag (own keys over inherited ones) for feature-unit specific keys.
    pub config: Arc<ConfigTag>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OperType {
    pub name: String,
    pub classes: Vec<String>,
    /// Union of the commands granted by every referenced `<class>`.
    pub commands: Vec<String>,
    pub config: Arc<ConfigTag>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OperInfo {
    pub name: String,
    pub oper_type: Arc<OperType>,
    pub oper_block: Arc<ConfigTag>,
}

/// One fully validated configuration state. Never mutated after `build`;
/// reloads publish a new instance instead.
#[derive(Debug)]
pub struct ServerConfig {
    store: ConfigStore,
    server: ServerIdentity,
    admin: AdminInfo,
    limits: ServerLimits,
    cidr: CloneRanges,
    whowas: WhoWasLimits,
    performance: Performance,
    disabled: DisabledCommands,
    options: ServerOptions,
    logging: LoggingConfig,
    classes: IndexMap<String, Arc<ConnectClass>>,
    oper_classes: IndexMap<String, Arc<ConfigTag>>,
    oper_types: IndexMap<String, Arc<OperType>>,
    opers: IndexMap<String, Arc<OperInfo>>,
}

impl ServerConfig {
    /// Derive every field from `store` and run the structural cross-checks.
    /// All problems are collected before returning.
    pub fn build(store: ConfigStore) -> Result<Self, Vec<ConfigError>> {
        let mut errors = Vec::new();
        let root = SourceLocation::new(store.source(), 0);

        check_singletons(&store, &mut errors);
        let server = build_identity(&store, &root, &mut errors);
        let admin = {
            let tag = conf_value(&store, "admin");
            AdminInfo {
                name: tag.string("name", ""),
                email: tag.string("email", ""),
                nick: tag.string("nick", ""),
            }
        };
        let limits = build_limits(&store, &mut errors);
        let cidr = {
            let tag = conf_value(&store, "cidr");
            CloneRanges {
                ipv4: tag.integer_in("ipv4clone", 32, 0, 32) as u8,
                ipv6: tag.integer_in("ipv6clone", 128, 0, 128) as u8,
            }
        };
        let whowas = build_whowas(&store, &mut errors);
        let performance = build_performance(&store, &mut errors);
        let disabled = {
            let tag = conf_value(&store, "disabled");
            DisabledCommands {
                commands: tag
                    .list("commands")
                    .into_iter()
                    .map(|c| c.to_ascii_uppercase())
                    .collect(),
                fake_nonexistent: tag.boolean("fakenonexistent", false),
                notify_opers: tag.boolean("notifyopers", false),
            }
        };
        let options = {
            let tag = conf_value(&store, "options");
            ServerOptions {
                hide_splits: tag.boolean("hidesplits", false),
                hide_bans: tag.boolean("hidebans", false),
                generic_oper: tag.boolean("genericoper", false),
                syntax_hints: tag.boolean("syntaxhints", false),
                cycle_hosts: tag.boolean("cyclehosts", true),
                default_modes: tag.string("defaultmodes", "not"),
                prefix_quit: tag.string("prefixquit", ""),
                suffix_quit: tag.string("suffixquit", ""),
                fixed_quit: tag.string("fixedquit", ""),
            }
        };
        let logging = build_logging(&store, &mut errors);
        let classes = build_classes(&store, &mut errors);
        let oper_classes = unique_by_name(&store, "class", &mut errors);
        let oper_types = build_oper_types(&store, &oper_classes, &mut errors);
        let opers = build_opers(&store, &oper_types, &mut errors);

        match server {
            Some(server) if errors.is_empty() => Ok(Self {
                store,
                server,
                admin,
                limits,
                cidr,
                whowas,
                performance,
                disabled,
                options,
                logging,
                classes,
                oper_classes,
                oper_types,
                opers,
            }),
            _ => Err(errors),
        }
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    /// Identifier of the source this snapshot was read from.
    pub fn source(&self) -> &str {
        self.store.source()
    }

    pub fn get_tag(&self, name: &str, index: usize) -> Option<Arc<ConfigTag>> {
        self.store.get_tag(name, index)
    }

    /// First tag called `name`, or an empty tag so readers fall back to defaults.
    pub fn conf_value(&self, name: &str) -> Arc<ConfigTag> {
        conf_value(&self.store, name)
    }

    pub fn server(&self) -> &ServerIdentity {
        &self.server
    }

    pub fn admin(&self) -> &AdminInfo {
        &self.admin
    }

    pub fn limits(&self) -> &ServerLimits {
        &self.limits
    }

    pub fn cidr(&self) -> &CloneRanges {
        &self.cidr
    }

    pub fn whowas(&self) -> &WhoWasLimits {
        &self.whowas
    }

    pub fn performance(&self) -> &Performance {
        &self.performance
    }

    pub fn disabled(&self) -> &DisabledCommands {
        &self.disabled
    }

    pub fn options(&self) -> &ServerOptions {
        &self.options
    }

    pub fn logging(&self) -> &LoggingConfig {
        &self.logging
    }

    pub fn class(&self, name: &str) -> Option<&Arc<ConnectClass>> {
        self.classes.get(&name.to_ascii_lowercase())
    }

    pub fn classes(&self) -> impl Iterator<Item = &Arc<ConnectClass>> {
        self.classes.values()
    }

    pub fn oper_class(&self, name: &str) -> Option<&Arc<ConfigTag>> {
        self.oper_classes.get(&name.to_ascii_lowercase())
    }

    pub fn oper_type(&self, name: &str) -> Option<&Arc<OperType>> {
        self.oper_types.get(&name.to_ascii_lowercase())
    }

    /// Oper block by login name.
    pub fn oper(&self, name: &str) -> Option<&Arc<OperInfo>> {
        self.opers.get(&name.to_ascii_lowercase())
    }

    pub fn opers(&self) -> impl Iterator<Item = &Arc<OperInfo>> {
        self.opers.values()
    }
}

/// Tags that configure one thing for the whole server and may appear once.
pub const SINGLETON_TAGS: &[&str] = &[
    "server",
    "admin",
    "limits",
    "cidr",
    "whowas",
    "performance",
    "disabled",
    "options",
    "log",
    "sslinfo",
];

fn check_singletons(store: &ConfigStore, errors: &mut Vec<ConfigError>) {
    for name in SINGLETON_TAGS {
        let tags = store.tags(name);
        let Some((first, rest)) = tags.split_first() else {
            continue;
        };
        for dup in rest {
            errors.push(ConfigError::validation(
                dup.location().clone(),
                format!(
                    "<{}> may only appear once (first defined at {})",
                    name,
                    first.location()
                ),
            ));
        }
    }
}

fn conf_value(store: &ConfigStore, name: &str) -> Arc<ConfigTag> {
    store
        .get_tag(name, 0)
        .unwrap_or_else(|| Arc::new(ConfigTag::empty(name)))
}

fn build_identity(
    store: &ConfigStore,
    root: &SourceLocation,
    errors: &mut Vec<ConfigError>,
) -> Option<ServerIdentity> {
    let Some(tag) = store.get_tag("server", 0) else {
        errors.push(ConfigError::validation(
            root.clone(),
            "missing <server> tag",
        ));
        return None;
    };
    let name = tag.read_required_string("name", false);
    let sid = tag.read_required_string("id", false);
    let (name, sid) = match (name, sid) {
        (Ok(name), Ok(sid)) => (name, sid),
        (name, sid) => {
            errors.extend(name.err());
            errors.extend(sid.err());
            return None;
        }
    };
    if !name.contains('.') || name.contains(char::is_whitespace) {
        errors.push(ConfigError::InvalidValue {
            location: tag.location().clone(),
            tag: "server".into(),
            key: "name".into(),
            message: format!("'{}' is not a valid server name", name),
        });
    }
    if !valid_sid(&sid) {
        errors.push(ConfigError::InvalidValue {
            location: tag.location().clone(),
            tag: "server".into(),
            key: "id".into(),
            message: format!("'{}' must be a digit followed by two digits or uppercase letters", sid),
        });
    }
    Some(ServerIdentity {
        description: tag.string("description", &name),
        network: tag.string("network", DEFAULT_NETWORK_NAME),
        name,
        sid,
    })
}

fn valid_sid(sid: &str) -> bool {
    let b = sid.as_bytes();
    b.len() == 3
        && b[0].is_ascii_digit()
        && b[1..]
            .iter()
            .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase())
}

fn positive(
    tag: &ConfigTag,
    key: &str,
    default: i64,
    errors: &mut Vec<ConfigError>,
) -> i64 {
    let v = tag.integer(key, default);
    if v <= 0 {
        errors.push(ConfigError::InvalidValue {
            location: tag.location().clone(),
            tag: tag.name().to_string(),
            key: key.to_string(),
            message: format!("must be positive (got {})", v),
        });
        return default;
    }
    v
}

/// [`positive`], additionally rejecting values that do not fit in a `u32`.
fn positive_u32(tag: &ConfigTag, key: &str, default: u32, errors: &mut Vec<ConfigError>) -> u32 {
    let v = positive(tag, key, i64::from(default), errors);
    u32::try_from(v).unwrap_or_else(|_| {
        errors.push(ConfigError::InvalidValue {
            location: tag.location().clone(),
            tag: tag.name().to_string(),
            key: key.to_string(),
            message: format!("must not exceed {} (got {})", u32::MAX, v),
        });
        default
    })
}

fn build_limits(store: &ConfigStore, errors: &mut Vec<ConfigError>) -> ServerLimits {
    let tag = conf_value(store, "limits");
    let d = ServerLimits::default();
    let mut read = |key: &str, default: usize| positive(&tag, key, default as i64, errors) as usize;
    ServerLimits {
        max_nick: read("maxnick", d.max_nick),
        max_chan: read("maxchan", d.max_chan),
        max_modes: read("maxmodes", d.max_modes),
        max_ident: read("maxident", d.max_ident),
        max_quit: read("maxquit", d.max_quit),
        max_topic: read("maxtopic", d.max_topic),
        max_kick: read("maxkick", d.max_kick),
        max_real: read("maxreal", d.max_real),
        max_away: read("maxaway", d.max_away),
    }
}

fn build_whowas(store: &ConfigStore, errors: &mut Vec<ConfigError>) -> WhoWasLimits {
    let tag = conf_value(store, "whowas");
    let group_size = positive_u32(&tag, "groupsize", 10, errors);
    let max_groups = positive_u32(&tag, "maxgroups", 10240, errors);
    let max_keep_secs = positive(&tag, "maxkeep", 3600, errors) as u64;
    if group_size > max_groups {
        errors.push(ConfigError::validation(
            tag.location().clone(),
            format!(
                "<whowas:groupsize> ({}) must not exceed <whowas:maxgroups> ({})",
                group_size, max_groups
            ),
        ));
    }
    WhoWasLimits {
        group_size,
        max_groups,
        max_keep_secs,
    }
}

fn build_performance(store: &ConfigStore, errors: &mut Vec<ConfigError>) -> Performance {
    let tag = conf_value(store, "performance");
    Performance {
        soft_limit: positive_u32(&tag, "softlimit", 1024, errors),
        max_conn: positive_u32(&tag, "somaxconn", 128, errors),
    }
}

fn build_logging(store: &ConfigStore, errors: &mut Vec<ConfigError>) -> LoggingConfig {
    let tag = conf_value(store, "log");
    let d = LoggingConfig::default();
    let level = match tag.get("level") {
        Some(raw) => LogLevel::from_str(raw).unwrap_or_else(|_| {
            errors.push(ConfigError::InvalidValue {
                location: tag.location().clone(),
                tag: "log".into(),
                key: "level".into(),
                message: format!("unknown log level '{}'", raw),
            });
            d.level
        }),
        None => d.level,
    };
    LoggingConfig {
        console: tag.boolean("console", d.console),
        level,
        json_path: tag.get("path").map(str::to_string),
        max_bytes: positive(&tag, "maxbytes", d.max_bytes as i64, errors) as u64,
        rotate: tag.integer_in("rotate", d.rotate as i64, 0, 100) as u32,
    }
}

/// Index tags by their `name` key, rejecting missing and duplicate names.
fn unique_by_name(
    store: &ConfigStore,
    tag_name: &str,
    errors: &mut Vec<ConfigError>,
) -> IndexMap<String, Arc<ConfigTag>> {
    let mut index: IndexMap<String, Arc<ConfigTag>> = IndexMap::new();
    for tag in store.tags(tag_name) {
        let name = match tag.read_required_string("name", false) {
            Ok(name) => name,
            Err(e) => {
                errors.push(e);
                continue;
            }
        };
        let key = name.to_ascii_lowercase();
        if let Some(existing) = index.get(&key) {
            errors.push(ConfigError::validation(
                tag.location().clone(),
                format!(
                    "duplicate <{} name=\"{}\"> (first defined at {})",
                    tag_name,
                    name,
                    existing.tag_location()
                ),
            ));
            continue;
        }
        index.insert(key, tag.clone());
    }
    index
}

fn build_classes(
    store: &ConfigStore,
    errors: &mut Vec<ConfigError>,
) -> IndexMap<String, Arc<ConnectClass>> {
    let raw = unique_by_name(store, "connect", errors);
    let mut out = IndexMap::new();
    for (key, tag) in &raw {
        // Walk the parent chain, nearest first.
        let mut chain: Vec<&Arc<ConfigTag>> = vec![tag];
        let mut seen: HashSet<&str> = HashSet::from([key.as_str()]);
        let mut broken = false;
        let mut cursor = tag;
        while let Some(parent) = cursor.get("parent") {
            let parent_key = parent.to_ascii_lowercase();
            let Some((parent_key, parent_tag)) = raw.get_key_value(&parent_key) else {
                errors.push(ConfigError::validation(
                    cursor.location().clone(),
                    format!(
                        "<connect name=\"{}\"> references undefined parent class '{}'",
                        cursor.string("name", ""),
                        parent
                    ),
                ));
                broken = true;
                break;
            };
            if !seen.insert(parent_key.as_str()) {
                errors.push(ConfigError::validation(
                    tag.location().clone(),
                    format!("connect class '{}' has a cyclic parent chain", key),
                ));
                broken = true;
                break;
            }
            chain.push(parent_tag);
            cursor = parent_tag;
        }
        if broken {
            continue;
        }

        // Root-most first so nearer definitions override inherited keys.
        let mut items: Vec<(String, String)> = Vec::new();
        for t in chain.iter().rev() {
            for (k, v) in t.items() {
                match items.iter_mut().find(|(ek, _)| ek.eq_ignore_ascii_case(k)) {
                    Some(slot) => slot.1 = v.clone(),
                    None => items.push((k.clone(), v.clone())),
                }
            }
        }
        let effective = Arc::new(ConfigTag::new("connect", tag.location().clone(), items));
        let soft_sendq = positive(&effective, "softsendq", 8192, errors) as u64;
        let hard_sendq = positive(&effective, "hardsendq", 1024 * 1024, errors) as u64;
        if soft_sendq > hard_sendq {
            errors.push(ConfigError::validation(
                tag.location().clone(),
                format!(
                    "connect class '{}': softsendq ({}) exceeds hardsendq ({})",
                    key, soft_sendq, hard_sendq
                ),
            ));
        }
        out.insert(
            key.clone(),
            Arc::new(ConnectClass {
                name: tag.string("name", key),
                parent: tag.get("parent").map(str::to_string),
                soft_sendq,
                hard_sendq,
                config: effective,
            }),
        );
    }
    out
}

fn build_oper_types(
    store: &ConfigStore,
    oper_classes: &IndexMap<String, Arc<ConfigTag>>,
    errors: &mut Vec<ConfigError>,
) -> IndexMap<String, Arc<OperType>> {
    let raw = unique_by_name(store, "type", errors);
    let mut out = IndexMap::new();
    for (key, tag) in raw {
        let classes = tag.list("classes");
        let mut commands: Vec<String> = Vec::new();
        for class in &classes {
            match oper_classes.get(&class.to_ascii_lowercase()) {
                Some(class_tag) => {
                    for cmd in class_tag.list("commands") {
                        let cmd = cmd.to_ascii_uppercase();
                        if !commands.contains(&cmd) {
                            commands.push(cmd);
                        }
                    }
                }
                None => errors.push(ConfigError::validation(
                    tag.location().clone(),
                    format!(
                        "oper type '{}' references undefined class '{}'",
                        tag.string("name", &key),
                        class
                    ),
                )),
            }
        }
        out.insert(
            key.clone(),
            Arc::new(OperType {
                name: tag.string("name", &key),
                classes,
                commands,
                config: tag,
            }),
        );
    }
    out
}

fn build_opers(
    store: &ConfigStore,
    oper_types: &IndexMap<String, Arc<OperType>>,
    errors: &mut Vec<ConfigError>,
) -> IndexMap<String, Arc<OperInfo>> {
    let raw = unique_by_name(store, "oper", errors);
    let mut out = IndexMap::new();
    for (key, tag) in raw {
        let type_name = match tag.read_required_string("type", false) {
            Ok(t) => t,
            Err(e) => {
                errors.push(e);
                continue;
            }
        };
        let Some(oper_type) = oper_types.get(&type_name.to_ascii_lowercase()) else {
            errors.push(ConfigError::validation(
                tag.location().clone(),
                format!(
                    "oper '{}' references undefined type '{}'",
                    tag.string("name", &key),
                    type_name
                ),
            ));
            continue;
        };
        out.insert(
            key.clone(),
            Arc::new(OperInfo {
                name: tag.string("name", &key),
                oper_type: oper_type.clone(),
                oper_block: tag,
            }),
        );
    }
    out
}
