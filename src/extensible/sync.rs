// src/extensible/sync.rs
// Peer-sync wire records: `<extension-name> <encoded-value>` tokens.
//
// Extensions are named by string on the wire; process-local ids never leave
// this server. Unknown names are logged and dropped so peers running extra
// feature units stay compatible.

use std::fmt;

use super::entity::Extensible;
use super::error::DecodeError;
use super::registry::ExtensionRegistry;
use crate::constants::SYNC_PROTOCOL_VERSION;
use crate::emit_extension_event;
use crate::events::model::LogLevel;

/// One extension value as exchanged between servers. `value == None` asks
/// the receiver to remove its copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncToken {
    pub name: String,
    pub value: Option<String>,
}

impl SyncToken {
    pub fn set(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
        }
    }

    pub fn remove(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
        }
    }

    /// `name value` sets (the value may be empty), a bare `name` removes.
    pub fn parse(raw: &str) -> Result<Self, DecodeError> {
        let (name, value) = match raw.split_once(' ') {
            Some((name, value)) => (name, Some(value.to_string())),
            None => (raw, None),
        };
        if name.is_empty() {
            return Err(DecodeError::Empty);
        }
        if name.contains(['\n', '\r']) || value.as_deref().is_some_and(|v| v.contains(['\n', '\r'])) {
            return Err(DecodeError::Malformed("token spans more than one line".into()));
        }
        Ok(Self {
            name: name.to_string(),
            value,
        })
    }
}

impl fmt::Display for SyncToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{} {}", self.name, value),
            None => write!(f, "{}", self.name),
        }
    }
}

/// What happened to one incoming token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Applied,
    Removed,
    /// No local feature unit knows this name; dropped.
    UnknownExtension,
    /// Known locally but not peer-syncable; dropped.
    LocalOnly,
    /// Registered for another entity kind; dropped.
    WrongKind,
    /// Malformed value; dropped.
    Rejected(DecodeError),
}

/// Encode every syncable extension set on `entity`, sorted by name.
pub fn encode_entity(entity: &Extensible) -> Vec<SyncToken> {
    let mut tokens: Vec<SyncToken> = entity
        .entries()
        .filter_map(|(descriptor, value)| {
            descriptor
                .encode_payload(value)
                .map(|encoded| SyncToken::set(descriptor.name(), encoded))
        })
        .collect();
    tokens.sort_by(|a, b| a.name.cmp(&b.name));
    tokens
}

/// Decode one token from a peer and apply it to `entity`.
pub fn apply_token(
    registry: &ExtensionRegistry,
    entity: &mut Extensible,
    token: &SyncToken,
) -> SyncOutcome {
    let Some(descriptor) = registry.find_by_name(&token.name) else {
        drop_token(token, "unknown extension");
        return SyncOutcome::UnknownExtension;
    };
    if !descriptor.is_syncable() {
        drop_token(token, "extension is not peer-syncable");
        return SyncOutcome::LocalOnly;
    }
    if descriptor.check_kind(entity).is_err() {
        drop_token(token, &format!("extension attaches to {} entities", descriptor.kind()));
        return SyncOutcome::WrongKind;
    }
    let Some(raw) = token.value.as_deref() else {
        entity.unset_raw(descriptor.id());
        return SyncOutcome::Removed;
    };
    match descriptor.decode_payload(raw) {
        Some(Ok(payload)) => {
            entity.set_raw(&descriptor, payload);
            SyncOutcome::Applied
        }
        Some(Err(e)) => {
            drop_token(token, &e.to_string());
            SyncOutcome::Rejected(e)
        }
        None => SyncOutcome::LocalOnly,
    }
}

/// Apply a batch of tokens; returns how many were applied or removed.
pub fn apply_tokens<'t, I>(registry: &ExtensionRegistry, entity: &mut Extensible, tokens: I) -> usize
where
    I: IntoIterator<Item = &'t SyncToken>,
{
    tokens
        .into_iter()
        .map(|t| apply_token(registry, entity, t))
        .filter(|o| matches!(o, SyncOutcome::Applied | SyncOutcome::Removed))
        .count()
}

fn drop_token(token: &SyncToken, reason: &str) {
    emit_extension_event!(
        LogLevel::Warn,
        "sync_dropped",
        token.name,
        None,
        Some(reason.to_string())
    );
}

/// `METADATA <target> <name> :<value>`; removal omits the trailing field.
pub fn metadata_line(target: &str, token: &SyncToken) -> String {
    match &token.value {
        Some(value) => format!("METADATA {} {} :{}", target, token.name, value),
        None => format!("METADATA {} {}", target, token.name),
    }
}

/// Parse a `METADATA` line into its target and token.
pub fn parse_metadata_line(line: &str) -> Result<(String, SyncToken), DecodeError> {
    let line = line.trim_end_matches(['\r', '\n']);
    let rest = line
        .strip_prefix("METADATA ")
        .ok_or_else(|| DecodeError::Malformed("not a METADATA line".into()))?;
    let (head, value) = match rest.split_once(" :") {
        Some((head, value)) => (head, Some(value)),
        None => (rest, None),
    };
    let mut parts = head.split(' ').filter(|p| !p.is_empty());
    let (Some(target), Some(name), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(DecodeError::Malformed(
            "METADATA needs a target and an extension name".into(),
        ));
    };
    let token = match value {
        Some(v) => SyncToken::set(name, v),
        None => SyncToken::remove(name),
    };
    Ok((target.to_string(), token))
}

/// `EXTSYNC <version> <name>...` advertising the local syncable extensions.
pub fn capability_line(registry: &ExtensionRegistry) -> String {
    let mut line = format!("EXTSYNC {}", SYNC_PROTOCOL_VERSION);
    for name in registry.syncable_names() {
        line.push(' ');
        line.push_str(&name);
    }
    line
}

pub fn parse_capability_line(line: &str) -> Result<(u32, Vec<String>), DecodeError> {
    let mut parts = line.split_whitespace();
    if parts.next() != Some("EXTSYNC") {
        return Err(DecodeError::Malformed("not an EXTSYNC line".into()));
    }
    let version = parts
        .next()
        .ok_or(DecodeError::Empty)?
        .parse::<u32>()
        .map_err(|_| DecodeError::Malformed("invalid EXTSYNC version".into()))?;
    Ok((version, parts.map(str::to_string).collect()))
}
