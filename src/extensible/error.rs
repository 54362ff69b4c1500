use super::EntityKind;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtensionError {
    /// Another feature unit already owns this extension name.
    #[error("extension '{name}' is already registered by {owner}")]
    NameCollision { name: String, owner: String },
    #[error("extension '{name}' attaches to {expected} entities, not {actual}")]
    WrongEntityKind {
        name: String,
        expected: EntityKind,
        actual: EntityKind,
    },
    #[error("extension '{name}' is no longer registered")]
    Unregistered { name: String },
    #[error("extension '{name}' stores {stored}, not {requested}")]
    TypeMismatch {
        name: String,
        stored: &'static str,
        requested: &'static str,
    },
    #[error("no extension named '{name}'")]
    NotFound { name: String },
}

/// A peer-sync value that could not be decoded. Peers are not trusted to run
/// identical code, so this is always recoverable: the token is dropped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("empty value")]
    Empty,
    #[error("invalid flag '{0}'")]
    InvalidFlag(char),
    #[error("invalid escape sequence '\\{0}'")]
    InvalidEscape(char),
    #[error("{0}")]
    Malformed(String),
}
