use std::fmt;

/// File and line a configuration tag (or error) originates from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceLocation {
    pub file: String,
    pub line: usize,
}

impl SourceLocation {
    pub fn new(file: impl Into<String>, line: usize) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// Everything that can go wrong while reading, validating or installing a
/// configuration snapshot. None of these are fatal to a running daemon.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Malformed configuration syntax.
    #[error("{location}: {message}")]
    Parse {
        location: SourceLocation,
        message: String,
    },
    /// Structurally invalid value or cross-reference.
    #[error("{location}: {message}")]
    Validation {
        location: SourceLocation,
        message: String,
    },
    #[error("{location}: <{tag}> is missing the required key '{key}'")]
    MissingKey {
        location: SourceLocation,
        tag: String,
        key: String,
    },
    #[error("{location}: <{tag}:{key}> {message}")]
    InvalidValue {
        location: SourceLocation,
        tag: String,
        key: String,
        message: String,
    },
    #[error("a configuration reload is already in progress")]
    ReloadInProgress,
    #[error("unable to read '{path}': {message}")]
    Io { path: String, message: String },
}

impl ConfigError {
    pub fn parse(location: SourceLocation, message: impl Into<String>) -> Self {
        ConfigError::Parse {
            location,
            message: message.into(),
        }
    }

    pub fn validation(location: SourceLocation, message: impl Into<String>) -> Self {
        ConfigError::Validation {
            location,
            message: message.into(),
        }
    }

    pub fn location(&self) -> Option<&SourceLocation> {
        match self {
            ConfigError::Parse { location, .. }
            | ConfigError::Validation { location, .. }
            | ConfigError::MissingKey { location, .. }
            | ConfigError::InvalidValue { location, .. } => Some(location),
            ConfigError::ReloadInProgress | ConfigError::Io { .. } => None,
        }
    }
}
