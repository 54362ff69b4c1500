// src/config/tag.rs
// One parsed `<tag key="value">` block and its typed readers.

use super::error::{ConfigError, SourceLocation};
use crate::emit_config_event;
use crate::events::model::LogLevel;

/// An immutable configuration block. Keys keep document order and are
/// matched case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigTag {
    name: String,
    location: SourceLocation,
    items: Vec<(String, String)>,
}

impl ConfigTag {
    pub fn new(
        name: impl Into<String>,
        location: SourceLocation,
        items: Vec<(String, String)>,
    ) -> Self {
        Self {
            name: name.into(),
            location,
            items,
        }
    }

    /// Placeholder handed out for absent tags so lookups fall back to defaults.
    pub fn empty(name: impl Into<String>) -> Self {
        Self::new(name, SourceLocation::new("<unknown>", 0), Vec::new())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn location(&self) -> &SourceLocation {
        &self.location
    }

    pub fn items(&self) -> &[(String, String)] {
        &self.items
    }

    /// "file:line" of the opening `<`.
    pub fn tag_location(&self) -> String {
        self.location.to_string()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.items
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Lenient string read. Embedded newlines are folded into spaces.
    pub fn string(&self, key: &str, default: &str) -> String {
        match self.get(key) {
            Some(v) if v.contains(['\n', '\r']) => {
                self.warn(key, "contains a newline; folded into spaces");
                v.replace(['\r', '\n'], " ")
            }
            Some(v) => v.to_string(),
            None => default.to_string(),
        }
    }

    /// Integer read accepting `k`/`m`/`g` multipliers. Invalid values fall back to `default`.
    pub fn integer(&self, key: &str, default: i64) -> i64 {
        let Some(raw) = self.get(key) else {
            return default;
        };
        match parse_integer(raw) {
            Some(v) => v,
            None => {
                self.warn(key, &format!("'{}' is not a valid integer; using {}", raw, default));
                default
            }
        }
    }

    /// Integer read clamped into `min..=max`; out-of-range values fall back to `default`.
    pub fn integer_in(&self, key: &str, default: i64, min: i64, max: i64) -> i64 {
        let v = self.integer(key, default);
        if v < min || v > max {
            self.warn(
                key,
                &format!("{} is outside {}..={}; using {}", v, min, max, default),
            );
            return default;
        }
        v
    }

    pub fn float(&self, key: &str, default: f64) -> f64 {
        let Some(raw) = self.get(key) else {
            return default;
        };
        match raw.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => v,
            _ => {
                self.warn(key, &format!("'{}' is not a valid number; using {}", raw, default));
                default
            }
        }
    }

    pub fn boolean(&self, key: &str, default: bool) -> bool {
        let Some(raw) = self.get(key) else {
            return default;
        };
        match parse_bool(raw) {
            Some(v) => v,
            None => {
                self.warn(key, &format!("'{}' is not a valid boolean; using {}", raw, default));
                default
            }
        }
    }

    /// Strict string read: absent keys are a `MissingKey` error and, unless
    /// `allow_newline` is set, multi-line values are rejected.
    pub fn read_required_string(&self, key: &str, allow_newline: bool) -> Result<String, ConfigError> {
        let value = self.get(key).ok_or_else(|| ConfigError::MissingKey {
            location: self.location.clone(),
            tag: self.name.clone(),
            key: key.to_string(),
        })?;
        if !allow_newline && value.contains(['\n', '\r']) {
            return Err(ConfigError::InvalidValue {
                location: self.location.clone(),
                tag: self.name.clone(),
                key: key.to_string(),
                message: "must not contain newlines".into(),
            });
        }
        Ok(value.to_string())
    }

    /// Space separated list value; empty when absent.
    pub fn list(&self, key: &str) -> Vec<String> {
        self.get(key)
            .map(|v| v.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default()
    }

    fn warn(&self, key: &str, detail: &str) {
        emit_config_event!(
            LogLevel::Warn,
            "invalid_value",
            Some(self.tag_location()),
            Vec::<String>::new(),
            Some(format!("<{}:{}> {}", self.name, key, detail))
        );
    }
}

pub(crate) fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "yes" | "true" | "on" | "1" => Some(true),
        "no" | "false" | "off" | "0" => Some(false),
        _ => None,
    }
}

pub(crate) fn parse_integer(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    let (digits, multiplier) = match raw.chars().last()?.to_ascii_lowercase() {
        'k' => (&raw[..raw.len() - 1], 1024_i64),
        'm' => (&raw[..raw.len() - 1], 1024 * 1024),
        'g' => (&raw[..raw.len() - 1], 1024 * 1024 * 1024),
        _ => (raw, 1),
    };
    digits.parse::<i64>().ok()?.checked_mul(multiplier)
}
