// src/config/parser.rs
// Tokenizer for the `<tag key="value">` configuration format.
//
// The parser never stops at the first problem: every error is recorded with
// its file and line, the scanner resynchronises at the next `>` and carries on.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::error::{ConfigError, SourceLocation};
use super::store::ConfigStore;
use super::tag::ConfigTag;
use crate::constants::MAX_INCLUDE_DEPTH;

/// Raw configuration text plus the identifier used in error messages.
#[derive(Debug, Clone)]
pub struct ConfigSource {
    name: String,
    text: String,
    base_dir: Option<PathBuf>,
}

impl ConfigSource {
    /// In-memory source. `<include>` is rejected unless a base directory is set.
    pub fn from_text(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
            base_dir: None,
        }
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Ok(Self {
            name: path.display().to_string(),
            text,
            base_dir: path.parent().map(Path::to_path_buf),
        })
    }

    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Parse a source into a tag store, accumulating every error encountered.
pub fn parse(source: &ConfigSource) -> Result<ConfigStore, Vec<ConfigError>> {
    let mut parser = Parser::default();
    parser.parse_file(
        &source.name,
        &source.text,
        source.base_dir.as_deref(),
        0,
    );
    if parser.errors.is_empty() {
        Ok(ConfigStore::from_tags(&source.name, parser.tags))
    } else {
        Err(parser.errors)
    }
}

#[derive(Default)]
struct Parser {
    tags: Vec<Arc<ConfigTag>>,
    defines: HashMap<String, String>,
    errors: Vec<ConfigError>,
}

struct Cursor<'a> {
    file: &'a str,
    chars: Vec<char>,
    pos: usize,
    line: usize,
}

impl<'a> Cursor<'a> {
    fn new(file: &'a str, text: &str) -> Self {
        Self {
            file,
            chars: text.chars().collect(),
            pos: 0,
            line: 1,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn here(&self) -> SourceLocation {
        SourceLocation::new(self.file, self.line)
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.bump();
        }
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> String {
        let mut out = String::new();
        while let Some(c) = self.peek() {
            if !pred(c) {
                break;
            }
            out.push(c);
            self.bump();
        }
        out
    }

    /// Skip to just past the next `>` that is not inside a quoted value.
    fn resync(&mut self) {
        let mut quoted = false;
        while let Some(c) = self.bump() {
            match c {
                '"' => quoted = !quoted,
                '>' if !quoted => return,
                _ => {}
            }
        }
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')
}

impl Parser {
    fn error(&mut self, location: SourceLocation, message: impl Into<String>) {
        self.errors.push(ConfigError::parse(location, message));
    }

    fn parse_file(&mut self, file: &str, text: &str, base: Option<&Path>, depth: usize) {
        let mut cur = Cursor::new(file, text);
        loop {
            cur.skip_whitespace();
            match cur.peek() {
                None => break,
                Some('#') => {
                    while !matches!(cur.bump(), Some('\n') | None) {}
                }
                Some('<') => {
                    cur.bump();
                    if let Some(tag) = self.parse_tag(&mut cur) {
                        self.accept_tag(tag, base, depth);
                    }
                }
                Some(c) => {
                    let at = cur.here();
                    self.error(at, format!("unexpected character '{}' outside of a tag", c));
                    // Skip the rest of the stray text up to the next tag or line.
                    while !matches!(cur.peek(), Some('<') | Some('\n') | None) {
                        cur.bump();
                    }
                }
            }
        }
    }

    fn parse_tag(&mut self, cur: &mut Cursor<'_>) -> Option<ConfigTag> {
        let start = cur.here();
        let name = cur.take_while(is_name_char);
        if name.is_empty() {
            self.error(start, "tag without a name");
            cur.resync();
            return None;
        }
        let mut items: Vec<(String, String)> = Vec::new();
        loop {
            cur.skip_whitespace();
            match cur.peek() {
                None => {
                    self.error(start, format!("unterminated <{}> tag", name));
                    return None;
                }
                Some('>') => {
                    cur.bump();
                    break;
                }
                Some(_) => {}
            }
            let key_at = cur.here();
            let key = cur.take_while(is_name_char);
            if key.is_empty() {
                let c = cur.peek().unwrap_or(' ');
                self.error(key_at, format!("invalid character '{}' in <{}>", c, name));
                cur.resync();
                return None;
            }
            cur.skip_whitespace();
            if cur.peek() != Some('=') {
                self.error(key_at, format!("expected '=' after <{}:{}>", name, key));
                cur.resync();
                return None;
            }
            cur.bump();
            cur.skip_whitespace();
            if cur.peek() != Some('"') {
                self.error(key_at, format!("value of <{}:{}> must be quoted", name, key));
                cur.resync();
                return None;
            }
            cur.bump();
            let value = self.parse_value(cur, &name, &key, &key_at)?;
            if items.iter().any(|(k, _)| k.eq_ignore_ascii_case(&key)) {
                self.error(key_at, format!("duplicate key '{}' in <{}>", key, name));
                continue;
            }
            items.push((key, value));
        }
        Some(ConfigTag::new(name.to_ascii_lowercase(), start, items))
    }

    fn parse_value(
        &mut self,
        cur: &mut Cursor<'_>,
        tag: &str,
        key: &str,
        key_at: &SourceLocation,
    ) -> Option<String> {
        let mut value = String::new();
        loop {
            match cur.bump() {
                None => {
                    self.error(
                        key_at.clone(),
                        format!("unterminated value for <{}:{}>", tag, key),
                    );
                    return None;
                }
                Some('"') => return Some(value),
                Some('&') => {
                    let at = cur.here();
                    let entity = cur.take_while(is_name_char);
                    if cur.peek() != Some(';') {
                        self.error(at, format!("malformed entity '&{}' in <{}:{}>", entity, tag, key));
                        continue;
                    }
                    cur.bump();
                    match self.expand_entity(&entity) {
                        Some(text) => value.push_str(&text),
                        None => self.error(at, format!("unknown entity '&{};'", entity)),
                    }
                }
                Some(c) => value.push(c),
            }
        }
    }

    fn expand_entity(&self, name: &str) -> Option<String> {
        let builtin = match name {
            "amp" => "&",
            "quot" => "\"",
            "lt" => "<",
            "gt" => ">",
            "nl" => "\n",
            _ => return self.defines.get(name).cloned(),
        };
        Some(builtin.to_string())
    }

    fn accept_tag(&mut self, tag: ConfigTag, base: Option<&Path>, depth: usize) {
        match tag.name() {
            "define" => {
                let (Some(name), Some(value)) = (tag.get("name"), tag.get("value")) else {
                    self.error(tag.location().clone(), "<define> needs both name and value");
                    return;
                };
                self.defines.insert(name.to_string(), value.to_string());
            }
            "include" => self.include(&tag, base, depth),
            _ => self.tags.push(Arc::new(tag)),
        }
    }

    fn include(&mut self, tag: &ConfigTag, base: Option<&Path>, depth: usize) {
        let at = tag.location().clone();
        let Some(file) = tag.get("file") else {
            self.error(at, "<include> needs a file");
            return;
        };
        if depth + 1 > MAX_INCLUDE_DEPTH {
            self.error(at, format!("include depth exceeds {} at '{}'", MAX_INCLUDE_DEPTH, file));
            return;
        }
        // Text that never came from disk may not pull in files, absolute or not.
        let Some(dir) = base else {
            self.error(at, format!("cannot include '{}' from a source without a base directory", file));
            return;
        };
        let path = Path::new(file);
        let resolved = if path.is_absolute() {
            path.to_path_buf()
        } else {
            dir.join(path)
        };
        match std::fs::read_to_string(&resolved) {
            Ok(text) => {
                let name = resolved.display().to_string();
                let child_base = resolved.parent().map(Path::to_path_buf);
                self.parse_file(&name, &text, child_base.as_deref(), depth + 1);
            }
            Err(e) => self.error(at, format!("unable to include '{}': {}", resolved.display(), e)),
        }
    }
}
