// src/extensible/codec.rs
// Peer-sync value encodings.
//
// Every encoding must be lossless for any value that can be set locally, and
// decoding must reject bad input with a DecodeError rather than panic: the
// text comes from a remote server.

use std::any::Any;
use std::marker::PhantomData;
use std::sync::Arc;

use super::entity::Payload;
use super::error::DecodeError;

/// A payload type with a textual peer-sync representation.
pub trait SyncValue: Sized + Send + Sync + 'static {
    fn encode(&self) -> String;
    fn decode(raw: &str) -> Result<Self, DecodeError>;
}

/// Type-erased codec stored on a descriptor so the wire layer can work by name.
pub(crate) trait ErasedCodec: Send + Sync {
    fn encode(&self, value: &(dyn Any + Send + Sync)) -> Option<String>;
    fn decode(&self, raw: &str) -> Result<Payload, DecodeError>;
}

pub(crate) struct TypedCodec<T>(PhantomData<fn() -> T>);

impl<T> TypedCodec<T> {
    pub(crate) fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T: SyncValue> ErasedCodec for TypedCodec<T> {
    fn encode(&self, value: &(dyn Any + Send + Sync)) -> Option<String> {
        value.downcast_ref::<T>().map(SyncValue::encode)
    }

    fn decode(&self, raw: &str) -> Result<Payload, DecodeError> {
        T::decode(raw).map(|v| Box::new(v) as Payload)
    }
}

impl SyncValue for String {
    fn encode(&self) -> String {
        escape(self, false)
    }

    fn decode(raw: &str) -> Result<Self, DecodeError> {
        unescape(raw)
    }
}

impl SyncValue for i64 {
    fn encode(&self) -> String {
        self.to_string()
    }

    fn decode(raw: &str) -> Result<Self, DecodeError> {
        raw.parse::<i64>()
            .map_err(|_| DecodeError::Malformed(format!("'{}' is not an integer", raw)))
    }
}

impl SyncValue for bool {
    fn encode(&self) -> String {
        let flag = if *self { "1" } else { "0" };
        flag.to_string()
    }

    fn decode(raw: &str) -> Result<Self, DecodeError> {
        match raw {
            "1" => Ok(true),
            "0" => Ok(false),
            _ => Err(DecodeError::Malformed(format!("'{}' is not a boolean", raw))),
        }
    }
}

/// Shared payloads (one immutable record referenced by many entities) sync
/// as the record they point to.
impl<T: SyncValue> SyncValue for Arc<T> {
    fn encode(&self) -> String {
        (**self).encode()
    }

    fn decode(raw: &str) -> Result<Self, DecodeError> {
        T::decode(raw).map(Arc::new)
    }
}

/// Escape `\`, CR and LF (and, with `spaces`, the space character) so the
/// value fits in one space-delimited field of a single line.
pub fn escape(raw: &str, spaces: bool) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            ' ' if spaces => out.push_str("\\s"),
            _ => out.push(c),
        }
    }
    out
}

/// Inverse of [`escape`]. Accepts `\s` whether or not spaces were escaped.
pub fn unescape(raw: &str) -> Result<String, DecodeError> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('s') => out.push(' '),
            Some(other) => return Err(DecodeError::InvalidEscape(other)),
            None => {
                return Err(DecodeError::Malformed(
                    "dangling escape at end of value".into(),
                ))
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_round_trip_with_control_characters() {
        let value = "line one\nline \\two\r".to_string();
        let encoded = value.encode();
        assert!(!encoded.contains('\n'));
        assert_eq!(String::decode(&encoded).unwrap(), value);
    }

    #[test]
    fn rejects_bad_escapes() {
        assert_eq!(String::decode("a\\x"), Err(DecodeError::InvalidEscape('x')));
        assert!(String::decode("trailing\\").is_err());
    }

    #[test]
    fn scalar_codecs() {
        assert_eq!(i64::decode(&(-42i64).encode()), Ok(-42));
        assert!(i64::decode("4x").is_err());
        assert_eq!(bool::decode(&true.encode()), Ok(true));
        assert!(bool::decode("yes").is_err());
    }
}
