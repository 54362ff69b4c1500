// src/modules/sslinfo/certificate.rs
// TLS client certificate record and its peer-sync encoding.

use base16ct::lower::encode_string;
use sha2::{Digest, Sha256};

use crate::extensible::codec::{escape, unescape};
use crate::extensible::{DecodeError, SyncValue};

/// What the TLS layer learned about a client certificate.
///
/// A record either describes a certificate (fingerprint, subject DN, issuer)
/// or carries an error explaining why none is usable, never both.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Certificate {
    invalid: bool,
    trusted: bool,
    revoked: bool,
    unknown_signer: bool,
    fingerprint: String,
    dn: String,
    issuer: String,
    error: String,
}

impl Certificate {
    pub fn new(
        fingerprint: impl Into<String>,
        dn: impl Into<String>,
        issuer: impl Into<String>,
    ) -> Self {
        Self {
            fingerprint: fingerprint.into(),
            dn: dn.into(),
            issuer: issuer.into(),
            ..Self::default()
        }
    }

    /// A record for a connection that presented no usable certificate.
    pub fn with_error(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            ..Self::default()
        }
    }

    pub fn invalid(mut self, invalid: bool) -> Self {
        self.invalid = invalid;
        self
    }

    pub fn trusted(mut self, trusted: bool) -> Self {
        self.trusted = trusted;
        self
    }

    pub fn revoked(mut self, revoked: bool) -> Self {
        self.revoked = revoked;
        self
    }

    pub fn unknown_signer(mut self, unknown_signer: bool) -> Self {
        self.unknown_signer = unknown_signer;
        self
    }

    pub fn is_invalid(&self) -> bool {
        self.invalid
    }

    pub fn is_trusted(&self) -> bool {
        self.trusted
    }

    pub fn is_revoked(&self) -> bool {
        self.revoked
    }

    pub fn is_unknown_signer(&self) -> bool {
        self.unknown_signer
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn dn(&self) -> &str {
        &self.dn
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn error(&self) -> &str {
        &self.error
    }

    /// Valid, unrevoked and without an error.
    pub fn is_usable(&self) -> bool {
        !self.invalid && !self.revoked && self.error.is_empty()
    }

    /// Usable and signed by a trusted CA.
    pub fn is_ca_verified(&self) -> bool {
        self.is_usable() && self.trusted && !self.unknown_signer
    }

    /// Whether any fingerprint in the space-separated `list` matches.
    pub fn matches_fingerprint(&self, list: &str) -> bool {
        !self.fingerprint.is_empty() && list.split_whitespace().any(|fp| fp == self.fingerprint)
    }

    /// The single-line form exchanged with linked servers.
    pub fn meta_line(&self) -> String {
        let mut line = String::with_capacity(16 + self.dn.len() + self.issuer.len());
        line.push(if self.invalid { 'v' } else { 'V' });
        line.push(if self.trusted { 'T' } else { 't' });
        line.push(if self.revoked { 'R' } else { 'r' });
        line.push(if self.unknown_signer { 's' } else { 'S' });
        if self.error.is_empty() {
            line.push('e');
            line.push(' ');
            line.push_str(&escape(&self.fingerprint, true));
            line.push(' ');
            line.push_str(&escape(&self.dn, true));
            line.push(' ');
            line.push_str(&escape(&self.issuer, false));
        } else {
            line.push('E');
            line.push(' ');
            line.push_str(&escape(&self.error, false));
        }
        line
    }
}

/// SHA-256 fingerprint of a DER-encoded certificate, lower-case hex.
pub fn fingerprint_der(der: &[u8]) -> String {
    let mut h = Sha256::new();
    h.update(der);
    encode_string(&h.finalize())
}

impl SyncValue for Certificate {
    fn encode(&self) -> String {
        self.meta_line()
    }

    fn decode(raw: &str) -> Result<Self, DecodeError> {
        if raw.is_empty() {
            return Err(DecodeError::Empty);
        }
        if raw.contains(['\n', '\r']) {
            return Err(DecodeError::Malformed("certificate spans more than one line".into()));
        }
        let (flags, rest) = raw.split_once(' ').unwrap_or((raw, ""));
        let mut cert = Certificate::default();
        let mut has_error = false;
        for flag in flags.chars() {
            match flag {
                'v' => cert.invalid = true,
                'V' => cert.invalid = false,
                'T' => cert.trusted = true,
                't' => cert.trusted = false,
                'R' => cert.revoked = true,
                'r' => cert.revoked = false,
                's' => cert.unknown_signer = true,
                'S' => cert.unknown_signer = false,
                'E' => has_error = true,
                'e' => has_error = false,
                other => return Err(DecodeError::InvalidFlag(other)),
            }
        }
        if has_error {
            cert.error = unescape(rest)?;
            if cert.error.is_empty() {
                return Err(DecodeError::Malformed("error flag set without error text".into()));
            }
            return Ok(cert);
        }
        // Older peers may omit trailing fields.
        let mut fields = rest.splitn(3, ' ');
        cert.fingerprint = unescape(fields.next().unwrap_or(""))?;
        cert.dn = unescape(fields.next().unwrap_or(""))?;
        cert.issuer = unescape(fields.next().unwrap_or(""))?;
        Ok(cert)
    }
}
