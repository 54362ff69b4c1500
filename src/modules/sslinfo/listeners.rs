// src/modules/sslinfo/listeners.rs
// Pipeline listeners contributed by the certificate feature unit.

use std::sync::Arc;

use super::api::CertificateApi;
use super::command::SslInfoSettings;
use crate::entities::Reply;
use crate::pipeline::{
    Listener, PostConnect, PostConnectPayload, PreCommand, PreCommandPayload, SetConnectClass,
    SetConnectClassPayload, Verdict, WhoLine, WhoLinePayload, Whois, WhoisPayload,
};

pub const RPL_WHOISCERTFP: u16 = 276;
pub const ERR_NOOPERHOST: u16 = 491;
pub const RPL_WHOISSECURE: u16 = 671;

/// Enforces `sslonly` and `fingerprint` on oper blocks before the core
/// checks the password.
pub struct OperCertCheck {
    pub api: CertificateApi,
}

impl OperCertCheck {
    fn refuse(&self, payload: &PreCommandPayload<'_>, login: &str, reason: &str) {
        payload.replies.push(Reply::numeric(
            ERR_NOOPERHOST,
            [payload.user.nick.as_str(), "Invalid oper credentials"],
        ));
        payload.replies.push(Reply::ServerNotice {
            snomask: 'o',
            text: format!(
                "WARNING! Failed oper attempt by {} using login '{}': {}",
                payload.user.full_host(),
                login,
                reason
            ),
        });
    }
}

impl Listener<PreCommand> for OperCertCheck {
    fn on_event<'a>(&self, payload: &PreCommandPayload<'a>) -> Verdict<PreCommandPayload<'a>>
    where
        'a: 'a,
    {
        if payload.command != "OPER" {
            return Verdict::Continue;
        }
        let Some(login) = payload.params.first() else {
            return Verdict::Continue;
        };
        let Some(oper) = payload.config.oper(login) else {
            return Verdict::Continue;
        };
        let cert = self.api.certificate(payload.user);

        if oper.oper_block.boolean("sslonly", false) && cert.is_none() {
            self.refuse(payload, login, "a secure connection is required.");
            return Verdict::Deny;
        }
        if let Some(fingerprints) = oper.oper_block.get("fingerprint") {
            if !cert.is_some_and(|c| c.matches_fingerprint(fingerprints)) {
                self.refuse(
                    payload,
                    login,
                    "their TLS (SSL) client certificate fingerprint does not match.",
                );
                return Verdict::Deny;
            }
        }
        Verdict::Continue
    }
}

/// Honours `requiressl` on connect classes: `yes` needs any TLS
/// connection, `trusted` a CA-verified certificate.
pub struct ConnectClassCertCheck {
    pub api: CertificateApi,
}

impl Listener<SetConnectClass> for ConnectClassCertCheck {
    fn on_event<'a>(
        &self,
        payload: &SetConnectClassPayload<'a>,
    ) -> Verdict<SetConnectClassPayload<'a>>
    where
        'a: 'a,
    {
        let cert = self.api.certificate(payload.user);
        let tag = &payload.class.config;
        let requirement = tag.string("requiressl", "");
        let unmet = if requirement.eq_ignore_ascii_case("trusted") {
            !cert.is_some_and(|c| c.is_ca_verified())
        } else {
            tag.boolean("requiressl", false) && cert.is_none()
        };
        if unmet {
            Verdict::Deny
        } else {
            Verdict::Continue
        }
    }
}

pub struct WhoisCert {
    pub api: CertificateApi,
    pub settings: Arc<SslInfoSettings>,
}

impl Listener<Whois> for WhoisCert {
    fn on_event<'a>(&self, payload: &WhoisPayload<'a>) -> Verdict<WhoisPayload<'a>>
    where
        'a: 'a,
    {
        let Some(cert) = self.api.certificate(payload.target) else {
            return Verdict::Continue;
        };
        let source = payload.source.nick.as_str();
        let target = payload.target.nick.as_str();
        payload.replies.push(Reply::numeric(
            RPL_WHOISSECURE,
            [source, target, "is using a secure connection"],
        ));
        let self_whois = payload.source.uid == payload.target.uid;
        let may_see = !self.settings.oper_only() || self_whois || payload.source.is_oper();
        if may_see && !cert.fingerprint().is_empty() {
            payload.replies.push(Reply::numeric(
                RPL_WHOISCERTFP,
                [
                    source.to_string(),
                    target.to_string(),
                    format!("has TLS (SSL) client certificate fingerprint {}", cert.fingerprint()),
                ],
            ));
        }
        Verdict::Continue
    }
}

/// Marks TLS users with an `s` in the WHO flag field, when the reply has one.
pub struct WhoFlag {
    pub api: CertificateApi,
}

impl Listener<WhoLine> for WhoFlag {
    fn on_event<'a>(&self, payload: &WhoLinePayload<'a>) -> Verdict<WhoLinePayload<'a>>
    where
        'a: 'a,
    {
        if !payload.has_flag_field || self.api.certificate(payload.target).is_none() {
            return Verdict::Continue;
        }
        let mut line = payload.clone();
        line.flags.push('s');
        Verdict::Override(line)
    }
}

/// Tells TLS users about their connection and logs them in to any oper
/// block with `autologin` whose fingerprint matches.
pub struct TlsWelcome {
    pub api: CertificateApi,
}

impl Listener<PostConnect> for TlsWelcome {
    fn on_event<'a>(&self, payload: &PostConnectPayload<'a>) -> Verdict<PostConnectPayload<'a>>
    where
        'a: 'a,
    {
        let user = payload.user;
        if !user.local || self.api.is_marked_insecure(user) {
            return Verdict::Continue;
        }
        let Some(cipher) = payload.tls_cipher else {
            return Verdict::Continue;
        };
        let cert = self.api.certificate(user);

        let mut text = format!(
            "*** You are connected to {} using TLS (SSL) cipher '{}'",
            payload.config.server().name,
            cipher
        );
        if let Some(fp) = cert.map(|c| c.fingerprint()).filter(|fp| !fp.is_empty()) {
            text.push_str(" and your TLS (SSL) client certificate fingerprint is ");
            text.push_str(fp);
        }
        payload.replies.push(Reply::Notice(text));

        let Some(cert) = cert else {
            return Verdict::Continue;
        };
        for oper in payload.config.opers() {
            let block = &oper.oper_block;
            if block.boolean("autologin", false) && cert.matches_fingerprint(&block.string("fingerprint", "")) {
                payload.replies.push(Reply::OperLogin {
                    oper: oper.name.clone(),
                });
            }
        }
        Verdict::Continue
    }
}
