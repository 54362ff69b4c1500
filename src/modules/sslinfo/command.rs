use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::api::CertificateApi;
use crate::config::{ConfigDependent, ServerConfig};
use crate::entities::{Directory, Replies, Reply, User};

pub const ERR_NOSUCHNICK: u16 = 401;

/// Values cached from `<sslinfo>`; refreshed on every reload.
#[derive(Debug, Default)]
pub struct SslInfoSettings {
    oper_only: AtomicBool,
}

impl SslInfoSettings {
    pub fn from_config(config: &ServerConfig) -> Self {
        let settings = Self::default();
        settings.load(config);
        settings
    }

    /// Only opers may see other users' certificate details.
    pub fn oper_only(&self) -> bool {
        self.oper_only.load(Ordering::Relaxed)
    }

    fn load(&self, config: &ServerConfig) {
        let tag = config.conf_value("sslinfo");
        self.oper_only
            .store(tag.boolean("operonly", false), Ordering::Relaxed);
    }
}

impl ConfigDependent for SslInfoSettings {
    fn name(&self) -> &str {
        "sslinfo"
    }

    fn apply(&self, candidate: &Arc<ServerConfig>) {
        self.load(candidate);
    }
}

/// `SSLINFO <nick>`: show the certificate details of a connected user.
pub struct SslInfoCommand {
    api: CertificateApi,
    settings: Arc<SslInfoSettings>,
}

impl SslInfoCommand {
    pub const NAME: &'static str = "SSLINFO";

    pub fn new(api: CertificateApi, settings: Arc<SslInfoSettings>) -> Self {
        Self { api, settings }
    }

    pub fn handle(&self, source: &User, params: &[String], directory: &Directory, replies: &Replies) {
        let Some(nick) = params.first() else {
            return;
        };
        let target = match directory.find_nick(nick) {
            Some(t) if t.registered => t,
            _ => {
                replies.push(Reply::numeric(
                    ERR_NOSUCHNICK,
                    [source.nick.as_str(), nick.as_str(), "No such nick"],
                ));
                return;
            }
        };

        if self.settings.oper_only() && !source.is_oper() && target.uid != source.uid {
            replies.push(Reply::notice(
                "*** You cannot view TLS (SSL) client certificate information for other users",
            ));
            return;
        }

        match self.api.certificate(target) {
            None => replies.push(Reply::notice(format!(
                "*** {} is not connected using TLS (SSL).",
                target.nick
            ))),
            Some(cert) if !cert.error().is_empty() => replies.push(Reply::notice(format!(
                "*** {} is connected using TLS (SSL) but has not specified a valid client certificate ({}).",
                target.nick,
                cert.error()
            ))),
            Some(cert) => {
                replies.push(Reply::notice(format!("*** Distinguished Name: {}", cert.dn())));
                replies.push(Reply::notice(format!("*** Issuer:             {}", cert.issuer())));
                replies.push(Reply::notice(format!(
                    "*** Key Fingerprint:    {}",
                    cert.fingerprint()
                )));
            }
        }
    }
}
