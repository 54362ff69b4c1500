use std::collections::HashMap;
use std::sync::Arc;

use super::certificate::Certificate;
use crate::emit_extension_event;
use crate::entities::User;
use crate::events::model::LogLevel;
use crate::extensible::{EntityKind, ExtensionError, ExtensionItem, ExtensionRegistry};
use crate::module_host::ModuleId;

pub const CERT_EXTENSION: &str = "ssl_cert";
pub const NO_CERT_EXTENSION: &str = "no_ssl_cert";

/// Error text stored for users whose WebIRC gateway reports a secure
/// client connection; the gateway cannot forward the client's certificate.
pub const WEBIRC_CERT_ERROR: &str = "WebIRC users can not specify valid certs yet";

/// Access to the certificate attached to users.
///
/// Cheap to clone; every listener of the feature unit holds one.
#[derive(Debug, Clone)]
pub struct CertificateApi {
    cert: ExtensionItem<Arc<Certificate>>,
    no_cert: ExtensionItem<bool>,
}

impl CertificateApi {
    /// Register both extensions under `owner`. If the second registration
    /// fails the first stays behind; the module host removes it when it
    /// rolls back the load.
    pub fn register(registry: &ExtensionRegistry, owner: &ModuleId) -> Result<Self, ExtensionError> {
        let cert =
            registry.register_synced::<Arc<Certificate>>(CERT_EXTENSION, EntityKind::User, owner)?;
        let no_cert = registry.register::<bool>(NO_CERT_EXTENSION, EntityKind::User, owner)?;
        Ok(Self { cert, no_cert })
    }

    /// Typed access for code outside the feature unit, once it is loaded.
    pub fn lookup(registry: &ExtensionRegistry) -> Result<Self, ExtensionError> {
        Ok(Self {
            cert: registry.item::<Arc<Certificate>>(CERT_EXTENSION)?,
            no_cert: registry.item::<bool>(NO_CERT_EXTENSION)?,
        })
    }

    /// The certificate of a user connected over TLS.
    pub fn certificate<'u>(&self, user: &'u User) -> Option<&'u Arc<Certificate>> {
        self.cert.get(&user.ext)
    }

    pub fn set_certificate(&self, user: &mut User, cert: Arc<Certificate>) -> Result<(), ExtensionError> {
        emit_extension_event!(
            LogLevel::Debug,
            "set",
            CERT_EXTENSION,
            None,
            Some(format!("{}: {}", user.full_host(), cert.meta_line()))
        );
        self.cert.set(&mut user.ext, cert)
    }

    pub fn unset_certificate(&self, user: &mut User) -> Option<Arc<Certificate>> {
        self.cert.unset(&mut user.ext)
    }

    /// Set once a WebIRC gateway reported an insecure client connection;
    /// the TLS layer must not attach a certificate to such a user.
    pub fn is_marked_insecure(&self, user: &User) -> bool {
        self.no_cert.get(&user.ext).copied().unwrap_or(false)
    }

    pub fn cert_item(&self) -> &ExtensionItem<Arc<Certificate>> {
        &self.cert
    }

    /// A WebIRC gateway authenticated `user`. Only connection flags matter,
    /// and only when the gateway itself connected over TLS.
    pub fn on_webirc_auth(
        &self,
        user: &mut User,
        flags: Option<&HashMap<String, String>>,
    ) -> Result<(), ExtensionError> {
        let Some(flags) = flags else {
            return Ok(());
        };
        if self.certificate(user).is_none() {
            return Ok(());
        }
        if !flags.contains_key("secure") {
            self.no_cert.set(&mut user.ext, true)?;
            self.cert.unset(&mut user.ext);
            return Ok(());
        }
        let cert = Certificate::with_error(WEBIRC_CERT_ERROR)
            .invalid(true)
            .revoked(true)
            .trusted(false)
            .unknown_signer(true);
        self.set_certificate(user, Arc::new(cert))
    }
}
