//! TLS client certificate information: the `ssl_cert` user extension, the
//! `SSLINFO` command and the listeners that enforce certificate
//! requirements on oper blocks and connect classes.

pub mod api;
pub mod certificate;
pub mod command;
pub mod listeners;

pub use api::{CertificateApi, CERT_EXTENSION, NO_CERT_EXTENSION};
pub use certificate::{fingerprint_der, Certificate};
pub use command::{SslInfoCommand, SslInfoSettings};

use std::sync::Arc;

use anyhow::Context;

use crate::module_host::{Module, ModuleContext};
use listeners::{ConnectClassCertCheck, OperCertCheck, TlsWelcome, WhoFlag, WhoisCert};

#[derive(Default)]
pub struct SslInfoModule {
    api: Option<CertificateApi>,
    command: Option<Arc<SslInfoCommand>>,
}

impl SslInfoModule {
    pub const NAME: &'static str = "sslinfo";

    pub fn new() -> Self {
        Self::default()
    }

    /// Available once the module has been loaded.
    pub fn api(&self) -> Option<&CertificateApi> {
        self.api.as_ref()
    }

    pub fn command(&self) -> Option<Arc<SslInfoCommand>> {
        self.command.clone()
    }
}

impl Module for SslInfoModule {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Adds user facing TLS (SSL) information, certificate requirements for opers and connect classes, and the SSLINFO command."
    }

    fn init(&mut self, ctx: &mut ModuleContext<'_>) -> anyhow::Result<()> {
        let owner = ctx.id().clone();
        let api = CertificateApi::register(ctx.extensions, &owner)
            .context("registering certificate extensions")?;

        let settings = Arc::new(SslInfoSettings::from_config(&ctx.current_config()));
        ctx.add_config_dependent(settings.clone());

        let pipeline = ctx.pipeline;
        pipeline.bind::<crate::pipeline::PreCommand>(
            &owner,
            0,
            Arc::new(OperCertCheck { api: api.clone() }),
        );
        pipeline.bind::<crate::pipeline::SetConnectClass>(
            &owner,
            0,
            Arc::new(ConnectClassCertCheck { api: api.clone() }),
        );
        pipeline.bind::<crate::pipeline::Whois>(
            &owner,
            0,
            Arc::new(WhoisCert {
                api: api.clone(),
                settings: settings.clone(),
            }),
        );
        pipeline.bind::<crate::pipeline::WhoLine>(&owner, 0, Arc::new(WhoFlag { api: api.clone() }));
        pipeline.bind::<crate::pipeline::PostConnect>(
            &owner,
            0,
            Arc::new(TlsWelcome { api: api.clone() }),
        );

        self.command = Some(Arc::new(SslInfoCommand::new(api.clone(), settings)));
        self.api = Some(api);
        Ok(())
    }

    fn on_unload(&mut self) {
        self.command = None;
        self.api = None;
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
