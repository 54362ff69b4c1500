// src/pipeline/kinds.rs
// Event kinds raised by the core.

use super::Event;
use crate::config::{ConnectClass, ServerConfig};
use crate::entities::{Replies, User};

/// A registered user issued a command; raised before the core handler runs.
pub struct PreCommand;

pub struct PreCommandPayload<'a> {
    pub user: &'a User,
    /// Upper-cased command name.
    pub command: &'a str,
    pub params: &'a [String],
    pub config: &'a ServerConfig,
    pub replies: &'a Replies,
}

impl Event for PreCommand {
    const NAME: &'static str = "PreCommand";
    type Payload<'a> = PreCommandPayload<'a>;
}

/// The core is about to place a connecting user in `class`. `Deny` makes it
/// try the next candidate class.
pub struct SetConnectClass;

pub struct SetConnectClassPayload<'a> {
    pub user: &'a User,
    pub class: &'a ConnectClass,
}

impl Event for SetConnectClass {
    const NAME: &'static str = "SetConnectClass";
    type Payload<'a> = SetConnectClassPayload<'a>;
}

/// `source` asked for WHOIS on `target`; listeners append extra numerics.
pub struct Whois;

pub struct WhoisPayload<'a> {
    pub source: &'a User,
    pub target: &'a User,
    pub replies: &'a Replies,
}

impl Event for Whois {
    const NAME: &'static str = "Whois";
    type Payload<'a> = WhoisPayload<'a>;
}

/// One RPL_WHOREPLY line about to be sent; listeners may rewrite it via
/// `Verdict::Override`, or `Deny` to suppress the line.
pub struct WhoLine;

#[derive(Debug, Clone)]
pub struct WhoLinePayload<'a> {
    pub source: &'a User,
    pub target: &'a User,
    /// The request asked for the flag field (plain WHO, or WHOX with `f`).
    pub has_flag_field: bool,
    /// Status flags such as `H`, `G`, `*`, `@`.
    pub flags: String,
}

impl Event for WhoLine {
    const NAME: &'static str = "WhoLine";
    type Payload<'a> = WhoLinePayload<'a>;
}

/// A local user has completed registration.
pub struct PostConnect;

pub struct PostConnectPayload<'a> {
    pub user: &'a User,
    /// Negotiated cipher suite when the client connected over TLS.
    pub tls_cipher: Option<&'a str>,
    pub config: &'a ServerConfig,
    pub replies: &'a Replies,
}

impl Event for PostConnect {
    const NAME: &'static str = "PostConnect";
    type Payload<'a> = PostConnectPayload<'a>;
}
