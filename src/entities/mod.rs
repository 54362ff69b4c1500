//! Core runtime objects that carry extension state, and the directory that
//! owns them.

pub mod directory;
pub mod replies;

pub use directory::Directory;
pub use replies::{Replies, Reply};

use crate::extensible::{EntityKind, Extensible};

/// A connected client, local or introduced by a linked server.
#[derive(Debug)]
pub struct User {
    pub uid: String,
    pub nick: String,
    pub ident: String,
    pub host: String,
    /// Oper type name once the user has opered up.
    pub oper: Option<String>,
    /// Connected to this server rather than to a peer.
    pub local: bool,
    /// Registration (NICK/USER) completed.
    pub registered: bool,
    pub ext: Extensible,
}

impl User {
    pub fn new(uid: impl Into<String>, nick: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            nick: nick.into(),
            ident: "unknown".into(),
            host: "unknown".into(),
            oper: None,
            local: true,
            registered: true,
            ext: Extensible::new(EntityKind::User),
        }
    }

    pub fn remote(uid: impl Into<String>, nick: impl Into<String>) -> Self {
        Self {
            local: false,
            ..Self::new(uid, nick)
        }
    }

    pub fn is_oper(&self) -> bool {
        self.oper.is_some()
    }

    /// nick!ident@host
    pub fn full_host(&self) -> String {
        format!("{}!{}@{}", self.nick, self.ident, self.host)
    }
}

#[derive(Debug)]
pub struct Channel {
    pub name: String,
    pub ext: Extensible,
}

impl Channel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ext: Extensible::new(EntityKind::Channel),
        }
    }
}

/// A user's presence in a channel.
#[derive(Debug)]
pub struct Membership {
    pub uid: String,
    pub channel: String,
    pub ext: Extensible,
}

impl Membership {
    pub fn new(uid: impl Into<String>, channel: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            channel: channel.into(),
            ext: Extensible::new(EntityKind::Membership),
        }
    }
}

#[derive(Debug)]
pub struct Server {
    pub name: String,
    pub sid: String,
    pub ext: Extensible,
}

impl Server {
    pub fn new(name: impl Into<String>, sid: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sid: sid.into(),
            ext: Extensible::new(EntityKind::Server),
        }
    }
}
