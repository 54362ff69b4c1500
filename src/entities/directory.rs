use indexmap::IndexMap;

use super::{Channel, Membership, Server, User};
use crate::extensible::{EntityKind, EntityWalker, Extensible};

/// Owner of every live entity on this server. Users are keyed by uid,
/// channels by lower-cased name.
#[derive(Debug)]
pub struct Directory {
    pub local_server: Server,
    users: IndexMap<String, User>,
    channels: IndexMap<String, Channel>,
    memberships: Vec<Membership>,
    servers: IndexMap<String, Server>,
}

impl Directory {
    pub fn new(local_server: Server) -> Self {
        Self {
            local_server,
            users: IndexMap::new(),
            channels: IndexMap::new(),
            memberships: Vec::new(),
            servers: IndexMap::new(),
        }
    }

    pub fn add_user(&mut self, user: User) {
        self.users.insert(user.uid.clone(), user);
    }

    /// Remove a user along with its memberships; dropping them releases
    /// their extension payloads.
    pub fn remove_user(&mut self, uid: &str) -> Option<User> {
        self.memberships.retain(|m| m.uid != uid);
        self.users.shift_remove(uid)
    }

    pub fn user(&self, uid: &str) -> Option<&User> {
        self.users.get(uid)
    }

    pub fn user_mut(&mut self, uid: &str) -> Option<&mut User> {
        self.users.get_mut(uid)
    }

    pub fn find_nick(&self, nick: &str) -> Option<&User> {
        self.users
            .values()
            .find(|u| u.nick.eq_ignore_ascii_case(nick))
    }

    pub fn users(&self) -> impl Iterator<Item = &User> {
        self.users.values()
    }

    pub fn add_channel(&mut self, channel: Channel) {
        self.channels
            .insert(channel.name.to_ascii_lowercase(), channel);
    }

    pub fn channel(&self, name: &str) -> Option<&Channel> {
        self.channels.get(&name.to_ascii_lowercase())
    }

    pub fn channel_mut(&mut self, name: &str) -> Option<&mut Channel> {
        self.channels.get_mut(&name.to_ascii_lowercase())
    }

    pub fn join(&mut self, uid: &str, channel: &str) {
        if !self
            .memberships
            .iter()
            .any(|m| m.uid == uid && m.channel.eq_ignore_ascii_case(channel))
        {
            self.memberships.push(Membership::new(uid, channel));
        }
    }

    pub fn membership_mut(&mut self, uid: &str, channel: &str) -> Option<&mut Membership> {
        self.memberships
            .iter_mut()
            .find(|m| m.uid == uid && m.channel.eq_ignore_ascii_case(channel))
    }

    /// Record a linked server.
    pub fn add_server(&mut self, server: Server) {
        self.servers.insert(server.sid.clone(), server);
    }

    pub fn server_mut(&mut self, sid: &str) -> Option<&mut Server> {
        if self.local_server.sid == sid {
            return Some(&mut self.local_server);
        }
        self.servers.get_mut(sid)
    }
}

impl EntityWalker for Directory {
    fn walk(&mut self, kind: EntityKind, visit: &mut dyn FnMut(&mut Extensible)) {
        match kind {
            EntityKind::User => self.users.values_mut().for_each(|u| visit(&mut u.ext)),
            EntityKind::Channel => self.channels.values_mut().for_each(|c| visit(&mut c.ext)),
            EntityKind::Membership => self.memberships.iter_mut().for_each(|m| visit(&mut m.ext)),
            EntityKind::Server => {
                visit(&mut self.local_server.ext);
                self.servers.values_mut().for_each(|s| visit(&mut s.ext));
            }
        }
    }
}
