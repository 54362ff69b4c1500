use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

use ircd_core::entities::{Channel, Directory, Server, User};
use ircd_core::events::{dispatcher, model::LogEvent, sink::LogSink};
use ircd_core::extensible::{EntityKind, Extensible, ExtensionError, ExtensionRegistry};
use ircd_core::module_host::ModuleId;

fn directory() -> Directory {
    let mut dir = Directory::new(Server::new("irc.example.net", "0AB"));
    dir.add_user(User::new("0ABAAAAAA", "alice"));
    dir.add_user(User::new("0ABAAAAAB", "bob"));
    dir.add_channel(Channel::new("#rust"));
    dir
}

#[test]
fn typed_get_set_unset() {
    let registry = ExtensionRegistry::new();
    let owner = ModuleId::new("away");
    let away = registry
        .register::<String>("away_reason", EntityKind::User, &owner)
        .unwrap();

    let mut user = User::new("0ABAAAAAA", "alice");
    assert!(away.get(&user.ext).is_none());
    away.set(&mut user.ext, "lunch".to_string()).unwrap();
    assert_eq!(away.get(&user.ext).map(String::as_str), Some("lunch"));

    away.set(&mut user.ext, "meeting".to_string()).unwrap();
    assert_eq!(user.ext.len(), 1);
    assert_eq!(away.unset(&mut user.ext).as_deref(), Some("meeting"));
    assert!(away.get(&user.ext).is_none());
    assert!(away.unset(&mut user.ext).is_none());
}

#[test]
fn collision_leaves_the_registry_unchanged() {
    let registry = ExtensionRegistry::new();
    let first = ModuleId::new("first");
    let second = ModuleId::new("second");
    let item = registry
        .register::<i64>("score", EntityKind::User, &first)
        .unwrap();

    let err = registry
        .register::<String>("score", EntityKind::Channel, &second)
        .unwrap_err();
    assert_eq!(
        err,
        ExtensionError::NameCollision {
            name: "score".into(),
            owner: "first".into(),
        }
    );
    assert_eq!(registry.len(), 1);
    let handle = registry.find_by_name("score").unwrap();
    assert!(Arc::ptr_eq(&handle, item.handle()));
    assert_eq!(handle.owner(), &first);
    assert_eq!(handle.kind(), EntityKind::User);
}

#[test]
fn wrong_entity_kind_is_rejected() {
    let registry = ExtensionRegistry::new();
    let topic_lock = registry
        .register::<bool>("topic_lock", EntityKind::Channel, &ModuleId::new("m"))
        .unwrap();
    let mut user = User::new("0ABAAAAAA", "alice");
    assert!(matches!(
        topic_lock.set(&mut user.ext, true),
        Err(ExtensionError::WrongEntityKind { .. })
    ));
    assert!(user.ext.is_empty());
}

#[test]
fn item_lookup_checks_the_payload_type() {
    let registry = ExtensionRegistry::new();
    registry
        .register::<i64>("score", EntityKind::User, &ModuleId::new("m"))
        .unwrap();
    assert!(registry.item::<i64>("score").is_ok());
    assert!(matches!(
        registry.item::<String>("score"),
        Err(ExtensionError::TypeMismatch { .. })
    ));
    assert!(matches!(
        registry.item::<i64>("nope"),
        Err(ExtensionError::NotFound { .. })
    ));
}

#[test]
fn unregister_sweeps_every_entity() {
    let registry = ExtensionRegistry::new();
    let owner = ModuleId::new("flags");
    let flag = registry
        .register::<i64>("flag", EntityKind::User, &owner)
        .unwrap();
    let other = registry
        .register::<i64>("other", EntityKind::User, &ModuleId::new("keep"))
        .unwrap();
    let mut dir = directory();
    for uid in ["0ABAAAAAA", "0ABAAAAAB"] {
        let user = dir.user_mut(uid).unwrap();
        flag.set(&mut user.ext, 1).unwrap();
        other.set(&mut user.ext, 2).unwrap();
    }

    assert_eq!(registry.unregister(flag.handle(), &mut dir), Some(2));
    assert!(registry.find_by_name("flag").is_none());
    for user in dir.users() {
        assert!(flag.get(&user.ext).is_none());
        assert_eq!(other.get(&user.ext), Some(&2));
        assert_eq!(user.ext.extension_names(), vec!["other"]);
    }

    // A stale item can no longer store anything.
    let user = dir.user_mut("0ABAAAAAA").unwrap();
    assert!(matches!(
        flag.set(&mut user.ext, 3),
        Err(ExtensionError::Unregistered { .. })
    ));
    assert_eq!(registry.unregister(flag.handle(), &mut dir), None);
}

#[test]
fn name_is_reusable_after_unregister() {
    let registry = ExtensionRegistry::new();
    let owner = ModuleId::new("m");
    let old = registry
        .register::<i64>("slot", EntityKind::User, &owner)
        .unwrap();
    let mut none: Vec<Extensible> = Vec::new();
    registry.unregister(old.handle(), &mut none);

    let new = registry
        .register::<String>("slot", EntityKind::User, &owner)
        .unwrap();
    assert_ne!(old.handle().id(), new.handle().id());
    assert!(!old.handle().is_registered());
}

#[test]
fn unregister_owner_only_touches_that_owner() {
    let registry = ExtensionRegistry::new();
    let a = ModuleId::new("a");
    let b = ModuleId::new("b");
    registry.register::<i64>("a1", EntityKind::User, &a).unwrap();
    registry.register::<i64>("a2", EntityKind::Channel, &a).unwrap();
    registry.register::<i64>("b1", EntityKind::User, &b).unwrap();

    let mut dir = directory();
    let mut removed = registry.unregister_owner(&a, &mut dir);
    removed.sort();
    assert_eq!(removed, vec!["a1", "a2"]);
    assert_eq!(registry.names(), vec!["b1"]);
}

#[test]
fn shared_payload_is_released_with_its_last_holder() {
    let registry = ExtensionRegistry::new();
    let shared = registry
        .register::<Arc<String>>("shared", EntityKind::User, &ModuleId::new("m"))
        .unwrap();
    let value = Arc::new("record".to_string());
    let mut alice = User::new("0ABAAAAAA", "alice");
    let mut bob = User::new("0ABAAAAAB", "bob");
    shared.set(&mut alice.ext, value.clone()).unwrap();
    shared.set(&mut bob.ext, value.clone()).unwrap();
    assert_eq!(Arc::strong_count(&value), 3);

    shared.unset(&mut alice.ext);
    assert_eq!(Arc::strong_count(&value), 2);
    drop(bob);
    assert_eq!(Arc::strong_count(&value), 1);
}

#[test]
fn membership_and_server_entities_are_walked() {
    let registry = ExtensionRegistry::new();
    let owner = ModuleId::new("m");
    let rank = registry
        .register::<i64>("rank", EntityKind::Membership, &owner)
        .unwrap();
    let burst = registry
        .register::<bool>("bursting", EntityKind::Server, &owner)
        .unwrap();
    let mut dir = directory();
    dir.join("0ABAAAAAA", "#rust");
    rank.set(&mut dir.membership_mut("0ABAAAAAA", "#RUST").unwrap().ext, 5)
        .unwrap();
    burst.set(&mut dir.local_server.ext, true).unwrap();

    assert_eq!(registry.unregister_owner(&owner, &mut dir).len(), 2);
    assert!(dir.local_server.ext.is_empty());
    assert!(dir
        .membership_mut("0ABAAAAAA", "#rust")
        .unwrap()
        .ext
        .is_empty());
}

struct MemorySink {
    events: Arc<Mutex<Vec<LogEvent>>>,
}

#[async_trait::async_trait]
impl LogSink for MemorySink {
    async fn handle(&self, event: &LogEvent) {
        self.events.lock().push(event.clone());
    }
}

#[tokio::test]
async fn collision_emits_extension_event() {
    let mem = Arc::new(MemorySink {
        events: Arc::new(Mutex::new(Vec::new())),
    });
    dispatcher::init_events(vec![mem.clone()], 64).await;

    let registry = ExtensionRegistry::new();
    registry
        .register::<i64>("dup", EntityKind::User, &ModuleId::new("one"))
        .unwrap();
    let _ = registry.register::<i64>("dup", EntityKind::User, &ModuleId::new("two"));

    tokio::time::sleep(Duration::from_millis(50)).await;

    let evts = mem.events.lock();
    let collision = evts.iter().any(|e| {
        matches!(e, LogEvent::Extension(x)
            if x.action == "collision" && x.extension == "dup" && x.owner.as_deref() == Some("two"))
    });
    assert!(collision, "expected a collision event, got: {:?}", *evts);
}
