use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use ircd_core::config::{ConfigDependent, ConfigError, ConfigLifecycle, ConfigSource, ServerConfig};
use ircd_core::events::{dispatcher, model::LogEvent, sink::LogSink};

fn conf(body: &str) -> ConfigSource {
    ConfigSource::from_text(
        "ircd.conf",
        format!(
            "<server name=\"irc.example.net\" id=\"0AB\">\n<connect name=\"main\">\n{}",
            body
        ),
    )
}

#[test]
fn readers_keep_their_snapshot_across_reloads() {
    let lifecycle = ConfigLifecycle::startup(&conf("<limits maxnick=\"20\">")).unwrap();
    let before = lifecycle.current();
    let tag = before.get_tag("limits", 0).unwrap();
    assert_eq!(lifecycle.generation(), 1);

    lifecycle.reload(&conf("<limits maxnick=\"25\">")).unwrap();

    assert_eq!(before.limits().max_nick, 20);
    assert_eq!(tag.integer("maxnick", 0), 20);
    assert_eq!(lifecycle.current().limits().max_nick, 25);
    assert_eq!(lifecycle.generation(), 2);
}

#[test]
fn invalid_reload_keeps_the_current_snapshot() {
    let lifecycle = ConfigLifecycle::startup(&conf("")).unwrap();
    let current = lifecycle.current();

    let errors = lifecycle
        .reload(&conf("<connect name=\"users\" parent=\"ghost\">"))
        .unwrap_err();
    assert!(!errors.is_empty());
    assert!(matches!(errors[0], ConfigError::Validation { .. }));
    assert!(errors[0].to_string().starts_with("ircd.conf:3:"));

    assert!(Arc::ptr_eq(&current, &lifecycle.current()));
    assert_eq!(lifecycle.generation(), 1);
}

#[test]
fn parse_errors_block_a_reload() {
    let lifecycle = ConfigLifecycle::startup(&conf("")).unwrap();
    let errors = lifecycle.reload(&conf("<a b=\"1\"><c d=>")).unwrap_err();
    assert_eq!(errors.len(), 1);
    assert!(matches!(errors[0], ConfigError::Parse { .. }));
    assert!(lifecycle.current().get_tag("a", 0).is_none());
}

#[test]
fn invalid_startup_is_reported() {
    let errors = ConfigLifecycle::startup(&ConfigSource::from_text("x.conf", "<limits maxnick=\"0\">"))
        .err()
        .expect("startup must fail");
    assert_eq!(errors.len(), 2);
}

struct MaxNick {
    cached: AtomicUsize,
    applied: AtomicUsize,
}

impl ConfigDependent for MaxNick {
    fn name(&self) -> &str {
        "maxnick-cache"
    }

    fn validate(&self, candidate: &ServerConfig) -> Vec<ConfigError> {
        let tag = candidate.conf_value("limits");
        if candidate.limits().max_nick > 50 {
            return vec![ConfigError::validation(
                tag.location().clone(),
                "nick length above 50 is not supported",
            )];
        }
        Vec::new()
    }

    fn apply(&self, candidate: &Arc<ServerConfig>) {
        self.cached.store(candidate.limits().max_nick, Ordering::SeqCst);
        self.applied.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn dependents_veto_and_rederive() {
    let lifecycle = ConfigLifecycle::startup(&conf("")).unwrap();
    let dep = Arc::new(MaxNick {
        cached: AtomicUsize::new(lifecycle.current().limits().max_nick),
        applied: AtomicUsize::new(0),
    });
    let id = lifecycle.add_dependent(dep.clone());

    lifecycle.reload(&conf("<limits maxnick=\"40\">")).unwrap();
    assert_eq!(dep.cached.load(Ordering::SeqCst), 40);

    let errors = lifecycle.reload(&conf("<limits maxnick=\"60\">")).unwrap_err();
    assert_eq!(errors.len(), 1);
    assert_eq!(dep.cached.load(Ordering::SeqCst), 40);
    assert_eq!(lifecycle.current().limits().max_nick, 40);
    assert_eq!(dep.applied.load(Ordering::SeqCst), 1);

    assert!(lifecycle.remove_dependent(id));
    assert!(!lifecycle.remove_dependent(id));
    lifecycle.reload(&conf("<limits maxnick=\"60\">")).unwrap();
    assert_eq!(dep.applied.load(Ordering::SeqCst), 1);
}

#[test]
fn removing_a_dependent_spares_others_with_the_same_name() {
    let lifecycle = ConfigLifecycle::startup(&conf("")).unwrap();
    let first = Arc::new(MaxNick {
        cached: AtomicUsize::new(0),
        applied: AtomicUsize::new(0),
    });
    let second = Arc::new(MaxNick {
        cached: AtomicUsize::new(0),
        applied: AtomicUsize::new(0),
    });
    let first_id = lifecycle.add_dependent(first.clone());
    let second_id = lifecycle.add_dependent(second.clone());
    assert_ne!(first_id, second_id);
    assert_eq!(first.name(), second.name());

    assert!(lifecycle.remove_dependent(first_id));
    assert_eq!(lifecycle.dependent_count(), 1);

    lifecycle.reload(&conf("<limits maxnick=\"30\">")).unwrap();
    assert_eq!(first.applied.load(Ordering::SeqCst), 0);
    assert_eq!(second.applied.load(Ordering::SeqCst), 1);
    assert_eq!(second.cached.load(Ordering::SeqCst), 30);
}

/// Parks the reload inside `validate` until released.
struct Gate {
    entered: mpsc::Sender<()>,
    release: Mutex<mpsc::Receiver<()>>,
}

impl ConfigDependent for Gate {
    fn name(&self) -> &str {
        "gate"
    }

    fn validate(&self, _candidate: &ServerConfig) -> Vec<ConfigError> {
        let _ = self.entered.send(());
        let _ = self.release.lock().recv_timeout(Duration::from_secs(5));
        Vec::new()
    }

    fn apply(&self, _candidate: &Arc<ServerConfig>) {}
}

#[test]
fn concurrent_reload_fails_fast() {
    let lifecycle = Arc::new(ConfigLifecycle::startup(&conf("")).unwrap());
    let (entered_tx, entered_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel();
    lifecycle.add_dependent(Arc::new(Gate {
        entered: entered_tx,
        release: Mutex::new(release_rx),
    }));

    let background = {
        let lifecycle = lifecycle.clone();
        std::thread::spawn(move || lifecycle.reload(&conf("<limits maxnick=\"40\">")))
    };
    entered_rx.recv_timeout(Duration::from_secs(5)).unwrap();

    let errors = lifecycle.reload(&conf("<limits maxnick=\"45\">")).unwrap_err();
    assert_eq!(errors, vec![ConfigError::ReloadInProgress]);

    release_tx.send(()).unwrap();
    background.join().unwrap().unwrap();
    assert_eq!(lifecycle.current().limits().max_nick, 40);
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
async fn rejected_reload_emits_config_event() {
    let mem = Arc::new(MemorySink {
        events: Arc::new(Mutex::new(Vec::new())),
    });
    dispatcher::init_events(vec![mem.clone()], 64).await;

    let lifecycle = ConfigLifecycle::startup(&conf("")).unwrap();
    let _ = lifecycle.reload(&conf("<connect name=\"users\" parent=\"ghost\">"));

    // Allow dispatch loop to process
    tokio::time::sleep(Duration::from_millis(50)).await;

    let evts = mem.events.lock();
    let rejected = evts.iter().find_map(|e| match e {
        LogEvent::Config(c) if c.action == "reload_rejected" => Some(c.clone()),
        _ => None,
    });
    let rejected = rejected.expect("expected a reload_rejected event");
    assert_eq!(rejected.source.as_deref(), Some("ircd.conf"));
    assert!(rejected.errors.iter().any(|e| e.contains("ghost")));
}
