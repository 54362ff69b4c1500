use parking_lot::Mutex;
use proptest::prelude::*;
use std::sync::Arc;
use std::time::Duration;

use ircd_core::entities::User;
use ircd_core::events::{dispatcher, model::LogEvent, sink::LogSink};
use ircd_core::extensible::sync::{
    apply_token, apply_tokens, capability_line, encode_entity, metadata_line,
    parse_capability_line, parse_metadata_line,
};
use ircd_core::extensible::{
    DecodeError, EntityKind, ExtensionRegistry, SyncOutcome, SyncToken, SyncValue,
};
use ircd_core::module_host::ModuleId;
use ircd_core::modules::sslinfo::Certificate;

#[test]
fn certificate_full_form_round_trips() {
    let cert = Certificate::new("ab12", "CN=test", "CN=ca")
        .trusted(true)
        .revoked(false)
        .invalid(false)
        .unknown_signer(false);
    let encoded = cert.encode();
    let decoded = Certificate::decode(&encoded).unwrap();
    assert_eq!(decoded, cert);
    assert!(decoded.is_trusted());
    assert_eq!(decoded.fingerprint(), "ab12");
    assert_eq!(decoded.dn(), "CN=test");
    assert_eq!(decoded.issuer(), "CN=ca");
}

#[test]
fn certificate_error_form_round_trips() {
    let cert = Certificate::with_error("bad cert");
    let decoded = Certificate::decode(&cert.encode()).unwrap();
    assert_eq!(decoded.error(), "bad cert");
    assert_eq!(decoded.fingerprint(), "");
    assert_eq!(decoded.dn(), "");
    assert_eq!(decoded.issuer(), "");
    assert!(!decoded.is_trusted());
    assert!(!decoded.is_usable());
    assert_eq!(decoded, cert);
}

#[test]
fn certificate_decode_accepts_short_and_rejects_bad_input() {
    let short = Certificate::decode("VTrSe ab12").unwrap();
    assert_eq!(short.fingerprint(), "ab12");
    assert_eq!(short.dn(), "");

    assert_eq!(Certificate::decode(""), Err(DecodeError::Empty));
    assert_eq!(Certificate::decode("VTxSe a b c"), Err(DecodeError::InvalidFlag('x')));
    assert!(Certificate::decode("vtrsE").is_err());
    assert!(Certificate::decode("VTrSe a\\q b c").is_err());
}

#[test]
fn entity_encoding_skips_local_only_extensions() {
    let registry = ExtensionRegistry::new();
    let owner = ModuleId::new("m");
    let account = registry
        .register_synced::<String>("accountname", EntityKind::User, &owner)
        .unwrap();
    let idle = registry
        .register_synced::<i64>("idle", EntityKind::User, &owner)
        .unwrap();
    let local = registry
        .register::<i64>("local_counter", EntityKind::User, &owner)
        .unwrap();

    let mut user = User::new("0ABAAAAAA", "alice");
    account.set(&mut user.ext, "alice\nsmith".into()).unwrap();
    idle.set(&mut user.ext, -3).unwrap();
    local.set(&mut user.ext, 9).unwrap();

    let tokens = encode_entity(&user.ext);
    assert_eq!(
        tokens,
        vec![
            SyncToken::set("accountname", "alice\\nsmith"),
            SyncToken::set("idle", "-3"),
        ]
    );

    let mut remote = User::remote("1CDAAAAAA", "alice");
    assert_eq!(apply_tokens(&registry, &mut remote.ext, &tokens), 2);
    assert_eq!(account.get(&remote.ext).map(String::as_str), Some("alice\nsmith"));
    assert_eq!(idle.get(&remote.ext), Some(&-3));
    assert!(local.get(&remote.ext).is_none());
}

#[test]
fn incoming_tokens_are_dropped_not_fatal() {
    let registry = ExtensionRegistry::new();
    let owner = ModuleId::new("m");
    let idle = registry
        .register_synced::<i64>("idle", EntityKind::User, &owner)
        .unwrap();
    registry
        .register::<i64>("local_counter", EntityKind::User, &owner)
        .unwrap();
    registry
        .register_synced::<bool>("chan_flag", EntityKind::Channel, &owner)
        .unwrap();

    let mut user = User::remote("1CDAAAAAA", "carol");
    let outcome = |user: &mut User, raw: &str| {
        apply_token(&registry, &mut user.ext, &SyncToken::parse(raw).unwrap())
    };
    assert_eq!(outcome(&mut user, "future_ext some value"), SyncOutcome::UnknownExtension);
    assert_eq!(outcome(&mut user, "local_counter 4"), SyncOutcome::LocalOnly);
    assert_eq!(outcome(&mut user, "chan_flag 1"), SyncOutcome::WrongKind);
    assert!(matches!(outcome(&mut user, "idle twelve"), SyncOutcome::Rejected(_)));
    assert!(user.ext.is_empty());

    assert_eq!(outcome(&mut user, "idle 12"), SyncOutcome::Applied);
    assert_eq!(idle.get(&user.ext), Some(&12));
    assert_eq!(outcome(&mut user, "idle"), SyncOutcome::Removed);
    assert!(idle.get(&user.ext).is_none());
}

#[test]
fn shared_certificate_payload_syncs() {
    let registry = ExtensionRegistry::new();
    let item = registry
        .register_synced::<Arc<Certificate>>("ssl_cert", EntityKind::User, &ModuleId::new("sslinfo"))
        .unwrap();
    let mut user = User::new("0ABAAAAAA", "alice");
    item.set(
        &mut user.ext,
        Arc::new(Certificate::new("ab12", "CN=alice smith", "CN=ca").trusted(true)),
    )
    .unwrap();

    let tokens = encode_entity(&user.ext);
    assert_eq!(tokens[0].to_string(), "ssl_cert VTrSe ab12 CN=alice\\ssmith CN=ca");

    let line = metadata_line("0ABAAAAAA", &tokens[0]);
    assert_eq!(line, "METADATA 0ABAAAAAA ssl_cert :VTrSe ab12 CN=alice\\ssmith CN=ca");
    let (target, token) = parse_metadata_line(&line).unwrap();
    assert_eq!(target, "0ABAAAAAA");

    let mut remote = User::remote("0ABAAAAAA", "alice");
    assert_eq!(apply_token(&registry, &mut remote.ext, &token), SyncOutcome::Applied);
    assert_eq!(item.get(&remote.ext).unwrap().dn(), "CN=alice smith");
}

#[test]
fn metadata_and_capability_lines() {
    let (target, token) = parse_metadata_line("METADATA #rust topic_lock").unwrap();
    assert_eq!(target, "#rust");
    assert_eq!(token, SyncToken::remove("topic_lock"));
    assert_eq!(metadata_line("#rust", &token), "METADATA #rust topic_lock");
    assert!(parse_metadata_line("PRIVMSG #rust :hi").is_err());
    assert!(parse_metadata_line("METADATA onlytarget").is_err());

    let registry = ExtensionRegistry::new();
    let owner = ModuleId::new("m");
    registry.register_synced::<i64>("zeta", EntityKind::User, &owner).unwrap();
    registry.register_synced::<i64>("alpha", EntityKind::User, &owner).unwrap();
    registry.register::<i64>("hidden", EntityKind::User, &owner).unwrap();
    let line = capability_line(&registry);
    assert_eq!(line, "EXTSYNC 1 alpha zeta");
    assert_eq!(
        parse_capability_line(&line).unwrap(),
        (1, vec!["alpha".to_string(), "zeta".to_string()])
    );
}

fn any_certificate() -> impl Strategy<Value = Certificate> {
    let flags = (any::<bool>(), any::<bool>(), any::<bool>(), any::<bool>());
    let full = ("[ -~]{0,16}", "[ -~\n]{0,24}", "[ -~\n]{0,24}")
        .prop_map(|(fp, dn, issuer)| Certificate::new(fp, dn, issuer));
    let failed = "[ -~\n]{1,24}".prop_map(|error: String| Certificate::with_error(error));
    (flags, prop_oneof![full, failed]).prop_map(|((v, t, r, s), cert)| {
        cert.invalid(v).trusted(t).revoked(r).unknown_signer(s)
    })
}

proptest! {
    #[test]
    fn certificate_encoding_is_lossless(cert in any_certificate()) {
        let encoded = cert.encode();
        prop_assert!(!encoded.contains('\n'));
        let decoded = Certificate::decode(&encoded).unwrap();
        prop_assert_eq!(&decoded, &cert);
        prop_assert_eq!(decoded.encode(), encoded);
    }

    #[test]
    fn certificate_decode_never_panics(raw in any::<String>()) {
        let _ = Certificate::decode(&raw);
    }

    #[test]
    fn string_decode_never_panics(raw in any::<String>()) {
        if let Ok(value) = String::decode(&raw) {
            prop_assert_eq!(String::decode(&value.encode()).unwrap(), value);
        }
    }

    #[test]
    fn sync_token_parsing_never_panics(raw in any::<String>()) {
        if let Ok(token) = SyncToken::parse(&raw) {
            prop_assert_eq!(token.to_string(), raw);
        }
    }
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
async fn unknown_extension_drop_is_logged() {
    let mem = Arc::new(MemorySink {
        events: Arc::new(Mutex::new(Vec::new())),
    });
    dispatcher::init_events(vec![mem.clone()], 64).await;

    let registry = ExtensionRegistry::new();
    let mut user = User::remote("1CDAAAAAA", "dave");
    let outcome = apply_token(&registry, &mut user.ext, &SyncToken::set("mystery", "42"));
    assert_eq!(outcome, SyncOutcome::UnknownExtension);

    tokio::time::sleep(Duration::from_millis(50)).await;

    let evts = mem.events.lock();
    assert!(
        evts.iter().any(|e| matches!(e, LogEvent::Extension(x)
            if x.action == "sync_dropped" && x.extension == "mystery")),
        "expected a sync_dropped event, got: {:?}",
        *evts
    );
}
