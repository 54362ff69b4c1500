use ircd_core::config::{parse, ConfigError, ConfigSource, ServerConfig};

fn source(text: &str) -> ConfigSource {
    ConfigSource::from_text("test.conf", text)
}

fn build(text: &str) -> Result<ServerConfig, Vec<ConfigError>> {
    let store = parse(&source(text))?;
    ServerConfig::build(store)
}

const SERVER: &str = r#"<server name="irc.example.net" description="Test server" id="0AB">"#;

#[test]
fn parse_errors_accumulate_with_locations() {
    let text = r#"<server name="irc.example.net" id="0AB">
<bad key=unquoted>
<limits maxnick="30" maxnick="40">
<ok a="1">
<x y="&bogus;">
"#;
    let errors = parse(&source(text)).unwrap_err();
    assert_eq!(errors.len(), 3, "got: {:?}", errors);
    let lines: Vec<usize> = errors
        .iter()
        .map(|e| e.location().expect("parse errors carry a location").line)
        .collect();
    assert_eq!(lines, vec![2, 3, 5]);
    assert!(errors.iter().all(|e| matches!(e, ConfigError::Parse { .. })));
    assert!(errors[0].to_string().starts_with("test.conf:2:"));
}

#[test]
fn comments_entities_and_defines() {
    let text = r#"
# network-wide settings
<define name="net" value="ExampleNet">
<server name="irc.example.net" network="&net;" id="0AB">
<motd text="a &amp; b &quot;quoted&quot; &lt;tag&gt;">
"#;
    let store = parse(&source(text)).unwrap();
    let server = store.get_tag("server", 0).unwrap();
    assert_eq!(server.string("network", ""), "ExampleNet");
    assert_eq!(server.location().line, 4);
    let motd = store.get_tag("motd", 0).unwrap();
    assert_eq!(motd.string("text", ""), r#"a & b "quoted" <tag>"#);
    // <define> is consumed by the parser.
    assert!(store.get_tag("define", 0).is_none());
}

#[test]
fn get_tag_by_occurrence() {
    let text = r#"<connect name="first"><connect name="second">"#;
    let store = parse(&source(text)).unwrap();
    assert_eq!(store.get_tag("connect", 0).unwrap().string("name", ""), "first");
    assert_eq!(store.get_tag("connect", 1).unwrap().string("name", ""), "second");
    assert!(store.get_tag("connect", 2).is_none());
    assert!(store.get_tag("missing", 0).is_none());
    assert_eq!(store.tags("connect").len(), 2);
}

#[test]
fn typed_readers() {
    let text = r#"<opts num="4k" neg="-5" f="1.5" on="ON" off="off" bad="maybe" multi="a&nl;b">"#;
    let store = parse(&source(text)).unwrap();
    let tag = store.get_tag("opts", 0).unwrap();
    assert_eq!(tag.integer("num", 0), 4096);
    assert_eq!(tag.integer("neg", 0), -5);
    assert_eq!(tag.integer("bad", 7), 7);
    assert_eq!(tag.float("f", 0.0), 1.5);
    assert!(tag.boolean("on", false));
    assert!(!tag.boolean("off", true));
    assert!(tag.boolean("bad", true));
    assert_eq!(tag.string("multi", ""), "a b");

    assert!(matches!(
        tag.read_required_string("multi", false),
        Err(ConfigError::InvalidValue { .. })
    ));
    assert_eq!(tag.read_required_string("multi", true).unwrap(), "a\nb");
    match tag.read_required_string("absent", false) {
        Err(ConfigError::MissingKey { tag, key, location }) => {
            assert_eq!(tag, "opts");
            assert_eq!(key, "absent");
            assert_eq!(location.line, 1);
        }
        other => panic!("expected MissingKey, got {:?}", other),
    }
}

#[test]
fn includes_resolve_relative_to_the_including_file() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("conf.d")).unwrap();
    std::fs::write(
        dir.path().join("ircd.conf"),
        format!("{}\n<include file=\"conf.d/opers.conf\">\n", SERVER),
    )
    .unwrap();
    std::fs::write(
        dir.path().join("conf.d/opers.conf"),
        "<class name=\"all\" commands=\"*\">\n<type name=\"Admin\" classes=\"all\">\n<include file=\"more.conf\">\n",
    )
    .unwrap();
    std::fs::write(
        dir.path().join("conf.d/more.conf"),
        "\n<oper name=\"root\" type=\"Admin\" password=\"x\">\n",
    )
    .unwrap();

    let source = ConfigSource::from_path(dir.path().join("ircd.conf")).unwrap();
    let store = parse(&source).unwrap();
    let oper = store.get_tag("oper", 0).unwrap();
    assert!(oper.location().file.ends_with("more.conf"));
    assert_eq!(oper.location().line, 2);
    let config = ServerConfig::build(store).unwrap();
    assert_eq!(config.oper("root").unwrap().oper_type.name, "Admin");
}

#[test]
fn include_errors_point_at_the_included_file() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("main.conf"), "<include file=\"bad.conf\">\n").unwrap();
    std::fs::write(dir.path().join("bad.conf"), "<ok a=\"1\">\n<broken a=>\n").unwrap();
    let source = ConfigSource::from_path(dir.path().join("main.conf")).unwrap();
    let errors = parse(&source).unwrap_err();
    assert_eq!(errors.len(), 1);
    let location = errors[0].location().unwrap();
    assert!(location.file.ends_with("bad.conf"));
    assert_eq!(location.line, 2);
}

#[test]
fn self_include_hits_the_depth_limit() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("loop.conf"), "<include file=\"loop.conf\">\n").unwrap();
    let source = ConfigSource::from_path(dir.path().join("loop.conf")).unwrap();
    let errors = parse(&source).unwrap_err();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].to_string().contains("include depth"));
}

#[test]
fn includes_need_a_base_directory() {
    let errors = parse(&source("<include file=\"other.conf\">")).unwrap_err();
    assert_eq!(errors.len(), 1);

    let dir = tempfile::tempdir().unwrap();
    let opers = dir.path().join("opers.conf");
    std::fs::write(&opers, "<class name=\"all\" commands=\"*\">\n").unwrap();
    let text = format!("{}\n<include file=\"{}\">", SERVER, opers.display());

    // The file exists, but in-memory text may not reach for it.
    let errors = parse(&source(&text)).unwrap_err();
    assert_eq!(errors.len(), 1);
    assert!(matches!(errors[0], ConfigError::Parse { .. }));
    assert!(errors[0].to_string().starts_with("test.conf:2:"));
    assert!(errors[0].to_string().contains("without a base directory"));

    let store = parse(&source(&text).with_base_dir(dir.path())).unwrap();
    assert!(store.get_tag("class", 0).is_some());
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = ConfigSource::from_path(dir.path().join("nope.conf")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}

#[test]
fn server_identity_is_required_and_checked() {
    let errors = build("<admin name=\"x\">").unwrap_err();
    assert_eq!(errors.len(), 1);

    let errors = build(r#"<server description="no name">"#).unwrap_err();
    assert_eq!(errors.len(), 2);
    assert!(errors.iter().all(|e| matches!(e, ConfigError::MissingKey { .. })));

    let errors = build(r#"<server name="irc.example.net" id="ABC">"#).unwrap_err();
    assert!(matches!(&errors[0], ConfigError::InvalidValue { key, .. } if key == "id"));

    let config = build(SERVER).unwrap();
    assert_eq!(config.server().name, "irc.example.net");
    assert_eq!(config.server().sid, "0AB");
    assert_eq!(config.server().network, "Network");
}

#[test]
fn limits_default_and_must_be_positive() {
    let config = build(SERVER).unwrap();
    assert_eq!(config.limits().max_nick, 31);
    assert_eq!(config.limits().max_topic, 307);

    let errors = build(&format!("{}<limits maxnick=\"0\" maxchan=\"-1\">", SERVER)).unwrap_err();
    assert_eq!(errors.len(), 2);
}

#[test]
fn oversized_counts_are_rejected_not_truncated() {
    let errors = build(&format!(
        "{}\n<whowas groupsize=\"4g\">\n<performance softlimit=\"4g\">",
        SERVER
    ))
    .unwrap_err();
    let keys: Vec<&str> = errors
        .iter()
        .map(|e| match e {
            ConfigError::InvalidValue { key, .. } => key.as_str(),
            other => panic!("expected InvalidValue, got {:?}", other),
        })
        .collect();
    assert_eq!(keys, vec!["groupsize", "softlimit"]);
    assert!(errors[0].to_string().contains("must not exceed"));

    let config = build(&format!("{}<whowas groupsize=\"2k\" maxgroups=\"1m\">", SERVER)).unwrap();
    assert_eq!(config.whowas().group_size, 2048);
    assert_eq!(config.whowas().max_groups, 1024 * 1024);
}

#[test]
fn singleton_tags_may_appear_once() {
    let errors = build(&format!(
        "{}\n<limits maxnick=\"20\">\n<server name=\"other.example.net\" id=\"1CD\">\n<limits maxnick=\"10\">",
        SERVER
    ))
    .unwrap_err();
    assert_eq!(errors.len(), 2, "{:?}", errors);
    assert!(errors.iter().all(|e| matches!(e, ConfigError::Validation { .. })));
    let text: Vec<String> = errors.iter().map(ToString::to_string).collect();
    assert!(text.iter().any(|e| e.starts_with("test.conf:3: <server> may only appear once (first defined at test.conf:1)")), "{:?}", text);
    assert!(text.iter().any(|e| e.starts_with("test.conf:4: <limits> may only appear once (first defined at test.conf:2)")), "{:?}", text);

    // Repeatable tags are unaffected.
    build(&format!("{}<connect name=\"a\"><connect name=\"b\">", SERVER)).unwrap();
}

#[test]
fn whowas_ordering_is_enforced() {
    let errors =
        build(&format!("{}<whowas groupsize=\"100\" maxgroups=\"10\">", SERVER)).unwrap_err();
    assert_eq!(errors.len(), 1);
    assert!(matches!(errors[0], ConfigError::Validation { .. }));
}

#[test]
fn disabled_command_toggles_are_independent() {
    let config = build(&format!(
        "{}<disabled commands=\"knock  list\" fakenonexistent=\"yes\">",
        SERVER
    ))
    .unwrap();
    let disabled = config.disabled();
    assert!(disabled.is_disabled("LIST"));
    assert!(disabled.is_disabled("knock"));
    assert!(!disabled.is_disabled("WHO"));
    assert!(disabled.fake_nonexistent);
    assert!(!disabled.notify_opers);
}

#[test]
fn connect_classes_inherit_from_parents() {
    let config = build(&format!(
        r#"{}
<connect name="base" requiressl="yes" hardsendq="1m">
<connect name="users" parent="base" softsendq="16k">
"#,
        SERVER
    ))
    .unwrap();
    let users = config.class("users").unwrap();
    assert_eq!(users.parent.as_deref(), Some("base"));
    assert_eq!(users.soft_sendq, 16 * 1024);
    assert_eq!(users.hard_sendq, 1024 * 1024);
    assert!(users.config.boolean("requiressl", false));
}

#[test]
fn connect_class_cross_checks() {
    let errors = build(&format!(
        r#"{}
<connect name="a" parent="b">
<connect name="b" parent="a">
<connect name="c" parent="nowhere">
<connect name="c">
<connect name="d" softsendq="2m" hardsendq="1m">
"#,
        SERVER
    ))
    .unwrap_err();
    let text: Vec<String> = errors.iter().map(ToString::to_string).collect();
    assert!(text.iter().any(|e| e.contains("cyclic")), "{:?}", text);
    assert!(text.iter().any(|e| e.contains("undefined parent class 'nowhere'")), "{:?}", text);
    assert!(text.iter().any(|e| e.contains("duplicate <connect")), "{:?}", text);
    assert!(text.iter().any(|e| e.contains("exceeds hardsendq")), "{:?}", text);
}

#[test]
fn oper_references_must_resolve() {
    let errors = build(&format!(
        r#"{}
<class name="basic" commands="kill">
<type name="Helper" classes="basic missing">
<oper name="bob" type="Ghost" password="x">
"#,
        SERVER
    ))
    .unwrap_err();
    assert_eq!(errors.len(), 2, "{:?}", errors);

    let config = build(&format!(
        r#"{}
<class name="basic" commands="kill wallops">
<class name="more" commands="KILL die">
<type name="Helper" classes="basic more">
<oper name="bob" type="helper" password="x">
"#,
        SERVER
    ))
    .unwrap();
    let bob = config.oper("bob").unwrap();
    assert_eq!(bob.oper_type.commands, vec!["KILL", "WALLOPS", "DIE"]);
}
