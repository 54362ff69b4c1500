use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use ircd_core::{
    config::{ConfigError, ConfigLifecycle, ConfigSource},
    constants::*,
    entities::{Directory, Server},
    events::{
        dispatcher::{self, EventDispatcher},
        model::{LogEvent, LogLevel, SystemEvent},
    },
    extensible::ExtensionRegistry,
    module_host::ModuleManager,
    modules::SslInfoModule,
    pipeline::EventPipeline,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "IRC server daemon core")]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Validate the configuration and exit
    #[arg(long)]
    check: bool,

    /// Minimum console log level (overrides <log level>)
    #[arg(long)]
    log_level: Option<String>,
}

fn print_errors(errors: &[ConfigError]) {
    for e in errors {
        eprintln!("   {}", e);
    }
}

fn system_event(level: LogLevel, action: &str, detail: Option<String>) {
    let mut meta = dispatcher::meta("daemon", level);
    meta.corr_id = Some(dispatcher::correlation_id());
    dispatcher::emit(LogEvent::System(SystemEvent {
        meta,
        action: action.into(),
        detail,
    }));
}

fn reload(lifecycle: &ConfigLifecycle, path: &PathBuf) {
    let result = ConfigSource::from_path(path)
        .map_err(|e| vec![e])
        .and_then(|source| lifecycle.reload(&source));
    match result {
        Ok(()) => println!(
            "{}Configuration reloaded (generation {})",
            ICON_PLACEHOLDER,
            lifecycle.generation()
        ),
        Err(errors) => {
            eprintln!("❌ Reload of '{}' rejected, keeping the current configuration:", path.display());
            print_errors(&errors);
        }
    }
}

#[cfg(unix)]
async fn hangup(signal: &mut Option<tokio::signal::unix::Signal>) {
    match signal {
        Some(s) => {
            s.recv().await;
        }
        None => std::future::pending::<()>().await,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let source = match ConfigSource::from_path(&args.config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    };
    // No last-good snapshot exists yet, so an invalid startup configuration is fatal.
    let lifecycle = match ConfigLifecycle::startup(&source) {
        Ok(l) => Arc::new(l),
        Err(errors) => {
            eprintln!("❌ Configuration '{}' is invalid:", source.name());
            print_errors(&errors);
            std::process::exit(1);
        }
    };
    println!("{}Loaded config from: {}", ICON_PLACEHOLDER, source.name());
    if args.check {
        println!("🟢 Configuration OK");
        return Ok(());
    }

    // Initialize events AFTER config is loaded so the <log> settings apply
    let console_level = match args.log_level.as_deref() {
        Some(raw) => match raw.parse::<LogLevel>() {
            Ok(level) => Some(level),
            Err(()) => {
                eprintln!("⚠️ Unknown log level '{}', using the configured level", raw);
                None
            }
        },
        None => None,
    };
    let snapshot = lifecycle.current();
    let log_settings =
        ircd_core::events::init_events_with_options(Some(snapshot.logging()), console_level).await;
    lifecycle.add_dependent(log_settings);
    system_event(
        LogLevel::Info,
        "startup",
        Some(format!(
            "server={} sid={} version={}",
            snapshot.server().name,
            snapshot.server().sid,
            full_version()
        )),
    );

    let extensions = Arc::new(ExtensionRegistry::new());
    let pipeline = Arc::new(EventPipeline::new());
    let mut modules = ModuleManager::new(extensions.clone(), pipeline.clone(), lifecycle.clone());
    if let Err(e) = modules.load(Box::new(SslInfoModule::new())) {
        eprintln!("❌ {:#}", e);
    }

    let mut directory = Directory::new(Server::new(
        snapshot.server().name.clone(),
        snapshot.server().sid.clone(),
    ));
    drop(snapshot);

    println!(
        "🟢 {} is running. Send SIGHUP to reload, Ctrl+C to shut down...",
        lifecycle.current().server().name
    );

    #[cfg(unix)]
    let mut sighup = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::hangup()).ok();

    loop {
        #[cfg(unix)]
        {
            tokio::select! {
                _ = hangup(&mut sighup) => reload(&lifecycle, &args.config),
                _ = tokio::signal::ctrl_c() => break,
            }
        }
        #[cfg(not(unix))]
        {
            tokio::signal::ctrl_c().await?;
            break;
        }
    }

    println!("🛑 {} shutting down gracefully.", lifecycle.current().server().name);
    for name in modules.names().into_iter().rev() {
        if let Err(e) = modules.unload(&name, &mut directory) {
            eprintln!("⚠️ {:#}", e);
        }
    }
    system_event(LogLevel::Info, "shutdown", None);
    if let Some(d) = EventDispatcher::global() {
        d.flush().await;
    }
    Ok(())
}
