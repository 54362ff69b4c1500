use crate::config::{ConfigDependent, LoggingConfig, ServerConfig};
use crate::emit_config_event;
use crate::events::dispatcher::init_events;
use crate::events::model::LogLevel;
use crate::events::sink::{ConsoleSink, JsonFileSink, LogSink};
use std::sync::Arc;

/// Initialize events using optional logging config and console minimum level filter.
/// An explicit `console_min_level` wins over the level configured in `<log>`.
///
/// The returned handle re-derives the console level on every reload and
/// should be registered with the config lifecycle.
pub async fn init_events_with_options(
    logging: Option<&LoggingConfig>,
    console_min_level: Option<LogLevel>,
) -> Arc<LogSettings> {
    let mut sinks: Vec<Arc<dyn LogSink>> = Vec::new();

    let console = logging.map(|l| l.console).unwrap_or(true);
    let console_sink = if console {
        let level = console_min_level.or_else(|| logging.map(|l| l.level));
        let sink = Arc::new(ConsoleSink::new(level));
        sinks.push(sink.clone());
        Some(sink)
    } else {
        None
    };

    if let Some(path) = logging.and_then(|l| l.json_path.clone()) {
        let max_bytes = logging.map(|l| l.max_bytes).unwrap_or(5 * 1024 * 1024);
        let rotate = logging.map(|l| l.rotate).unwrap_or(3);
        match JsonFileSink::new(&path, rotate > 0, max_bytes, rotate).await {
            Ok(json_sink) => sinks.push(Arc::new(json_sink)),
            Err(e) => eprintln!("⚠️ Unable to open event log '{}': {}", path, e),
        }
    }
    init_events(sinks, 1024).await;

    Arc::new(LogSettings::new(
        console_sink,
        console_min_level,
        logging.cloned().unwrap_or_default(),
    ))
}

/// Keeps the running sinks in line with `<log>` across reloads.
///
/// The console level follows the new snapshot unless it was pinned on the
/// command line. Sink set changes (console on/off, JSON path, rotation)
/// need a restart and are reported as such.
pub struct LogSettings {
    console: Option<Arc<ConsoleSink>>,
    pinned: Option<LogLevel>,
    started_with: LoggingConfig,
}

impl LogSettings {
    pub fn new(
        console: Option<Arc<ConsoleSink>>,
        pinned: Option<LogLevel>,
        started_with: LoggingConfig,
    ) -> Self {
        Self {
            console,
            pinned,
            started_with,
        }
    }
}

impl ConfigDependent for LogSettings {
    fn name(&self) -> &str {
        "log"
    }

    fn apply(&self, candidate: &Arc<ServerConfig>) {
        let next = candidate.logging();
        if let (Some(console), None) = (&self.console, self.pinned) {
            if console.level() != Some(next.level) {
                console.set_level(Some(next.level));
            }
        }
        let started = &self.started_with;
        if next.console != started.console
            || next.json_path != started.json_path
            || next.max_bytes != started.max_bytes
            || next.rotate != started.rotate
        {
            emit_config_event!(
                LogLevel::Warn,
                "restart_required",
                None,
                Vec::<String>::new(),
                Some("<log> sink settings change on restart".to_string())
            );
        }
    }
}
