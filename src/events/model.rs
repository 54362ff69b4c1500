use serde::Serialize;
use std::time::SystemTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl std::str::FromStr for LogLevel {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let level = match s.to_ascii_lowercase().as_str() {
            "trace" | "rawio" => LogLevel::Trace,
            "debug" => LogLevel::Debug,
            "info" | "default" | "normal" => LogLevel::Info,
            "warn" | "warning" | "sparse" => LogLevel::Warn,
            "error" | "none" => LogLevel::Error,
            _ => return Err(()),
        };
        Ok(level)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EventMeta {
    pub ts: SystemTime,
    pub level: LogLevel,
    pub corr_id: Option<String>,
    pub session_id: String,
    pub component: &'static str,
    pub suppress_console: bool,
}

/// Snapshot build / install / rejection and lenient-read warnings.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigEvent {
    pub meta: EventMeta,
    pub action: String,
    pub source: Option<String>,
    pub errors: Vec<String>,
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtensionEvent {
    pub meta: EventMeta,
    pub action: String,
    pub extension: String,
    pub owner: Option<String>,
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModuleEvent {
    pub meta: EventMeta,
    pub module: String,
    pub action: String,
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HookEvent {
    pub meta: EventMeta,
    pub event: &'static str,
    pub action: String,
    pub owner: Option<String>,
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SystemEvent {
    pub meta: EventMeta,
    pub action: String,
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LogEvent {
    Config(ConfigEvent),
    Extension(ExtensionEvent),
    Module(ModuleEvent),
    Hook(HookEvent),
    System(SystemEvent),
}

impl LogEvent {
    pub fn meta(&self) -> &EventMeta {
        match self {
            LogEvent::Config(e) => &e.meta,
            LogEvent::Extension(e) => &e.meta,
            LogEvent::Module(e) => &e.meta,
            LogEvent::Hook(e) => &e.meta,
            LogEvent::System(e) => &e.meta,
        }
    }
}
