use crate::{
    constants::ICON_PLACEHOLDER,
    events::model::{LogEvent, LogLevel},
};
use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

#[async_trait]
pub trait LogSink: Send + Sync {
    async fn handle(&self, event: &LogEvent);
    async fn flush(&self) {}
}

pub struct ConsoleSink {
    level_filter: parking_lot::RwLock<Option<LogLevel>>,
}
impl ConsoleSink {
    pub fn new(level_filter: Option<LogLevel>) -> Self {
        Self {
            level_filter: parking_lot::RwLock::new(level_filter),
        }
    }

    pub fn level(&self) -> Option<LogLevel> {
        *self.level_filter.read()
    }

    /// Change the minimum level; applies to the next event handled.
    pub fn set_level(&self, level_filter: Option<LogLevel>) {
        *self.level_filter.write() = level_filter;
    }
}

fn level_rank(level: LogLevel) -> u8 {
    match level {
        LogLevel::Trace => 0,
        LogLevel::Debug => 1,
        LogLevel::Info => 2,
        LogLevel::Warn => 3,
        LogLevel::Error => 4,
    }
}

#[async_trait]
impl LogSink for ConsoleSink {
    async fn handle(&self, event: &LogEvent) {
        let meta = event.meta();
        if meta.suppress_console {
            return;
        }
        if let Some(min) = self.level() {
            if level_rank(meta.level) < level_rank(min) {
                return;
            }
        }
        match event {
            LogEvent::Config(c) => {
                println!(
                    "{}CONFIG action={} source={:?} errors={} detail={:?}",
                    ICON_PLACEHOLDER,
                    c.action,
                    c.source,
                    c.errors.len(),
                    c.detail
                );
                for err in &c.errors {
                    println!("{}  {}", ICON_PLACEHOLDER, err);
                }
            }
            LogEvent::Extension(e) => {
                println!(
                    "{}EXT action={} name={} owner={:?} detail={:?}",
                    ICON_PLACEHOLDER, e.action, e.extension, e.owner, e.detail
                );
            }
            LogEvent::Module(m) => {
                println!(
                    "{}MODULE name={} action={} detail={:?}",
                    ICON_PLACEHOLDER, m.module, m.action, m.detail
                );
            }
            LogEvent::Hook(h) => {
                println!(
                    "{}HOOK event={} action={} owner={:?} detail={:?}",
                    ICON_PLACEHOLDER, h.event, h.action, h.owner, h.detail
                );
            }
            LogEvent::System(s) => {
                println!(
                    "{}SYS action={} detail={:?} corr={:?}",
                    ICON_PLACEHOLDER, s.action, s.detail, s.meta.corr_id
                );
            }
        }
    }
}

pub struct JsonFileSink {
    path: std::path::PathBuf,
    rotate: bool,
    max_size_bytes: u64,
    max_backups: u32,
    writer: tokio::sync::Mutex<Option<tokio::fs::File>>,
}

impl JsonFileSink {
    pub async fn new<P: Into<std::path::PathBuf>>(
        path: P,
        rotate: bool,
        max_size_bytes: u64,
        max_backups: u32,
    ) -> std::io::Result<Self> {
        let pb = path.into();
        if let Some(parent) = pb.parent() {
            tokio::fs::create_dir_all(parent).await.ok();
        }
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&pb)
            .await?;
        Ok(Self {
            path: pb,
            rotate,
            max_size_bytes,
            max_backups,
            writer: tokio::sync::Mutex::new(Some(file)),
        })
    }
    async fn rotate_if_needed(&self) {
        if !self.rotate {
            return;
        }
        if let Ok(meta) = tokio::fs::metadata(&self.path).await {
            if meta.len() >= self.max_size_bytes {
                let _ = self.perform_rotation().await;
            }
        }
    }
    async fn perform_rotation(&self) -> std::io::Result<()> {
        let mut guard = self.writer.lock().await;
        *guard = None;
        for idx in (1..self.max_backups).rev() {
            let from = self.path.with_extension(format!("jsonl.{}", idx));
            let to = self.path.with_extension(format!("jsonl.{}", idx + 1));
            if tokio::fs::metadata(&from).await.is_ok() {
                let _ = tokio::fs::rename(&from, &to).await;
            }
        }
        // Reopen whatever sits at `path` even if the rename failed, so the
        // sink keeps writing instead of going silent.
        let renamed = if self.max_backups > 0 {
            tokio::fs::rename(&self.path, self.path.with_extension("jsonl.1")).await
        } else {
            Ok(())
        };
        let file = self.open().await?;
        *guard = Some(file);
        renamed
    }

    async fn open(&self) -> std::io::Result<tokio::fs::File> {
        let mut options = tokio::fs::OpenOptions::new();
        options.create(true);
        if self.max_backups > 0 {
            options.append(true);
        } else {
            options.write(true).truncate(true);
        }
        options.open(&self.path).await
    }
}

#[async_trait]
impl LogSink for JsonFileSink {
    async fn handle(&self, event: &LogEvent) {
        self.rotate_if_needed().await;
        if let Ok(json) = serde_json::to_string(event) {
            let mut guard = self.writer.lock().await;
            if let Some(f) = guard.as_mut() {
                let _ = f.write_all(json.as_bytes()).await;
                let _ = f.write_all(b"\n").await;
            }
        }
    }
    async fn flush(&self) {
        let mut guard = self.writer.lock().await;
        if let Some(f) = guard.as_mut() {
            let _ = f.flush().await;
            let _ = f.sync_all().await;
        }
    }
}
