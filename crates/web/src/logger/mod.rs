//! Leveled application logger.
//!
//! [`Logger`] is a cheap, cloneable handle shared by the server, the
//! dispatcher and every request (it is mapped into each request's injection
//! registry). Messages at or above the configured [`LogLevel`] go to the
//! console through `tracing` events on the `cosine` target, and optionally
//! to a rotating [`FileSink`].
//!
//! File rotation is checked by a background task once per second between
//! [`Logger::start_rotation`] and [`Logger::stop_rotation`]; the task is
//! aborted when the last handle is dropped.

mod file;

pub use file::{FileSink, RotationPolicy};

use std::fmt::{self, Display};
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Deserialize;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::LogConfig;

const ROTATION_INTERVAL: Duration = Duration::from_secs(1);

/// Log levels, ordered from most to least verbose.
///
/// `All` and `Off` are thresholds only: a logger at `All` emits every
/// message, a logger at `Off` emits none, and neither is a level messages
/// are emitted at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    #[default]
    All,
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
    Off,
}

impl LogLevel {
    /// The fixed-width tag written in front of every message.
    pub fn tag(self) -> &'static str {
        match self {
            LogLevel::All => "[ALL  ]",
            LogLevel::Debug => "[DEBUG]",
            LogLevel::Info => "[INFO ]",
            LogLevel::Warn => "[WARN ]",
            LogLevel::Error => "[ERROR]",
            LogLevel::Fatal => "[FATAL]",
            LogLevel::Off => "[OFF  ]",
        }
    }

    /// The most verbose `tracing` level this threshold lets through.
    pub fn as_tracing_filter(self) -> tracing::level_filters::LevelFilter {
        use tracing::level_filters::LevelFilter;
        match self {
            LogLevel::All => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error | LogLevel::Fatal => LevelFilter::ERROR,
            LogLevel::Off => LevelFilter::OFF,
        }
    }
}

impl Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogLevel::All => "all",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Fatal => "fatal",
            LogLevel::Off => "off",
        };
        f.write_str(name)
    }
}

impl FromStr for LogLevel {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(LogLevel::All),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            "fatal" => Ok(LogLevel::Fatal),
            "off" => Ok(LogLevel::Off),
            _ => Err(LogError::UnknownLevel(s.to_owned())),
        }
    }
}

#[derive(Error, Debug)]
pub enum LogError {
    #[error("log file '{}' i/o failed: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("log file '{}' is not open", path.display())]
    NotOpen { path: PathBuf },

    #[error("unknown log level '{0}'")]
    UnknownLevel(String),
}

impl LogError {
    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        Self::Io { path: path.to_path_buf(), source }
    }
}

#[derive(Clone)]
pub struct Logger {
    inner: Arc<Inner>,
}

struct Inner {
    level: LogLevel,
    console: bool,
    file: Option<Arc<FileSink>>,
    rotation: Mutex<Option<JoinHandle<()>>>,
}

impl Logger {
    pub fn new(level: LogLevel, console: bool, file: Option<FileSink>) -> Self {
        let inner = Inner { level, console, file: file.map(Arc::new), rotation: Mutex::new(None) };
        Self { inner: Arc::new(inner) }
    }

    /// A console-only logger.
    pub fn console(level: LogLevel) -> Self {
        Self::new(level, true, None)
    }

    /// Builds the logger described by `config`, opening its file sink if
    /// rolling or daily files are enabled.
    pub fn from_config(config: &LogConfig) -> Result<Self, LogError> {
        let file = match config.rotation() {
            Some(policy) => Some(FileSink::open(&config.dir, &config.file, policy)?),
            None => None,
        };
        Ok(Self::new(config.level, config.console, file))
    }

    pub fn level(&self) -> LogLevel {
        self.inner.level
    }

    pub fn file_sink(&self) -> Option<&FileSink> {
        self.inner.file.as_deref()
    }

    /// Whether a message at `level` would be written anywhere.
    pub fn enabled(&self, level: LogLevel) -> bool {
        level != LogLevel::All && level != LogLevel::Off && level >= self.inner.level
    }

    pub fn log(&self, level: LogLevel, message: impl Display) {
        if !self.enabled(level) {
            return;
        }
        self.write(level, &message.to_string());
    }

    /// Logs `values` joined by single spaces.
    pub fn emit(&self, level: LogLevel, values: &[&dyn Display]) {
        if !self.enabled(level) {
            return;
        }

        let message = values.iter().map(ToString::to_string).collect::<Vec<_>>().join(" ");
        self.write(level, &message);
    }

    pub fn debug(&self, message: impl Display) {
        self.log(LogLevel::Debug, message);
    }

    pub fn info(&self, message: impl Display) {
        self.log(LogLevel::Info, message);
    }

    pub fn warn(&self, message: impl Display) {
        self.log(LogLevel::Warn, message);
    }

    pub fn error(&self, message: impl Display) {
        self.log(LogLevel::Error, message);
    }

    /// Logs at fatal level. The process is not terminated.
    pub fn fatal(&self, message: impl Display) {
        self.log(LogLevel::Fatal, message);
    }

    fn write(&self, level: LogLevel, message: &str) {
        let tag = level.tag();

        if let Some(file) = &self.inner.file
            && let Err(e) = file.write_line(tag, message)
        {
            warn!(target: "cosine::logger", cause = %e, "failed to write log file");
        }

        if self.inner.console {
            match level {
                LogLevel::Debug => debug!(target: "cosine", "{tag} {message}"),
                LogLevel::Info => info!(target: "cosine", "{tag} {message}"),
                LogLevel::Warn => warn!(target: "cosine", "{tag} {message}"),
                LogLevel::Error | LogLevel::Fatal => error!(target: "cosine", "{tag} {message}"),
                LogLevel::All | LogLevel::Off => {}
            }
        }
    }

    /// Starts the once-per-second rotation check on the current tokio
    /// runtime. Does nothing without a file sink or when already started.
    pub fn start_rotation(&self) {
        let Some(file) = &self.inner.file else {
            return;
        };

        let mut rotation = self.inner.rotation.lock();
        if rotation.is_some() {
            return;
        }

        let sink = Arc::clone(file);
        *rotation = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(ROTATION_INTERVAL);
            loop {
                ticker.tick().await;
                let sink = Arc::clone(&sink);
                match tokio::task::spawn_blocking(move || sink.check()).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => warn!(target: "cosine::logger", cause = %e, "log rotation failed"),
                    Err(e) => warn!(target: "cosine::logger", cause = %e, "log rotation check panicked"),
                }
            }
        }));
        debug!(target: "cosine::logger", path = %file.path().display(), "log rotation started");
    }

    pub fn stop_rotation(&self) {
        if let Some(handle) = self.inner.rotation.lock().take() {
            handle.abort();
            debug!(target: "cosine::logger", "log rotation stopped");
        }
    }

    pub fn is_rotating(&self) -> bool {
        self.inner.rotation.lock().is_some()
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::console(LogLevel::All)
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("level", &self.inner.level)
            .field("console", &self.inner.console)
            .field("file", &self.inner.file)
            .finish()
    }
}

/// Aborts the rotation task once the last handle is gone.
impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(handle) = self.rotation.get_mut().take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn file_logger(level: LogLevel) -> (tempfile::TempDir, Logger) {
        let tmp = tempfile::tempdir().unwrap();
        let sink = FileSink::open(tmp.path(), "test.log", RotationPolicy::Daily).unwrap();
        (tmp, Logger::new(level, false, Some(sink)))
    }

    fn content(logger: &Logger) -> String {
        fs::read_to_string(logger.file_sink().unwrap().path()).unwrap()
    }

    #[test]
    fn test_level_order() {
        assert!(LogLevel::All < LogLevel::Debug);
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Warn);
        assert!(LogLevel::Warn < LogLevel::Error);
        assert!(LogLevel::Error < LogLevel::Fatal);
        assert!(LogLevel::Fatal < LogLevel::Off);
    }

    #[test]
    fn test_level_parse() {
        assert_eq!("INFO".parse::<LogLevel>().unwrap(), LogLevel::Info);
        assert_eq!("off".parse::<LogLevel>().unwrap(), LogLevel::Off);
        assert!(matches!("verbose".parse::<LogLevel>(), Err(LogError::UnknownLevel(_))));
        assert_eq!(LogLevel::Warn.to_string(), "warn");
    }

    #[test]
    fn test_enabled() {
        let logger = Logger::console(LogLevel::Warn);
        assert!(!logger.enabled(LogLevel::Info));
        assert!(logger.enabled(LogLevel::Warn));
        assert!(logger.enabled(LogLevel::Fatal));
        assert!(!logger.enabled(LogLevel::Off));

        let off = Logger::console(LogLevel::Off);
        assert!(!off.enabled(LogLevel::Fatal));

        let all = Logger::default();
        assert!(all.enabled(LogLevel::Debug));
        assert!(!all.enabled(LogLevel::All));
    }

    #[test]
    fn test_file_filtering() {
        let (_tmp, logger) = file_logger(LogLevel::Warn);
        logger.debug("hidden debug");
        logger.info("hidden info");
        logger.warn("disk almost full");
        logger.fatal("out of disk");

        let content = content(&logger);
        assert!(!content.contains("hidden"));
        assert!(content.contains("[WARN ] disk almost full"));
        assert!(content.contains("[FATAL] out of disk"));
    }

    #[test]
    fn test_emit_joins_values() {
        let (_tmp, logger) = file_logger(LogLevel::All);
        logger.emit(LogLevel::Info, &[&"127.0.0.1:5000", &"-", &"GET", &"-", &"/users/1"]);
        logger.emit(LogLevel::Error, &[&"code", &404]);

        let content = content(&logger);
        assert!(content.contains("[INFO ] 127.0.0.1:5000 - GET - /users/1"));
        assert!(content.contains("[ERROR] code 404"));
    }

    #[test]
    fn test_clones_share_sink() {
        let (_tmp, logger) = file_logger(LogLevel::All);
        let clone = logger.clone();
        clone.error("from the clone");
        assert!(content(&logger).contains("from the clone"));
    }

    #[test]
    fn test_from_config() {
        let tmp = tempfile::tempdir().unwrap();
        let config = LogConfig {
            level: LogLevel::Info,
            console: false,
            daily_file: true,
            dir: tmp.path().to_path_buf(),
            file: "svc.log".into(),
            ..LogConfig::default()
        };

        let logger = Logger::from_config(&config).unwrap();
        assert_eq!(logger.level(), LogLevel::Info);
        assert_eq!(logger.file_sink().unwrap().policy(), RotationPolicy::Daily);
        assert!(tmp.path().join("svc.log").exists());

        let console_only = Logger::from_config(&LogConfig::default()).unwrap();
        assert!(console_only.file_sink().is_none());
    }

    #[tokio::test]
    async fn test_rotation_lifecycle() {
        let (_tmp, logger) = file_logger(LogLevel::All);
        assert!(!logger.is_rotating());

        logger.start_rotation();
        logger.start_rotation();
        assert!(logger.is_rotating());

        logger.stop_rotation();
        assert!(!logger.is_rotating());
    }

    #[tokio::test]
    async fn test_rotation_task_rolls_file() {
        let tmp = tempfile::tempdir().unwrap();
        let sink = FileSink::open(tmp.path(), "test.log", RotationPolicy::Size { max_bytes: 8 }).unwrap();
        let logger = Logger::new(LogLevel::All, false, Some(sink));
        logger.info("a line well over eight bytes");

        logger.start_rotation();
        let mut entries = 0;
        for _ in 0..60 {
            tokio::time::sleep(Duration::from_millis(50)).await;
            entries = fs::read_dir(tmp.path()).unwrap().count();
            if entries == 2 {
                break;
            }
        }
        logger.stop_rotation();

        assert_eq!(entries, 2);
        assert_eq!(content(&logger), "");
    }

    #[tokio::test]
    async fn test_rotation_needs_file() {
        let logger = Logger::console(LogLevel::All);
        logger.start_rotation();
        assert!(!logger.is_rotating());
    }
}
