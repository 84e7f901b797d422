//! Append-only log file with size or date based rotation.
//!
//! Lines are written under the sink's read lock so concurrent emitters never
//! wait on each other; a rotation takes the write lock, renames the current
//! file aside and reopens a fresh one.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDate};
use parking_lot::RwLock;
use tracing::debug;

use crate::logger::LogError;

const LINE_PREFIX: &str = "[Cosine]";
const TIMESTAMP_FORMAT: &str = "%Y/%m/%d %H:%M:%S%.6f";
const DATE_SUFFIX_FORMAT: &str = "%Y-%m-%d";

/// When the log file is rolled over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationPolicy {
    /// Roll to `<file>.<unix-seconds>` once the file reaches `max_bytes`.
    Size { max_bytes: u64 },
    /// Roll to `<file>.<YYYY-MM-DD>` once the local date changes.
    Daily,
}

pub struct FileSink {
    path: PathBuf,
    policy: RotationPolicy,
    state: RwLock<FileState>,
}

struct FileState {
    file: Option<File>,
    opened_on: NaiveDate,
}

impl FileSink {
    /// Opens `<dir>/<file_name>` for appending, creating the directory and
    /// the file as needed, and applies the policy once.
    pub fn open(dir: impl AsRef<Path>, file_name: &str, policy: RotationPolicy) -> Result<Self, LogError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(|e| LogError::io(dir, e))?;

        let path = dir.join(file_name);
        let file = open_append(&path)?;
        let sink = Self { path, policy, state: RwLock::new(FileState { file: Some(file), opened_on: Local::now().date_naive() }) };
        sink.check()?;
        Ok(sink)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn policy(&self) -> RotationPolicy {
        self.policy
    }

    /// Appends one formatted line.
    ///
    /// The line is written with a single `write` on an append-mode file, so
    /// lines from concurrent emitters never interleave.
    pub fn write_line(&self, tag: &str, message: &str) -> Result<(), LogError> {
        let state = self.state.read();
        let Some(file) = state.file.as_ref() else {
            return Err(LogError::NotOpen { path: self.path.clone() });
        };

        let line = format!("{LINE_PREFIX} {} {tag} {message}\n", Local::now().format(TIMESTAMP_FORMAT));
        let mut writer: &File = file;
        writer.write_all(line.as_bytes()).map_err(|e| LogError::io(&self.path, e))
    }

    /// Rotates the file if the policy says it is due.
    pub fn check(&self) -> Result<(), LogError> {
        self.check_at(Local::now())
    }

    pub(crate) fn check_at(&self, now: DateTime<Local>) -> Result<(), LogError> {
        let mut state = self.state.write();

        let suffix = match self.policy {
            RotationPolicy::Size { max_bytes } => {
                let len = fs::metadata(&self.path).map(|meta| meta.len()).unwrap_or(0);
                (len > 0 && len >= max_bytes).then(|| now.timestamp().to_string())
            }
            RotationPolicy::Daily => {
                let today = now.date_naive();
                (today > state.opened_on).then(|| state.opened_on.format(DATE_SUFFIX_FORMAT).to_string())
            }
        };

        match suffix {
            Some(suffix) => {
                state.file = None;
                let rolled = rolled_path(&self.path, &suffix);
                let moved = move_aside(&self.path, &rolled);

                // the live file is reopened whether or not it could be moved
                state.file = Some(open_append(&self.path)?);
                state.opened_on = now.date_naive();
                moved?;
                debug!(target: "cosine::logger", from = %self.path.display(), to = %rolled.display(), "log file rotated");
            }
            None if state.file.is_none() => {
                state.file = Some(open_append(&self.path)?);
            }
            None => {}
        }

        Ok(())
    }
}

impl std::fmt::Debug for FileSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSink").field("path", &self.path).field("policy", &self.policy).finish()
    }
}

fn open_append(path: &Path) -> Result<File, LogError> {
    OpenOptions::new().create(true).append(true).open(path).map_err(|e| LogError::io(path, e))
}

fn move_aside(path: &Path, rolled: &Path) -> Result<(), LogError> {
    if rolled.exists() {
        fs::remove_file(rolled).map_err(|e| LogError::io(rolled, e))?;
    }
    fs::rename(path, rolled).map_err(|e| LogError::io(path, e))
}

fn rolled_path(path: &Path, suffix: &str) -> PathBuf {
    let mut rolled = path.as_os_str().to_owned();
    rolled.push(".");
    rolled.push(suffix);
    PathBuf::from(rolled)
}
