use crate::error::EventLogError;
use chrono::{DateTime, Local};
use log::debug;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Timestamp format of each log line
const LINE_TIMESTAMP_FORMAT: &str = "%Y/%m/%d_%H:%M";
/// Timestamp format embedded in the log file name
const FILE_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Append-only text log of monitor events for one session
///
/// The file name is fixed when the log is created, so every event of a
/// process run lands in the same file.
#[derive(Debug, Clone)]
pub struct EventLog {
    path: PathBuf,
}

impl EventLog {
    /// Create a session log in `dir`, named after `started_at`
    ///
    /// The directory is created if missing; the file itself is only created
    /// by the first `append`.
    pub fn create(
        dir: impl AsRef<Path>,
        started_at: DateTime<Local>,
    ) -> Result<Self, EventLogError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(|source| EventLogError::Io {
            path: dir.display().to_string(),
            source,
        })?;

        let file_name = format!(
            "monitoring_{}.log",
            started_at.format(FILE_TIMESTAMP_FORMAT)
        );
        Ok(Self::at_path(dir.join(file_name)))
    }

    /// Use an explicit log file path
    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `event` stamped with the current local time
    pub fn append(&self, event: &str) -> Result<(), EventLogError> {
        self.append_at(event, Local::now())
    }

    /// Append `event` stamped with `timestamp`
    pub fn append_at(&self, event: &str, timestamp: DateTime<Local>) -> Result<(), EventLogError> {
        let line = format!("{} {}\n", timestamp.format(LINE_TIMESTAMP_FORMAT), event);

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| self.io_error(source))?;
        file.write_all(line.as_bytes())
            .map_err(|source| self.io_error(source))?;

        debug!("Logged event: {}", event);
        Ok(())
    }

    fn io_error(&self, source: std::io::Error) -> EventLogError {
        EventLogError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}
