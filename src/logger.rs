//! Leveled logging front-end
//!
//! Thin formatting layer over the rolling writer: filters by level, stamps
//! each line with a local timestamp and optionally the call site, and
//! appends it through the shared sink.

use std::io::Write;
use std::panic::Location;

use chrono::Local;

use crate::config::Config;
use crate::rolling::{RollingWriter, SharedWriter};

/// Log severity, ordered `Debug < Error`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Debug,
    Error,
}

impl Level {
    /// Display tag for this level
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Error => "ERROR",
        }
    }

    /// Map the configuration integer (2 = debug, 3 = error) to a level,
    /// clamping out-of-range values
    pub fn from_config(value: u8) -> Self {
        if value <= 2 {
            Level::Debug
        } else {
            Level::Error
        }
    }
}

/// Leveled logger writing through a [`SharedWriter`].
///
/// Cheap to share: the underlying writer handle is cloneable and every
/// clone appends to the same rolling file.
pub struct Logger {
    writer: SharedWriter,
    level: Level,
    include_caller: bool,
}

impl Logger {
    /// Build a logger (and its rolling writer) from configuration.
    ///
    /// The configuration is normalized first, so out-of-range size and
    /// count values fall back to their defaults. No file is opened until
    /// the first line is written.
    pub fn new(config: &Config) -> Self {
        let config = config.normalized();
        let writer = SharedWriter::new(RollingWriter::new(
            &config.log_dir,
            config.file_prefix.clone(),
            config.max_file_size,
            config.max_file_count,
        ));
        Self {
            writer,
            level: Level::from_config(config.level),
            include_caller: config.include_caller,
        }
    }

    /// Clone of the underlying sink, e.g. to point a
    /// [`StatAggregator`](crate::stats::StatAggregator) at the same file
    pub fn sink(&self) -> SharedWriter {
        self.writer.clone()
    }

    /// Log at debug level
    #[track_caller]
    pub fn debug(&self, msg: &str) {
        if self.level > Level::Debug {
            return;
        }
        self.emit(Level::Debug, Location::caller(), msg);
    }

    /// Log at error level
    #[track_caller]
    pub fn error(&self, msg: &str) {
        self.emit(Level::Error, Location::caller(), msg);
    }

    fn emit(&self, level: Level, caller: &Location<'_>, msg: &str) {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
        let line = if self.include_caller {
            format!(
                "{} [{}:{}] [{}] {}\n",
                timestamp,
                base_name(caller.file()),
                caller.line(),
                level.as_str(),
                msg
            )
        } else {
            format!("{} {}\n", timestamp, msg)
        };
        let mut writer = self.writer.clone();
        let _ = writer.write_all(line.as_bytes());
    }
}

/// Base name of the caller's source path
fn base_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}
