//! The rolling log sink
//!
//! Owns the live log file, tracks its size, and rotates it through
//! [`choose_file`] once it outgrows the configured budget.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, Once};

use tracing::warn;

use super::selector::choose_file;

/// Appends log bytes to a live file, rotating it by size and count.
///
/// The writer is not internally synchronized; callers must serialize access
/// themselves (see [`SharedWriter`]). Two concurrent writers could
/// interleave a rotation and corrupt the live file.
///
/// `write` never fails from the caller's point of view: open, rotation, and
/// append errors are reported through `tracing` and the bytes are claimed
/// as consumed, so a logging call can never take down its host.
pub struct RollingWriter {
    dir: PathBuf,
    prefix: String,
    max_size: u64,
    max_count: usize,
    /// Open handle to the live file, absent until the first write and reset
    /// on rotation or append error
    file: Option<File>,
    /// Bytes in the live file; seeded from the file length on open
    current_size: u64,
    dir_init: Once,
}

impl RollingWriter {
    /// Create a writer for `<dir>/<prefix>`.
    ///
    /// No filesystem access happens until the first write; the directory is
    /// created then if missing.
    pub fn new(
        dir: impl Into<PathBuf>,
        prefix: impl Into<String>,
        max_size: u64,
        max_count: usize,
    ) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
            max_size,
            max_count,
            file: None,
            current_size: 0,
            dir_init: Once::new(),
        }
    }

    /// Path of the live log file
    pub fn live_path(&self) -> PathBuf {
        self.dir.join(&self.prefix)
    }

    fn ensure_dir(&self) {
        self.dir_init.call_once(|| {
            if let Err(e) = fs::create_dir_all(&self.dir) {
                warn!("create log dir {}: {}", self.dir.display(), e);
            }
        });
    }

    fn open_live_file(&mut self) -> io::Result<()> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.live_path())?;
        self.current_size = file.metadata()?.len();
        self.file = Some(file);
        Ok(())
    }

    /// Close the live file, rename it to the chosen rotation target, and
    /// leave the handle empty for a fresh open. The rename is best-effort:
    /// on failure the live file keeps its name and the next write appends
    /// to it again.
    fn rotate(&mut self) {
        self.file = None;
        let target = choose_file(&self.dir, &self.prefix, self.max_size, self.max_count);
        let from = self.live_path();
        let to = self.dir.join(&target);
        if let Err(e) = fs::rename(&from, &to) {
            warn!(
                "rotate rename {} -> {}: {}",
                from.display(),
                to.display(),
                e
            );
        }
    }

    /// Size check happens before the append, so a single oversized write
    /// lands in the current live file and rotation triggers on the next one.
    fn prepare_for_write(&mut self) -> io::Result<()> {
        if self.file.is_none() {
            return self.open_live_file();
        }
        if self.current_size > self.max_size {
            self.rotate();
            return self.open_live_file();
        }
        Ok(())
    }
}

impl Write for RollingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.ensure_dir();
        if let Err(e) = self.prepare_for_write() {
            warn!("open live log file in {}: {}", self.dir.display(), e);
            return Ok(buf.len());
        }
        let Some(file) = self.file.as_mut() else {
            return Ok(buf.len());
        };
        match file.write(buf) {
            Ok(n) => {
                self.current_size += n as u64;
                Ok(n)
            }
            Err(e) => {
                warn!("append to live log file: {}", e);
                self.file = None;
                Ok(buf.len())
            }
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.file.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

/// Cloneable handle serializing access to a [`RollingWriter`].
///
/// Every clone appends through the same underlying writer; the mutex
/// provides the single-writer-at-a-time discipline the writer requires.
#[derive(Clone)]
pub struct SharedWriter {
    inner: Arc<Mutex<RollingWriter>>,
}

impl SharedWriter {
    pub fn new(writer: RollingWriter) -> Self {
        Self {
            inner: Arc::new(Mutex::new(writer)),
        }
    }
}

impl Write for SharedWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.inner.lock() {
            Ok(mut writer) => writer.write(buf),
            Err(_) => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.inner.lock() {
            Ok(mut writer) => writer.flush(),
            Err(_) => Ok(()),
        }
    }
}
