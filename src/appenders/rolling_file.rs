//! File appender that rolls the active file over to numbered backups
//!
//! `app.log` is always the active file. On rollover it becomes `app.log.1`
//! (or `app.log.1.gz` when compression is on), older backups shift up by one
//! and anything beyond `max_backups` is deleted.

use super::triggering_policy::{SizeBasedTriggeringPolicy, TriggeringPolicy};
use crate::core::{diagnostics, Appender, Layout, LoggingEvent, LoggerError, Result};
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

const MAX_DELETION_FAILURES: usize = 5;
const COMPRESS_BUFFER_SIZE: usize = 64 * 1024;

struct RollingState {
    writer: Option<BufWriter<File>>,
    current_size: u64,
    deletion_failures: usize,
    rollovers: u64,
    closed: bool,
}

pub struct RollingFileAppender {
    name: String,
    base_path: PathBuf,
    policy: Box<dyn TriggeringPolicy>,
    max_backups: usize,
    compress: bool,
    layout: Layout,
    state: Mutex<RollingState>,
}

impl RollingFileAppender {
    /// Size-triggered appender with the default 10 MiB limit and 5 backups
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        Self::with_policy(path, SizeBasedTriggeringPolicy::default())
    }

    pub fn with_policy(
        path: impl Into<PathBuf>,
        policy: impl TriggeringPolicy + 'static,
    ) -> Result<Self> {
        let base_path = path.into();

        if let Some(parent) = base_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                LoggerError::io_operation(
                    "create log directory",
                    format!("Failed to create directory '{}'", parent.display()),
                    e,
                )
            })?;
        }

        let (file, current_size) = Self::open_active(&base_path)?;

        Ok(Self {
            name: "rolling_file".to_string(),
            base_path,
            policy: Box::new(policy),
            max_backups: 5,
            compress: false,
            layout: Layout::default(),
            state: Mutex::new(RollingState {
                writer: Some(BufWriter::new(file)),
                current_size,
                deletion_failures: 0,
                rollovers: 0,
                closed: false,
            }),
        })
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Number of numbered backups to keep; at least one is always kept
    #[must_use]
    pub fn with_max_backups(mut self, count: usize) -> Self {
        self.max_backups = count.max(1);
        self
    }

    /// Gzip each backup as it is rolled
    #[must_use]
    pub fn with_compression(mut self, enabled: bool) -> Self {
        self.compress = enabled;
        self
    }

    #[must_use]
    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    pub fn path(&self) -> &Path {
        &self.base_path
    }

    /// Bytes written to the active file, including what it held when opened
    pub fn current_size(&self) -> u64 {
        self.state.lock().current_size
    }

    /// Rollovers performed since creation
    pub fn rollover_count(&self) -> u64 {
        self.state.lock().rollovers
    }

    /// Path of backup `index`, uncompressed
    pub fn backup_path(&self, index: usize) -> PathBuf {
        let mut path = self.base_path.clone();
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("app.log");
        path.set_file_name(format!("{}.{}", filename, index));
        path
    }

    fn compressed_path(path: &Path) -> PathBuf {
        let mut name = path.as_os_str().to_owned();
        name.push(".gz");
        PathBuf::from(name)
    }

    fn open_active(path: &Path) -> Result<(File, u64)> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| {
                LoggerError::file_appender(
                    path.display().to_string(),
                    format!("Failed to open: {}", e),
                )
            })?;
        let size = file.metadata().map(|m| m.len()).unwrap_or(0);
        Ok((file, size))
    }

    fn remove_oldest(&self, state: &mut RollingState) -> Result<()> {
        let oldest = self.backup_path(self.max_backups);
        let mut deletion_failed = false;

        for candidate in [Self::compressed_path(&oldest), oldest] {
            if candidate.exists() {
                if let Err(e) = fs::remove_file(&candidate) {
                    deletion_failed = true;
                    diagnostics::warn(format!(
                        "Failed to remove oldest backup {}: {} (failure #{}/{})",
                        candidate.display(),
                        e,
                        state.deletion_failures + 1,
                        MAX_DELETION_FAILURES
                    ));
                }
            }
        }

        if !deletion_failed {
            state.deletion_failures = 0;
            return Ok(());
        }

        state.deletion_failures += 1;
        if state.deletion_failures >= MAX_DELETION_FAILURES {
            return Err(LoggerError::file_rotation(
                self.base_path.display().to_string(),
                format!(
                    "Rollover aborted: failed to delete old backups {} consecutive times",
                    state.deletion_failures
                ),
            ));
        }
        Ok(())
    }

    fn shift_backups(&self) -> Result<()> {
        for i in (1..self.max_backups).rev() {
            let from = self.backup_path(i);
            let to = self.backup_path(i + 1);
            let (from, to) = if Self::compressed_path(&from).exists() {
                (Self::compressed_path(&from), Self::compressed_path(&to))
            } else if from.exists() {
                (from, to)
            } else {
                continue;
            };

            if fs::rename(&from, &to).is_err() {
                // some platforms refuse to rename over an existing file
                let _ = fs::remove_file(&to);
                fs::rename(&from, &to).map_err(|e| {
                    LoggerError::file_rotation(
                        from.display().to_string(),
                        format!("Failed to shift backup: {}", e),
                    )
                })?;
            }
        }
        Ok(())
    }

    fn roll_over(&self, state: &mut RollingState) -> Result<()> {
        if let Some(mut writer) = state.writer.take() {
            writer.flush().map_err(|e| {
                LoggerError::file_rotation(
                    self.base_path.display().to_string(),
                    format!("Failed to flush before rollover: {}", e),
                )
            })?;
        }

        self.remove_oldest(state)?;
        self.shift_backups()?;

        let first_backup = self.backup_path(1);
        if self.base_path.exists() {
            fs::rename(&self.base_path, &first_backup).map_err(|e| {
                LoggerError::file_rotation(
                    self.base_path.display().to_string(),
                    format!("Failed to move active file: {}", e),
                )
            })?;

            if self.compress {
                compress_file(&first_backup, &Self::compressed_path(&first_backup))?;
            }
        }

        let (file, size) = Self::open_active(&self.base_path)?;
        state.writer = Some(BufWriter::new(file));
        state.current_size = size;
        state.rollovers += 1;
        diagnostics::debug(format!(
            "Rolled over {} (rollover #{})",
            self.base_path.display(),
            state.rollovers
        ));
        Ok(())
    }

    /// Get a writer back after a failed rollover so later events are not lost
    fn recover(&self, state: &mut RollingState) {
        if state.writer.is_some() {
            return;
        }
        match Self::open_active(&self.base_path) {
            Ok((file, size)) => {
                state.writer = Some(BufWriter::new(file));
                state.current_size = size;
            }
            Err(e) => diagnostics::error(format!(
                "Cannot reopen {} after failed rollover: {}",
                self.base_path.display(),
                e
            )),
        }
    }
}

/// Gzip `source` into `target`, removing `source` only once the archive is
/// complete
fn compress_file(source: &Path, target: &Path) -> Result<()> {
    use std::io::{BufReader, Read};

    let mut temp = target.as_os_str().to_owned();
    temp.push(".tmp");
    let temp = PathBuf::from(temp);

    let compress = || -> std::io::Result<()> {
        let mut reader = BufReader::with_capacity(COMPRESS_BUFFER_SIZE, File::open(source)?);
        let output = BufWriter::with_capacity(COMPRESS_BUFFER_SIZE, File::create(&temp)?);
        let mut encoder = flate2::write::GzEncoder::new(output, flate2::Compression::default());

        let mut buffer = vec![0u8; COMPRESS_BUFFER_SIZE];
        loop {
            let read = reader.read(&mut buffer)?;
            if read == 0 {
                break;
            }
            encoder.write_all(&buffer[..read])?;
        }
        encoder.finish()?.flush()?;
        fs::rename(&temp, target)
    };

    if let Err(e) = compress() {
        let _ = fs::remove_file(&temp);
        return Err(LoggerError::io_operation(
            "compress log file",
            format!("Failed to compress {}", source.display()),
            e,
        ));
    }

    if let Err(e) = fs::remove_file(source) {
        diagnostics::warn(format!(
            "Compressed {} but could not remove the original: {}",
            source.display(),
            e
        ));
    }
    Ok(())
}

impl Appender for RollingFileAppender {
    fn append(&self, event: &LoggingEvent) -> Result<()> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(LoggerError::appender_closed(&self.name));
        }

        if self
            .policy
            .is_triggering_event(self, event, &self.base_path, state.current_size)
        {
            if let Err(e) = self.roll_over(&mut state) {
                self.recover(&mut state);
                return Err(e);
            }
        }

        let mut output = self.layout.format(event);
        output.push('\n');

        let writer = state
            .writer
            .as_mut()
            .ok_or_else(|| LoggerError::writer("no active file"))?;
        writer.write_all(output.as_bytes())?;
        state.current_size += output.len() as u64;
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        if let Some(ref mut writer) = self.state.lock().writer {
            writer.flush()?;
        }
        Ok(())
    }

    fn close(&self) -> Result<()> {
        let mut state = self.state.lock();
        state.closed = true;
        if let Some(mut writer) = state.writer.take() {
            writer.flush()?;
        }
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for RollingFileAppender {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}
