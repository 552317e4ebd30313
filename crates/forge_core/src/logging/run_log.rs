//! Per-batch log file.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use parking_lot::Mutex;

/// Per-batch logger writing timestamped lines to a dedicated file.
///
/// Thread-safe; stage workers log through a shared reference. Failures to
/// write are reported once through `tracing` and otherwise ignored, a batch
/// never fails because its log file did.
pub struct RunLog {
    /// Batch name for identification.
    name: String,
    /// Path to the log file.
    log_path: PathBuf,
    /// Buffered writer.
    writer: Mutex<BufWriter<File>>,
}

impl RunLog {
    /// Create a log file named after the batch inside `log_dir`.
    pub fn new(name: impl Into<String>, log_dir: impl AsRef<Path>) -> std::io::Result<Self> {
        let name = name.into();
        let log_dir = log_dir.as_ref();
        fs::create_dir_all(log_dir)?;

        let log_path = log_dir.join(format!("{}.log", sanitize_filename(&name)));
        let file = File::create(&log_path)?;

        Ok(Self {
            name,
            log_path,
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    /// Batch name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Log file path.
    pub fn path(&self) -> &Path {
        &self.log_path
    }

    /// Plain informational line.
    pub fn info(&self, message: &str) {
        self.write_line(message);
    }

    /// Warning line.
    pub fn warn(&self, message: &str) {
        self.write_line(&format!("[WARN] {}", message));
    }

    /// Error line.
    pub fn error(&self, message: &str) {
        self.write_line(&format!("[ERROR] {}", message));
    }

    /// Phase marker.
    pub fn phase(&self, phase_name: &str) {
        self.write_line(&format!("--- {} ---", phase_name));
    }

    /// External command being executed.
    pub fn command(&self, command_line: &str) {
        self.write_line(&format!("$ {}", command_line));
    }

    /// Flush buffered output to disk.
    pub fn flush(&self) {
        let _ = self.writer.lock().flush();
    }

    fn write_line(&self, message: &str) {
        let stamp = Local::now().format("%H:%M:%S");
        let mut writer = self.writer.lock();
        if let Err(e) = writeln!(writer, "[{}] {}", stamp, message) {
            tracing::warn!("Run log write failed for '{}': {}", self.name, e);
        }
    }
}

impl Drop for RunLog {
    fn drop(&mut self) {
        self.flush();
    }
}

/// Replace filesystem-hostile characters in a batch name.
fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c => c,
        })
        .collect()
}
