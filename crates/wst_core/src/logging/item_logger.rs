//! Per-item logger with optional file output.
//!
//! Each work item gets its own logger that:
//! - Writes the commands it ran and their output to a dedicated log file
//!   (when a log directory is configured)
//! - Maintains a tail buffer of stderr lines for failure reports

use std::collections::VecDeque;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use parking_lot::Mutex;

use super::types::MessagePrefix;

/// Per-item logger.
pub struct ItemLogger {
    /// Path to log file, if writing one.
    log_path: Option<PathBuf>,
    /// File writer (buffered).
    file_writer: Mutex<Option<BufWriter<File>>>,
    /// Recent stderr lines.
    tail_buffer: Mutex<VecDeque<String>>,
    /// Maximum tail length.
    tail_len: usize,
}

impl ItemLogger {
    /// Create a logger that writes `<log_dir>/<item>.log`.
    pub fn new(
        item_id: impl Into<String>,
        log_dir: impl AsRef<Path>,
        tail_len: usize,
    ) -> std::io::Result<Self> {
        let item_id = item_id.into();
        let log_dir = log_dir.as_ref();

        fs::create_dir_all(log_dir)?;

        let log_path = log_dir.join(format!("{}.log", sanitize_filename(&item_id)));
        let file = File::create(&log_path)?;

        Ok(Self {
            log_path: Some(log_path),
            file_writer: Mutex::new(Some(BufWriter::new(file))),
            tail_buffer: Mutex::new(VecDeque::with_capacity(tail_len)),
            tail_len,
        })
    }

    /// Create a logger that only keeps the stderr tail in memory.
    pub fn tail_only(tail_len: usize) -> Self {
        Self {
            log_path: None,
            file_writer: Mutex::new(None),
            tail_buffer: Mutex::new(VecDeque::with_capacity(tail_len)),
            tail_len,
        }
    }

    /// Get the log file path, if any.
    pub fn log_path(&self) -> Option<&Path> {
        self.log_path.as_deref()
    }

    /// Log a command about to run.
    pub fn command(&self, command: &str) {
        self.write(&MessagePrefix::Command.format(command));
    }

    /// Log a command that was not run.
    pub fn dry_run(&self, command: &str) {
        self.write(&MessagePrefix::DryRun.format(command));
    }

    /// Log an exit code.
    pub fn exit(&self, code: i32) {
        self.write(&MessagePrefix::Exit.format(&code.to_string()));
    }

    /// Log a free-form note.
    pub fn note(&self, message: &str) {
        self.write(&MessagePrefix::None.format(message));
    }

    /// Log one line of child output. Stderr lines also go to the tail.
    pub fn output_line(&self, line: &str, is_stderr: bool) {
        if is_stderr {
            if self.tail_len > 0 {
                let mut buffer = self.tail_buffer.lock();
                if buffer.len() >= self.tail_len {
                    buffer.pop_front();
                }
                buffer.push_back(line.to_string());
            }
            self.write(&MessagePrefix::Stderr.format(line));
        } else {
            self.write(line);
        }
    }

    /// Log a whole captured stream, line by line.
    pub fn output(&self, text: &str, is_stderr: bool) {
        for line in text.lines() {
            self.output_line(line, is_stderr);
        }
    }

    /// Get the current tail buffer contents.
    pub fn get_tail(&self) -> Vec<String> {
        self.tail_buffer.lock().iter().cloned().collect()
    }

    /// Flush the log file.
    pub fn flush(&self) {
        if let Some(ref mut writer) = *self.file_writer.lock() {
            let _ = writer.flush();
        }
    }

    /// Close the logger and release the file.
    pub fn close(&self) {
        self.flush();
        *self.file_writer.lock() = None;
    }

    fn write(&self, message: &str) {
        if let Some(ref mut writer) = *self.file_writer.lock() {
            let timestamp = Local::now().format("%H:%M:%S");
            let _ = writeln!(writer, "[{}] {}", timestamp, message);
        }
    }
}

impl Drop for ItemLogger {
    fn drop(&mut self) {
        self.close();
    }
}

/// Sanitize a string to be safe for use as a filename.
pub(crate) fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            _ => c,
        })
        .collect()
}
