//! Logger utility for application-wide logging
//!
//! A `log::Log` implementation that writes every record to a file and
//! echoes it to the console. Used when a run is given `--log-file`;
//! otherwise `env_logger` handles the console alone.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Mutex;
use std::thread;

use log::{Level, Log, Metadata, Record};

/// Logger writing to a file and the console
pub struct Logger {
    file: Mutex<File>,
    level: Level,
}

impl Logger {
    /// Creates a new logger instance
    ///
    /// # Arguments
    ///
    /// * `log_file` - Path to the log file, truncated if it exists
    /// * `level` - Most verbose level that is recorded
    pub fn new(log_file: &Path, level: Level) -> io::Result<Self> {
        let file = File::create(log_file)?;
        Ok(Logger {
            file: Mutex::new(file),
            level,
        })
    }

    /// Writes one line to the log file
    pub fn write_line(&self, message: &str) -> io::Result<()> {
        // A unit that panicked while holding the lock leaves the file usable
        let mut file = match self.file.lock() {
            Ok(file) => file,
            Err(poisoned) => poisoned.into_inner(),
        };
        writeln!(file, "{}", message)?;
        file.flush()
    }

    /// Install a file logger as the global `log` backend
    pub fn init_global_logger(log_file: &Path, level: Level) -> io::Result<()> {
        let global_logger = Logger::new(log_file, level)?;

        if log::set_boxed_logger(Box::new(global_logger)).is_err() {
            eprintln!("Warning: Global logger was already initialized");
        }

        log::set_max_level(level.to_level_filter());
        Ok(())
    }

    fn format(record: &Record) -> String {
        // Units run on threads named after their box
        match thread::current().name() {
            Some(name) if name != "main" => format!("[{}] [{}] {}", record.level(), name, record.args()),
            _ => format!("[{}] {}", record.level(), record.args()),
        }
    }
}

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let message = Self::format(record);
            let _ = self.write_line(&message);

            println!("{}", message);
        }
    }

    fn flush(&self) {
        // Already flushing in write_line
    }
}
