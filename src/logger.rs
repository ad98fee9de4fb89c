use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use chrono::Utc;

/// Append-only file logger, echoed to stderr. Passed around as Arc<Logger>
/// rather than living in a global.
pub struct Logger {
  file: Option<Mutex<std::fs::File>>,
}

impl Logger {
  pub fn new(path: &Path) -> anyhow::Result<Self> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    Ok(Self {
      file: Some(Mutex::new(file)),
    })
  }

  /// Stderr-only logger, for tests and for running without a writable log dir.
  pub fn stderr() -> Self {
    Self { file: None }
  }

  pub fn log(&self, level: &str, message: &str) {
    let ts = Utc::now().to_rfc3339();
    let line = format!("[{ts}] {level}: {message}");
    eprintln!("{line}");
    if let Some(file) = &self.file {
      if let Ok(mut file) = file.lock() {
        let _ = writeln!(file, "{line}");
      }
    }
  }

  pub fn info(&self, message: &str) {
    self.log("INFO", message);
  }

  pub fn warn(&self, message: &str) {
    self.log("WARN", message);
  }
}
