//! User-facing progress sinks.
//!
//! The provisioner reports progress through the [`Ui`] trait; hosts decide
//! where it goes. Internal diagnostics use `tracing` instead.
//!
//! `MachineReadableUi` writes NDJSON, one object per line:
//!
//! ```json
//! {"ts":"2026-01-01T00:00:00Z","kind":"say","message":"Provisioning with Powershell..."}
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::sync::Mutex;

/// Sink for human-readable progress and error messages.
pub trait Ui {
    /// A top-level progress line.
    fn say(&self, message: &str);
    /// Output relayed from the remote machine.
    fn message(&self, message: &str);
    /// An error the user should see.
    fn error(&self, message: &str);
}

/// Kind of a UI message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UiKind {
    Say,
    Message,
    Error,
}

/// Writes to the terminal: progress to stdout, errors to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleUi;

impl Ui for ConsoleUi {
    fn say(&self, message: &str) {
        println!("==> {}", message);
    }

    fn message(&self, message: &str) {
        println!("    {}", message);
    }

    fn error(&self, message: &str) {
        eprintln!("==> {}", message);
    }
}

/// A single machine-readable UI record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiRecord {
    pub ts: DateTime<Utc>,
    pub kind: UiKind,
    pub message: String,
}

/// Writes each message as a timestamped JSON line.
pub struct MachineReadableUi<W: Write> {
    out: Mutex<W>,
}

impl<W: Write> MachineReadableUi<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    /// Consume the sink and return the underlying writer.
    pub fn into_inner(self) -> W {
        self.out
            .into_inner()
            .unwrap_or_else(|poison| poison.into_inner())
    }

    fn emit(&self, kind: UiKind, message: &str) {
        let record = UiRecord {
            ts: Utc::now(),
            kind,
            message: message.to_string(),
        };
        let Ok(line) = serde_json::to_string(&record) else {
            return;
        };
        let mut out = self.out.lock().unwrap_or_else(|poison| poison.into_inner());
        // Write failures are dropped.
        let _ = writeln!(out, "{}", line);
        let _ = out.flush();
    }
}

impl<W: Write> Ui for MachineReadableUi<W> {
    fn say(&self, message: &str) {
        self.emit(UiKind::Say, message);
    }

    fn message(&self, message: &str) {
        self.emit(UiKind::Message, message);
    }

    fn error(&self, message: &str) {
        self.emit(UiKind::Error, message);
    }
}

/// Keeps every message in memory, for tests and dry runs.
#[derive(Debug, Default)]
pub struct RecordingUi {
    entries: Mutex<Vec<(UiKind, String)>>,
}

impl RecordingUi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<(UiKind, String)> {
        self.entries
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .clone()
    }

    /// Messages of one kind, in order.
    pub fn of_kind(&self, kind: UiKind) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, m)| m)
            .collect()
    }

    fn push(&self, kind: UiKind, message: &str) {
        self.entries
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .push((kind, message.to_string()));
    }
}

impl Ui for RecordingUi {
    fn say(&self, message: &str) {
        self.push(UiKind::Say, message);
    }

    fn message(&self, message: &str) {
        self.push(UiKind::Message, message);
    }

    fn error(&self, message: &str) {
        self.push(UiKind::Error, message);
    }
}
