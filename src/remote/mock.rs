//! Mock channel for testing.
//!
//! Records every upload, start, and exit in one ordered log and lets tests
//! script failures per attempt.

use super::{ChannelError, RemoteChannel, RemoteProcess};
use crate::ui::Ui;
use std::collections::VecDeque;
use std::io::Read;
use std::sync::{Arc, Mutex};

/// Something that happened on the mock channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockEvent {
    Upload { path: String, content: String },
    UploadRejected { path: String },
    Start { command: String },
    StartRejected { command: String },
    Exited { command: String, code: i32 },
}

/// Scripted outcome for one upload or start call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Fail,
    Succeed,
}

/// In-memory channel. Calls succeed and commands exit 0 unless scripted otherwise.
#[derive(Debug, Default)]
pub struct MockChannel {
    log: Arc<Mutex<Vec<MockEvent>>>,
    upload_outcomes: VecDeque<Outcome>,
    start_outcomes: VecDeque<Outcome>,
    fail_all_starts: bool,
    exit_codes: VecDeque<i32>,
    output: Vec<String>,
}

impl MockChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `n` uploads, then succeed.
    pub fn fail_next_uploads(mut self, n: usize) -> Self {
        self.upload_outcomes
            .extend(std::iter::repeat_n(Outcome::Fail, n));
        self.upload_outcomes.push_back(Outcome::Succeed);
        self
    }

    /// Fail the next `n` starts, then succeed.
    pub fn fail_next_starts(mut self, n: usize) -> Self {
        self.start_outcomes
            .extend(std::iter::repeat_n(Outcome::Fail, n));
        self.start_outcomes.push_back(Outcome::Succeed);
        self
    }

    /// Fail every start.
    pub fn fail_all_starts(mut self) -> Self {
        self.fail_all_starts = true;
        self
    }

    /// Exit codes for successive started commands; 0 once exhausted.
    pub fn with_exit_codes(mut self, codes: impl IntoIterator<Item = i32>) -> Self {
        self.exit_codes.extend(codes);
        self
    }

    /// Lines every started command prints before exiting.
    pub fn with_output(mut self, lines: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.output = lines.into_iter().map(Into::into).collect();
        self
    }

    /// Everything that happened, in order.
    pub fn events(&self) -> Vec<MockEvent> {
        self.log
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .clone()
    }

    /// Paths of successful uploads, in order.
    pub fn uploaded_paths(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                MockEvent::Upload { path, .. } => Some(path),
                _ => None,
            })
            .collect()
    }

    /// Content of the most recent successful upload to `path`.
    pub fn uploaded_content(&self, path: &str) -> Option<String> {
        self.events().into_iter().rev().find_map(|e| match e {
            MockEvent::Upload { path: p, content } if p == path => Some(content),
            _ => None,
        })
    }

    /// Commands that were started, in order.
    pub fn started_commands(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                MockEvent::Start { command } => Some(command),
                _ => None,
            })
            .collect()
    }

    /// Upload and start calls, successful or not.
    pub fn attempt_counts(&self) -> (usize, usize) {
        self.events().iter().fold((0, 0), |(u, s), e| match e {
            MockEvent::Upload { .. } | MockEvent::UploadRejected { .. } => (u + 1, s),
            MockEvent::Start { .. } | MockEvent::StartRejected { .. } => (u, s + 1),
            MockEvent::Exited { .. } => (u, s),
        })
    }

    fn record(&self, event: MockEvent) {
        self.log
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .push(event);
    }
}

fn next_outcome(queue: &mut VecDeque<Outcome>) -> Outcome {
    match queue.len() {
        0 => Outcome::Succeed,
        // The trailing entry is sticky.
        1 => queue[0],
        _ => queue.pop_front().unwrap_or(Outcome::Succeed),
    }
}

impl RemoteChannel for MockChannel {
    fn upload(
        &mut self,
        path: &str,
        content: &mut dyn Read,
        _binary: bool,
    ) -> Result<(), ChannelError> {
        let mut buf = Vec::new();
        content.read_to_end(&mut buf)?;

        if next_outcome(&mut self.upload_outcomes) == Outcome::Fail {
            self.record(MockEvent::UploadRejected {
                path: path.to_string(),
            });
            return Err(ChannelError::Remote(format!(
                "upload of '{}' rejected",
                path
            )));
        }

        self.record(MockEvent::Upload {
            path: path.to_string(),
            content: String::from_utf8_lossy(&buf).into_owned(),
        });
        Ok(())
    }

    fn start(&mut self, command: &str) -> Result<Box<dyn RemoteProcess>, ChannelError> {
        let outcome = if self.fail_all_starts {
            Outcome::Fail
        } else {
            next_outcome(&mut self.start_outcomes)
        };

        if outcome == Outcome::Fail {
            self.record(MockEvent::StartRejected {
                command: command.to_string(),
            });
            return Err(ChannelError::Remote(
                "connection refused: machine is restarting".to_string(),
            ));
        }

        self.record(MockEvent::Start {
            command: command.to_string(),
        });
        Ok(Box::new(MockProcess {
            log: Arc::clone(&self.log),
            command: command.to_string(),
            exit_code: self.exit_codes.pop_front().unwrap_or(0),
            output: self.output.clone(),
        }))
    }
}

struct MockProcess {
    log: Arc<Mutex<Vec<MockEvent>>>,
    command: String,
    exit_code: i32,
    output: Vec<String>,
}

impl RemoteProcess for MockProcess {
    fn wait(self: Box<Self>, ui: &dyn Ui) -> Result<i32, ChannelError> {
        for line in &self.output {
            ui.message(line);
        }
        self.log
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .push(MockEvent::Exited {
                command: self.command.clone(),
                code: self.exit_code,
            });
        Ok(self.exit_code)
    }
}
