//! Local-process channel.
//!
//! Provisions the machine psprov is running on: uploads are plain file
//! writes and commands are spawned as child processes. Environment
//! references in paths and arguments (`${env:NAME}` and `%NAME%`) are
//! expanded here, standing in for the remote shell that would normally do it.

use super::{ChannelError, RemoteChannel, RemoteProcess};
use crate::ui::Ui;
use regex::{Captures, Regex};
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::LazyLock;
use std::sync::mpsc;
use std::thread;
use tracing::{debug, info, warn};

static ENV_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{env:([A-Za-z_][A-Za-z0-9_]*)\}|%([A-Za-z_][A-Za-z0-9_]*)%")
        .expect("Invalid env reference regex")
});

/// Expand `${env:NAME}` and `%NAME%` using `lookup`. Unknown names are left as written.
pub fn expand_env_refs<F>(input: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    ENV_REF
        .replace_all(input, |caps: &Captures<'_>| {
            let name = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map(|m| m.as_str())
                .unwrap_or_default();
            lookup(name).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// Channel that runs everything on the local machine.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalChannel;

impl LocalChannel {
    pub fn new() -> Self {
        Self
    }
}

impl RemoteChannel for LocalChannel {
    fn upload(
        &mut self,
        path: &str,
        content: &mut dyn Read,
        _binary: bool,
    ) -> Result<(), ChannelError> {
        let target = PathBuf::from(expand_env_refs(path, process_env));
        if let Some(parent) = target.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = File::create(&target)?;
        let bytes = std::io::copy(content, &mut file)?;
        info!(path = %target.display(), bytes, "uploaded file");
        Ok(())
    }

    fn start(&mut self, command: &str) -> Result<Box<dyn RemoteProcess>, ChannelError> {
        let args = shell_words::split(command).map_err(|e| {
            ChannelError::Remote(format!("failed to parse command '{}': {}", command, e))
        })?;

        let Some((program, rest)) = args.split_first() else {
            return Err(ChannelError::Remote("command is empty".to_string()));
        };

        let program = expand_env_refs(program, process_env);
        let rest: Vec<String> = rest
            .iter()
            .map(|arg| expand_env_refs(arg, process_env))
            .collect();
        debug!(program = %program, args = ?rest, "spawning local command");

        let child = Command::new(&program)
            .args(&rest)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                ChannelError::Remote(format!("failed to execute '{}': {}", program, e))
            })?;

        Ok(Box::new(LocalProcess { child }))
    }
}

struct LocalProcess {
    child: Child,
}

/// Feed each line of `reader` to `emit`, without the line terminator.
///
/// Bytes that are not UTF-8 (OEM code page output, for instance) are
/// replaced rather than treated as an error.
fn read_lossy_lines(reader: impl Read, mut emit: impl FnMut(String)) -> std::io::Result<()> {
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            return Ok(());
        }
        if buf.last() == Some(&b'\n') {
            buf.pop();
            if buf.last() == Some(&b'\r') {
                buf.pop();
            }
        }
        emit(String::from_utf8_lossy(&buf).into_owned());
    }
}

impl RemoteProcess for LocalProcess {
    fn wait(mut self: Box<Self>, ui: &dyn Ui) -> Result<i32, ChannelError> {
        // Drain stderr on a helper thread so a full pipe cannot stall the child.
        let (tx, rx) = mpsc::channel();
        let stderr_reader = self.child.stderr.take().map(|stderr| {
            thread::spawn(move || {
                let _ = read_lossy_lines(stderr, |line| {
                    let _ = tx.send(line);
                });
            })
        });

        let stdout_result = match self.child.stdout.take() {
            Some(stdout) => read_lossy_lines(stdout, |line| ui.message(&line)),
            None => Ok(()),
        };

        if let Some(handle) = stderr_reader {
            let _ = handle.join();
        }
        for line in rx.try_iter() {
            ui.error(&line);
        }

        let status = self.child.wait()?;
        if let Err(e) = stdout_result {
            warn!(error = %e, "stopped reading command output");
        }
        status.code().ok_or_else(|| {
            ChannelError::Remote(format!("process terminated without exit code ({})", status))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::{RecordingUi, UiKind};
    use tempfile::TempDir;

    fn lookup(name: &str) -> Option<String> {
        match name {
            "TEMP" => Some("/tmp/x".to_string()),
            "USER_NAME" => Some("admin".to_string()),
            _ => None,
        }
    }

    #[test]
    fn test_expand_powershell_and_cmd_refs() {
        assert_eq!(
            expand_env_refs("${env:TEMP}\\a.ps1", lookup),
            "/tmp/x\\a.ps1"
        );
        assert_eq!(expand_env_refs("%TEMP%\\a.ps1", lookup), "/tmp/x\\a.ps1");
        assert_eq!(
            expand_env_refs("%USER_NAME%@${env:TEMP}", lookup),
            "admin@/tmp/x"
        );
    }

    #[test]
    fn test_unknown_refs_left_alone() {
        assert_eq!(expand_env_refs("%NOPE%\\a", lookup), "%NOPE%\\a");
        assert_eq!(expand_env_refs("100% done", lookup), "100% done");
    }

    #[test]
    fn test_upload_writes_file_and_creates_parents() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("nested").join("script.ps1");

        let mut channel = LocalChannel::new();
        channel
            .upload(
                target.to_str().unwrap(),
                &mut "Write-Output 'hi'\n".as_bytes(),
                false,
            )
            .unwrap();

        let content = std::fs::read_to_string(&target).unwrap();
        assert_eq!(content, "Write-Output 'hi'\n");
    }

    #[test]
    fn test_start_relays_output_and_exit_code() {
        let mut channel = LocalChannel::new();
        let ui = RecordingUi::new();

        #[cfg(windows)]
        let command = "cmd /c echo hello";
        #[cfg(not(windows))]
        let command = "echo hello";

        let code = channel.start(command).unwrap().wait(&ui).unwrap();
        assert_eq!(code, 0);
        assert_eq!(ui.of_kind(UiKind::Message), vec!["hello"]);
    }

    #[test]
    fn test_start_reports_nonzero_exit() {
        let mut channel = LocalChannel::new();

        #[cfg(windows)]
        let command = "cmd /c exit 3";
        #[cfg(not(windows))]
        let command = "sh -c \"exit 3\"";

        let code = channel
            .start(command)
            .unwrap()
            .wait(&RecordingUi::new())
            .unwrap();
        assert_eq!(code, 3);
    }

    #[cfg(not(windows))]
    #[test]
    fn test_stderr_relayed_as_errors() {
        let mut channel = LocalChannel::new();
        let ui = RecordingUi::new();
        channel
            .start("sh -c \"echo oops 1>&2\"")
            .unwrap()
            .wait(&ui)
            .unwrap();
        assert_eq!(ui.of_kind(UiKind::Error), vec!["oops"]);
    }

    #[cfg(not(windows))]
    #[test]
    fn test_non_utf8_output_is_replaced_not_fatal() {
        let mut channel = LocalChannel::new();
        let ui = RecordingUi::new();
        let code = channel
            .start("sh -c \"printf 'caf\\351\\n'; printf 'bad\\377\\n' 1>&2; exit 0\"")
            .unwrap()
            .wait(&ui)
            .unwrap();

        assert_eq!(code, 0);
        assert_eq!(ui.of_kind(UiKind::Message), vec!["caf\u{FFFD}"]);
        assert_eq!(ui.of_kind(UiKind::Error), vec!["bad\u{FFFD}"]);
    }

    #[test]
    fn test_read_lossy_lines_strips_terminators() {
        let mut lines = Vec::new();
        read_lossy_lines(&b"a\r\nb\n\xffc"[..], |l| lines.push(l)).unwrap();
        assert_eq!(lines, vec!["a", "b", "\u{FFFD}c"]);
    }

    #[test]
    fn test_start_nonexistent_command_fails() {
        let mut channel = LocalChannel::new();
        let err = channel.start("nonexistent_command_xyz_123").err().unwrap();
        assert!(err.to_string().contains("failed to execute"));
    }

    #[test]
    fn test_start_unparseable_command_fails() {
        let mut channel = LocalChannel::new();
        let err = channel.start("echo \"unmatched").err().unwrap();
        assert!(err.to_string().contains("failed to parse"));
    }
}
