//! Remote execution channel.
//!
//! The channel is supplied by the host: it uploads files to the machine
//! being provisioned and starts commands there. This crate ships two
//! implementations:
//!
//! - **local**: treats the local machine as the remote (used by `psprov run`)
//! - **mock**: scripted failures and a recorded event log, for tests

pub mod local;
pub mod mock;

use crate::ui::Ui;
use std::io::Read;
use thiserror::Error;

pub use local::LocalChannel;
pub use mock::{MockChannel, MockEvent};

/// Error reported by a remote channel.
#[derive(Error, Debug)]
pub enum ChannelError {
    /// Local I/O failed while talking to the channel.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The remote side refused or failed the request.
    #[error("{0}")]
    Remote(String),
}

/// A started remote command.
pub trait RemoteProcess {
    /// Block until the command finishes, relaying its output to `ui`, and
    /// return its exit status.
    fn wait(self: Box<Self>, ui: &dyn Ui) -> Result<i32, ChannelError>;
}

/// Uploads files to, and starts commands on, the machine being provisioned.
pub trait RemoteChannel {
    /// Write `content` to `path` on the remote machine. `binary` disables
    /// any line-ending conversion the channel would otherwise apply.
    fn upload(
        &mut self,
        path: &str,
        content: &mut dyn Read,
        binary: bool,
    ) -> Result<(), ChannelError>;

    /// Start `command` in the remote shell.
    fn start(&mut self, command: &str) -> Result<Box<dyn RemoteProcess>, ChannelError>;
}

/// One uploaded file, named two ways.
///
/// The upload API takes PowerShell path syntax (`${env:TEMP}\x.ps1`) while
/// the command line that runs the file goes through `cmd` first and needs
/// `%TEMP%\x.ps1`. Both resolve to the same file on the remote machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    pub upload_path: String,
    pub shell_path: String,
}

impl RemoteFile {
    /// A file under the remote user's `TEMP` directory.
    pub fn in_temp(file_name: &str) -> Self {
        Self {
            upload_path: format!("${{env:TEMP}}\\{}", file_name),
            shell_path: format!("%TEMP%\\{}", file_name),
        }
    }
}
