//! psprov: run PowerShell provisioning scripts on a remote Windows machine.
//!
//! The host supplies a [`remote::RemoteChannel`] (upload a file, start a
//! command) and a [`ui::Ui`] sink; [`Provisioner`] does the rest:
//!
//! - renders each command from the `execute_command` template with the
//!   build's environment variables
//! - encodes it for `powershell -encodedCommand`
//! - optionally wraps it in a scheduled task so it runs as an elevated user
//! - uploads and starts each script, retrying while the machine is
//!   unreachable, and checks exit codes against an allow-list

pub mod command;
pub mod config;
pub mod encoding;
pub mod environment;
pub mod error;
pub mod exit_codes;
pub mod ids;
pub mod logging;
pub mod provisioner;
pub mod remote;
pub mod template;
pub mod ui;

pub use config::{Config, Settings};
pub use error::{ConfigErrors, ConfigIssue, ProvisionError, Result};
pub use provisioner::Provisioner;
