//! Remote command construction.
//!
//! Turns the execute-command templates into the exact command line handed
//! to the remote channel:
//!
//! - **plain**: the rendered template is encoded and run with
//!   `powershell -executionpolicy bypass -encodedCommand <b64>`
//! - **elevated**: variables are uploaded as a script, the rendered template
//!   is wrapped in a scheduled task (see [`elevated`]), and the wrapper file
//!   is run with `powershell -executionpolicy bypass -file "<path>"`

pub mod elevated;

pub use elevated::{ElevatedCredentials, upload_elevated_wrapper};

use crate::config::Settings;
use crate::encoding::encode_command;
use crate::environment::EnvironmentAssembler;
use crate::error::{ProvisionError, Result};
use crate::ids::IdGenerator;
use crate::remote::{RemoteChannel, RemoteFile};
use crate::template::{fields, render_template};
use tracing::{debug, info};

/// Command line that runs `command` through `-encodedCommand`.
pub fn encoded_command_line(command: &str) -> String {
    format!(
        "powershell -executionpolicy bypass -encodedCommand {}",
        encode_command(command)
    )
}

/// Command line that runs a PowerShell file, given its shell-side path.
pub fn file_command_line(shell_path: &str) -> String {
    format!("powershell -executionpolicy bypass -file \"{}\"", shell_path)
}

/// Renders the command line for one script run.
pub struct CommandRenderer<'a> {
    settings: &'a Settings,
    environment: &'a EnvironmentAssembler,
    ids: &'a dyn IdGenerator,
}

impl<'a> CommandRenderer<'a> {
    pub fn new(
        settings: &'a Settings,
        environment: &'a EnvironmentAssembler,
        ids: &'a dyn IdGenerator,
    ) -> Self {
        Self {
            settings,
            environment,
            ids,
        }
    }

    /// Render the command line, elevated when credentials are configured.
    ///
    /// Elevated rendering uploads helper files through `channel`.
    pub fn render(&self, channel: &mut dyn RemoteChannel) -> Result<String> {
        match &self.settings.elevated {
            None => self.render_plain(),
            Some(credentials) => self.render_elevated(credentials, channel),
        }
    }

    /// Non-privileged command line. Pure; nothing is uploaded.
    pub fn render_plain(&self) -> Result<String> {
        let vars = self.environment.assemble(false);
        let command = render_template(
            &self.settings.execute_command,
            &fields([
                ("Vars", vars.as_str()),
                ("Path", self.settings.remote_path.as_str()),
            ]),
        )?;

        debug!(command = %command, "building command line");
        Ok(encoded_command_line(&command))
    }

    /// Privileged command line.
    ///
    /// Variables cannot survive the extra layer of quoting inside the
    /// scheduled task, so they are uploaded as a script that the elevated
    /// command dot-sources.
    pub fn render_elevated(
        &self,
        credentials: &ElevatedCredentials,
        channel: &mut dyn RemoteChannel,
    ) -> Result<String> {
        let vars = self.environment.assemble(true);
        let vars_file =
            RemoteFile::in_temp(&format!("psprov-env-vars-{}.ps1", self.ids.next_id()));

        info!(path = %vars_file.upload_path, "uploading env vars");
        channel
            .upload(&vars_file.upload_path, &mut vars.as_bytes(), false)
            .map_err(|source| ProvisionError::Upload {
                path: vars_file.upload_path.clone(),
                source,
            })?;

        let command = render_template(
            &self.settings.elevated_execute_command,
            &fields([
                ("Vars", vars_file.upload_path.as_str()),
                ("Path", self.settings.remote_path.as_str()),
            ]),
        )?;

        let wrapper = upload_elevated_wrapper(&command, credentials, self.ids, channel)?;
        Ok(file_command_line(&wrapper.shell_path))
    }
}
