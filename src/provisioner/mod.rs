//! Script execution against a remote channel.
//!
//! A [`Provisioner`] is built once from a [`Config`] and then runs every
//! script in order:
//!
//! 1. open the local script (inline commands are staged per run)
//! 2. render the command line (uploading elevation helpers if needed)
//! 3. upload the script and start the command, retrying both until the
//!    `start_retry_timeout` window closes
//! 4. wait for the exit status and check it against `valid_exit_codes`
//!
//! The first failure stops the run.

mod retry;
mod scripts;

pub use retry::{DEFAULT_RETRY_DELAY, RetryWindow};
pub use scripts::ScriptSet;

use crate::command::CommandRenderer;
use crate::config::{Config, Settings};
use crate::environment::HttpAddrSource;
use crate::error::{ProvisionError, Result};
use crate::exit_codes;
use crate::ids::{IdGenerator, TimeOrderedIds};
use crate::remote::{ChannelError, RemoteChannel};
use crate::ui::Ui;
use std::fs::File;
use std::io::{Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Runs PowerShell scripts on the machine behind a [`RemoteChannel`].
pub struct Provisioner {
    settings: Settings,
    ids: Arc<dyn IdGenerator>,
    http_addr: Arc<dyn HttpAddrSource>,
    retry_delay: Duration,
}

impl Provisioner {
    /// Validate `config`, fill in defaults, and stage inline commands.
    pub fn prepare(config: Config) -> Result<Self> {
        Self::prepare_with_ids(config, Arc::new(TimeOrderedIds))
    }

    /// Like [`Provisioner::prepare`] with a caller-chosen id source. The
    /// same source names the default remote path and every helper file.
    pub fn prepare_with_ids(config: Config, ids: Arc<dyn IdGenerator>) -> Result<Self> {
        let settings = config.resolve(ids.as_ref())?;
        debug!(
            scripts = settings.scripts.len(),
            inline = settings.inline.len(),
            elevated = settings.elevated.is_some(),
            remote_path = %settings.remote_path,
            "provisioner prepared"
        );

        Ok(Self {
            settings,
            ids,
            http_addr: Arc::new(None::<String>),
            retry_delay: DEFAULT_RETRY_DELAY,
        })
    }

    /// Source of `PACKER_HTTP_ADDR`, queried each time a command is rendered.
    pub fn with_http_addr(mut self, source: Arc<dyn HttpAddrSource>) -> Self {
        self.http_addr = source;
        self
    }

    /// Pause between upload/start attempts.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Run every script in order, stopping at the first failure.
    ///
    /// Inline commands are written to a fresh temp file for each call,
    /// removed when the call returns.
    pub fn provision(&self, ui: &dyn Ui, channel: &mut dyn RemoteChannel) -> Result<()> {
        ui.say("Provisioning with Powershell...");
        let scripts = ScriptSet::collect(&self.settings)?;

        let environment = self.settings.environment(Arc::clone(&self.http_addr));
        let renderer = CommandRenderer::new(&self.settings, &environment, self.ids.as_ref());
        let window = RetryWindow::new(self.settings.start_retry_timeout, self.retry_delay);

        for path in scripts.paths() {
            ui.say(&format!(
                "Provisioning with powershell script: {}",
                path.display()
            ));
            self.run_script(path, ui, channel, &renderer, &window)?;
        }
        Ok(())
    }

    fn run_script(
        &self,
        path: &Path,
        ui: &dyn Ui,
        channel: &mut dyn RemoteChannel,
        renderer: &CommandRenderer<'_>,
        window: &RetryWindow,
    ) -> Result<()> {
        let mut file = File::open(path).map_err(|source| ProvisionError::ScriptOpen {
            path: path.to_path_buf(),
            source,
        })?;

        let command = renderer.render(channel)?;
        let remote_path = self.settings.remote_path.as_str();
        let binary = self.settings.binary;
        let mut start_failure_reported = false;

        let process = window.run(|| {
            let upload_err = |source: ChannelError| ProvisionError::Upload {
                path: remote_path.to_string(),
                source,
            };

            file.seek(SeekFrom::Start(0))
                .map_err(|e| upload_err(ChannelError::Io(e)))?;
            info!(script = %path.display(), remote_path, "uploading script");
            channel
                .upload(remote_path, &mut file, binary)
                .map_err(upload_err)?;
            channel.start(&command).map_err(|source| {
                if !start_failure_reported {
                    start_failure_reported = true;
                    ui.error(&format!(
                        "Failed to start remote command, retrying for up to {}s: {}",
                        window.timeout().as_secs(),
                        source
                    ));
                }
                ProvisionError::Start(source)
            })
        })?;

        let code = process.wait(ui).map_err(ProvisionError::Wait)?;
        info!(script = %path.display(), code, "script finished");

        if !self.settings.is_valid_exit_code(code) {
            return Err(ProvisionError::NonZeroExit {
                code,
                allowed: self.settings.valid_exit_codes.clone(),
            });
        }
        Ok(())
    }

    /// Abort the run by exiting the process. Nothing is cleaned up.
    pub fn cancel(&self) -> ! {
        info!("provisioning cancelled");
        std::process::exit(exit_codes::SUCCESS)
    }
}

impl std::fmt::Debug for Provisioner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Provisioner")
            .field("settings", &self.settings)
            .field("retry_delay", &self.retry_delay)
            .finish_non_exhaustive()
    }
}
