//! Resolved settings for a provisioning run.

use crate::command::ElevatedCredentials;
use crate::environment::{BuildIdentity, EnvironmentAssembler, HttpAddrSource};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// A validated config with every default filled in. Immutable for the
/// lifetime of a [`crate::Provisioner`].
#[derive(Debug, Clone)]
pub struct Settings {
    pub identity: BuildIdentity,
    pub binary: bool,
    /// Script files, in run order. Empty when `inline` is used.
    pub scripts: Vec<PathBuf>,
    /// Inline commands. Empty when script files are used.
    pub inline: Vec<String>,
    pub environment_vars: Vec<String>,
    pub remote_path: String,
    pub execute_command: String,
    pub elevated_execute_command: String,
    pub start_retry_timeout: Duration,
    pub env_var_format: String,
    pub elevated_env_var_format: String,
    /// Present when scripts run elevated.
    pub elevated: Option<ElevatedCredentials>,
    pub valid_exit_codes: Vec<i32>,
}

impl Settings {
    pub fn is_valid_exit_code(&self, code: i32) -> bool {
        self.valid_exit_codes.contains(&code)
    }

    /// Environment assembler for these settings.
    pub fn environment(&self, http_addr: Arc<dyn HttpAddrSource>) -> EnvironmentAssembler {
        EnvironmentAssembler::new(
            self.identity.clone(),
            self.environment_vars.clone(),
            self.env_var_format.clone(),
            self.elevated_env_var_format.clone(),
            http_addr,
        )
    }
}
