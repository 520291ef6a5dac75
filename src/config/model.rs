//! Config struct definition and default implementation.

use super::types::*;
use crate::environment::BuildIdentity;
use serde::{Deserialize, Serialize};

/// Provisioner configuration, as written in the YAML config file.
///
/// Every optional field has a serde default. Empty strings and empty lists
/// are treated the same as an absent key when the config is resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // =========================================================================
    // Build identity
    // =========================================================================
    /// Exposed to scripts as `PACKER_BUILD_NAME`.
    pub packer_build_name: String,

    /// Exposed to scripts as `PACKER_BUILDER_TYPE`.
    pub packer_builder_type: String,

    // =========================================================================
    // Script sources
    // =========================================================================
    /// Upload scripts without line-ending conversion.
    pub binary: bool,

    /// Commands concatenated into a single script, one per line.
    pub inline: Vec<String>,

    /// A single local script to upload and run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,

    /// Local scripts to upload and run, in order.
    pub scripts: Vec<String>,

    /// `key=value` assignments injected before each script runs.
    pub environment_vars: Vec<String>,

    // =========================================================================
    // Execution
    // =========================================================================
    /// Where each script is uploaded. Defaults to a unique `.ps1` path under
    /// `c:/Windows/Temp`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_path: Option<String>,

    /// Template for the command that runs a script (`{{.Vars}}`, `{{.Path}}`).
    #[serde(default = "default_execute_command")]
    pub execute_command: String,

    /// Template for the elevated command. `{{.Vars}}` is the path of the
    /// uploaded variables script.
    #[serde(default = "default_elevated_execute_command")]
    pub elevated_execute_command: String,

    /// How long to keep retrying upload+start, e.g. `5m` or `90s`.
    #[serde(default = "default_start_retry_timeout")]
    pub start_retry_timeout: String,

    /// printf-style assignment format for `execute_command`.
    #[serde(default = "default_env_var_format")]
    pub env_var_format: String,

    /// printf-style assignment format for the elevated variables script.
    #[serde(default = "default_env_var_format")]
    pub elevated_env_var_format: String,

    // =========================================================================
    // Elevation
    // =========================================================================
    /// Run scripts as this user through a scheduled task.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elevated_user: Option<String>,

    /// Password for `elevated_user`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elevated_password: Option<String>,

    /// Exit codes that count as success (e.g. 3010, "reboot required").
    /// An empty list, absent or written as `[]`, means `[0]`.
    #[serde(default = "default_valid_exit_codes")]
    pub valid_exit_codes: Vec<i32>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            packer_build_name: String::new(),
            packer_builder_type: String::new(),
            binary: false,
            inline: Vec::new(),
            script: None,
            scripts: Vec::new(),
            environment_vars: Vec::new(),
            remote_path: None,
            execute_command: default_execute_command(),
            elevated_execute_command: default_elevated_execute_command(),
            start_retry_timeout: default_start_retry_timeout(),
            env_var_format: default_env_var_format(),
            elevated_env_var_format: default_env_var_format(),
            elevated_user: None,
            elevated_password: None,
            valid_exit_codes: default_valid_exit_codes(),
        }
    }
}

impl Config {
    /// Build identity exposed to scripts.
    pub fn build_identity(&self) -> BuildIdentity {
        BuildIdentity {
            build_name: self.packer_build_name.clone(),
            builder_type: self.packer_builder_type.clone(),
        }
    }
}
