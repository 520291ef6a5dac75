//! Error types for psprov.
//!
//! Uses thiserror for derive macros. Configuration problems are collected
//! into a single [`ConfigErrors`] value so every issue is reported at once;
//! execution errors abort the remaining script sequence.

use crate::exit_codes;
use crate::remote::ChannelError;
use crate::template::TemplateError;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Main error type for provisioning operations.
#[derive(Error, Debug)]
pub enum ProvisionError {
    /// One or more configuration problems, reported together.
    #[error("{0}")]
    Config(#[from] ConfigErrors),

    /// A configured script could not be opened for reading.
    #[error("Error opening powershell script '{}': {source}", path.display())]
    ScriptOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Inline commands could not be written to a temporary script.
    #[error("Unable to extract inline scripts into a file: {0}")]
    InlineScript(String),

    /// A command template failed to render.
    #[error("Error processing command: {0}")]
    Template(#[from] TemplateError),

    /// A command could not be encoded or decoded.
    #[error("Error encoding command: {0}")]
    Encoding(String),

    /// The remote channel rejected an upload.
    #[error("Error uploading '{path}': {source}")]
    Upload {
        path: String,
        #[source]
        source: ChannelError,
    },

    /// The remote channel failed to start a command. Retried until the
    /// retry window closes.
    #[error("Error starting remote command: {0}")]
    Start(#[source] ChannelError),

    /// The retry window closed while uploads or starts kept failing.
    #[error("Retryable error: {last} (gave up after {}s)", timeout.as_secs())]
    RetriesExhausted {
        timeout: Duration,
        #[source]
        last: Box<ProvisionError>,
    },

    /// The channel lost track of a started command before it reported an exit status.
    #[error("Error waiting for remote command: {0}")]
    Wait(#[source] ChannelError),

    /// A script exited with a code outside the configured allow-list.
    #[error(
        "Script exited with non-zero exit status: {code}. Allowed exit codes are: {allowed:?}"
    )]
    NonZeroExit { code: i32, allowed: Vec<i32> },
}

impl ProvisionError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            ProvisionError::Config(_)
            | ProvisionError::ScriptOpen { .. }
            | ProvisionError::InlineScript(_) => exit_codes::CONFIG_ERROR,
            ProvisionError::Template(_) | ProvisionError::Encoding(_) => {
                exit_codes::COMMAND_FAILURE
            }
            ProvisionError::Upload { .. }
            | ProvisionError::Start(_)
            | ProvisionError::RetriesExhausted { .. }
            | ProvisionError::Wait(_) => exit_codes::CHANNEL_FAILURE,
            ProvisionError::NonZeroExit { .. } => exit_codes::SCRIPT_FAILURE,
        }
    }
}

/// Result type alias for provisioning operations.
pub type Result<T> = std::result::Result<T, ProvisionError>;

/// A single configuration problem found during validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigIssue {
    #[error("failed to read config file '{path}': {reason}")]
    Unreadable { path: String, reason: String },

    #[error("failed to parse config YAML: {0}")]
    Parse(String),

    #[error("Only one of script or scripts can be specified.")]
    ScriptAndScripts,

    #[error("Must supply an 'elevated_password' if 'elevated_user' provided")]
    MissingElevatedPassword,

    #[error("Must supply an 'elevated_user' if 'elevated_password' provided")]
    MissingElevatedUser,

    #[error("Either a script file or inline script must be specified.")]
    NoScripts,

    #[error("Only a script file or an inline script can be specified, not both.")]
    ScriptAndInline,

    #[error("Bad script '{path}': {reason}")]
    BadScript { path: String, reason: String },

    #[error("Environment variable not in format 'key=value': {0}")]
    BadEnvironmentVar(String),

    #[error("Invalid start_retry_timeout '{value}': {reason}")]
    BadRetryTimeout { value: String, reason: String },
}

/// Every configuration problem found in one validation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigErrors(pub Vec<ConfigIssue>);

impl ConfigErrors {
    pub fn issues(&self) -> &[ConfigIssue] {
        &self.0
    }
}

impl fmt::Display for ConfigErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self.0.len();
        writeln!(
            f,
            "{} error{} occurred:",
            count,
            if count == 1 { "" } else { "s" }
        )?;
        for issue in &self.0 {
            write!(f, "\n* {}", issue)?;
        }
        Ok(())
    }
}

impl std::error::Error for ConfigErrors {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_has_correct_exit_code() {
        let err = ProvisionError::Config(ConfigErrors(vec![ConfigIssue::NoScripts]));
        assert_eq!(err.exit_code(), exit_codes::CONFIG_ERROR);
    }

    #[test]
    fn non_zero_exit_has_correct_exit_code() {
        let err = ProvisionError::NonZeroExit {
            code: 1,
            allowed: vec![0],
        };
        assert_eq!(err.exit_code(), exit_codes::SCRIPT_FAILURE);
    }

    #[test]
    fn channel_errors_share_exit_code() {
        let err = ProvisionError::Start(ChannelError::Remote("refused".to_string()));
        assert_eq!(err.exit_code(), exit_codes::CHANNEL_FAILURE);

        let err = ProvisionError::RetriesExhausted {
            timeout: Duration::from_secs(1),
            last: Box::new(err),
        };
        assert_eq!(err.exit_code(), exit_codes::CHANNEL_FAILURE);
    }

    #[test]
    fn non_zero_exit_names_code_and_allowed_set() {
        let err = ProvisionError::NonZeroExit {
            code: 1,
            allowed: vec![0, 3010],
        };
        assert_eq!(
            err.to_string(),
            "Script exited with non-zero exit status: 1. Allowed exit codes are: [0, 3010]"
        );
    }

    #[test]
    fn config_errors_list_every_issue() {
        let errs = ConfigErrors(vec![
            ConfigIssue::ScriptAndScripts,
            ConfigIssue::ScriptAndInline,
        ]);
        let msg = errs.to_string();
        assert!(msg.starts_with("2 errors occurred:"));
        assert!(msg.contains("* Only one of script or scripts can be specified."));
        assert!(msg.contains("* Only a script file or an inline script can be specified"));
    }

    #[test]
    fn single_config_error_is_singular() {
        let errs = ConfigErrors(vec![ConfigIssue::MissingElevatedUser]);
        assert!(errs.to_string().starts_with("1 error occurred:"));
    }
}
