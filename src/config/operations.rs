//! Config loading, validation, and resolution.

use super::model::Config;
use super::settings::Settings;
use super::types::*;
use crate::command::ElevatedCredentials;
use crate::environment::split_assignment;
use crate::error::{ConfigErrors, ConfigIssue, ProvisionError, Result};
use crate::ids::IdGenerator;
use std::path::{Path, PathBuf};
use std::time::Duration;

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

fn or_default(value: &str, default: &str) -> String {
    if value.is_empty() {
        default.to_string()
    } else {
        value.to_string()
    }
}

impl Config {
    /// Load config from a YAML file and validate it.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            ProvisionError::Config(ConfigErrors(vec![ConfigIssue::Unreadable {
                path: path.display().to_string(),
                reason: e.to_string(),
            }]))
        })?;

        Self::from_yaml(&content)
    }

    /// Parse config from a YAML string and validate it.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml).map_err(|e| {
            ProvisionError::Config(ConfigErrors(vec![ConfigIssue::Parse(e.to_string())]))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Script files that will run, in order.
    ///
    /// `script` takes the place of `scripts` when both are present; that
    /// combination is still reported by [`Config::validate`].
    pub fn script_files(&self) -> Vec<String> {
        match non_empty(&self.script) {
            Some(script) => vec![script.to_string()],
            None => self.scripts.clone(),
        }
    }

    /// Every configuration problem, in a stable order.
    pub fn issues(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        if non_empty(&self.script).is_some() && !self.scripts.is_empty() {
            issues.push(ConfigIssue::ScriptAndScripts);
        }

        let user = non_empty(&self.elevated_user);
        let password = non_empty(&self.elevated_password);
        if user.is_some() && password.is_none() {
            issues.push(ConfigIssue::MissingElevatedPassword);
        }
        if user.is_none() && password.is_some() {
            issues.push(ConfigIssue::MissingElevatedUser);
        }

        let scripts = self.script_files();
        if scripts.is_empty() && self.inline.is_empty() {
            issues.push(ConfigIssue::NoScripts);
        } else if !scripts.is_empty() && !self.inline.is_empty() {
            issues.push(ConfigIssue::ScriptAndInline);
        }

        for path in &scripts {
            if let Err(e) = std::fs::metadata(path) {
                issues.push(ConfigIssue::BadScript {
                    path: path.clone(),
                    reason: e.to_string(),
                });
            }
        }

        for assignment in &self.environment_vars {
            if split_assignment(assignment).is_none() {
                issues.push(ConfigIssue::BadEnvironmentVar(assignment.clone()));
            }
        }

        if !self.start_retry_timeout.is_empty()
            && let Err(reason) = parse_duration(&self.start_retry_timeout)
        {
            issues.push(ConfigIssue::BadRetryTimeout {
                value: self.start_retry_timeout.clone(),
                reason,
            });
        }

        issues
    }

    /// Validate the config, reporting every problem at once.
    pub fn validate(&self) -> Result<()> {
        let issues = self.issues();
        if issues.is_empty() {
            Ok(())
        } else {
            Err(ProvisionError::Config(ConfigErrors(issues)))
        }
    }

    /// Validate and fill in every default, producing the settings a run uses.
    ///
    /// `ids` supplies the unique part of the default `remote_path`.
    pub fn resolve(&self, ids: &dyn IdGenerator) -> Result<Settings> {
        self.validate()?;

        let remote_path = match non_empty(&self.remote_path) {
            Some(path) => path.to_string(),
            None => default_remote_path(&ids.next_id()),
        };

        let start_retry_timeout = match parse_duration(&self.start_retry_timeout) {
            Ok(timeout) if !timeout.is_zero() => timeout,
            _ => Duration::from_secs(5 * 60),
        };

        let elevated = match (
            non_empty(&self.elevated_user),
            non_empty(&self.elevated_password),
        ) {
            (Some(user), Some(password)) => Some(ElevatedCredentials {
                user: user.to_string(),
                password: password.to_string(),
            }),
            _ => None,
        };

        let valid_exit_codes = if self.valid_exit_codes.is_empty() {
            default_valid_exit_codes()
        } else {
            self.valid_exit_codes.clone()
        };

        Ok(Settings {
            identity: self.build_identity(),
            binary: self.binary,
            scripts: self.script_files().into_iter().map(PathBuf::from).collect(),
            inline: self.inline.clone(),
            environment_vars: self.environment_vars.clone(),
            remote_path,
            execute_command: or_default(&self.execute_command, DEFAULT_EXECUTE_COMMAND),
            elevated_execute_command: or_default(
                &self.elevated_execute_command,
                DEFAULT_ELEVATED_EXECUTE_COMMAND,
            ),
            start_retry_timeout,
            env_var_format: or_default(&self.env_var_format, DEFAULT_ENV_VAR_FORMAT),
            elevated_env_var_format: or_default(
                &self.elevated_env_var_format,
                DEFAULT_ENV_VAR_FORMAT,
            ),
            elevated,
            valid_exit_codes,
        })
    }
}
