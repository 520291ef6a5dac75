//! The ordered list of scripts a run uploads.

use crate::config::Settings;
use crate::error::{ProvisionError, Result};
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;
use tracing::debug;

/// Script files for one run, in order. Owns the temp file inline commands
/// were written to; dropping the set removes it.
#[derive(Debug)]
pub struct ScriptSet {
    paths: Vec<PathBuf>,
    _inline: Option<NamedTempFile>,
}

impl ScriptSet {
    /// Configured files first, then one file holding every inline command.
    pub fn collect(settings: &Settings) -> Result<Self> {
        let mut paths = settings.scripts.clone();

        let inline = if settings.inline.is_empty() {
            None
        } else {
            let file = write_inline(&settings.inline)?;
            paths.push(file.path().to_path_buf());
            Some(file)
        };

        Ok(Self {
            paths,
            _inline: inline,
        })
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }
}

fn write_inline(commands: &[String]) -> Result<NamedTempFile> {
    let extract_err = |e: std::io::Error| ProvisionError::InlineScript(e.to_string());

    let mut file = tempfile::Builder::new()
        .prefix("psprov-inline-")
        .suffix(".ps1")
        .tempfile()
        .map_err(extract_err)?;

    for command in commands {
        writeln!(file, "{}", command).map_err(extract_err)?;
    }
    file.flush().map_err(extract_err)?;

    debug!(path = %file.path().display(), commands = commands.len(), "wrote inline script");
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::ids::SequentialIds;

    fn settings(config: Config) -> Settings {
        config.resolve(&SequentialIds::new("")).unwrap()
    }

    #[test]
    fn test_inline_commands_joined_with_newlines() {
        let set = ScriptSet::collect(&settings(Config {
            inline: vec!["Write-Output 'a'".to_string(), "exit 0".to_string()],
            ..Default::default()
        }))
        .unwrap();

        assert_eq!(set.paths().len(), 1);
        let path = &set.paths()[0];
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("psprov-inline-"));
        assert!(name.ends_with(".ps1"));
        assert_eq!(
            std::fs::read_to_string(path).unwrap(),
            "Write-Output 'a'\nexit 0\n"
        );
    }

    #[test]
    fn test_inline_file_removed_with_set() {
        let set = ScriptSet::collect(&settings(Config {
            inline: vec!["x".to_string()],
            ..Default::default()
        }))
        .unwrap();
        let path = set.paths()[0].clone();
        assert!(path.exists());

        drop(set);
        assert!(!path.exists());
    }

    #[test]
    fn test_script_files_kept_in_order() {
        let a = NamedTempFile::new().unwrap();
        let b = NamedTempFile::new().unwrap();
        let set = ScriptSet::collect(&settings(Config {
            scripts: vec![
                b.path().display().to_string(),
                a.path().display().to_string(),
            ],
            ..Default::default()
        }))
        .unwrap();

        assert_eq!(set.paths(), &[b.path().to_path_buf(), a.path().to_path_buf()]);
    }
}
