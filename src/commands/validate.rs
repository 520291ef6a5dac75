//! Implementation of the `psprov validate` command.

use crate::cli::ValidateArgs;
use psprov::{Config, Result};

/// Load a config and report whether it is usable.
///
/// Every problem is collected before reporting, so a single run lists all
/// of them.
pub fn cmd_validate(args: ValidateArgs) -> Result<()> {
    let config = Config::load(&args.config)?;

    let sources = if config.inline.is_empty() {
        format!("{} script file(s)", config.script_files().len())
    } else {
        format!("{} inline command(s)", config.inline.len())
    };
    let mode = match config.elevated_user.as_deref() {
        Some(user) if !user.is_empty() => format!("elevated as '{}'", user),
        _ => "not elevated".to_string(),
    };

    println!("{} is valid: {}, {}", args.config.display(), sources, mode);
    Ok(())
}
