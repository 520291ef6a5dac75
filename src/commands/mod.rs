//! Command implementations for psprov.
//!
//! This module provides the dispatcher that routes CLI commands to their
//! implementations.

mod decode;
mod render;
mod run;
mod validate;

use crate::cli::Command;
use psprov::Result;

/// Dispatch a command to its implementation.
pub fn dispatch(command: Command) -> Result<()> {
    match command {
        Command::Validate(args) => validate::cmd_validate(args),
        Command::Render(args) => render::cmd_render(args),
        Command::Run(args) => run::cmd_run(args),
        Command::Decode(args) => decode::cmd_decode(args),
    }
}
