//! Implementation of the `psprov render` command.
//!
//! Runs the provisioner against an in-memory channel that accepts every
//! upload and reports exit 0 for every command, then prints what was sent.

use crate::cli::RenderArgs;
use psprov::encoding::decode_command;
use psprov::remote::{MockChannel, MockEvent};
use psprov::ui::ConsoleUi;
use psprov::{Config, Provisioner, Result};
use std::sync::Arc;
use std::time::Duration;

const ENCODED_PREFIX: &str = "powershell -executionpolicy bypass -encodedCommand ";

pub fn cmd_render(args: RenderArgs) -> Result<()> {
    let config = Config::load(&args.config)?;
    let provisioner = Provisioner::prepare(config)?
        .with_http_addr(Arc::new(args.http_addr))
        .with_retry_delay(Duration::ZERO);

    let mut channel = MockChannel::new();
    provisioner.provision(&ConsoleUi, &mut channel)?;

    println!();
    for event in channel.events() {
        match event {
            MockEvent::Upload { path, content } => {
                println!("upload  {} ({} bytes)", path, content.len());
            }
            MockEvent::Start { command } => {
                println!("start   {}", command);
                if let Some(encoded) = command.strip_prefix(ENCODED_PREFIX) {
                    println!("        # {}", decode_command(encoded)?);
                }
            }
            _ => {}
        }
    }
    Ok(())
}
