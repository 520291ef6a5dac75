//! Implementation of the `psprov run` command.

use crate::cli::RunArgs;
use psprov::remote::LocalChannel;
use psprov::ui::{ConsoleUi, MachineReadableUi, Ui};
use psprov::{Config, Provisioner, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Provision the local machine through [`LocalChannel`].
pub fn cmd_run(args: RunArgs) -> Result<()> {
    let config = Config::load(&args.config)?;
    let provisioner = Provisioner::prepare(config)?
        .with_http_addr(Arc::new(args.http_addr))
        .with_retry_delay(Duration::from_millis(args.retry_delay_ms));

    info!(
        config = %args.config.display(),
        scripts = provisioner.settings().scripts.len(),
        inline = provisioner.settings().inline.len(),
        "starting local run"
    );

    let ui: Box<dyn Ui> = if args.machine_readable {
        Box::new(MachineReadableUi::new(std::io::stdout()))
    } else {
        Box::new(ConsoleUi)
    };

    let mut channel = LocalChannel::new();
    let result = provisioner.provision(ui.as_ref(), &mut channel);
    if args.machine_readable
        && let Err(err) = &result
    {
        ui.error(&err.to_string());
    }
    result
}
