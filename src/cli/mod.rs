//! CLI argument parsing for psprov.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// psprov: run PowerShell provisioning scripts.
///
/// Scripts are described by a YAML config (script files or inline
/// commands, environment variables, optional elevated credentials).
#[derive(Parser, Debug)]
#[command(name = "psprov")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Log debug diagnostics to stderr (overridden by PSPROV_LOG).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands for psprov.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check a config file and report every problem found.
    Validate(ValidateArgs),

    /// Show what a run would do without executing anything.
    ///
    /// Prints each helper upload and the exact command line started for
    /// every script.
    Render(RenderArgs),

    /// Provision the local machine.
    ///
    /// Uploads go to the local filesystem and commands run as local
    /// processes.
    Run(RunArgs),

    /// Decode a base64 `-EncodedCommand` payload.
    Decode(DecodeArgs),
}

/// Arguments for the `validate` command.
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to the YAML config.
    pub config: PathBuf,
}

/// Arguments for the `render` command.
#[derive(Parser, Debug)]
pub struct RenderArgs {
    /// Path to the YAML config.
    pub config: PathBuf,

    /// Value for PACKER_HTTP_ADDR.
    #[arg(long)]
    pub http_addr: Option<String>,
}

/// Arguments for the `run` command.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Path to the YAML config.
    pub config: PathBuf,

    /// Emit progress as NDJSON on stdout.
    #[arg(long)]
    pub machine_readable: bool,

    /// Value for PACKER_HTTP_ADDR.
    #[arg(long)]
    pub http_addr: Option<String>,

    /// Pause between upload/start attempts, in milliseconds.
    #[arg(long, default_value_t = 2000)]
    pub retry_delay_ms: u64,
}

/// Arguments for the `decode` command.
#[derive(Parser, Debug)]
pub struct DecodeArgs {
    /// Base64 payload, as passed to `-EncodedCommand`.
    pub encoded: String,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
