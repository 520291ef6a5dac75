//! Implementation of the `psprov decode` command.

use crate::cli::DecodeArgs;
use psprov::Result;
use psprov::encoding::decode_command;

pub fn cmd_decode(args: DecodeArgs) -> Result<()> {
    println!("{}", decode_command(&args.encoded)?);
    Ok(())
}
