//! Exit code constants for the psprov CLI.
//!
//! - 0: Success
//! - 1: Configuration error (invalid or conflicting options, unreadable scripts)
//! - 2: Command construction failure (template, encoding)
//! - 3: Remote channel failure (upload, start, wait, retries exhausted)
//! - 4: A script finished with an exit code outside the allowed set

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// Configuration error: conflicting options, bad variables, missing scripts.
pub const CONFIG_ERROR: i32 = 1;

/// The remote command line could not be built.
pub const COMMAND_FAILURE: i32 = 2;

/// The remote channel rejected an upload or could not start a command.
pub const CHANNEL_FAILURE: i32 = 3;

/// A script exited with a code that is not in `valid_exit_codes`.
pub const SCRIPT_FAILURE: i32 = 4;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_distinct() {
        let codes = [
            SUCCESS,
            CONFIG_ERROR,
            COMMAND_FAILURE,
            CHANNEL_FAILURE,
            SCRIPT_FAILURE,
        ];
        for (i, &a) in codes.iter().enumerate() {
            for (j, &b) in codes.iter().enumerate() {
                if i != j {
                    assert_ne!(a, b, "Exit codes must be distinct");
                }
            }
        }
    }
}
