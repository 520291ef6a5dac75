//! PowerShell `-EncodedCommand` encoding.
//!
//! PowerShell expects the argument to `-EncodedCommand` to be the standard
//! base64 encoding of the command text in UTF-16LE.

use crate::error::{ProvisionError, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Encode a command for `powershell -EncodedCommand`.
///
/// ```
/// assert_eq!(psprov::encoding::encode_command("dir"), "ZABpAHIA");
/// ```
pub fn encode_command(command: &str) -> String {
    let bytes: Vec<u8> = command
        .encode_utf16()
        .flat_map(|unit| unit.to_le_bytes())
        .collect();
    STANDARD.encode(bytes)
}

/// Decode an `-EncodedCommand` payload back into command text.
pub fn decode_command(encoded: &str) -> Result<String> {
    let bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|e| ProvisionError::Encoding(format!("invalid base64: {}", e)))?;

    if bytes.len() % 2 != 0 {
        return Err(ProvisionError::Encoding(format!(
            "decoded payload has odd length {} (expected UTF-16LE)",
            bytes.len()
        )));
    }

    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();

    String::from_utf16(&units)
        .map_err(|e| ProvisionError::Encoding(format!("invalid UTF-16: {}", e)))
}
