//! Configuration defaults and value parsing.

use std::time::Duration;

/// Execute command used when `execute_command` is not set.
pub const DEFAULT_EXECUTE_COMMAND: &str = "if (Test-Path variable:global:ProgressPreference){$ProgressPreference='SilentlyContinue'};{{.Vars}}&'{{.Path}}';exit $LastExitCode";

/// Execute command used for elevated runs when `elevated_execute_command` is not set.
///
/// `{{.Vars}}` is the path of an uploaded script that sets the variables; it
/// is dot-sourced into the elevated session.
pub const DEFAULT_ELEVATED_EXECUTE_COMMAND: &str = "if (Test-Path variable:global:ProgressPreference){$ProgressPreference='SilentlyContinue'}; . {{.Vars}}; &'{{.Path}}'; exit $LastExitCode";

/// printf-style format for one variable assignment (key, then value).
pub const DEFAULT_ENV_VAR_FORMAT: &str = "$env:%s=\"%s\"; ";

/// How long to keep retrying upload+start, as a duration string.
pub const DEFAULT_START_RETRY_TIMEOUT: &str = "5m";

/// Remote directory for the default `remote_path`.
pub const DEFAULT_REMOTE_DIR: &str = "c:/Windows/Temp";

pub(crate) fn default_execute_command() -> String {
    DEFAULT_EXECUTE_COMMAND.to_string()
}
pub(crate) fn default_elevated_execute_command() -> String {
    DEFAULT_ELEVATED_EXECUTE_COMMAND.to_string()
}
pub(crate) fn default_env_var_format() -> String {
    DEFAULT_ENV_VAR_FORMAT.to_string()
}
pub(crate) fn default_start_retry_timeout() -> String {
    DEFAULT_START_RETRY_TIMEOUT.to_string()
}
pub(crate) fn default_valid_exit_codes() -> Vec<i32> {
    vec![0]
}

/// Default upload target for a generated id.
pub fn default_remote_path(id: &str) -> String {
    format!("{}/script-{}.ps1", DEFAULT_REMOTE_DIR, id)
}

/// Parse a duration string such as `300ms`, `90s`, `5m`, `1h30m`, or `1.5h`.
///
/// Valid units are `ns`, `us` (or `µs`), `ms`, `s`, `m`, and `h`. A bare
/// `0` is accepted and means zero.
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let s = input.trim();
    if s.is_empty() {
        return Err("empty duration".to_string());
    }
    if s == "0" {
        return Ok(Duration::ZERO);
    }
    if s.starts_with('-') {
        return Err("duration must not be negative".to_string());
    }

    let mut total_nanos: f64 = 0.0;
    let mut rest = s.strip_prefix('+').unwrap_or(s);

    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        let (number, tail) = rest.split_at(number_len);
        if number.is_empty() || number == "." {
            return Err(format!("expected a number at '{}'", rest));
        }
        let value: f64 = number
            .parse()
            .map_err(|_| format!("invalid number '{}'", number))?;

        let unit_len = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, next) = tail.split_at(unit_len);
        let scale = match unit {
            "ns" => 1.0,
            "us" | "µs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60.0 * 1e9,
            "h" => 3600.0 * 1e9,
            "" => return Err(format!("missing unit after '{}'", number)),
            other => return Err(format!("unknown unit '{}'", other)),
        };

        total_nanos += value * scale;
        rest = next;
    }

    if !total_nanos.is_finite() || total_nanos > u64::MAX as f64 {
        return Err("duration out of range".to_string());
    }
    Ok(Duration::from_nanos(total_nanos.round() as u64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_units() {
        assert_eq!(parse_duration("5m").unwrap(), Duration::from_secs(300));
        assert_eq!(parse_duration("90s").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_duration("2h").unwrap(), Duration::from_secs(7200));
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_duration("10us").unwrap(), Duration::from_micros(10));
        assert_eq!(parse_duration("7ns").unwrap(), Duration::from_nanos(7));
    }

    #[test]
    fn test_parse_compound_and_fractional() {
        assert_eq!(parse_duration("1m30s").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_duration("1h15m").unwrap(), Duration::from_secs(4500));
        assert_eq!(parse_duration("1.5h").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_duration(" 10s ").unwrap(), Duration::from_secs(10));
    }

    #[test]
    fn test_parse_zero() {
        assert_eq!(parse_duration("0").unwrap(), Duration::ZERO);
        assert_eq!(parse_duration("0s").unwrap(), Duration::ZERO);
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_duration("").unwrap_err().contains("empty"));
        assert!(parse_duration("10").unwrap_err().contains("missing unit"));
        assert!(parse_duration("10d").unwrap_err().contains("unknown unit 'd'"));
        assert!(parse_duration("-5m").unwrap_err().contains("negative"));
        assert!(parse_duration("m").unwrap_err().contains("expected a number"));
        assert!(parse_duration("1..5s").unwrap_err().contains("invalid number"));
    }

    #[test]
    fn test_default_remote_path() {
        assert_eq!(
            default_remote_path("abc"),
            "c:/Windows/Temp/script-abc.ps1"
        );
    }
}
