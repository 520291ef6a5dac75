//! Environment variable assembly.
//!
//! Builds the variable-assignment prefix that is injected in front of every
//! script invocation. Reserved build-identity variables are always present;
//! user variables from `environment_vars` override them on key collision.
//! Keys are emitted in lexicographic order so the rendered command is
//! deterministic.

use std::collections::BTreeMap;
use std::sync::Arc;

/// Name of the build being provisioned.
pub const BUILD_NAME_VAR: &str = "PACKER_BUILD_NAME";

/// Type of the builder that created the machine.
pub const BUILDER_TYPE_VAR: &str = "PACKER_BUILDER_TYPE";

/// Address of the host's HTTP file server, when one is running.
pub const HTTP_ADDR_VAR: &str = "PACKER_HTTP_ADDR";

/// Identity of the build, exposed to scripts through reserved variables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildIdentity {
    pub build_name: String,
    pub builder_type: String,
}

/// Read-only accessor for the host's HTTP server address.
///
/// Queried each time a command is rendered, so a server started after
/// `prepare` is still picked up.
pub trait HttpAddrSource: Send + Sync {
    fn http_addr(&self) -> Option<String>;
}

impl HttpAddrSource for Option<String> {
    fn http_addr(&self) -> Option<String> {
        self.clone()
    }
}

impl<F> HttpAddrSource for F
where
    F: Fn() -> Option<String> + Send + Sync,
{
    fn http_addr(&self) -> Option<String> {
        self()
    }
}

/// Split a `key=value` assignment at the first `=`.
///
/// Returns `None` when there is no `=` or the key is empty.
pub fn split_assignment(assignment: &str) -> Option<(&str, &str)> {
    match assignment.split_once('=') {
        Some((key, value)) if !key.is_empty() => Some((key, value)),
        _ => None,
    }
}

/// Substitute `key` and `value` into a printf-style format.
///
/// The first `%s` receives the key and the second the value. `%%` renders a
/// literal `%`; any other `%` sequence, including a third `%s`, is copied
/// through unchanged.
pub fn format_assignment(format: &str, key: &str, value: &str) -> String {
    let mut out = String::with_capacity(format.len() + key.len() + value.len());
    let mut args = [key, value].into_iter();
    let mut chars = format.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '%' {
            out.push(ch);
            continue;
        }
        match chars.peek() {
            Some('%') => {
                chars.next();
                out.push('%');
            }
            Some('s') => match args.next() {
                Some(arg) => {
                    chars.next();
                    out.push_str(arg);
                }
                None => out.push('%'),
            },
            _ => out.push('%'),
        }
    }

    out
}

/// Merges reserved and user variables and renders them with the configured
/// assignment formats.
#[derive(Clone)]
pub struct EnvironmentAssembler {
    identity: BuildIdentity,
    user_vars: Vec<String>,
    format: String,
    elevated_format: String,
    http_addr: Arc<dyn HttpAddrSource>,
}

impl EnvironmentAssembler {
    /// `user_vars` must already be validated as `key=value`; malformed
    /// entries are skipped.
    pub fn new(
        identity: BuildIdentity,
        user_vars: Vec<String>,
        format: impl Into<String>,
        elevated_format: impl Into<String>,
        http_addr: Arc<dyn HttpAddrSource>,
    ) -> Self {
        Self {
            identity,
            user_vars,
            format: format.into(),
            elevated_format: elevated_format.into(),
            http_addr,
        }
    }

    /// The merged variable set, sorted by key.
    pub fn variables(&self) -> BTreeMap<String, String> {
        let mut vars = BTreeMap::new();
        vars.insert(
            BUILD_NAME_VAR.to_string(),
            self.identity.build_name.clone(),
        );
        vars.insert(
            BUILDER_TYPE_VAR.to_string(),
            self.identity.builder_type.clone(),
        );
        if let Some(addr) = self.http_addr.http_addr().filter(|a| !a.is_empty()) {
            vars.insert(HTTP_ADDR_VAR.to_string(), addr);
        }

        for assignment in &self.user_vars {
            if let Some((key, value)) = split_assignment(assignment) {
                vars.insert(key.to_string(), value.to_string());
            }
        }
        vars
    }

    /// Render every variable with the plain or elevated format, concatenated
    /// in key order.
    pub fn assemble(&self, elevated: bool) -> String {
        let format = if elevated {
            &self.elevated_format
        } else {
            &self.format
        };

        self.variables()
            .iter()
            .map(|(key, value)| format_assignment(format, key, value))
            .collect()
    }
}

impl std::fmt::Debug for EnvironmentAssembler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvironmentAssembler")
            .field("identity", &self.identity)
            .field("user_vars", &self.user_vars)
            .field("format", &self.format)
            .field("elevated_format", &self.elevated_format)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FORMAT: &str = "$env:%s=\"%s\"; ";

    fn identity() -> BuildIdentity {
        BuildIdentity {
            build_name: "win-2019".to_string(),
            builder_type: "hyperv-iso".to_string(),
        }
    }

    fn assembler(vars: &[&str], http: Option<&str>) -> EnvironmentAssembler {
        EnvironmentAssembler::new(
            identity(),
            vars.iter().map(|v| v.to_string()).collect(),
            FORMAT,
            "${Env:%s}=\"%s\"\n",
            Arc::new(http.map(str::to_string)),
        )
    }

    #[test]
    fn test_split_assignment() {
        assert_eq!(split_assignment("A=1"), Some(("A", "1")));
        assert_eq!(split_assignment("A="), Some(("A", "")));
        assert_eq!(split_assignment("A=b=c"), Some(("A", "b=c")));
        assert_eq!(split_assignment("=foo"), None);
        assert_eq!(split_assignment("foobar"), None);
    }

    #[test]
    fn test_format_assignment() {
        assert_eq!(format_assignment(FORMAT, "K", "V"), "$env:K=\"V\"; ");
        assert_eq!(format_assignment("%s=%s 100%%", "K", "V"), "K=V 100%");
        assert_eq!(format_assignment("%d %s", "K", "V"), "%d K");
        assert_eq!(format_assignment("%s %s %s", "K", "V"), "K V %s");
        assert_eq!(format_assignment("trailing %", "K", "V"), "trailing %");
    }

    #[test]
    fn test_reserved_variables_always_present() {
        let vars = assembler(&[], None).variables();
        assert_eq!(vars.get(BUILD_NAME_VAR).unwrap(), "win-2019");
        assert_eq!(vars.get(BUILDER_TYPE_VAR).unwrap(), "hyperv-iso");
        assert!(!vars.contains_key(HTTP_ADDR_VAR));
    }

    #[test]
    fn test_http_addr_included_when_available() {
        let vars = assembler(&[], Some("10.0.2.2:8080")).variables();
        assert_eq!(vars.get(HTTP_ADDR_VAR).unwrap(), "10.0.2.2:8080");

        let vars = assembler(&[], Some("")).variables();
        assert!(!vars.contains_key(HTTP_ADDR_VAR));
    }

    #[test]
    fn test_http_addr_queried_at_render_time() {
        use std::sync::Mutex;
        let addr = Arc::new(Mutex::new(None::<String>));
        let source = {
            let addr = Arc::clone(&addr);
            move || addr.lock().unwrap().clone()
        };
        let asm = EnvironmentAssembler::new(identity(), vec![], FORMAT, FORMAT, Arc::new(source));

        assert!(!asm.assemble(false).contains(HTTP_ADDR_VAR));
        *addr.lock().unwrap() = Some("127.0.0.1:9000".to_string());
        assert!(asm.assemble(false).contains("$env:PACKER_HTTP_ADDR=\"127.0.0.1:9000\"; "));
    }

    #[test]
    fn test_user_variable_overrides_reserved() {
        let vars = assembler(&["PACKER_BUILD_NAME=custom"], None).variables();
        assert_eq!(vars.get(BUILD_NAME_VAR).unwrap(), "custom");
    }

    #[test]
    fn test_output_sorted_regardless_of_input_order() {
        let asm = assembler(&["ZED=last", "ALPHA=first", "MIDDLE=m"], None);
        assert_eq!(
            asm.assemble(false),
            "$env:ALPHA=\"first\"; \
             $env:MIDDLE=\"m\"; \
             $env:PACKER_BUILDER_TYPE=\"hyperv-iso\"; \
             $env:PACKER_BUILD_NAME=\"win-2019\"; \
             $env:ZED=\"last\"; "
        );

        let keys: Vec<String> = asm.variables().into_keys().collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }

    #[test]
    fn test_elevated_format_selected_by_flag() {
        let asm = assembler(&["A=1"], None);
        let out = asm.assemble(true);
        assert!(out.starts_with("${Env:A}=\"1\"\n"));
        assert!(!out.contains("$env:"));
    }

    #[test]
    fn test_value_with_equals_sign_preserved() {
        let asm = assembler(&["CONN=a=b;c=d"], None);
        assert!(asm.assemble(false).contains("$env:CONN=\"a=b;c=d\"; "));
    }
}
