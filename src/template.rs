//! Template engine for command rendering.
//!
//! Execute-command templates and the elevated wrapper script are written in
//! PowerShell, which uses single braces for script blocks. Placeholders are
//! therefore delimited by double braces:
//!
//! - `{{ .Name }}` - Substitutes the value of field `Name`
//! - `{{ "text" }}` - Renders `text` verbatim (use `{{ "{{" }}` for a literal `{{` and `{{ "}}" }}` for `}}`)
//! - `{` and `}` on their own are ordinary characters
//!
//! Undefined fields are an error rather than an empty substitution, so a
//! typo in a user-supplied template is caught before anything is uploaded.

use std::collections::HashMap;
use std::fmt;

/// Error type for template rendering failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    /// A field was referenced but not provided.
    UndefinedField {
        /// The name of the undefined field (without the leading dot).
        name: String,
        /// Byte offset of the opening `{{`.
        position: usize,
    },
    /// A `{{` was found without a matching `}}`.
    UnclosedAction {
        /// Byte offset of the unmatched `{{`.
        position: usize,
    },
    /// An action with nothing inside it (e.g., `{{ }}`).
    EmptyAction {
        /// Byte offset of the empty action.
        position: usize,
    },
    /// An action that is neither `.Field` nor a quoted string.
    UnsupportedAction {
        /// The trimmed action text.
        action: String,
        /// Byte offset of the opening `{{`.
        position: usize,
    },
}

impl fmt::Display for TemplateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateError::UndefinedField { name, position } => {
                write!(
                    f,
                    "undefined field '.{}' at position {} in template",
                    name, position
                )
            }
            TemplateError::UnclosedAction { position } => {
                write!(f, "unclosed '{{{{' at position {} in template", position)
            }
            TemplateError::EmptyAction { position } => {
                write!(f, "empty action at position {} in template", position)
            }
            TemplateError::UnsupportedAction { action, position } => {
                write!(
                    f,
                    "unsupported action '{}' at position {} in template (expected '.Field')",
                    action, position
                )
            }
        }
    }
}

impl std::error::Error for TemplateError {}

/// Render a template string by substituting `{{ .Field }}` actions.
///
/// # Examples
///
/// ```
/// use psprov::template::{fields, render_template};
///
/// let fields = fields([("Vars", "$env:A=\"1\"; "), ("Path", "c:/t/s.ps1")]);
/// let out = render_template("{{.Vars}}&'{{ .Path }}'", &fields).unwrap();
/// assert_eq!(out, "$env:A=\"1\"; &'c:/t/s.ps1'");
/// ```
pub fn render_template(
    template: &str,
    fields: &HashMap<String, String>,
) -> Result<String, TemplateError> {
    let mut result = String::with_capacity(template.len());
    let mut rest = template;
    let mut offset = 0;

    while let Some(start) = rest.find("{{") {
        result.push_str(&rest[..start]);
        let position = offset + start;

        let body = &rest[start + 2..];
        let end = action_end(body).ok_or(TemplateError::UnclosedAction { position })?;
        render_action(body[..end].trim(), position, fields, &mut result)?;

        let consumed = start + 2 + end + 2;
        rest = &rest[consumed..];
        offset += consumed;
    }

    result.push_str(rest);
    Ok(result)
}

/// Offset of the `}}` closing the action at the start of `body`. A quoted
/// literal may itself contain `}}`.
fn action_end(body: &str) -> Option<usize> {
    let lead = body.len() - body.trim_start().len();
    let mut from = 0;
    if body[lead..].starts_with('"') {
        let close = body[lead + 1..].find('"')?;
        from = lead + 1 + close + 1;
    }
    body[from..].find("}}").map(|i| from + i)
}

fn render_action(
    action: &str,
    position: usize,
    fields: &HashMap<String, String>,
    out: &mut String,
) -> Result<(), TemplateError> {
    if action.is_empty() {
        return Err(TemplateError::EmptyAction { position });
    }

    if action.len() >= 2 && action.starts_with('"') && action.ends_with('"') {
        out.push_str(&action[1..action.len() - 1]);
        return Ok(());
    }

    let Some(name) = action.strip_prefix('.') else {
        return Err(TemplateError::UnsupportedAction {
            action: action.to_string(),
            position,
        });
    };

    match fields.get(name.trim()) {
        Some(value) => {
            out.push_str(value);
            Ok(())
        }
        None => Err(TemplateError::UndefinedField {
            name: name.trim().to_string(),
            position,
        }),
    }
}

/// Helper to create a field map from a list of key-value pairs.
pub fn fields<I, K, V>(pairs: I) -> HashMap<String, String>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_substitution() {
        let f = fields([("Vars", "V"), ("Path", "P")]);
        let result = render_template("{{.Vars}}&'{{.Path}}'", &f).unwrap();
        assert_eq!(result, "V&'P'");
    }

    #[test]
    fn test_no_actions() {
        let result = render_template("Just plain text", &HashMap::new()).unwrap();
        assert_eq!(result, "Just plain text");
    }

    #[test]
    fn test_empty_template() {
        let result = render_template("", &HashMap::new()).unwrap();
        assert_eq!(result, "");
    }

    #[test]
    fn test_single_braces_are_literal() {
        let f = fields([("Vars", "")]);
        let template =
            "if (Test-Path variable:global:ProgressPreference){$ProgressPreference='SilentlyContinue'};{{.Vars}}";
        let result = render_template(template, &f).unwrap();
        assert_eq!(
            result,
            "if (Test-Path variable:global:ProgressPreference){$ProgressPreference='SilentlyContinue'};"
        );
    }

    #[test]
    fn test_whitespace_inside_action() {
        let f = fields([("Path", "c:/x.ps1")]);
        let result = render_template("run {{  .Path  }} now", &f).unwrap();
        assert_eq!(result, "run c:/x.ps1 now");
    }

    #[test]
    fn test_quoted_literal_action() {
        let result = render_template("a {{ \"{{\" }} b", &HashMap::new()).unwrap();
        assert_eq!(result, "a {{ b");
    }

    #[test]
    fn test_quoted_literal_may_contain_closing_braces() {
        let result = render_template("a{{ \"}}\" }}b{{.X}}", &fields([("X", "x")])).unwrap();
        assert_eq!(result, "a}}bx");
    }

    #[test]
    fn test_unterminated_quoted_literal_is_unclosed() {
        let err = render_template("a {{ \"}} b", &HashMap::new()).unwrap_err();
        assert_eq!(err, TemplateError::UnclosedAction { position: 2 });
    }

    #[test]
    fn test_undefined_field_error() {
        let err = render_template("Hello {{.Name}}", &HashMap::new()).unwrap_err();
        assert_eq!(
            err,
            TemplateError::UndefinedField {
                name: "Name".to_string(),
                position: 6
            }
        );
    }

    #[test]
    fn test_unclosed_action_error() {
        let err = render_template("Hello {{.Name", &HashMap::new()).unwrap_err();
        assert_eq!(err, TemplateError::UnclosedAction { position: 6 });
    }

    #[test]
    fn test_empty_action_error() {
        let err = render_template("Hello {{ }}", &HashMap::new()).unwrap_err();
        assert_eq!(err, TemplateError::EmptyAction { position: 6 });
    }

    #[test]
    fn test_unsupported_action_error() {
        let err = render_template("{{ Path }}", &fields([("Path", "x")])).unwrap_err();
        assert_eq!(
            err,
            TemplateError::UnsupportedAction {
                action: "Path".to_string(),
                position: 0
            }
        );
    }

    #[test]
    fn test_position_counts_previous_actions() {
        let f = fields([("A", "a")]);
        let err = render_template("{{.A}} {{.B}}", &f).unwrap_err();
        assert_eq!(
            err,
            TemplateError::UndefinedField {
                name: "B".to_string(),
                position: 7
            }
        );
    }

    #[test]
    fn test_multiple_occurrences() {
        let f = fields([("User", "admin")]);
        let result = render_template("{{.User}}-{{.User}}", &f).unwrap();
        assert_eq!(result, "admin-admin");
    }

    #[test]
    fn test_values_are_not_reinterpreted() {
        let f = fields([("Vars", "{{.Path}}"), ("Path", "x")]);
        let result = render_template("{{.Vars}}", &f).unwrap();
        assert_eq!(result, "{{.Path}}");
    }

    #[test]
    fn test_unicode_in_template_and_values() {
        let f = fields([("Path", "c:/データ/s.ps1")]);
        let result = render_template("→ {{.Path}}", &f).unwrap();
        assert_eq!(result, "→ c:/データ/s.ps1");
    }

    #[test]
    fn test_error_display() {
        let err = TemplateError::UndefinedField {
            name: "Vars".to_string(),
            position: 10,
        };
        assert_eq!(
            err.to_string(),
            "undefined field '.Vars' at position 10 in template"
        );

        let err = TemplateError::UnclosedAction { position: 5 };
        assert_eq!(err.to_string(), "unclosed '{{' at position 5 in template");
    }
}
