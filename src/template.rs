//! Workload template interpolation.
//!
//! Templates are plain text with `${name}` placeholders resolved against a
//! flat string-to-string configuration. Substitution is single pass and flat:
//! resolved values are emitted verbatim and never re-scanned, and a
//! placeholder must open and close within a single line.

use std::collections::HashMap;

use crate::error::{Result, ScaleTestError};

/// Scanner state while walking one line of template text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    /// Copying literal characters through.
    Literal,
    /// Saw `$`, deciding whether a placeholder opens.
    SawDollar,
    /// Inside `${`, before the first name character.
    LeadingSpace,
    /// Accumulating the parameter name.
    Name,
    /// Name finished, only whitespace allowed before the closing `}`.
    TrailingSpace,
}

/// Renders `template` against `config`, substituting every `${name}`
/// placeholder with its configured value.
///
/// A `$` not followed by `{` passes through literally. Whitespace may
/// surround the parameter name inside the braces. `{`, `}` and `$` inside a
/// name (other than the terminating `}`) are ordinary name characters.
pub fn render(template: &str, config: &HashMap<String, String>) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    for line in template.split_inclusive('\n') {
        render_line(line, config, &mut out)?;
    }
    Ok(out)
}

fn render_line(line: &str, config: &HashMap<String, String>, out: &mut String) -> Result<()> {
    let mut state = ScanState::Literal;
    let mut name = String::new();

    for ch in line.chars() {
        match state {
            ScanState::Literal => {
                if ch == '$' {
                    state = ScanState::SawDollar;
                } else {
                    out.push(ch);
                }
            }
            ScanState::SawDollar => {
                if ch == '{' {
                    state = ScanState::LeadingSpace;
                } else {
                    out.push('$');
                    out.push(ch);
                    state = ScanState::Literal;
                }
            }
            ScanState::LeadingSpace => {
                if !ch.is_whitespace() {
                    name.push(ch);
                    state = ScanState::Name;
                }
            }
            ScanState::Name => {
                if ch.is_whitespace() {
                    state = ScanState::TrailingSpace;
                } else if ch == '}' {
                    resolve(&name, config, out)?;
                    name.clear();
                    state = ScanState::Literal;
                } else {
                    name.push(ch);
                }
            }
            ScanState::TrailingSpace => {
                if ch == '}' {
                    resolve(&name, config, out)?;
                    name.clear();
                    state = ScanState::Literal;
                } else if !ch.is_whitespace() {
                    return Err(ScaleTestError::MalformedTemplate(format!(
                        "unexpected character {ch:?} between parameter name and closing brace in {:?}",
                        line.trim_end()
                    )));
                }
            }
        }
    }

    if state != ScanState::Literal {
        return Err(ScaleTestError::MalformedTemplate(format!(
            "placeholder does not close before end of line in {:?}",
            line.trim_end()
        )));
    }
    Ok(())
}

fn resolve(name: &str, config: &HashMap<String, String>, out: &mut String) -> Result<()> {
    let value = config
        .get(name)
        .ok_or_else(|| ScaleTestError::UnresolvedParameter(name.to_string()))?;
    out.push_str(value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn plain_text_passes_through_unchanged() {
        let text = "apiVersion: v1\nkind: Pod\n";
        assert_eq!(render(text, &config(&[])).unwrap(), text);
    }

    #[test]
    fn substitutes_single_placeholder() {
        let cfg = config(&[("fs_name", "lustrefs")]);
        let rendered = render("fsname: ${fs_name} # mount\n", &cfg).unwrap();
        assert_eq!(rendered, "fsname: lustrefs # mount\n");
    }

    #[test]
    fn substitutes_multiple_placeholders_per_line() {
        let cfg = config(&[("a", "1"), ("b", "2")]);
        assert_eq!(render("${a}-${b}", &cfg).unwrap(), "1-2");
    }

    #[test]
    fn whitespace_allowed_inside_braces() {
        let cfg = config(&[("scale", "50")]);
        assert_eq!(render("replicas: ${ scale }\n", &cfg).unwrap(), "replicas: 50\n");
    }

    #[test]
    fn missing_parameter_is_unresolved() {
        let err = render("${missing}", &config(&[])).unwrap_err();
        assert!(matches!(err, ScaleTestError::UnresolvedParameter(name) if name == "missing"));
    }

    #[test]
    fn unclosed_placeholder_is_malformed() {
        let err = render("name: ${foo", &config(&[("foo", "x")])).unwrap_err();
        assert!(matches!(err, ScaleTestError::MalformedTemplate(_)));
    }

    #[test]
    fn placeholder_must_close_on_same_line() {
        let err = render("name: ${foo\n}", &config(&[("foo", "x")])).unwrap_err();
        assert!(matches!(err, ScaleTestError::MalformedTemplate(_)));
    }

    #[test]
    fn dollar_without_brace_is_literal() {
        assert_eq!(render("cost: $5\n", &config(&[])).unwrap(), "cost: $5\n");
    }

    #[test]
    fn garbage_after_name_whitespace_is_malformed() {
        let err = render("${foo bar}", &config(&[("foo", "x")])).unwrap_err();
        assert!(matches!(err, ScaleTestError::MalformedTemplate(_)));
    }

    #[test]
    fn resolved_value_is_not_rescanned() {
        let cfg = config(&[("outer", "${inner}")]);
        assert_eq!(render("${outer}", &cfg).unwrap(), "${inner}");
    }

    #[test]
    fn braces_and_dollars_are_name_characters() {
        let cfg = config(&[("we$ird{", "ok")]);
        assert_eq!(render("${we$ird{}", &cfg).unwrap(), "ok");
    }
}
