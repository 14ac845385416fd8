// Prompt templates
//
// Templates use `{name}` placeholders. `{{` and `}}` produce literal braces so
// prompts can show JSON examples to the model.

use std::collections::BTreeMap;

use anyhow::{bail, Result};

/// Named values substituted into a prompt template.
pub type PromptVariables = BTreeMap<String, String>;

/// Build a variable map from `(name, value)` pairs.
pub fn variables<I, K, V>(pairs: I) -> PromptVariables
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

/// Substitute every `{name}` in `template`.
///
/// A placeholder with no matching variable, or an unclosed `{`, is an error.
pub fn render_template(template: &str, variables: &PromptVariables) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut name = String::new();
                let mut closed = false;
                for n in chars.by_ref() {
                    if n == '}' {
                        closed = true;
                        break;
                    }
                    name.push(n);
                }
                if !closed {
                    bail!("Unclosed placeholder in prompt template: {{{}", name);
                }
                match variables.get(name.trim()) {
                    Some(value) => out.push_str(value),
                    None => bail!("No value for prompt variable `{}`", name.trim()),
                }
            }
            other => out.push(other),
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_named_placeholders() {
        let vars = variables([("name", "Ada"), ("topic", "parks")]);
        let rendered = render_template("Hi {name}, let's discuss {topic}.", &vars).unwrap();
        assert_eq!(rendered, "Hi Ada, let's discuss parks.");
    }

    #[test]
    fn doubled_braces_are_literal() {
        let rendered =
            render_template(r#"Reply as {{"ok": true}} for {who}"#, &variables([("who", "me")]))
                .unwrap();
        assert_eq!(rendered, r#"Reply as {"ok": true} for me"#);
    }

    #[test]
    fn missing_variable_is_an_error() {
        let err = render_template("Hello {nobody}", &PromptVariables::new()).unwrap_err();
        assert!(err.to_string().contains("nobody"));
    }

    #[test]
    fn unclosed_placeholder_is_an_error() {
        assert!(render_template("Hello {name", &variables([("name", "x")])).is_err());
    }
}
