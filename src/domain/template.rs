//! Prompt templates and flat key→string substitution.

use std::collections::HashMap;

use crate::domain::error::FinpromptError;

/// Speaker of a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    Human,
    Ai,
}

impl Role {
    /// Label prefixed to the turn when rendering.
    pub fn label(&self) -> &'static str {
        match self {
            Role::System => "System",
            Role::Human => "Human",
            Role::Ai => "AI",
        }
    }

    /// Tag used in storage.
    pub fn as_tag(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::Human => "human",
            Role::Ai => "ai",
        }
    }

    pub fn from_tag(s: &str) -> Option<Role> {
        match s {
            "system" => Some(Role::System),
            "human" => Some(Role::Human),
            "ai" => Some(Role::Ai),
            _ => None,
        }
    }
}

/// Body shape of a template.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateBody {
    /// One free-form body.
    Simple(String),
    /// Ordered chat turns, each rendered as `Label: text`.
    Chat(Vec<(Role, String)>),
}

/// A prompt template: the variables it expects, a free-form type tag
/// used for retrieval, and its body.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateMeta {
    pub input_variables: Vec<String>,
    pub prompt_type: String,
    pub body: TemplateBody,
}

impl TemplateMeta {
    /// Render the template against one flat record.
    ///
    /// Identical template and record always produce identical bytes.
    pub fn render(&self, record: &HashMap<String, String>) -> Result<String, FinpromptError> {
        match &self.body {
            TemplateBody::Simple(body) => substitute(body, record),
            TemplateBody::Chat(turns) => {
                let mut lines = Vec::with_capacity(turns.len());
                for (role, body) in turns {
                    lines.push(format!("{}: {}", role.label(), substitute(body, record)?));
                }
                Ok(lines.join("\n"))
            }
        }
    }

    /// The body of a `Simple` template, `None` for the chat shape.
    pub fn simple_body(&self) -> Option<&str> {
        match &self.body {
            TemplateBody::Simple(body) => Some(body),
            TemplateBody::Chat(_) => None,
        }
    }
}

/// Replace every `{name}` span with the record value for `name`.
///
/// `{{` and `}}` are literal-brace escapes. A placeholder whose key the
/// record lacks is an error, never an empty string.
fn substitute(body: &str, record: &HashMap<String, String>) -> Result<String, FinpromptError> {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' => {
                if chars.peek() == Some(&'{') {
                    chars.next();
                    out.push('{');
                    continue;
                }
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(inner) => name.push(inner),
                        None => {
                            return Err(FinpromptError::Validation {
                                reason: format!("unterminated placeholder '{{{}' in template", name),
                            });
                        }
                    }
                }
                match record.get(&name) {
                    Some(value) => out.push_str(value),
                    None => return Err(FinpromptError::MissingVariable { variable: name }),
                }
            }
            '}' => {
                if chars.peek() == Some(&'}') {
                    chars.next();
                    out.push('}');
                } else {
                    return Err(FinpromptError::Validation {
                        reason: "single '}' in template body".to_string(),
                    });
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

    fn record(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn simple(body: &str) -> TemplateMeta {
        TemplateMeta {
            input_variables: vec![],
            prompt_type: "test".to_string(),
            body: TemplateBody::Simple(body.to_string()),
        }
    }

    #[test]
    fn substitutes_every_placeholder() {
        let template = simple("{greeting}, {name}!");
        let rendered = template
            .render(&record(&[("greeting", "Hello"), ("name", "World")]))
            .unwrap();
        assert_eq!(rendered, "Hello, World!");
    }

    #[test]
    fn missing_key_is_an_error_not_a_blank() {
        let template = simple("value: {missing}");
        let err = template.render(&record(&[])).unwrap_err();
        assert!(
            matches!(err, FinpromptError::MissingVariable { variable } if variable == "missing")
        );
    }

    #[test]
    fn doubled_braces_are_literals() {
        let template = simple("{{not_a_var}} but {real}");
        let rendered = template.render(&record(&[("real", "yes")])).unwrap();
        assert_eq!(rendered, "{not_a_var} but yes");
    }

    #[test]
    fn unterminated_placeholder_is_rejected() {
        let template = simple("broken {tail");
        let err = template.render(&record(&[("tail", "x")])).unwrap_err();
        assert!(matches!(err, FinpromptError::Validation { .. }));
    }

    #[test]
    fn single_closing_brace_is_rejected() {
        let template = simple("dangling }");
        let err = template.render(&record(&[])).unwrap_err();
        assert!(matches!(err, FinpromptError::Validation { .. }));
    }

    #[test]
    fn chat_turns_render_with_labels() {
        let template = TemplateMeta {
            input_variables: vec!["question".to_string()],
            prompt_type: "chat".to_string(),
            body: TemplateBody::Chat(vec![
                (Role::System, "You are concise.".to_string()),
                (Role::Human, "{question}".to_string()),
                (Role::Ai, "Thinking.".to_string()),
            ]),
        };
        let rendered = template
            .render(&record(&[("question", "Up or down?")]))
            .unwrap();
        assert_eq!(
            rendered,
            "System: You are concise.\nHuman: Up or down?\nAI: Thinking."
        );
    }

    #[test]
    fn render_is_deterministic() {
        let template = simple("{a} {b} {a}");
        let rec = record(&[("a", "1"), ("b", "2")]);
        assert_eq!(template.render(&rec).unwrap(), template.render(&rec).unwrap());
        assert_eq!(template.render(&rec).unwrap(), "1 2 1");
    }

    #[test]
    fn simple_body_only_for_simple_shape() {
        assert_eq!(simple("x").simple_body(), Some("x"));
        let chat = TemplateMeta {
            input_variables: vec![],
            prompt_type: "chat".to_string(),
            body: TemplateBody::Chat(vec![(Role::System, "x".to_string())]),
        };
        assert_eq!(chat.simple_body(), None);
    }

    #[test]
    fn role_tags_round_trip() {
        for role in [Role::System, Role::Human, Role::Ai] {
            assert_eq!(Role::from_tag(role.as_tag()), Some(role));
        }
        assert_eq!(Role::from_tag("assistant"), None);
    }
}
