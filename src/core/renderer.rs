//! Variable substitution for prompts and their templates.

use super::models::{Message, Prompt, Slot, Template, Variable, VariableType};
use crate::api::{Error, Result};
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;

/// Slot name a template uses to receive the rendered prompt body.
const CONTENT_SLOT: &str = "content";

/// Renders a prompt, optionally through its template, with a set of
/// name → value bindings.
pub struct Renderer<'a> {
    prompt: &'a Prompt,
    template: Option<&'a Template>,
}

impl<'a> Renderer<'a> {
    pub fn new(prompt: &'a Prompt, template: Option<&'a Template>) -> Self {
        Renderer { prompt, template }
    }

    /// Produce the plain-text output shape.
    ///
    /// Every `{{name}}` in the prompt body is replaced by its binding,
    /// declared default, or the empty string; a required variable with
    /// neither binding nor default is a validation error. When the prompt
    /// references a template, the template's slots are filled from the
    /// same bindings and the prompt body lands in its `{{content}}` slot.
    pub fn render_text(&self, bindings: &HashMap<String, Value>) -> Result<String> {
        let mut values = resolve_variables(&self.prompt.variables, bindings)?;
        for (name, value) in bindings {
            values
                .entry(name.clone())
                .or_insert_with(|| value_to_string(value));
        }

        let body = substitute(&self.prompt.content, &values);

        let Some(template) = self.template else {
            return Ok(body);
        };

        let mut slot_values = resolve_slots(&template.slots, bindings)?;
        for (name, value) in bindings {
            slot_values
                .entry(name.clone())
                .or_insert_with(|| value_to_string(value));
        }
        slot_values.insert(CONTENT_SLOT.to_string(), body);
        Ok(substitute(&template.content, &slot_values))
    }

    /// Produce the LLM-messages output shape: a single `user` message
    /// carrying the rendered text.
    pub fn render_messages(&self, bindings: &HashMap<String, Value>) -> Result<Vec<Message>> {
        let content = self.render_text(bindings)?;
        Ok(vec![Message {
            role: "user".to_string(),
            content,
        }])
    }

    /// The messages shape serialized as pretty JSON.
    pub fn render_json(&self, bindings: &HashMap<String, Value>) -> Result<String> {
        let messages = self.render_messages(bindings)?;
        Ok(serde_json::to_string_pretty(&messages)?)
    }
}

/// Resolve declared variables: explicit binding, then default, then empty
/// string; missing required variables fail by name.
fn resolve_variables(
    variables: &[Variable],
    bindings: &HashMap<String, Value>,
) -> Result<HashMap<String, String>> {
    let mut values = HashMap::new();
    for var in variables {
        let value = match bindings.get(&var.name) {
            Some(bound) => value_to_string(&coerce(bound, var.var_type)),
            None => match &var.default {
                Some(default) => value_to_string(default),
                None if var.required => {
                    return Err(Error::Validation(format!(
                        "missing required variable '{}'",
                        var.name
                    )));
                }
                None => String::new(),
            },
        };
        values.insert(var.name.clone(), value);
    }
    Ok(values)
}

/// Resolve template slots with the same precedence as variables.
fn resolve_slots(
    slots: &[Slot],
    bindings: &HashMap<String, Value>,
) -> Result<HashMap<String, String>> {
    let mut values = HashMap::new();
    for slot in slots {
        let value = match bindings.get(&slot.name) {
            Some(bound) => value_to_string(bound),
            None => match &slot.default {
                Some(default) => default.clone(),
                None if slot.required => {
                    return Err(Error::Validation(format!(
                        "missing required variable '{}'",
                        slot.name
                    )));
                }
                None => String::new(),
            },
        };
        values.insert(slot.name.clone(), value);
    }
    Ok(values)
}

/// Replace `{{name}}` references, leaving unknown names verbatim.
fn substitute(text: &str, values: &HashMap<String, String>) -> String {
    let re = Regex::new(r"\{\{\s*(\w+)\s*\}\}").unwrap();
    re.replace_all(text, |caps: &regex::Captures| match values.get(&caps[1]) {
        Some(value) => value.clone(),
        None => caps[0].to_string(),
    })
    .into_owned()
}

/// Best-effort coercion of a binding toward its declared type.
fn coerce(value: &Value, var_type: VariableType) -> Value {
    match (var_type, value) {
        (VariableType::Boolean, Value::String(s)) => match s.as_str() {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => value.clone(),
        },
        (VariableType::Number, Value::String(s)) => {
            if let Ok(n) = s.parse::<i64>() {
                Value::Number(n.into())
            } else if let Some(n) = s.parse::<f64>().ok().and_then(serde_json::Number::from_f64) {
                Value::Number(n)
            } else {
                value.clone()
            }
        }
        (VariableType::List, Value::String(s)) => Value::Array(
            s.split(',')
                .map(|item| Value::String(item.trim().to_string()))
                .collect(),
        ),
        _ => value.clone(),
    }
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(value_to_string)
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use std::path::PathBuf;

    fn prompt(content: &str, variables: Vec<Variable>, template_ref: Option<&str>) -> Prompt {
        let now = Utc::now();
        Prompt {
            id: "p".to_string(),
            version: "1.0.0".to_string(),
            title: "P".to_string(),
            description: String::new(),
            tags: vec![],
            variables,
            template_ref: template_ref.map(|s| s.to_string()),
            created_at: now,
            updated_at: now,
            content: content.to_string(),
            file_path: PathBuf::from("prompts/p.md"),
            content_hash: String::new(),
        }
    }

    fn template(content: &str, slots: Vec<Slot>) -> Template {
        let now = Utc::now();
        Template {
            id: "t".to_string(),
            version: "1.0.0".to_string(),
            name: "T".to_string(),
            description: String::new(),
            slots,
            created_at: now,
            updated_at: now,
            content: content.to_string(),
            file_path: PathBuf::from("templates/t.md"),
        }
    }

    fn var(name: &str, required: bool, default: Option<Value>) -> Variable {
        Variable {
            name: name.to_string(),
            var_type: VariableType::String,
            description: String::new(),
            default,
            required,
            options: vec![],
        }
    }

    #[test]
    fn substitutes_bindings() {
        let p = prompt("Hello {{name}}", vec![], None);
        let bindings = HashMap::from([("name".to_string(), json!("world"))]);
        let out = Renderer::new(&p, None).render_text(&bindings).unwrap();
        assert_eq!(out, "Hello world");
    }

    #[test]
    fn falls_back_to_declared_default() {
        let p = prompt(
            "Lang: {{lang}}",
            vec![var("lang", false, Some(json!("rust")))],
            None,
        );
        let out = Renderer::new(&p, None).render_text(&HashMap::new()).unwrap();
        assert_eq!(out, "Lang: rust");
    }

    #[test]
    fn optional_without_default_renders_empty() {
        let p = prompt("[{{note}}]", vec![var("note", false, None)], None);
        let out = Renderer::new(&p, None).render_text(&HashMap::new()).unwrap();
        assert_eq!(out, "[]");
    }

    #[test]
    fn missing_required_variable_names_it() {
        let p = prompt("{{task}}", vec![var("task", true, None)], None);
        let err = Renderer::new(&p, None)
            .render_text(&HashMap::new())
            .unwrap_err();
        match err {
            Error::Validation(msg) => assert!(msg.contains("'task'"), "{}", msg),
            other => panic!("expected validation error, got {other}"),
        }
    }

    #[test]
    fn unknown_references_stay_verbatim() {
        let p = prompt("keep {{unknown}} as-is", vec![], None);
        let out = Renderer::new(&p, None).render_text(&HashMap::new()).unwrap();
        assert_eq!(out, "keep {{unknown}} as-is");
    }

    #[test]
    fn template_wraps_prompt_body() {
        let t = template("You are {{role}}.\n{{content}}", vec![]);
        let p = prompt("Do {{task}}", vec![], Some("t"));
        let bindings = HashMap::from([
            ("role".to_string(), json!("analyst")),
            ("task".to_string(), json!("triage")),
        ]);
        let out = Renderer::new(&p, Some(&t)).render_text(&bindings).unwrap();
        assert_eq!(out, "You are analyst.\nDo triage");
    }

    #[test]
    fn slot_defaults_apply() {
        let t = template(
            "{{greeting}}: {{content}}",
            vec![Slot {
                name: "greeting".to_string(),
                description: String::new(),
                required: false,
                default: Some("Hi".to_string()),
            }],
        );
        let p = prompt("body", vec![], Some("t"));
        let out = Renderer::new(&p, Some(&t)).render_text(&HashMap::new()).unwrap();
        assert_eq!(out, "Hi: body");
    }

    #[test]
    fn coerces_binding_types() {
        assert_eq!(coerce(&json!("true"), VariableType::Boolean), json!(true));
        assert_eq!(coerce(&json!("42"), VariableType::Number), json!(42));
        assert_eq!(coerce(&json!("1.5"), VariableType::Number), json!(1.5));
        assert_eq!(
            coerce(&json!("a, b"), VariableType::List),
            json!(["a", "b"])
        );
        assert_eq!(coerce(&json!("plain"), VariableType::String), json!("plain"));
    }

    #[test]
    fn messages_shape_is_single_user_message() {
        let p = prompt("hello", vec![], None);
        let messages = Renderer::new(&p, None)
            .render_messages(&HashMap::new())
            .unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, "user");
        assert_eq!(messages[0].content, "hello");

        let json = Renderer::new(&p, None).render_json(&HashMap::new()).unwrap();
        let parsed: Vec<Message> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, messages);
    }
}
