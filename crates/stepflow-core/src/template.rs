//! Template resolution: `{{ path.to.value }}` interpolation.
//!
//! References are resolved against the execution context's JSON view.
//! Failures are contained to the single placeholder that caused them: the
//! placeholder is replaced with an inline `[ERROR: ...]` marker and
//! resolution of everything else continues. Resolution recurses through
//! nested objects and arrays, not just top-level string values.

use serde_json::{Map, Value};

use crate::context::ExecutionContext;

/// Resolve all template references in a step's parameter map.
pub fn resolve_params(params: &Map<String, Value>, ctx: &ExecutionContext) -> Map<String, Value> {
    let view = ctx.as_value();
    params
        .iter()
        .map(|(key, value)| (key.clone(), resolve_value(value, &view)))
        .collect()
}

/// Resolve template references in one string against the context.
pub fn resolve_str(template: &str, ctx: &ExecutionContext) -> String {
    resolve_in_string(template, &ctx.as_value())
}

/// Recursively resolve template references inside an arbitrary JSON value.
fn resolve_value(value: &Value, view: &Value) -> Value {
    match value {
        Value::String(text) => Value::String(resolve_in_string(text, view)),
        Value::Array(items) => {
            Value::Array(items.iter().map(|item| resolve_value(item, view)).collect())
        }
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, nested)| (key.clone(), resolve_value(nested, view)))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn resolve_in_string(template: &str, view: &Value) -> String {
    let mut result = String::with_capacity(template.len());
    let mut remainder = template;

    while let Some(start) = remainder.find("{{") {
        let Some(end) = remainder[start + 2..].find("}}") else {
            // Unterminated opener: keep the rest verbatim.
            break;
        };
        result.push_str(&remainder[..start]);

        let expression = remainder[start + 2..start + 2 + end].trim();
        match walk_path(view, expression) {
            Ok(value) => result.push_str(&value_to_string(value)),
            Err(reason) => {
                result.push_str(&format!("[ERROR: {reason}]"));
            }
        }

        remainder = &remainder[start + 2 + end + 2..];
    }

    result.push_str(remainder);
    result
}

/// Walk a dot-separated path through a JSON value.
///
/// A segment that parses as a non-negative integer indexes into arrays;
/// every segment also works as an object-key lookup (so `steps.0.output`
/// resolves whether step outputs are kept in an int-keyed map or a list).
fn walk_path<'a>(view: &'a Value, path: &str) -> Result<&'a Value, String> {
    if path.is_empty() {
        return Err("empty template reference".to_string());
    }

    let mut current = view;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map
                .get(segment)
                .ok_or_else(|| format!("'{segment}' not found in '{path}'"))?,
            Value::Array(items) => {
                let index: usize = segment
                    .parse()
                    .map_err(|_| format!("'{segment}' is not an index in '{path}'"))?;
                items
                    .get(index)
                    .ok_or_else(|| format!("index {index} out of range in '{path}'"))?
            }
            other => {
                return Err(format!(
                    "cannot descend into {} at '{segment}' in '{path}'",
                    type_name(other)
                ));
            }
        };
    }
    Ok(current)
}

/// String form used when substituting a resolved value into a template.
fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        // Objects and arrays substitute as compact JSON.
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn context() -> ExecutionContext {
        let trigger = json!({
            "repo": "acme/widgets",
            "title": "Crash on save",
            "body": "Steps to reproduce..."
        })
        .as_object()
        .unwrap()
        .clone();
        let mut ctx = ExecutionContext::new(trigger);
        ctx.record_output(0, json!("a short summary"));
        ctx.record_output(1, json!({ "items": ["first", "second"] }));
        ctx
    }

    #[test]
    fn test_resolve_trigger_reference() {
        let ctx = context();
        assert_eq!(resolve_str("{{ trigger.repo }}", &ctx), "acme/widgets");
    }

    #[test]
    fn test_resolve_step_output_reference() {
        let ctx = context();
        assert_eq!(resolve_str("{{ steps.0.output }}", &ctx), "a short summary");
    }

    #[test]
    fn test_resolve_nested_array_index() {
        let ctx = context();
        assert_eq!(
            resolve_str("{{ steps.1.output.items.1 }}", &ctx),
            "second"
        );
    }

    #[test]
    fn test_mixed_literal_and_multiple_placeholders() {
        let ctx = context();
        assert_eq!(
            resolve_str("[{{ trigger.repo }}] {{ trigger.title }}", &ctx),
            "[acme/widgets] Crash on save"
        );
    }

    #[test]
    fn test_unknown_reference_yields_error_marker() {
        let ctx = context();
        let resolved = resolve_str("value: {{ trigger.nope }}", &ctx);
        assert!(resolved.starts_with("value: [ERROR: "), "got: {resolved}");
        assert!(resolved.contains("'nope' not found"));
    }

    #[test]
    fn test_failure_is_local_to_one_placeholder() {
        let ctx = context();
        let resolved = resolve_str("{{ trigger.nope }} / {{ trigger.repo }}", &ctx);
        assert!(resolved.contains("[ERROR: "));
        assert!(resolved.ends_with("/ acme/widgets"));
    }

    #[test]
    fn test_index_out_of_range() {
        let ctx = context();
        let resolved = resolve_str("{{ steps.1.output.items.9 }}", &ctx);
        assert!(resolved.contains("index 9 out of range"));
    }

    #[test]
    fn test_descend_into_scalar_fails() {
        let ctx = context();
        let resolved = resolve_str("{{ trigger.repo.deeper }}", &ctx);
        assert!(resolved.contains("cannot descend into string"));
    }

    #[test]
    fn test_forward_reference_yields_error_marker() {
        // steps.2 has not completed: a step must never resolve its own or a
        // later step's output.
        let ctx = context();
        let resolved = resolve_str("{{ steps.2.output }}", &ctx);
        assert!(resolved.contains("[ERROR: "), "got: {resolved}");
    }

    #[test]
    fn test_object_substitutes_as_compact_json() {
        let ctx = context();
        let resolved = resolve_str("{{ steps.1.output }}", &ctx);
        assert_eq!(resolved, r#"{"items":["first","second"]}"#);
    }

    #[test]
    fn test_unterminated_placeholder_kept_verbatim() {
        let ctx = context();
        assert_eq!(
            resolve_str("broken {{ trigger.repo", &ctx),
            "broken {{ trigger.repo"
        );
    }

    #[test]
    fn test_resolve_params_recurses_nested_structures() {
        let ctx = context();
        let params = json!({
            "title": "{{ trigger.title }}",
            "blocks": [
                { "text": "{{ steps.0.output }}" },
                { "text": "literal" }
            ],
            "count": 3
        })
        .as_object()
        .unwrap()
        .clone();

        let resolved = resolve_params(&params, &ctx);
        assert_eq!(resolved["title"], json!("Crash on save"));
        assert_eq!(resolved["blocks"][0]["text"], json!("a short summary"));
        assert_eq!(resolved["blocks"][1]["text"], json!("literal"));
        assert_eq!(resolved["count"], json!(3));
    }
}
