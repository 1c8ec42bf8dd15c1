//! Prompt helpers shared by providers.

use serde_json::Value;

/// Append JSON schema instructions to a prompt.
///
/// Used by providers whose API has no native schema parameter.
/// Returns the original prompt if schema is null.
pub fn build_schema_prompt(user_prompt: &str, schema: &Value) -> String {
    if schema.is_null() {
        return user_prompt.to_string();
    }

    let schema_str = serde_json::to_string_pretty(schema).unwrap_or_default();
    format!(
        "{}\n\n---\n\nThe answer must be a JSON document valid against this schema:\n```json\n{}\n```\n\nRespond ONLY with the JSON document.",
        user_prompt, schema_str
    )
}
