//! Idea response decoding
//!
//! Turns a provider's raw text into [`IdeaItem`]s. Decoding is strict:
//! cosmetic wrapping (markdown fences, BOM, surrounding whitespace) is
//! stripped, but the payload itself is never repaired. A body that is not
//! `{"ideas": [{"hook", "content", "source"}, ...]}` is a failure.

use serde_json::{Value, json};

use crate::types::{HookError, IdeaBatch, IdeaItem, Result};

/// JSON schema of the document every agent must return
pub fn ideas_schema() -> Value {
    json!({
        "type": "object",
        "required": ["ideas"],
        "properties": {
            "ideas": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["hook", "content", "source"],
                    "properties": {
                        "hook": { "type": "string", "description": "Short attention-grabbing opener" },
                        "content": { "type": "string", "description": "Body of the content idea" },
                        "source": { "type": "string", "description": "Where in the page or comments the idea comes from" }
                    }
                }
            }
        }
    })
}

/// Decode a raw response into idea items.
pub fn decode_ideas(raw: &str) -> Result<Vec<IdeaItem>> {
    let cleaned = preprocess(raw);
    if cleaned.is_empty() {
        return Err(HookError::Decode("empty response body".to_string()));
    }

    let batch: IdeaBatch = serde_json::from_str(&cleaned).map_err(|e| {
        HookError::Decode(format!(
            "{} (content preview: {}...)",
            e,
            cleaned.chars().take(120).collect::<String>()
        ))
    })?;

    Ok(batch.ideas)
}

/// Strip wrapping that models add around otherwise valid JSON.
fn preprocess(raw: &str) -> String {
    let s = raw.trim().trim_start_matches('\u{feff}').trim();
    strip_code_fences(s).trim().to_string()
}

/// Strip ```json ... ``` or ``` ... ``` fences
fn strip_code_fences(s: &str) -> &str {
    let mut result = s;

    if result.starts_with("```")
        && let Some(first_newline) = result.find('\n')
    {
        result = &result[first_newline + 1..];
    }

    if let Some(stripped) = result.trim_end().strip_suffix("```") {
        result = stripped;
    }

    result
}
