//! Prompt construction for persona agents

use std::borrow::Cow;

use super::AgentDefinition;
use crate::constants::prompt as prompt_constants;
use crate::types::truncate_chars;

/// Builds the generation prompt for one agent
///
/// Both inputs are cut to a bounded prefix of `max_input_chars` characters;
/// nothing is summarized. A cut prefix ends with `...`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptBuilder {
    max_input_chars: usize,
    ideas_per_agent: usize,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self {
            max_input_chars: prompt_constants::MAX_INPUT_CHARS,
            ideas_per_agent: prompt_constants::IDEAS_PER_AGENT,
        }
    }
}

impl PromptBuilder {
    pub fn new(max_input_chars: usize, ideas_per_agent: usize) -> Self {
        Self {
            max_input_chars,
            ideas_per_agent,
        }
    }

    pub fn build(&self, agent: &AgentDefinition, site_text: &str, comments: &str) -> String {
        let site = self.clip(site_text);
        let comments = self.clip(comments);

        format!(
            r#"ROLE: {role}. MISSION: {mission}

SITE CONTEXT:
{site}

COMMENTS CONTEXT:
{comments}

Task: generate {count} content ideas in the voice of your role.
Each idea needs a short hook, the idea itself, and the part of the site or comments it comes from.

Required JSON format: {{ "ideas": [{{ "hook": "...", "content": "...", "source": "..." }}] }}
Respond with that JSON document only."#,
            role = agent.role,
            mission = agent.mission,
            site = site,
            comments = comments,
            count = self.ideas_per_agent,
        )
    }

    fn clip<'a>(&self, text: &'a str) -> Cow<'a, str> {
        let prefix = truncate_chars(text, self.max_input_chars);
        if prefix.len() == text.len() {
            Cow::Borrowed(text)
        } else {
            Cow::Owned(format!("{}...", prefix))
        }
    }
}
