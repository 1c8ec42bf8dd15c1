//! Content Agents
//!
//! Each agent is a persona (name, role, mission) that turns one page and its
//! comment thread into a handful of content ideas. The orchestrator only
//! sees the [`Agent`] trait, so new agents plug in through the registry.
//!
//! Built-in catalog:
//! - Polariser: unpopular opinions
//! - Expertise: sharp, concrete advice
//! - Divertir: pokes fun at the problems
//! - Vente: bridges to the paid offer

pub mod prompt;
pub mod registry;

pub use prompt::PromptBuilder;
pub use registry::AgentRegistry;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ai::{decode_ideas, ideas_schema};
use crate::types::{IdeaItem, Result};

/// Static persona configuration, loaded once at startup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentDefinition {
    /// Tag written on every content row the agent produces
    pub name: String,
    pub role: String,
    pub mission: String,
}

impl AgentDefinition {
    pub fn new(
        name: impl Into<String>,
        role: impl Into<String>,
        mission: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            role: role.into(),
            mission: mission.into(),
        }
    }
}

/// One content-generation capability
pub trait Agent: Send + Sync {
    fn name(&self) -> &str;

    fn role(&self) -> &str;

    /// Prompt for one page and its comments.
    fn build_prompt(&self, site_text: &str, comments: &str) -> String;

    /// Schema handed to the provider alongside the prompt.
    fn schema(&self) -> Value {
        ideas_schema()
    }

    /// Decode the raw response. Any non-conforming body is an error.
    fn interpret(&self, raw: &str) -> Result<Vec<IdeaItem>> {
        decode_ideas(raw)
    }
}

/// Agent driven entirely by its [`AgentDefinition`]
#[derive(Debug, Clone)]
pub struct PersonaAgent {
    definition: AgentDefinition,
    prompts: PromptBuilder,
}

impl PersonaAgent {
    pub fn new(definition: AgentDefinition, prompts: PromptBuilder) -> Self {
        Self {
            definition,
            prompts,
        }
    }

    pub fn definition(&self) -> &AgentDefinition {
        &self.definition
    }
}

impl Agent for PersonaAgent {
    fn name(&self) -> &str {
        &self.definition.name
    }

    fn role(&self) -> &str {
        &self.definition.role
    }

    fn build_prompt(&self, site_text: &str, comments: &str) -> String {
        self.prompts.build(&self.definition, site_text, comments)
    }
}
