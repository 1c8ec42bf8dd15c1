//! Agent registry
//!
//! Ordered and immutable once built. The orchestrator iterates it for every
//! run; nothing mutates it after startup.

use std::collections::HashSet;
use std::sync::Arc;

use super::{Agent, AgentDefinition, PersonaAgent, PromptBuilder};
use crate::types::{HookError, Result};

pub struct AgentRegistry {
    agents: Vec<Arc<dyn Agent>>,
}

impl AgentRegistry {
    /// The four built-in personas.
    pub fn builtin_definitions() -> Vec<AgentDefinition> {
        vec![
            AgentDefinition::new("Polariser", "Provocateur", "Find unpopular opinions."),
            AgentDefinition::new(
                "Expertise",
                "Technical Expert",
                "Give sharp, concrete advice.",
            ),
            AgentDefinition::new("Divertir", "Humorist", "Poke fun at the problems."),
            AgentDefinition::new("Vente", "Copywriter", "Bridge to the paid offer."),
        ]
    }

    pub fn builtin(prompts: PromptBuilder) -> Self {
        Self {
            agents: Self::builtin_definitions()
                .into_iter()
                .map(|d| Arc::new(PersonaAgent::new(d, prompts)) as Arc<dyn Agent>)
                .collect(),
        }
    }

    /// Build from configured personas. Rejects an empty list and duplicate names.
    pub fn from_definitions(definitions: Vec<AgentDefinition>, prompts: PromptBuilder) -> Result<Self> {
        let agents = definitions
            .into_iter()
            .map(|d| Arc::new(PersonaAgent::new(d, prompts)) as Arc<dyn Agent>)
            .collect();
        Self::from_agents(agents)
    }

    pub fn from_agents(agents: Vec<Arc<dyn Agent>>) -> Result<Self> {
        if agents.is_empty() {
            return Err(HookError::Config(
                "Agent catalog must contain at least one agent".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for agent in &agents {
            if agent.name().trim().is_empty() {
                return Err(HookError::Config("Agent name must not be empty".to_string()));
            }
            if !seen.insert(agent.name().to_string()) {
                return Err(HookError::Config(format!(
                    "Duplicate agent name: {}",
                    agent.name()
                )));
            }
        }

        Ok(Self { agents })
    }

    pub fn agents(&self) -> &[Arc<dyn Agent>] {
        &self.agents
    }

    pub fn names(&self) -> Vec<&str> {
        self.agents.iter().map(|a| a.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

impl std::fmt::Debug for AgentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentRegistry")
            .field("agents", &self.names())
            .finish()
    }
}
