//! Agents Command
//!
//! Prints the effective agent catalog (configured personas or the built-ins).

use std::path::Path;

use crate::agents::AgentRegistry;
use crate::cli::util::{Overrides, load_config};
use crate::types::Result;

pub fn list(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path, Overrides::default())?;
    let registry = config.registry()?;
    print!("{}", render(&registry));
    Ok(())
}

fn render(registry: &AgentRegistry) -> String {
    let width = registry
        .agents()
        .iter()
        .map(|a| a.name().len())
        .max()
        .unwrap_or(0);

    let mut out = format!("{} agents\n", registry.len());
    for agent in registry.agents() {
        out.push_str(&format!(
            "  {:width$}  {}\n",
            agent.name(),
            agent.role(),
            width = width
        ));
    }
    out
}
