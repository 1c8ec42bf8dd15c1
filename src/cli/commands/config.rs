//! Config Command
//!
//! Usage:
//!   hookforge config show [-f toml|json]

use std::path::Path;

use crate::cli::util::{Overrides, load_config};
use crate::config::{ConfigFormat, ConfigLoader};
use crate::types::Result;

/// Parse an output format name
pub fn parse_format(s: &str) -> std::result::Result<ConfigFormat, String> {
    match s.to_lowercase().as_str() {
        "toml" => Ok(ConfigFormat::Toml),
        "json" => Ok(ConfigFormat::Json),
        _ => Err(format!("Invalid format '{}'. Valid values: toml, json", s)),
    }
}

/// Print the merged configuration. API keys are omitted.
pub fn show(config_path: Option<&Path>, format: ConfigFormat) -> Result<()> {
    let config = load_config(config_path, Overrides::default())?;
    println!("{}", ConfigLoader::render(&config, format)?);
    Ok(())
}
