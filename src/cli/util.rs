//! CLI Common Utilities
//!
//! Config loading shared by every command, with command-line overrides
//! applied on top of the merged file/env configuration.

use std::path::{Path, PathBuf};

use crate::config::{Config, ConfigLoader};
use crate::types::Result;

/// Values given on the command line; these win over every other source
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub db: Option<PathBuf>,
}

impl Overrides {
    pub fn apply(self, config: &mut Config) {
        if let Some(host) = self.host {
            config.server.host = host;
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(db) = self.db {
            config.storage.path = db;
        }
    }
}

/// Load, override and validate the effective configuration.
pub fn load_config(path: Option<&Path>, overrides: Overrides) -> Result<Config> {
    let mut config = ConfigLoader::load(path)?;
    overrides.apply(&mut config);
    config.validate()?;
    Ok(config)
}
