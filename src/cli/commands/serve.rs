//! Serve Command
//!
//! Usage:
//!   hookforge serve [--host <addr>] [--port <port>] [--db <path>]

use std::path::Path;

use tokio::runtime::Runtime;
use tracing::info;

use crate::cli::util::{Overrides, load_config};
use crate::server;
use crate::types::Result;

pub fn run(config_path: Option<&Path>, overrides: Overrides) -> Result<()> {
    let config = load_config(config_path, overrides)?;
    info!(
        "Starting hookforge (provider: {}, database: {})",
        config.llm.provider,
        config.storage.path.display()
    );

    let rt = Runtime::new()?;
    rt.block_on(server::run(config))
}
