//! Database Command
//!
//! Usage:
//!   hookforge init-db [--db <path>]

use std::path::Path;

use crate::cli::util::{Overrides, load_config};
use crate::storage::Database;
use crate::types::Result;

/// Create the tables if absent, then exit.
pub fn init(config_path: Option<&Path>, overrides: Overrides) -> Result<()> {
    let config = load_config(config_path, overrides)?;
    let db = Database::open_with_config(&config.storage.path, config.storage.pool)?;
    db.initialize()?;

    println!("Database ready: {}", config.storage.path.display());
    Ok(())
}
