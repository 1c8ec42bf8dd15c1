//! Configuration Management
//!
//! Layered configuration resolution:
//! 1. Built-in defaults
//! 2. Config file (hookforge.toml or --config)
//! 3. Deployment variables (PORT, DATABASE_PATH)
//! 4. Environment variables (HOOKFORGE_*)
//! 5. CLI arguments (highest priority, applied by `main`)

mod loader;
mod types;

pub use loader::{ConfigFormat, ConfigLoader};
pub use types::*;
