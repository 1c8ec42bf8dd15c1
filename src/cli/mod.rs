pub mod commands;
pub mod util;

pub use util::{Overrides, load_config};
