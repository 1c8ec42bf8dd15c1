pub mod error;
pub mod project;
pub mod utils;

pub use error::{ErrorCategory, ErrorClassifier, HookError, LlmError, Result, ResultExt};
pub use project::*;
pub use utils::truncate_chars;
