//! Global Constants
//!
//! Centralized constants for configuration and tuning.
//! All magic numbers should be defined here with documentation.

/// Prompt construction constants
pub mod prompt {
    /// Maximum characters of site text or comment text embedded in a prompt
    pub const MAX_INPUT_CHARS: usize = 4000;

    /// Number of ideas each agent is asked for
    pub const IDEAS_PER_AGENT: usize = 2;
}

/// LLM provider constants
pub mod network {
    /// Per-call generation timeout (seconds)
    pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

    /// Connection establishment timeout (seconds)
    pub const CONNECTION_TIMEOUT_SECS: u64 = 20;

    /// Default maximum output tokens
    pub const DEFAULT_MAX_TOKENS: usize = 2048;
}

/// Storage constants
pub mod storage {
    /// Default database file
    pub const DEFAULT_DB_PATH: &str = "hookforge.db";

    /// Number of projects returned by the dashboard listing
    pub const PROJECT_LIST_LIMIT: usize = 20;

    /// Idle pooled connections are closed after this many seconds
    pub const IDLE_TIMEOUT_SECS: u64 = 300;

    /// Pooled connections are recycled after this many seconds
    pub const MAX_LIFETIME_SECS: u64 = 1800;
}

/// Final status write retry constants
pub mod status_retry {
    /// Attempts before the project is marked stalled
    pub const MAX_ATTEMPTS: usize = 3;

    /// First backoff delay (milliseconds)
    pub const MIN_DELAY_MS: u64 = 200;

    /// Backoff ceiling (milliseconds)
    pub const MAX_DELAY_MS: u64 = 2000;
}

/// HTTP server constants
pub mod server {
    pub const DEFAULT_HOST: &str = "0.0.0.0";

    pub const DEFAULT_PORT: u16 = 3000;

    /// Request body limit; intake carries whole pages of text
    pub const BODY_LIMIT_BYTES: usize = 10 * 1024 * 1024;

    /// Pending jobs the intake may queue before callers wait
    pub const QUEUE_CAPACITY: usize = 64;
}
