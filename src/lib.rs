//! hookforge - Multi-Agent Content Idea Generator
//!
//! Takes the text of a webpage and its comment thread, fans it out to a set
//! of persona agents backed by an LLM, and stores every idea they return
//! for a small dashboard.
//!
//! ## Flow
//!
//! `POST /api/analyze` creates a `pending` project and queues it. A
//! background worker runs the [`Orchestrator`]: every agent builds its
//! prompt, calls the provider and writes its ideas independently. Once all
//! agents have settled, successfully or not, the project moves to `done`.
//!
//! ## Quick Start
//!
//! ```ignore
//! use hookforge::{AgentRegistry, Database, GenerationClient, Orchestrator, PromptBuilder};
//!
//! let db = Database::open("hookforge.db")?;
//! db.initialize()?;
//! let provider = hookforge::ai::create_provider(&config.llm)?;
//! let orchestrator = Orchestrator::new(
//!     Arc::new(db),
//!     GenerationClient::new(provider, Duration::from_secs(120)),
//!     Arc::new(AgentRegistry::builtin(PromptBuilder::default())),
//! );
//! let report = orchestrator.run(project_id, &site_text, &comments).await;
//! ```
//!
//! ## Modules
//!
//! - [`ai`]: LLM providers, timeout-bounded client, idea decoding
//! - [`agents`]: persona agents, prompt builder, registry
//! - [`pipeline`]: orchestrator and work queue
//! - [`storage`]: SQLite persistence with connection pooling
//! - [`server`]: HTTP routes and dashboard
//! - [`config`]: layered configuration

pub mod agents;
pub mod ai;
pub mod cli;
pub mod config;
pub mod constants;
pub mod pipeline;
pub mod server;
pub mod storage;
pub mod types;

// =============================================================================
// Core Re-exports
// =============================================================================

// Configuration
pub use config::{Config, ConfigLoader};

// Error Types
pub use types::error::{ErrorCategory, HookError, Result, ResultExt};

// Domain
pub use types::{Content, IdeaItem, Project, ProjectStatus};

// Agents and pipeline
pub use agents::{Agent, AgentDefinition, AgentRegistry, PersonaAgent, PromptBuilder};
pub use ai::{GenerationClient, LlmProvider, SharedProvider};
pub use pipeline::{AgentOutcome, AnalysisJob, AnalysisQueue, Orchestrator, RunReport, Worker};

// Storage
pub use storage::{Database, ProjectStore, SharedStore};
