//! Analysis pipeline: the multi-agent orchestrator and its work queue.

pub mod orchestrator;
pub mod queue;

pub use orchestrator::{AgentOutcome, Orchestrator, RunReport, StatusRetryPolicy};
pub use queue::{AnalysisJob, AnalysisQueue, Worker};
