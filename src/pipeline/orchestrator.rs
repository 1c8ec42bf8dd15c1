//! Multi-agent orchestrator
//!
//! One run per project:
//! 1. every registered agent runs its own pipeline concurrently
//!    (prompt, generate, interpret, persist)
//! 2. all pipelines are joined, whatever their outcome
//! 3. the project leaves `pending` exactly once, after the join
//!
//! A failing agent is logged and absorbed; it never cancels a sibling and
//! never reaches the caller. The final status write is retried with
//! exponential backoff; if it still fails the project is marked `stalled`.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use futures::FutureExt;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};

use crate::agents::{Agent, AgentRegistry};
use crate::ai::GenerationClient;
use crate::constants::status_retry;
use crate::storage::SharedStore;
use crate::types::{HookError, ProjectStatus, Result};

// =============================================================================
// Status Retry Policy
// =============================================================================

/// Backoff applied to the final `pending → done` write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusRetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: usize,
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for StatusRetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: status_retry::MAX_ATTEMPTS,
            min_delay_ms: status_retry::MIN_DELAY_MS,
            max_delay_ms: status_retry::MAX_DELAY_MS,
        }
    }
}

impl StatusRetryPolicy {
    fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(self.min_delay_ms))
            .with_max_delay(Duration::from_millis(self.max_delay_ms))
            .with_max_times(self.max_attempts.saturating_sub(1))
    }
}

// =============================================================================
// Run Report
// =============================================================================

/// How one agent's pipeline ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AgentOutcome {
    Succeeded { agent: String, rows: usize },
    Failed { agent: String, error: String },
}

impl AgentOutcome {
    pub fn agent(&self) -> &str {
        match self {
            Self::Succeeded { agent, .. } | Self::Failed { agent, .. } => agent,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }

    /// Content rows written by this agent
    pub fn rows(&self) -> usize {
        match self {
            Self::Succeeded { rows, .. } => *rows,
            Self::Failed { .. } => 0,
        }
    }
}

/// Summary of one orchestrator run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub project_id: i64,
    /// One entry per agent, in registry order
    pub outcomes: Vec<AgentOutcome>,
    /// Status the project was left in; `Pending` if neither write landed
    pub final_status: ProjectStatus,
}

impl RunReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn total_rows(&self) -> usize {
        self.outcomes.iter().map(AgentOutcome::rows).sum()
    }
}

// =============================================================================
// Orchestrator
// =============================================================================

pub struct Orchestrator {
    store: SharedStore,
    client: GenerationClient,
    registry: Arc<AgentRegistry>,
    status_retry: StatusRetryPolicy,
}

impl Orchestrator {
    pub fn new(store: SharedStore, client: GenerationClient, registry: Arc<AgentRegistry>) -> Self {
        Self {
            store,
            client,
            registry,
            status_retry: StatusRetryPolicy::default(),
        }
    }

    pub fn with_status_retry(mut self, policy: StatusRetryPolicy) -> Self {
        self.status_retry = policy;
        self
    }

    /// Run every agent for one project, then settle its status.
    #[instrument(skip(self, site_text, comments), fields(agents = self.registry.len()))]
    pub async fn run(&self, project_id: i64, site_text: &str, comments: &str) -> RunReport {
        info!(
            "Starting analysis of project #{} with {} agents via {}",
            project_id,
            self.registry.len(),
            self.client.provider_name()
        );

        let pipelines = self
            .registry
            .agents()
            .iter()
            .map(|agent| self.run_agent(project_id, agent.as_ref(), site_text, comments));
        let outcomes = join_all(pipelines).await;

        let final_status = self.settle(project_id).await;

        let report = RunReport {
            project_id,
            outcomes,
            final_status,
        };
        info!(
            "Project #{} settled as {} ({}/{} agents succeeded, {} rows)",
            project_id,
            report.final_status,
            report.succeeded(),
            report.outcomes.len(),
            report.total_rows()
        );
        report
    }

    /// One agent's pipeline. Errors and panics end here.
    #[instrument(skip_all, fields(project_id = project_id, agent = agent.name()))]
    async fn run_agent(
        &self,
        project_id: i64,
        agent: &dyn Agent,
        site_text: &str,
        comments: &str,
    ) -> AgentOutcome {
        let name = agent.name().to_string();
        let pipeline = AssertUnwindSafe(self.try_agent(project_id, agent, site_text, comments));

        match pipeline.catch_unwind().await {
            Ok(Ok(rows)) => {
                info!("Agent {} wrote {} ideas", name, rows);
                AgentOutcome::Succeeded { agent: name, rows }
            }
            Ok(Err(e)) => {
                warn!("Agent {} failed for project #{}: {}", name, project_id, e);
                AgentOutcome::Failed {
                    agent: name,
                    error: e.to_string(),
                }
            }
            Err(_) => {
                error!("Agent {} panicked for project #{}", name, project_id);
                AgentOutcome::Failed {
                    agent: name,
                    error: "agent pipeline panicked".to_string(),
                }
            }
        }
    }

    async fn try_agent(
        &self,
        project_id: i64,
        agent: &dyn Agent,
        site_text: &str,
        comments: &str,
    ) -> Result<usize> {
        let prompt = agent.build_prompt(site_text, comments);
        let response = self
            .client
            .generate(&prompt, &agent.schema(), agent.name())
            .await?;

        debug!(
            "Agent {} received {} chars ({} tokens, {} ms)",
            agent.name(),
            response.content.len(),
            response.usage.total(),
            response.timing.total_ms
        );

        let ideas = agent.interpret(&response.content)?;
        self.store
            .insert_ideas(project_id, agent.name(), &ideas)
            .await
    }

    /// Move the project to `done`, falling back to `stalled`.
    async fn settle(&self, project_id: i64) -> ProjectStatus {
        let store = &self.store;
        let write_done = || async move {
            store
                .set_project_status(project_id, ProjectStatus::Done)
                .await
        };

        let result = write_done
            .retry(self.status_retry.backoff())
            .when(HookError::is_retryable)
            .notify(|e: &HookError, delay: Duration| {
                warn!(
                    "Status update for project #{} failed, retrying in {:?}: {}",
                    project_id, delay, e
                );
            })
            .await;

        match result {
            Ok(()) => ProjectStatus::Done,
            Err(e) => {
                error!(
                    "Could not mark project #{} as done, marking it stalled: {}",
                    project_id, e
                );
                match store
                    .set_project_status(project_id, ProjectStatus::Stalled)
                    .await
                {
                    Ok(()) => ProjectStatus::Stalled,
                    Err(e) => {
                        error!("Could not mark project #{} as stalled: {}", project_id, e);
                        ProjectStatus::Pending
                    }
                }
            }
        }
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("client", &self.client)
            .field("registry", &self.registry)
            .field("status_retry", &self.status_retry)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::{AgentDefinition, PromptBuilder};
    use crate::ai::{LlmProvider, LlmResponse};
    use crate::storage::{Database, ProjectStore};
    use crate::types::{Content, IdeaItem, Project};
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const ONE_IDEA: &str = r#"{"ideas":[{"hook":"H","content":"I","source":"S"}]}"#;

    /// Answers by looking up the agent's role in the prompt.
    struct ScriptedProvider {
        responses: Vec<(&'static str, &'static str)>,
        fallback: &'static str,
    }

    impl ScriptedProvider {
        fn uniform(body: &'static str) -> Self {
            Self {
                responses: vec![],
                fallback: body,
            }
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        async fn generate(&self, prompt: &str, _schema: &Value) -> Result<LlmResponse> {
            let body = self
                .responses
                .iter()
                .find(|(role, _)| prompt.contains(&format!("ROLE: {}.", role)))
                .map(|(_, body)| *body)
                .unwrap_or(self.fallback);
            if body == "ERROR" {
                return Err(HookError::LlmApi("provider unavailable".into()));
            }
            if body == "HANG" {
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
            Ok(LlmResponse::content_only(body))
        }

        fn name(&self) -> &str {
            "scripted"
        }

        fn model(&self) -> &str {
            "scripted-1"
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }
    }

    /// Delegates to a real store but fails the first N `done` writes.
    struct FlakyStatusStore {
        inner: Database,
        failures_left: AtomicUsize,
        status_calls: AtomicUsize,
    }

    #[async_trait]
    impl ProjectStore for FlakyStatusStore {
        async fn create_project(&self, url: &str) -> Result<i64> {
            ProjectStore::create_project(&self.inner, url).await
        }

        async fn get_project(&self, id: i64) -> Result<Project> {
            ProjectStore::get_project(&self.inner, id).await
        }

        async fn insert_content(
            &self,
            project_id: i64,
            agent_name: &str,
            hook: &str,
            idea: &str,
            source: &str,
        ) -> Result<()> {
            ProjectStore::insert_content(&self.inner, project_id, agent_name, hook, idea, source)
                .await
        }

        async fn insert_ideas(
            &self,
            project_id: i64,
            agent_name: &str,
            ideas: &[IdeaItem],
        ) -> Result<usize> {
            ProjectStore::insert_ideas(&self.inner, project_id, agent_name, ideas).await
        }

        async fn set_project_status(&self, id: i64, status: ProjectStatus) -> Result<()> {
            self.status_calls.fetch_add(1, Ordering::SeqCst);
            if status == ProjectStatus::Done
                && self
                    .failures_left
                    .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                    .is_ok()
            {
                return Err(HookError::Storage("connection dropped".into()));
            }
            ProjectStore::set_project_status(&self.inner, id, status).await
        }

        async fn list_projects(&self, limit: usize) -> Result<Vec<Project>> {
            ProjectStore::list_projects(&self.inner, limit).await
        }

        async fn list_contents(&self, project_id: i64) -> Result<Vec<Content>> {
            ProjectStore::list_contents(&self.inner, project_id).await
        }

        async fn delete_project(&self, id: i64) -> Result<()> {
            ProjectStore::delete_project(&self.inner, id).await
        }
    }

    fn fast_retry() -> StatusRetryPolicy {
        StatusRetryPolicy {
            max_attempts: 3,
            min_delay_ms: 1,
            max_delay_ms: 5,
        }
    }

    fn orchestrator(store: SharedStore, provider: ScriptedProvider) -> Orchestrator {
        let client = GenerationClient::new(Arc::new(provider), Duration::from_millis(500));
        let registry = Arc::new(AgentRegistry::builtin(PromptBuilder::default()));
        Orchestrator::new(store, client, registry).with_status_retry(fast_retry())
    }

    fn memory_store() -> (Database, SharedStore) {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        let store: SharedStore = Arc::new(db.clone());
        (db, store)
    }

    #[tokio::test]
    async fn test_every_agent_writes_its_own_rows() {
        let (db, store) = memory_store();
        let id = ProjectStore::create_project(store.as_ref(), "https://example.com")
            .await
            .unwrap();

        let report = orchestrator(store.clone(), ScriptedProvider::uniform(ONE_IDEA))
            .run(id, "X", "Y")
            .await;

        assert_eq!(report.final_status, ProjectStatus::Done);
        assert_eq!(report.succeeded(), 4);
        assert_eq!(report.total_rows(), 4);

        let contents = db.list_contents(id).unwrap();
        let mut agents: Vec<&str> = contents.iter().map(|c| c.agent_name.as_str()).collect();
        agents.sort();
        assert_eq!(agents, vec!["Divertir", "Expertise", "Polariser", "Vente"]);
        for content in &contents {
            assert_eq!(content.project_id, id);
            assert_eq!(
                (content.hook.as_str(), content.idea.as_str(), content.source.as_str()),
                ("H", "I", "S")
            );
        }
        assert_eq!(db.get_project(id).unwrap().status, ProjectStatus::Done);
    }

    #[tokio::test]
    async fn test_malformed_agent_is_isolated() {
        let (db, store) = memory_store();
        let id = db.create_project("u").unwrap();

        let provider = ScriptedProvider {
            responses: vec![
                ("Provocateur", "not json at all"),
                ("Humorist", r#"{"ideas":[{"hook":"only hook"}]}"#),
                ("Copywriter", "ERROR"),
            ],
            fallback: ONE_IDEA,
        };
        let report = orchestrator(store, provider).run(id, "X", "Y").await;

        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.failed(), 3);
        assert_eq!(report.final_status, ProjectStatus::Done);

        let contents = db.list_contents(id).unwrap();
        assert_eq!(contents.len(), 1);
        assert_eq!(contents[0].agent_name, "Expertise");
    }

    #[tokio::test]
    async fn test_all_agents_failing_still_settles() {
        let (db, store) = memory_store();
        let id = db.create_project("u").unwrap();

        let report = orchestrator(store, ScriptedProvider::uniform("garbage"))
            .run(id, "", "")
            .await;

        assert_eq!(report.succeeded(), 0);
        assert_eq!(report.final_status, ProjectStatus::Done);
        assert!(db.list_contents(id).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_idea_list_is_success_without_rows() {
        let (db, store) = memory_store();
        let id = db.create_project("u").unwrap();

        let report = orchestrator(store, ScriptedProvider::uniform(r#"{"ideas":[]}"#))
            .run(id, "X", "Y")
            .await;

        assert_eq!(report.succeeded(), 4);
        assert_eq!(report.total_rows(), 0);
        assert_eq!(db.count_contents(id).unwrap(), 0);
    }

    #[tokio::test]
    async fn test_hung_agent_times_out_and_run_settles() {
        let (db, store) = memory_store();
        let id = db.create_project("u").unwrap();

        let provider = ScriptedProvider {
            responses: vec![("Technical Expert", "HANG")],
            fallback: ONE_IDEA,
        };
        let client = GenerationClient::new(Arc::new(provider), Duration::from_millis(50));
        let registry = Arc::new(AgentRegistry::builtin(PromptBuilder::default()));
        let report = Orchestrator::new(store, client, registry)
            .with_status_retry(fast_retry())
            .run(id, "X", "Y")
            .await;

        let expertise = report
            .outcomes
            .iter()
            .find(|o| o.agent() == "Expertise")
            .unwrap();
        assert!(matches!(expertise, AgentOutcome::Failed { error, .. } if error.starts_with("Timeout after")));
        assert_eq!(report.succeeded(), 3);
        assert_eq!(db.get_project(id).unwrap().status, ProjectStatus::Done);
    }

    #[tokio::test]
    async fn test_concurrent_runs_do_not_mix_projects() {
        let (db, store) = memory_store();
        let first = db.create_project("first").unwrap();
        let second = db.create_project("second").unwrap();

        let runner = orchestrator(store, ScriptedProvider::uniform(ONE_IDEA));
        let (a, b) = tokio::join!(
            runner.run(first, "site one", "c"),
            runner.run(second, "site two", "c")
        );

        assert_eq!(a.project_id, first);
        assert_eq!(b.project_id, second);
        for id in [first, second] {
            let contents = db.list_contents(id).unwrap();
            assert_eq!(contents.len(), 4);
            assert!(contents.iter().all(|c| c.project_id == id));
        }
    }

    #[tokio::test]
    async fn test_status_write_is_retried() {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        let id = db.create_project("u").unwrap();
        let flaky = Arc::new(FlakyStatusStore {
            inner: db.clone(),
            failures_left: AtomicUsize::new(2),
            status_calls: AtomicUsize::new(0),
        });

        let report = orchestrator(flaky.clone(), ScriptedProvider::uniform(ONE_IDEA))
            .run(id, "X", "Y")
            .await;

        assert_eq!(report.final_status, ProjectStatus::Done);
        assert_eq!(flaky.status_calls.load(Ordering::SeqCst), 3);
        assert_eq!(db.get_project(id).unwrap().status, ProjectStatus::Done);
    }

    #[tokio::test]
    async fn test_exhausted_retries_mark_project_stalled() {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        let id = db.create_project("u").unwrap();
        let flaky = Arc::new(FlakyStatusStore {
            inner: db.clone(),
            failures_left: AtomicUsize::new(10),
            status_calls: AtomicUsize::new(0),
        });

        let report = orchestrator(flaky.clone(), ScriptedProvider::uniform(ONE_IDEA))
            .run(id, "X", "Y")
            .await;

        assert_eq!(report.final_status, ProjectStatus::Stalled);
        // three `done` attempts, then one `stalled` write
        assert_eq!(flaky.status_calls.load(Ordering::SeqCst), 4);
        assert_eq!(db.get_project(id).unwrap().status, ProjectStatus::Stalled);
        assert_eq!(db.count_contents(id).unwrap(), 4);
    }

    #[tokio::test]
    async fn test_custom_catalog() {
        let (db, store) = memory_store();
        let id = db.create_project("u").unwrap();

        let registry = AgentRegistry::from_definitions(
            vec![AgentDefinition::new("Solo", "Analyst", "Summarize.")],
            PromptBuilder::default(),
        )
        .unwrap();
        let client = GenerationClient::new(
            Arc::new(ScriptedProvider::uniform(ONE_IDEA)),
            Duration::from_secs(1),
        );
        let report = Orchestrator::new(store, client, Arc::new(registry))
            .run(id, "X", "Y")
            .await;

        assert_eq!(report.outcomes.len(), 1);
        assert_eq!(db.list_contents(id).unwrap()[0].agent_name, "Solo");
    }
}
