//! Analysis work queue
//!
//! The intake endpoint hands jobs to [`AnalysisQueue`] and answers right
//! away; a background [`Worker`] drains the queue and runs each job's
//! orchestrator pass as its own task, so runs for different projects
//! overlap. Dropping every queue handle lets the worker finish the runs it
//! already started and then exit.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info};

use super::orchestrator::{Orchestrator, RunReport};
use crate::types::{HookError, Result};

/// One project waiting for analysis
#[derive(Debug, Clone)]
pub struct AnalysisJob {
    pub project_id: i64,
    pub site_text: String,
    pub comments: String,
}

impl AnalysisJob {
    pub fn new(project_id: i64, site_text: impl Into<String>, comments: impl Into<String>) -> Self {
        Self {
            project_id,
            site_text: site_text.into(),
            comments: comments.into(),
        }
    }
}

/// Sending side of the work queue
#[derive(Debug, Clone)]
pub struct AnalysisQueue {
    tx: mpsc::Sender<AnalysisJob>,
}

impl AnalysisQueue {
    /// Enqueue a job. Waits while the queue is full; fails once the worker is gone.
    pub async fn submit(&self, job: AnalysisJob) -> Result<()> {
        let project_id = job.project_id;
        self.tx.send(job).await.map_err(|_| {
            HookError::Queue(format!(
                "analysis worker is not running, project {} was not queued",
                project_id
            ))
        })?;
        debug!("Queued project #{}", project_id);
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Background consumer of the work queue
pub struct Worker {
    orchestrator: Arc<Orchestrator>,
    rx: mpsc::Receiver<AnalysisJob>,
}

impl Worker {
    pub fn new(orchestrator: Arc<Orchestrator>, capacity: usize) -> (AnalysisQueue, Self) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (AnalysisQueue { tx }, Self { orchestrator, rx })
    }

    /// Start the worker on the runtime.
    pub fn spawn(orchestrator: Arc<Orchestrator>, capacity: usize) -> (AnalysisQueue, JoinHandle<()>) {
        let (queue, worker) = Self::new(orchestrator, capacity);
        (queue, tokio::spawn(worker.run()))
    }

    /// Drain the queue until every sender is dropped, then wait for in-flight runs.
    pub async fn run(mut self) {
        info!("Analysis worker started");
        let mut runs: JoinSet<RunReport> = JoinSet::new();

        loop {
            tokio::select! {
                job = self.rx.recv() => match job {
                    Some(job) => {
                        let orchestrator = Arc::clone(&self.orchestrator);
                        runs.spawn(async move {
                            orchestrator
                                .run(job.project_id, &job.site_text, &job.comments)
                                .await
                        });
                    }
                    None => break,
                },
                Some(finished) = runs.join_next(), if !runs.is_empty() => {
                    Self::reap(finished);
                }
            }
        }

        info!("Analysis queue closed, waiting for {} runs", runs.len());
        while let Some(finished) = runs.join_next().await {
            Self::reap(finished);
        }
        info!("Analysis worker stopped");
    }

    fn reap(finished: std::result::Result<RunReport, tokio::task::JoinError>) {
        match finished {
            Ok(report) => debug!(
                "Run for project #{} finished as {}",
                report.project_id, report.final_status
            ),
            Err(e) => error!("Analysis run aborted: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::{AgentRegistry, PromptBuilder};
    use crate::ai::{GenerationClient, LlmProvider, LlmResponse};
    use crate::storage::{Database, SharedStore};
    use crate::types::ProjectStatus;
    use async_trait::async_trait;
    use serde_json::Value;
    use std::time::Duration;

    struct FixedProvider;

    #[async_trait]
    impl LlmProvider for FixedProvider {
        async fn generate(&self, _prompt: &str, _schema: &Value) -> Result<LlmResponse> {
            Ok(LlmResponse::content_only(
                r#"{"ideas":[{"hook":"H","content":"I","source":"S"}]}"#,
            ))
        }

        fn name(&self) -> &str {
            "fixed"
        }

        fn model(&self) -> &str {
            "fixed-1"
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }
    }

    fn orchestrator(db: &Database) -> Arc<Orchestrator> {
        let store: SharedStore = Arc::new(db.clone());
        let client = GenerationClient::new(Arc::new(FixedProvider), Duration::from_secs(1));
        let registry = Arc::new(AgentRegistry::builtin(PromptBuilder::default()));
        Arc::new(Orchestrator::new(store, client, registry))
    }

    #[tokio::test]
    async fn test_worker_drains_jobs_before_exit() {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        let first = db.create_project("a").unwrap();
        let second = db.create_project("b").unwrap();

        let (queue, handle) = Worker::spawn(orchestrator(&db), 4);
        queue.submit(AnalysisJob::new(first, "X", "Y")).await.unwrap();
        queue.submit(AnalysisJob::new(second, "X", "Y")).await.unwrap();
        drop(queue);

        tokio::time::timeout(Duration::from_secs(10), handle)
            .await
            .expect("worker did not stop")
            .unwrap();

        for id in [first, second] {
            assert_eq!(db.get_project(id).unwrap().status, ProjectStatus::Done);
            assert_eq!(db.count_contents(id).unwrap(), 4);
        }
    }

    #[tokio::test]
    async fn test_submit_fails_without_worker() {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        let (queue, worker) = Worker::new(orchestrator(&db), 1);
        drop(worker);

        assert!(queue.is_closed());
        let err = queue.submit(AnalysisJob::new(1, "", "")).await.unwrap_err();
        assert!(matches!(err, HookError::Queue(_)));
    }
}
