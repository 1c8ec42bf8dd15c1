//! Async persistence gateway
//!
//! [`ProjectStore`] is the seam the orchestrator and HTTP handlers talk to.
//! The SQLite implementation hands each call to the blocking pool so a
//! storage round-trip is a suspension point for the async runtime, never a
//! stall of it.

use std::sync::Arc;

use async_trait::async_trait;

use super::database::Database;
use crate::types::{Content, HookError, IdeaItem, Project, ProjectStatus, Result};

/// Shared store handle for async contexts.
pub type SharedStore = Arc<dyn ProjectStore>;

#[async_trait]
pub trait ProjectStore: Send + Sync {
    async fn create_project(&self, url: &str) -> Result<i64>;

    async fn get_project(&self, id: i64) -> Result<Project>;

    async fn insert_content(
        &self,
        project_id: i64,
        agent_name: &str,
        hook: &str,
        idea: &str,
        source: &str,
    ) -> Result<()>;

    /// Persist one agent's ideas; returns the number of rows written.
    async fn insert_ideas(
        &self,
        project_id: i64,
        agent_name: &str,
        ideas: &[IdeaItem],
    ) -> Result<usize>;

    async fn set_project_status(&self, id: i64, status: ProjectStatus) -> Result<()>;

    async fn list_projects(&self, limit: usize) -> Result<Vec<Project>>;

    async fn list_contents(&self, project_id: i64) -> Result<Vec<Content>>;

    async fn delete_project(&self, id: i64) -> Result<()>;
}

impl Database {
    /// Run a blocking storage operation on the blocking thread pool.
    async fn blocking<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&Database) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.clone();
        tokio::task::spawn_blocking(move || op(&db))
            .await
            .map_err(|e| HookError::Storage(format!("Storage task failed: {}", e)))?
    }
}

#[async_trait]
impl ProjectStore for Database {
    async fn create_project(&self, url: &str) -> Result<i64> {
        let url = url.to_string();
        self.blocking(move |db| db.create_project(&url)).await
    }

    async fn get_project(&self, id: i64) -> Result<Project> {
        self.blocking(move |db| db.get_project(id)).await
    }

    async fn insert_content(
        &self,
        project_id: i64,
        agent_name: &str,
        hook: &str,
        idea: &str,
        source: &str,
    ) -> Result<()> {
        let (agent_name, hook, idea, source) = (
            agent_name.to_string(),
            hook.to_string(),
            idea.to_string(),
            source.to_string(),
        );
        self.blocking(move |db| {
            db.insert_content(project_id, &agent_name, &hook, &idea, &source)
                .map(|_| ())
        })
        .await
    }

    async fn insert_ideas(
        &self,
        project_id: i64,
        agent_name: &str,
        ideas: &[IdeaItem],
    ) -> Result<usize> {
        let agent_name = agent_name.to_string();
        let ideas = ideas.to_vec();
        self.blocking(move |db| db.insert_ideas(project_id, &agent_name, &ideas))
            .await
    }

    async fn set_project_status(&self, id: i64, status: ProjectStatus) -> Result<()> {
        self.blocking(move |db| db.set_project_status(id, status))
            .await
    }

    async fn list_projects(&self, limit: usize) -> Result<Vec<Project>> {
        self.blocking(move |db| db.list_projects(limit)).await
    }

    async fn list_contents(&self, project_id: i64) -> Result<Vec<Content>> {
        self.blocking(move |db| db.list_contents(project_id)).await
    }

    async fn delete_project(&self, id: i64) -> Result<()> {
        self.blocking(move |db| db.delete_project(id)).await
    }
}
