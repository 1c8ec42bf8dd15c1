//! HTTP Service
//!
//! Routes:
//! - `GET /` dashboard
//! - `GET /api/health`
//! - `POST /api/analyze` create a project and queue its analysis
//! - `GET /api/projects` newest projects first
//! - `GET /api/projects/{id}` contents of one project
//! - `GET /api/projects/{id}/status` the project row
//! - `DELETE /api/projects/{id}`

mod error;
mod handlers;

pub use error::ApiError;
pub use handlers::{AnalyzeRequest, AnalyzeResponse};

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::ai::{GenerationClient, create_provider};
use crate::config::{Config, ServerConfig};
use crate::constants::storage::PROJECT_LIST_LIMIT;
use crate::pipeline::{AnalysisQueue, Orchestrator, Worker};
use crate::storage::{Database, SharedStore};
use crate::types::{HookError, Result};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
    pub queue: AnalysisQueue,
    pub provider: String,
    pub model: String,
    /// Projects returned by the listing endpoint
    pub list_limit: usize,
}

impl AppState {
    pub fn new(store: SharedStore, queue: AnalysisQueue, client: &GenerationClient) -> Self {
        Self {
            store,
            queue,
            provider: client.provider_name().to_string(),
            model: client.model().to_string(),
            list_limit: PROJECT_LIST_LIMIT,
        }
    }
}

pub fn router(state: AppState, config: &ServerConfig) -> Router {
    let mut app = Router::new()
        .route("/", get(handlers::dashboard))
        .route("/api/health", get(handlers::health))
        .route("/api/analyze", post(handlers::analyze))
        .route("/api/projects", get(handlers::list_projects))
        .route(
            "/api/projects/{id}",
            get(handlers::list_contents).delete(handlers::delete_project),
        )
        .route("/api/projects/{id}/status", get(handlers::project_status));

    if let Some(dir) = &config.static_dir {
        app = app.nest_service("/static", ServeDir::new(dir));
    }

    app.layer(DefaultBodyLimit::max(config.body_limit_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Wire storage, provider, orchestrator and worker, then serve until Ctrl-C.
pub async fn run(config: Config) -> Result<()> {
    let database = Database::open_deferred(&config.storage.path, config.storage.pool.clone());
    let schema_db = database.clone();
    let initialized = tokio::task::spawn_blocking(move || schema_db.initialize())
        .await
        .map_err(|e| HookError::Storage(format!("Schema task failed: {}", e)))
        .and_then(|result| result);
    if let Err(e) = initialized {
        error!(
            "Schema initialization failed for {}, continuing: {}",
            config.storage.path.display(),
            e
        );
    }
    let store: SharedStore = Arc::new(database);

    let provider = create_provider(&config.llm)?;
    match provider.health_check().await {
        Ok(true) => {}
        Ok(false) | Err(_) => warn!("Provider {} did not pass its health check", provider.name()),
    }
    let client = GenerationClient::new(provider, config.generation_timeout());

    let registry = Arc::new(config.registry()?);
    info!("Agents: {}", registry.names().join(", "));

    let orchestrator = Arc::new(
        Orchestrator::new(store.clone(), client.clone(), registry)
            .with_status_retry(config.pipeline.status_retry),
    );
    let (queue, worker) = Worker::spawn(orchestrator, config.pipeline.queue_capacity);

    let state = AppState::new(store, queue, &client);
    let app = router(state, &config.server);

    let address = config.server.bind_address();
    let listener = TcpListener::bind(&address).await?;
    info!("Listening on http://{}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped, waiting for running analyses");
    worker
        .await
        .map_err(|e| HookError::Queue(format!("Analysis worker failed: {}", e)))?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
