//! Route handlers

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequestParts, Path, State};
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::Html;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{error, info};

use super::AppState;
use super::error::ApiError;
use crate::pipeline::AnalysisJob;
use crate::types::{Content, Project, ProjectStatus};

const DASHBOARD: &str = include_str!("dashboard.html");

type ApiResult<T> = std::result::Result<T, ApiError>;

/// Numeric `{id}` path segment; anything else is a 400
#[derive(Debug, Clone, Copy)]
pub struct ProjectId(pub i64);

impl<S> FromRequestParts<S> for ProjectId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id) = Path::<i64>::from_request_parts(parts, state).await?;
        Ok(Self(id))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    pub url: String,
    #[serde(default)]
    pub site_text: String,
    #[serde(default)]
    pub comments: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    pub success: bool,
    pub project_id: i64,
    pub message: String,
}

pub async fn dashboard() -> Html<&'static str> {
    Html(DASHBOARD)
}

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "provider": state.provider,
        "model": state.model,
    }))
}

/// Create the project, queue its analysis and answer without waiting for it.
pub async fn analyze(
    State(state): State<AppState>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> ApiResult<Json<AnalyzeResponse>> {
    let Json(request) = payload?;

    let project_id = state.store.create_project(&request.url).await?;
    info!("Created project #{} for {}", project_id, request.url);

    let job = AnalysisJob::new(project_id, request.site_text, request.comments);
    if let Err(e) = state.queue.submit(job).await {
        error!("Could not queue project #{}: {}", project_id, e);
        if let Err(status_err) = state
            .store
            .set_project_status(project_id, ProjectStatus::Stalled)
            .await
        {
            error!(
                "Could not mark project #{} as stalled: {}",
                project_id, status_err
            );
        }
        return Err(ApiError::internal(e.to_string()));
    }

    Ok(Json(AnalyzeResponse {
        success: true,
        project_id,
        message: "Analysis started".to_string(),
    }))
}

pub async fn list_projects(State(state): State<AppState>) -> ApiResult<Json<Vec<Project>>> {
    Ok(Json(state.store.list_projects(state.list_limit).await?))
}

/// Contents of one project; empty while agents run or if all of them failed.
pub async fn list_contents(
    State(state): State<AppState>,
    ProjectId(id): ProjectId,
) -> ApiResult<Json<Vec<Content>>> {
    Ok(Json(state.store.list_contents(id).await?))
}

pub async fn project_status(
    State(state): State<AppState>,
    ProjectId(id): ProjectId,
) -> ApiResult<Json<Project>> {
    Ok(Json(state.store.get_project(id).await?))
}

pub async fn delete_project(
    State(state): State<AppState>,
    ProjectId(id): ProjectId,
) -> ApiResult<StatusCode> {
    state.store.delete_project(id).await?;
    info!("Deleted project #{}", id);
    Ok(StatusCode::NO_CONTENT)
}
