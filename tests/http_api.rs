use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use serde_json::{Value, json};
use tokio::sync::Semaphore;
use tower::ServiceExt;

use hookforge::ai::{GenerationClient, LlmProvider, LlmResponse};
use hookforge::config::ServerConfig;
use hookforge::pipeline::{Orchestrator, StatusRetryPolicy, Worker};
use hookforge::server::{AppState, router};
use hookforge::storage::PoolConfig;
use hookforge::{AgentRegistry, Database, HookError, PromptBuilder, Result, SharedStore};

const ONE_IDEA: &str = r#"{"ideas":[{"hook":"H","content":"I","source":"S"}]}"#;

/// Returns a fixed body once a permit is released.
struct GatedProvider {
    body: &'static str,
    gate: Arc<Semaphore>,
}

#[async_trait]
impl LlmProvider for GatedProvider {
    async fn generate(&self, _prompt: &str, _schema: &Value) -> Result<LlmResponse> {
        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|e| HookError::LlmApi(e.to_string()))?;
        permit.forget();
        Ok(LlmResponse::content_only(self.body))
    }

    fn name(&self) -> &str {
        "stub"
    }

    fn model(&self) -> &str {
        "stub-1"
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }
}

struct TestApp {
    router: Router,
    db: Database,
    gate: Arc<Semaphore>,
}

/// Queue handling for [`build_router`]
enum WorkerMode {
    Running,
    Stopped,
}

fn build_router(store: SharedStore, provider: Arc<GatedProvider>, mode: WorkerMode) -> Router {
    let client = GenerationClient::new(provider, Duration::from_secs(5));
    let registry = Arc::new(AgentRegistry::builtin(PromptBuilder::default()));
    let orchestrator = Arc::new(
        Orchestrator::new(store.clone(), client.clone(), registry).with_status_retry(
            StatusRetryPolicy {
                max_attempts: 3,
                min_delay_ms: 1,
                max_delay_ms: 5,
            },
        ),
    );
    let queue = match mode {
        WorkerMode::Running => Worker::spawn(orchestrator, 16).0,
        WorkerMode::Stopped => {
            let (queue, worker) = Worker::new(orchestrator, 16);
            drop(worker);
            queue
        }
    };

    router(AppState::new(store, queue, &client), &ServerConfig::default())
}

async fn send(router: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request should build");

    let response = router
        .clone()
        .oneshot(request)
        .await
        .expect("oneshot should succeed");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::String(
            String::from_utf8_lossy(&bytes).into_owned(),
        ))
    };
    (status, value)
}

impl TestApp {
    fn new(body: &'static str, open: bool) -> Self {
        Self::with_worker(body, open, WorkerMode::Running)
    }

    fn with_worker(body: &'static str, open: bool, mode: WorkerMode) -> Self {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();

        let gate = Arc::new(Semaphore::new(if open { Semaphore::MAX_PERMITS } else { 0 }));
        let provider = Arc::new(GatedProvider {
            body,
            gate: gate.clone(),
        });
        Self {
            router: build_router(Arc::new(db.clone()), provider, mode),
            db,
            gate,
        }
    }

    fn release(&self, permits: usize) {
        self.gate.add_permits(permits);
    }

    async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        send(&self.router, method, uri, body).await
    }

    async fn analyze(&self, body: Value) -> i64 {
        let (status, response) = self.send(Method::POST, "/api/analyze", Some(body)).await;
        assert_eq!(status, StatusCode::OK, "{response}");
        assert_eq!(response["success"], json!(true));
        response["projectId"].as_i64().unwrap()
    }

    async fn wait_until_settled(&self, id: i64) -> String {
        for _ in 0..500 {
            let (_, project) = self
                .send(Method::GET, &format!("/api/projects/{id}/status"), None)
                .await;
            let status = project["status"].as_str().unwrap_or_default().to_string();
            if status != "pending" {
                return status;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("project {id} never settled");
    }
}

#[tokio::test]
async fn analyze_returns_pending_project_before_agents_settle() {
    let app = TestApp::new(ONE_IDEA, false);
    let id = app
        .analyze(json!({"url": "https://example.com/post", "siteText": "X", "comments": "Y"}))
        .await;

    let (status, projects) = app.send(Method::GET, "/api/projects", None).await;
    assert_eq!(status, StatusCode::OK);
    let row = projects
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["id"] == json!(id))
        .expect("new project is listed");
    assert_eq!(row["status"], json!("pending"));
    assert_eq!(row["url"], json!("https://example.com/post"));

    let (_, contents) = app
        .send(Method::GET, &format!("/api/projects/{id}"), None)
        .await;
    assert_eq!(contents, json!([]));

    app.release(4);
    assert_eq!(app.wait_until_settled(id).await, "done");
}

#[tokio::test]
async fn settled_project_has_one_row_per_agent() {
    let app = TestApp::new(ONE_IDEA, true);
    let id = app
        .analyze(json!({"url": "u", "siteText": "X", "comments": "Y"}))
        .await;
    assert_eq!(app.wait_until_settled(id).await, "done");

    let (status, contents) = app
        .send(Method::GET, &format!("/api/projects/{id}"), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let rows = contents.as_array().unwrap();
    assert_eq!(rows.len(), 4);
    let mut agents: Vec<&str> = rows
        .iter()
        .map(|r| r["agent_name"].as_str().unwrap())
        .collect();
    agents.sort();
    assert_eq!(agents, vec!["Divertir", "Expertise", "Polariser", "Vente"]);
    for row in rows {
        assert_eq!(row["project_id"], json!(id));
        assert_eq!(row["hook"], json!("H"));
        assert_eq!(row["idea"], json!("I"));
        assert_eq!(row["source"], json!("S"));
    }
}

#[tokio::test]
async fn failing_agents_leave_empty_contents_and_done_status() {
    let app = TestApp::new("this is not json", true);
    let id = app.analyze(json!({"url": "u"})).await;

    assert_eq!(app.wait_until_settled(id).await, "done");
    let (status, contents) = app
        .send(Method::GET, &format!("/api/projects/{id}"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(contents, json!([]));
}

#[tokio::test]
async fn projects_are_listed_newest_first_and_capped() {
    let app = TestApp::new(ONE_IDEA, false);
    for i in 0..22 {
        app.db.create_project(&format!("https://example.com/{i}")).unwrap();
    }

    let (_, projects) = app.send(Method::GET, "/api/projects", None).await;
    let ids: Vec<i64> = projects
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids.len(), 20);
    assert!(ids.windows(2).all(|w| w[0] > w[1]));
    assert_eq!(ids[0], 22);
}

#[tokio::test]
async fn malformed_analyze_body_is_rejected() {
    let app = TestApp::new(ONE_IDEA, true);

    let (status, body) = app
        .send(Method::POST, "/api/analyze", Some(json!({"siteText": "no url"})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/analyze")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let (_, projects) = app.send(Method::GET, "/api/projects", None).await;
    assert_eq!(projects, json!([]));
}

#[tokio::test]
async fn status_and_delete_endpoints() {
    let app = TestApp::new(ONE_IDEA, true);
    let id = app.analyze(json!({"url": "u"})).await;
    app.wait_until_settled(id).await;

    let (status, project) = app
        .send(Method::GET, &format!("/api/projects/{id}/status"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(project["status"], json!("done"));

    let (status, _) = app
        .send(Method::DELETE, &format!("/api/projects/{id}"), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(app.db.count_contents(id).unwrap(), 0);

    let (status, body) = app
        .send(Method::DELETE, &format!("/api/projects/{id}"), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());

    let (status, _) = app
        .send(Method::GET, "/api/projects/999/status", None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.send(Method::GET, "/api/projects/abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn health_and_dashboard() {
    let app = TestApp::new(ONE_IDEA, true);

    let (status, body) = app.send(Method::GET, "/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"status": "ok", "provider": "stub", "model": "stub-1"})
    );

    let (status, page) = app.send(Method::GET, "/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(page.as_str().unwrap().contains("/api/projects"));
}

#[tokio::test]
async fn unreachable_storage_answers_500_instead_of_stopping_the_service() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing").join("hookforge.db");
    let config = PoolConfig {
        min_idle: 0,
        connection_timeout_secs: 1,
        ..PoolConfig::auto()
    };
    let db = Database::open_deferred(&path, config);
    assert!(db.initialize().is_err());

    let provider = Arc::new(GatedProvider {
        body: ONE_IDEA,
        gate: Arc::new(Semaphore::new(Semaphore::MAX_PERMITS)),
    });
    let app = build_router(Arc::new(db), provider, WorkerMode::Running);

    let (status, body) = send(&app, Method::GET, "/api/projects", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].is_string());

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/analyze",
        Some(json!({"url": "https://example.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("Storage"));

    let (status, _) = send(&app, Method::GET, "/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn analyze_without_worker_marks_project_stalled() {
    let app = TestApp::with_worker(ONE_IDEA, true, WorkerMode::Stopped);

    let (status, body) = app
        .send(Method::POST, "/api/analyze", Some(json!({"url": "u"})))
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].is_string());

    let (_, projects) = app.send(Method::GET, "/api/projects", None).await;
    let rows = projects.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["url"], json!("u"));
    assert_eq!(rows[0]["status"], json!("stalled"));
    assert_eq!(app.db.count_contents(rows[0]["id"].as_i64().unwrap()).unwrap(), 0);
}
