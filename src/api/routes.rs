//! HTTP route handlers.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::card::{generate_agent_card, AgentCard};
use crate::clarification::Task;
use crate::config::Config;
use crate::router::{FormattedArtifact, TaskRouter};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub router: TaskRouter,
}

impl AppState {
    pub fn new(config: Config, router: TaskRouter) -> Self {
        Self { config, router }
    }
}

/// Error body, `{"detail": "..."}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub detail: String,
}

type ApiError = (StatusCode, Json<ErrorDetail>);

fn internal_error(detail: impl ToString) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorDetail {
            detail: detail.to_string(),
        }),
    )
}

/// Build the application router.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(read_root))
        .route("/agent_card", get(get_agent_card))
        .route("/task", post(process_task))
        .route("/api/health", get(health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server on the configured address.
pub async fn serve(config: Config, router: TaskRouter) -> anyhow::Result<()> {
    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", listener.local_addr()?);
    serve_on(listener, Arc::new(AppState::new(config, router))).await
}

/// Serve on an already bound listener.
pub async fn serve_on(listener: TcpListener, state: Arc<AppState>) -> anyhow::Result<()> {
    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}

#[derive(Debug, Serialize)]
struct RootResponse {
    message: &'static str,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    model: String,
}

/// GET / - Liveness message.
async fn read_root() -> Json<RootResponse> {
    tracing::debug!("Received request at root endpoint.");
    Json(RootResponse {
        message: "CortexMesh A2A Adapter Server is running",
    })
}

/// GET /api/health - Health check.
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        model: state.config.model.clone(),
    })
}

/// GET /agent_card - Agent card for this adapter.
async fn get_agent_card(State(state): State<Arc<AppState>>) -> Json<AgentCard> {
    tracing::debug!("Generating agent card.");
    Json(generate_agent_card(&state.config.public_url))
}

/// POST /task - Clarify a task and return its formatted artifact.
async fn process_task(
    State(state): State<Arc<AppState>>,
    Json(task): Json<Task>,
) -> Result<Json<FormattedArtifact>, ApiError> {
    tracing::debug!("Received task via POST: {:?}", task);

    match state.router.route(&task).await {
        Ok(formatted) => Ok(Json(formatted)),
        Err(e) => {
            tracing::error!("Error processing task: {}", e);
            Err(internal_error(e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::ScriptedRunner;
    use crate::client::{A2aClient, ClientError};
    use crate::clarification::ClarificationEngine;
    use crate::router::ArtifactStatus;
    use axum::body::Body;
    use axum::http::{header, Request};
    use serde_json::{json, Value};
    use std::future::IntoFuture;
    use tower::ServiceExt;

    fn state(runner: ScriptedRunner) -> Arc<AppState> {
        let router = TaskRouter::new(ClarificationEngine::new(Arc::new(runner)));
        Arc::new(AppState::new(Config::default(), router))
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_task(body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/task")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_root() {
        let response = app(state(ScriptedRunner::silent()))
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({"message": "CortexMesh A2A Adapter Server is running"})
        );
    }

    #[tokio::test]
    async fn test_agent_card() {
        let response = app(state(ScriptedRunner::silent()))
            .oneshot(Request::builder().uri("/agent_card").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let card = body_json(response).await;
        assert_eq!(card["agent_name"], "CortexMesh-A2A-Agent");
        assert_eq!(card["endpoints"]["task_endpoint"], "http://localhost:8000/task");
    }

    #[tokio::test]
    async fn test_task_clarification_needed() {
        let runner = ScriptedRunner::replying(
            r#"{"task_id":"t1","is_complete":false,"clarification_points":["payload is empty"]}"#,
        );
        let response = app(state(runner))
            .oneshot(post_task(
                json!({"task_id": "t1", "description": "Analyze data?", "payload": {}}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["task_id"], "t1");
        assert_eq!(body["status"], "clarification_needed");
        assert_eq!(body["artifact"]["clarification_points"], json!(["payload is empty"]));
        assert_eq!(body["version"], "1.0");
        assert!(body["timestamp"].as_str().unwrap().ends_with('Z'));
    }

    #[tokio::test]
    async fn test_task_engine_failure_is_500() {
        let response = app(state(ScriptedRunner::replying("I don't know")))
            .oneshot(post_task(
                json!({"task_id": "t1", "description": "Analyze data?", "payload": {}}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert!(body["detail"].as_str().unwrap().contains("I don't know"));
    }

    #[tokio::test]
    async fn test_task_rejects_invalid_body() {
        let response = app(state(ScriptedRunner::silent()))
            .oneshot(post_task(json!({"description": "no id"})))
            .await
            .unwrap();
        assert!(response.status().is_client_error());
    }

    #[tokio::test]
    async fn test_client_round_trip_over_tcp() {
        let runner = ScriptedRunner::replying(
            r#"{"task_id":"t2","is_complete":true,"clarification_points":[]}"#,
        );
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(axum::serve(listener, app(state(runner))).into_future());

        let client = A2aClient::new(format!("http://{}", addr));
        let task: Task = serde_json::from_value(json!({
            "task_id": "t2",
            "description": "Sum column A",
            "payload": {"file": "a.csv"}
        }))
        .unwrap();

        let artifact = client.send_task(&task).await.unwrap();
        assert_eq!(artifact.artifact.status, ArtifactStatus::Complete);
        assert_eq!(artifact.version, "1.0");

        let card = client.agent_card().await.unwrap();
        assert_eq!(card.version, "1.0.0");

        server.abort();
    }

    #[tokio::test]
    async fn test_client_reports_server_errors() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(
            axum::serve(listener, app(state(ScriptedRunner::silent()))).into_future(),
        );

        let client = A2aClient::new(format!("http://{}", addr));
        let err = client
            .send_task(&Task::new("t", "d", Default::default()))
            .await
            .unwrap_err();
        match err {
            ClientError::Status { status, body, .. } => {
                assert_eq!(status, reqwest::StatusCode::INTERNAL_SERVER_ERROR);
                assert!(body.contains("empty messages list"));
            }
            other => panic!("unexpected error: {other:?}"),
        }

        server.abort();
    }
}
