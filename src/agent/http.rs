use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::agent::error::AgentError;
use crate::agent::metrics::{sample_memory, CpuSampler};
use crate::agent::process::{ProcessRecord, ProcessTable};

#[derive(Clone)]
pub struct AgentState {
    pub table: ProcessTable,
    pub cpu_sampler: Arc<CpuSampler>,
    pub stop_grace: Duration,
}

pub fn router(state: AgentState) -> Router {
    Router::new()
        .route("/status", get(status))
        .route("/start", post(start))
        .route("/stop", post(stop))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(Serialize)]
struct StatusResponse {
    cpu_usage: f64,
    memory_usage: f64,
    total_memory: u64,
    available_memory: u64,
    running_processes: usize,
    processes: Vec<ProcessRecord>,
}

async fn status(State(state): State<AgentState>) -> Json<StatusResponse> {
    let cpu_usage = state.cpu_sampler.sample().await;
    let memory = sample_memory().await;
    let processes = state.table.snapshot().await;

    Json(StatusResponse {
        cpu_usage,
        memory_usage: memory.used_percent,
        total_memory: memory.total_kb,
        available_memory: memory.available_kb,
        running_processes: processes.len(),
        processes,
    })
}

#[derive(Deserialize)]
struct StartRequest {
    script_path: String,
}

#[derive(Serialize)]
struct StartResponse {
    pid: u32,
    status: &'static str,
}

async fn start(
    State(state): State<AgentState>,
    Json(req): Json<StartRequest>,
) -> Result<Json<StartResponse>, AgentError> {
    let pid = state.table.start(req.script_path).await?;
    Ok(Json(StartResponse {
        pid,
        status: "started",
    }))
}

/// `pid` may arrive as a JSON number or as a numeric string — accept both.
#[derive(Deserialize)]
#[serde(untagged)]
enum PidValue {
    Number(u32),
    Text(String),
}

#[derive(Deserialize)]
struct StopRequest {
    pid: PidValue,
}

#[derive(Serialize)]
struct StopResponse {
    status: &'static str,
}

async fn stop(
    State(state): State<AgentState>,
    Json(req): Json<StopRequest>,
) -> Result<Json<StopResponse>, AgentError> {
    let pid = match req.pid {
        PidValue::Number(pid) => pid,
        PidValue::Text(text) => text
            .parse()
            .map_err(|_| AgentError::InvalidPid(text.clone()))?,
    };

    state.table.stop(pid, state.stop_grace).await?;
    Ok(Json(StopResponse { status: "stopped" }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn test_state() -> AgentState {
        AgentState {
            table: ProcessTable::new(),
            cpu_sampler: Arc::new(CpuSampler::new()),
            stop_grace: Duration::from_millis(500),
        }
    }

    #[tokio::test]
    async fn start_rejects_empty_script_path() {
        let app = router(test_state());
        let req = Request::builder()
            .method("POST")
            .uri("/start")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"script_path":""}"#))
            .unwrap();

        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn stop_unknown_pid_returns_404() {
        let app = router(test_state());
        let req = Request::builder()
            .method("POST")
            .uri("/stop")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"pid":424242}"#))
            .unwrap();

        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unknown_route_returns_404() {
        let app = router(test_state());
        let req = Request::builder()
            .uri("/nope")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn status_reports_empty_process_list_initially() {
        let app = router(test_state());
        let req = Request::builder()
            .uri("/status")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
