use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::scheduler::error::SchedulerError;
use crate::scheduler::health::probe_round;
use crate::scheduler::state::SchedulerState;
use crate::scheduler::types::{Node, NodeStatus, Workload};

pub fn router(state: Arc<SchedulerState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/health/summary", get(health_summary))
        .route("/health/check", post(health_check))
        .route("/recovery/metrics", get(recovery_metrics))
        .route("/nodes", get(list_nodes).post(register_node))
        .route("/workloads", get(list_workloads).post(submit_workload))
        .route("/workloads/:id", delete(delete_workload))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    online_nodes: usize,
    degraded_nodes: usize,
    offline_nodes: usize,
    unknown_nodes: usize,
}

fn summarize(nodes: &[Node]) -> HealthResponse {
    let mut summary = HealthResponse {
        online_nodes: 0,
        degraded_nodes: 0,
        offline_nodes: 0,
        unknown_nodes: 0,
    };
    for node in nodes {
        match node.status {
            NodeStatus::Online => summary.online_nodes += 1,
            NodeStatus::Degraded => summary.degraded_nodes += 1,
            NodeStatus::Offline => summary.offline_nodes += 1,
            NodeStatus::Unknown => summary.unknown_nodes += 1,
        }
    }
    summary
}

async fn health(State(state): State<Arc<SchedulerState>>) -> Json<HealthResponse> {
    let nodes = state.list_nodes().await;
    Json(summarize(&nodes))
}

async fn health_summary(State(state): State<Arc<SchedulerState>>) -> Json<Vec<Node>> {
    Json(state.list_nodes().await)
}

async fn health_check(State(state): State<Arc<SchedulerState>>) -> Json<HealthResponse> {
    probe_round(&state).await;
    let nodes = state.list_nodes().await;
    Json(summarize(&nodes))
}

#[derive(Serialize)]
struct RecoveryMetrics {
    failed_workload_ids: Vec<String>,
    desired_count: usize,
    nodes: Vec<Node>,
}

async fn recovery_metrics(State(state): State<Arc<SchedulerState>>) -> Json<RecoveryMetrics> {
    let inner = state.lock().await;
    Json(RecoveryMetrics {
        failed_workload_ids: inner.failed.iter().cloned().collect(),
        desired_count: inner.desired.len(),
        nodes: {
            let mut nodes: Vec<Node> = inner.nodes.values().cloned().collect();
            nodes.sort_by_key(|n| n.registration_order);
            nodes
        },
    })
}

async fn list_nodes(State(state): State<Arc<SchedulerState>>) -> Json<Vec<Node>> {
    Json(state.list_nodes().await)
}

#[derive(Deserialize)]
struct RegisterNodeRequest {
    host: String,
    port: u16,
}

async fn register_node(
    State(state): State<Arc<SchedulerState>>,
    Json(req): Json<RegisterNodeRequest>,
) -> Result<Json<Node>, SchedulerError> {
    if req.host.trim().is_empty() {
        return Err(SchedulerError::EmptyHost);
    }
    Ok(Json(state.register_node(req.host, req.port).await))
}

async fn list_workloads(State(state): State<Arc<SchedulerState>>) -> Json<Vec<Workload>> {
    Json(state.list_workloads().await)
}

#[derive(Deserialize)]
struct SubmitWorkloadRequest {
    script_path: String,
}

#[derive(Serialize)]
struct SubmitWorkloadResponse {
    workload_id: String,
}

async fn submit_workload(
    State(state): State<Arc<SchedulerState>>,
    Json(req): Json<SubmitWorkloadRequest>,
) -> Result<Json<SubmitWorkloadResponse>, SchedulerError> {
    let workload = state.submit_workload(req.script_path).await?;
    Ok(Json(SubmitWorkloadResponse {
        workload_id: workload.id,
    }))
}

async fn delete_workload(
    State(state): State<Arc<SchedulerState>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, SchedulerError> {
    state.stop_workload(&id).await?;
    Ok(Json(serde_json::json!({ "status": "stopped" })))
}
