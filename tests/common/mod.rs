use std::sync::Arc;

use orchestrator_core::agent::{self, AgentConfig, AgentState, CpuSampler, ProcessTable};
use orchestrator_core::scheduler::{self, SchedulerConfig, SchedulerState};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Starts a real Node Agent HTTP server on an OS-assigned port. Returns
/// the port it bound and the server task's handle; aborting the handle
/// simulates that node going dark for failure-recovery scenarios.
pub async fn spawn_node_agent() -> (u16, JoinHandle<()>) {
    let config = AgentConfig::default();
    let table = ProcessTable::new();
    let state = AgentState {
        table,
        cpu_sampler: Arc::new(CpuSampler::new()),
        stop_grace: config.stop_grace(),
    };

    let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let app = agent::router(state);

    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (port, handle)
}

/// Starts a real Scheduler HTTP server on an OS-assigned port, with its
/// background loops running, and returns the port it bound. Intervals
/// are shortened so scenario tests don't need to wait out the spec's
/// production-sized defaults.
pub async fn spawn_scheduler() -> u16 {
    let mut config = SchedulerConfig::default();
    config.health_check_interval_ms = 200;
    config.health_check_timeout_ms = 150;
    config.recovery_period_ms = 100;
    config.state_save_period_ms = 60_000;
    config.state_file_path = format!("/tmp/orchestrator_test_state_{}.json", std::process::id());

    let state = Arc::new(SchedulerState::new(config));

    let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let app = scheduler::http::router(state.clone());

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Background loops run for the lifetime of the test process; the
    // token is intentionally never cancelled here.
    let shutdown = CancellationToken::new();
    tokio::spawn(scheduler::health::run(state.clone(), shutdown.child_token()));
    tokio::spawn(scheduler::recovery::run(state, shutdown));

    port
}
