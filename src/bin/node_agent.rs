use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use orchestrator_core::agent::{router, AgentConfig, AgentState, CpuSampler, ProcessTable};
use orchestrator_core::runtime::{wait_for_shutdown_signal, Services};
use tokio::net::TcpListener;
use tracing::info;

/// Node Agent: supervises processes on this host and reports its status
/// to the scheduler.
#[derive(Parser, Debug)]
struct Args {
    /// Path (without extension) to a config file layered under defaults.
    #[arg(long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config = AgentConfig::load(args.config.as_deref())?;
    info!(port = config.port, "starting node agent");

    let table = ProcessTable::new();
    let state = AgentState {
        table: table.clone(),
        cpu_sampler: Arc::new(CpuSampler::new()),
        stop_grace: config.stop_grace(),
    };

    let listener = TcpListener::bind(("0.0.0.0", config.port))
        .await
        .with_context(|| format!("failed to bind port {}", config.port))?;

    let mut services = Services::new();

    services.spawn("reaper", move |shutdown| {
        orchestrator_core::agent::reaper::run(table, shutdown)
    });

    services.spawn("http", move |shutdown| async move {
        let app = router(state);
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await
            .context("node agent http server failed")
    });

    wait_for_shutdown_signal().await;
    info!("shutdown signal received, stopping node agent");
    services.shutdown().await
}
