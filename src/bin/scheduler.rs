use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use orchestrator_core::runtime::{wait_for_shutdown_signal, Services};
use orchestrator_core::scheduler::{config::SchedulerConfig, health, http, persistence, recovery, SchedulerState};
use tokio::net::TcpListener;
use tracing::info;

/// Scheduler: places workloads on registered Node Agents and keeps them
/// running under node failure.
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
    let config = SchedulerConfig::load(args.config.as_deref())?;
    info!(port = config.port, state_file = %config.state_file_path, "starting scheduler");

    let state = Arc::new(SchedulerState::new(config.clone()));
    persistence::load(&state).await?;

    let listener = TcpListener::bind((config.host.as_str(), config.port))
        .await
        .with_context(|| format!("failed to bind {}:{}", config.host, config.port))?;

    let mut services = Services::new();

    {
        let state = state.clone();
        services.spawn("health", move |shutdown| health::run(state, shutdown));
    }
    {
        let state = state.clone();
        services.spawn("recovery", move |shutdown| recovery::run(state, shutdown));
    }
    {
        let state = state.clone();
        services.spawn("persistence", move |shutdown| persistence::run(state, shutdown));
    }
    {
        let state = state.clone();
        services.spawn("http", move |shutdown| async move {
            let app = http::router(state);
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { shutdown.cancelled().await })
                .await
                .context("scheduler http server failed")
        });
    }

    wait_for_shutdown_signal().await;
    info!("shutdown signal received, stopping scheduler");
    services.shutdown().await
}
