use std::time::Duration;

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::agent::process::ProcessTable;

const SWEEP_INTERVAL: Duration = Duration::from_secs(5);

/// Background sweep that purges process-table records whose child has
/// exited. Runs even if no operator ever calls `stop`.
pub async fn run(table: ProcessTable, shutdown: CancellationToken) -> Result<()> {
    let mut interval = tokio::time::interval(SWEEP_INTERVAL);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => return Ok(()),
            _ = interval.tick() => {
                table.reap().await;
                debug!("reaper swept process table");
            }
        }
    }
}
