//! Recovery engine: bounded-retry re-placement for workloads in the
//! failed set, plus first-placement retries for workloads still Pending
//! after a submission found no candidate node (§4.5).

use std::sync::Arc;

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::scheduler::state::SchedulerState;
use crate::scheduler::types::WorkloadStatus;

pub async fn run(state: Arc<SchedulerState>, shutdown: CancellationToken) -> Result<()> {
    let mut interval = tokio::time::interval(state.config.recovery_period());
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => return Ok(()),
            _ = interval.tick() => {
                recovery_tick(&state).await;
            }
        }
    }
}

async fn recovery_tick(state: &SchedulerState) {
    let mut inner = state.lock().await;
    let max_retries = state.config.max_retries;

    let failed_ids: Vec<String> = inner.failed.iter().cloned().collect();
    for workload_id in failed_ids {
        let retry_count = match inner.workloads.get(&workload_id) {
            Some(w) => w.retry_count,
            None => {
                inner.failed.remove(&workload_id);
                continue;
            }
        };

        if retry_count >= max_retries {
            inner.failed.remove(&workload_id);
            if let Some(w) = inner.workloads.get_mut(&workload_id) {
                w.status = WorkloadStatus::Failed;
            }
            warn!(workload = %workload_id, "recovery retries exhausted, workload terminally failed");
            continue;
        }

        let exclude = inner.desired.get(&workload_id).map(|d| d.node_key());
        let placed = state
            .try_place(&mut inner, &workload_id, exclude.as_deref())
            .await;

        if placed {
            info!(workload = %workload_id, "recovered workload onto new node");
        } else if let Some(w) = inner.workloads.get_mut(&workload_id) {
            w.retry_count += 1;
        }
    }

    let pending_ids: Vec<String> = inner
        .workloads
        .values()
        .filter(|w| w.status == WorkloadStatus::Pending && !inner.desired.contains_key(&w.id))
        .map(|w| w.id.clone())
        .collect();

    for workload_id in pending_ids {
        let retry_count = inner
            .workloads
            .get(&workload_id)
            .map(|w| w.retry_count)
            .unwrap_or(0);

        if retry_count >= max_retries {
            if let Some(w) = inner.workloads.get_mut(&workload_id) {
                w.status = WorkloadStatus::Failed;
            }
            warn!(workload = %workload_id, "submission retries exhausted, workload terminally failed");
            continue;
        }

        let placed = state.try_place(&mut inner, &workload_id, None).await;
        if !placed {
            if let Some(w) = inner.workloads.get_mut(&workload_id) {
                w.retry_count += 1;
            }
        }
    }
}
