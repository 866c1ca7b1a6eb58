//! Whole-file state persistence (§4.6, §6.3). The write is serialized to
//! an in-memory snapshot under the scheduler lock, then the lock is
//! dropped before the blocking filesystem work runs — only the
//! serialization step is covered by the lock, not the syscall.

use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::scheduler::state::SchedulerState;
use crate::scheduler::types::{DesiredPlacementEntry, Workload};

#[derive(Debug, Serialize, Deserialize, Default)]
struct StateFile {
    #[serde(default)]
    workloads: Vec<Workload>,
    #[serde(default)]
    desired: Vec<DesiredPlacementEntry>,
}

pub async fn run(state: std::sync::Arc<SchedulerState>, shutdown: CancellationToken) -> Result<()> {
    let mut interval = tokio::time::interval(state.config.state_save_period());
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                if let Err(err) = save(&state).await {
                    error!(error = %err, "final state save failed on shutdown");
                }
                return Ok(());
            }
            _ = interval.tick() => {
                if let Err(err) = save(&state).await {
                    error!(error = %err, "periodic state save failed");
                }
            }
        }
    }
}

pub async fn save(state: &SchedulerState) -> Result<()> {
    let snapshot = {
        let inner = state.lock().await;
        StateFile {
            workloads: inner.workloads.values().cloned().collect(),
            desired: inner.desired.values().cloned().collect(),
        }
    };

    let path = PathBuf::from(&state.config.state_file_path);
    tokio::task::spawn_blocking(move || write_atomically(&path, &snapshot)).await??;
    Ok(())
}

fn write_atomically(path: &Path, snapshot: &StateFile) -> Result<()> {
    let json = serde_json::to_vec_pretty(snapshot)?;
    let tmp_path = path.with_extension(format!("json.tmp-{}", std::process::id()));
    std::fs::write(&tmp_path, &json)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Seeds in-memory workload and desired-placement tables from disk, if a
/// state file is present. Does not re-issue start RPCs or re-place
/// anything — loaded workloads are trusted as already running on their
/// recorded node until the next health probe or recovery tick says
/// otherwise.
pub async fn load(state: &SchedulerState) -> Result<()> {
    let path = PathBuf::from(&state.config.state_file_path);
    if !path.exists() {
        return Ok(());
    }

    let content = tokio::fs::read_to_string(&path).await?;
    let parsed: StateFile = match serde_json::from_str(&content) {
        Ok(parsed) => parsed,
        Err(err) => {
            error!(error = %err, "state file present but unreadable, starting with empty state");
            return Ok(());
        }
    };

    let mut inner = state.lock().await;
    for workload in parsed.workloads {
        inner.workloads.insert(workload.id.clone(), workload);
    }
    for entry in parsed.desired {
        inner.desired.insert(entry.workload_id.clone(), entry);
    }

    info!(
        workloads = inner.workloads.len(),
        desired = inner.desired.len(),
        "loaded scheduler state from disk"
    );
    Ok(())
}
