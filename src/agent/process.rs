//! Child-process table. The parent-child relationship is a kernel fact,
//! not an in-memory graph: this is a flat mapping keyed by PID, guarded
//! by a single lock, matching the supervisor's concurrency model.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use serde::{Deserialize, Serialize};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tokio::time::timeout;

use crate::agent::error::AgentError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessStatus {
    Running,
    Exited,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessRecord {
    pub pid: u32,
    pub command: String,
    pub start_time: u64,
    pub status: ProcessStatus,
}

struct Entry {
    record: ProcessRecord,
    child: Child,
}

/// Table of children this agent has spawned, guarded by a single mutex.
/// `start`, `stop`, `reap`, and `snapshot` all take it.
#[derive(Clone)]
pub struct ProcessTable {
    inner: Arc<Mutex<HashMap<u32, Entry>>>,
}

impl ProcessTable {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Spawns `script_path` directly (no shell indirection, no
    /// canonicalization or existence check). If the path is bogus the
    /// exec fails inside the child and it exits immediately; the next
    /// reaper sweep purges the resulting record.
    pub async fn start(&self, script_path: String) -> Result<u32, AgentError> {
        if script_path.trim().is_empty() {
            return Err(AgentError::EmptyScriptPath);
        }

        let child = Command::new(&script_path)
            .kill_on_drop(false)
            .spawn()
            .map_err(AgentError::SpawnFailed)?;

        let pid = child.id().ok_or_else(|| {
            AgentError::SpawnFailed(std::io::Error::other(
                "child process exited before its pid could be observed",
            ))
        })?;

        let record = ProcessRecord {
            pid,
            command: script_path,
            start_time: unix_seconds(SystemTime::now()),
            status: ProcessStatus::Running,
        };

        let mut table = self.inner.lock().await;
        table.insert(pid, Entry { record, child });
        Ok(pid)
    }

    /// Sends SIGTERM, waits up to `grace` for the child to exit, then
    /// sends SIGKILL if it is still alive. Removes the record on success;
    /// does not block on the kill's actual effect beyond `grace` — the
    /// reaper completes cleanup on its next sweep.
    pub async fn stop(&self, pid: u32, grace: Duration) -> Result<(), AgentError> {
        let mut entry = {
            let mut table = self.inner.lock().await;
            table.remove(&pid).ok_or(AgentError::UnknownPid(pid))?
        };

        if let Err(err) = signal::kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
            if err != nix::errno::Errno::ESRCH {
                // Put the record back; the process is still there, we just
                // couldn't signal it.
                let mut table = self.inner.lock().await;
                table.insert(pid, entry);
                return Err(AgentError::SignalFailed(err));
            }
        }

        if timeout(grace, entry.child.wait()).await.is_err() {
            let _ = entry.child.start_kill();
        }

        Ok(())
    }

    pub async fn snapshot(&self) -> Vec<ProcessRecord> {
        let table = self.inner.lock().await;
        table.values().map(|e| e.record.clone()).collect()
    }

    /// Drops records whose child has exited. Safe to call even if no
    /// process ever exited; idempotent.
    pub async fn reap(&self) {
        let mut table = self.inner.lock().await;
        table.retain(|_, entry| !matches!(entry.child.try_wait(), Ok(Some(_)) | Err(_)));
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }
}

impl Default for ProcessTable {
    fn default() -> Self {
        Self::new()
    }
}

fn unix_seconds(t: SystemTime) -> u64 {
    t.duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
