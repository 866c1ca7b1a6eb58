//! Scheduler singleton state: node registry, workload table, desired
//! placement, and failed set behind one coarse lock (§5). Health, recovery,
//! persistence, and HTTP all operate through this type so the
//! lookup-decide-RPC-update sequence for any given workload is
//! serialized — a workload is never started on two nodes at once.

use std::collections::{HashMap, HashSet};
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::{Mutex, MutexGuard};
use tracing::{info, warn};

use crate::scheduler::client::NodeClient;
use crate::scheduler::config::SchedulerConfig;
use crate::scheduler::error::SchedulerError;
use crate::scheduler::placement::select_node;
use crate::scheduler::types::{
    node_key, DesiredPlacementEntry, Node, NodeStatus, Workload, WorkloadStatus,
};

pub struct Inner {
    pub nodes: HashMap<String, Node>,
    pub workloads: HashMap<String, Workload>,
    pub desired: HashMap<String, DesiredPlacementEntry>,
    pub failed: HashSet<String>,
    next_registration_order: u64,
    next_workload_seq: u64,
}

impl Inner {
    fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            workloads: HashMap::new(),
            desired: HashMap::new(),
            failed: HashSet::new(),
            next_registration_order: 0,
            next_workload_seq: 0,
        }
    }

    fn all_nodes(&self) -> Vec<Node> {
        self.nodes.values().cloned().collect()
    }
}

pub struct SchedulerState {
    inner: Mutex<Inner>,
    pub client: NodeClient,
    pub config: SchedulerConfig,
}

impl SchedulerState {
    pub fn new(config: SchedulerConfig) -> Self {
        let client = NodeClient::new(config.health_check_timeout(), config.rpc_timeout());
        Self {
            inner: Mutex::new(Inner::new()),
            client,
            config,
        }
    }

    pub(crate) async fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().await
    }

    // -- registry -----------------------------------------------------

    pub async fn register_node(&self, host: String, port: u16) -> Node {
        let mut inner = self.lock().await;
        let key = node_key(&host, port);

        if let Some(existing) = inner.nodes.get_mut(&key) {
            existing.status = NodeStatus::Unknown;
            existing.consecutive_failures = 0;
            return existing.clone();
        }

        let order = inner.next_registration_order;
        inner.next_registration_order += 1;
        let node = Node::new(host, port, order);
        inner.nodes.insert(key.clone(), node.clone());
        info!(node = %key, "registered node");
        node
    }

    pub async fn list_nodes(&self) -> Vec<Node> {
        let inner = self.lock().await;
        let mut nodes: Vec<Node> = inner.nodes.values().cloned().collect();
        nodes.sort_by_key(|n| n.registration_order);
        nodes
    }

    // -- workloads ------------------------------------------------------

    pub async fn submit_workload(&self, script_path: String) -> Result<Workload, SchedulerError> {
        if script_path.trim().is_empty() {
            return Err(SchedulerError::EmptyScriptPath);
        }

        let mut inner = self.lock().await;
        let id = next_workload_id(&mut inner);
        let workload = Workload::new(id.clone(), script_path, unix_seconds());
        inner.workloads.insert(id.clone(), workload.clone());

        self.try_place(&mut inner, &id, None).await;
        Ok(inner.workloads.get(&id).cloned().unwrap_or(workload))
    }

    pub async fn list_workloads(&self) -> Vec<Workload> {
        let inner = self.lock().await;
        let mut workloads: Vec<Workload> = inner.workloads.values().cloned().collect();
        workloads.sort_by(|a, b| a.submitted_unix.cmp(&b.submitted_unix));
        workloads
    }

    /// Explicit stop: removes the desired entry, issues a best-effort stop
    /// RPC, and marks the workload Stopped regardless of RPC outcome.
    pub async fn stop_workload(&self, id: &str) -> Result<(), SchedulerError> {
        let mut inner = self.lock().await;

        if !inner.workloads.contains_key(id) {
            return Err(SchedulerError::UnknownWorkload(id.to_string()));
        }

        if let Some(entry) = inner.desired.remove(id) {
            let client = self.client.clone();
            let (host, port, pid) = (entry.node_host.clone(), entry.node_port, entry.pid);
            if let Err(err) = client.stop(&host, port, pid).await {
                warn!(workload = %id, node = %entry.node_key(), error = %err, "best-effort stop rpc failed");
            }
        }

        inner.failed.remove(id);
        if let Some(workload) = inner.workloads.get_mut(id) {
            workload.status = WorkloadStatus::Stopped;
            workload.node_key = None;
            workload.pid = None;
        }

        Ok(())
    }

    /// Attempts placement for `workload_id` under the already-held lock,
    /// excluding `exclude_key` if given. Used both for fresh submissions
    /// and by the recovery engine. Updates workload status and
    /// DesiredPlacement in place; never panics on RPC failure.
    pub(crate) async fn try_place(
        &self,
        inner: &mut MutexGuard<'_, Inner>,
        workload_id: &str,
        exclude_key: Option<&str>,
    ) -> bool {
        let candidates = inner.all_nodes();
        let chosen = select_node(&candidates, self.config.cpu_placement_ceiling, exclude_key).cloned();

        let Some(node) = chosen else {
            return false;
        };

        let script_path = match inner.workloads.get(workload_id) {
            Some(w) => w.script_path.clone(),
            None => return false,
        };

        match self.client.start(&node.host, node.port, &script_path).await {
            Ok(response) => {
                inner.desired.insert(
                    workload_id.to_string(),
                    DesiredPlacementEntry {
                        workload_id: workload_id.to_string(),
                        node_host: node.host.clone(),
                        node_port: node.port,
                        pid: response.pid,
                        script_path: script_path.clone(),
                    },
                );
                if let Some(workload) = inner.workloads.get_mut(workload_id) {
                    workload.status = WorkloadStatus::Running;
                    workload.node_key = Some(node.key());
                    workload.pid = Some(response.pid);
                    workload.pending_retry_reset_node = Some(node.key());
                }
                inner.failed.remove(workload_id);
                info!(workload = %workload_id, node = %node.key(), pid = response.pid, "placed workload");
                true
            }
            Err(err) => {
                warn!(workload = %workload_id, node = %node.key(), error = %err, "placement rpc failed");
                false
            }
        }
    }
}

fn next_workload_id(inner: &mut Inner) -> String {
    let seq = inner.next_workload_seq;
    inner.next_workload_seq += 1;
    format!("workload_{}_{}", unix_seconds(), seq)
}

pub fn unix_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn register_node_is_idempotent_on_membership() {
        let state = SchedulerState::new(SchedulerConfig::default());
        state.register_node("localhost".to_string(), 8080).await;
        state.register_node("localhost".to_string(), 8080).await;
        assert_eq!(state.list_nodes().await.len(), 1);
    }

    #[tokio::test]
    async fn re_registration_resets_status_to_unknown() {
        let state = SchedulerState::new(SchedulerConfig::default());
        state.register_node("localhost".to_string(), 8080).await;
        {
            let mut inner = state.lock().await;
            let node = inner.nodes.get_mut("localhost:8080").unwrap();
            node.status = NodeStatus::Online;
            node.consecutive_failures = 1;
        }
        let node = state.register_node("localhost".to_string(), 8080).await;
        assert_eq!(node.status, NodeStatus::Unknown);
        assert_eq!(node.consecutive_failures, 0);
    }

    #[tokio::test]
    async fn submit_with_no_nodes_leaves_workload_pending() {
        let state = SchedulerState::new(SchedulerConfig::default());
        let workload = state.submit_workload("./work.sh".to_string()).await.unwrap();
        assert_eq!(workload.status, WorkloadStatus::Pending);
    }

    #[tokio::test]
    async fn submit_rejects_empty_script_path() {
        let state = SchedulerState::new(SchedulerConfig::default());
        let err = state.submit_workload(String::new()).await.unwrap_err();
        assert!(matches!(err, SchedulerError::EmptyScriptPath));
    }

    #[tokio::test]
    async fn stop_unknown_workload_errors() {
        let state = SchedulerState::new(SchedulerConfig::default());
        let err = state.stop_workload("nope").await.unwrap_err();
        assert!(matches!(err, SchedulerError::UnknownWorkload(_)));
    }
}
