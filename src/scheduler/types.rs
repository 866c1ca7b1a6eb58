//! Wire and in-memory record types shared across the registry, placement,
//! health, recovery, and persistence modules.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    Online,
    Degraded,
    Offline,
    Unknown,
}

impl Default for NodeStatus {
    fn default() -> Self {
        NodeStatus::Unknown
    }
}

/// Identity is the (host, port) pair; `key()` renders it for use as a map
/// key and in log output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub host: String,
    pub port: u16,
    pub status: NodeStatus,
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub consecutive_failures: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_probe_unix: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_probe_rtt_ms: Option<u64>,
    /// Monotonic registration order, used as the placement tie-break.
    pub registration_order: u64,
}

impl Node {
    pub fn new(host: String, port: u16, registration_order: u64) -> Self {
        Self {
            host,
            port,
            status: NodeStatus::Unknown,
            cpu_percent: 0.0,
            memory_percent: 0.0,
            consecutive_failures: 0,
            last_probe_unix: None,
            last_probe_rtt_ms: None,
            registration_order,
        }
    }

    pub fn key(&self) -> String {
        node_key(&self.host, self.port)
    }
}

pub fn node_key(host: &str, port: u16) -> String {
    format!("{host}:{port}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkloadStatus {
    Pending,
    Running,
    Stopped,
    Failed,
    Recovering,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workload {
    pub id: String,
    pub script_path: String,
    pub submitted_unix: u64,
    pub status: WorkloadStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    pub retry_count: u32,
    /// Set once a recovery re-placement succeeds; cleared (alongside
    /// resetting `retry_count` to 0) on that node's next healthy probe.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_retry_reset_node: Option<String>,
}

impl Workload {
    pub fn new(id: String, script_path: String, submitted_unix: u64) -> Self {
        Self {
            id,
            script_path,
            submitted_unix,
            status: WorkloadStatus::Pending,
            node_key: None,
            pid: None,
            retry_count: 0,
            pending_retry_reset_node: None,
        }
    }
}

/// A binding the scheduler believes should currently be running.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DesiredPlacementEntry {
    pub workload_id: String,
    pub node_host: String,
    pub node_port: u16,
    pub pid: u32,
    pub script_path: String,
}

impl DesiredPlacementEntry {
    pub fn node_key(&self) -> String {
        node_key(&self.node_host, self.node_port)
    }
}
