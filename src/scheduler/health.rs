//! Health monitor: periodic probing with a failure-threshold state
//! machine (§4.4). `run` drives the periodic loop; `probe_round` is also
//! reachable on demand from the HTTP surface (`POST /health/check`).

use std::time::{Duration, Instant};

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::scheduler::state::{unix_seconds, SchedulerState};
use crate::scheduler::types::NodeStatus;

pub async fn run(state: std::sync::Arc<SchedulerState>, shutdown: CancellationToken) -> Result<()> {
    let mut interval = tokio::time::interval(state.config.health_check_interval());
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => return Ok(()),
            _ = interval.tick() => {
                probe_round(&state).await;
            }
        }
    }
}

/// Probes every registered node concurrently, then applies all resulting
/// state-machine transitions under one lock acquisition so a single
/// probe round's effects are atomic with respect to recovery.
pub async fn probe_round(state: &SchedulerState) {
    let keys: Vec<(String, String, u16)> = {
        let inner = state.lock().await;
        inner
            .nodes
            .values()
            .map(|n| (n.key(), n.host.clone(), n.port))
            .collect()
    };

    let mut results = Vec::with_capacity(keys.len());
    for (key, host, port) in keys {
        let client = state.client.clone();
        let started = Instant::now();
        let outcome = client.probe(&host, port).await;
        let rtt = started.elapsed();
        results.push((key, outcome, rtt));
    }

    let mut inner = state.lock().await;
    let failure_threshold = state.config.failure_threshold;
    let mut rejoined = Vec::new();
    let mut newly_offline = Vec::new();

    for (key, outcome, rtt) in results {
        let Some(node) = inner.nodes.get_mut(&key) else {
            continue;
        };

        let ok = outcome.is_ok();
        let (new_status, new_failures, rejoin) =
            transition(node.status, ok, node.consecutive_failures, failure_threshold);

        node.status = new_status;
        node.consecutive_failures = new_failures;
        node.last_probe_unix = Some(unix_seconds());
        node.last_probe_rtt_ms = Some(rtt.as_millis() as u64);

        if let Ok(response) = outcome {
            node.cpu_percent = response.cpu_usage;
            node.memory_percent = response.memory_usage;
        }

        if rejoin {
            rejoined.push(key.clone());
        }
        if new_status == NodeStatus::Offline && node.consecutive_failures == failure_threshold {
            newly_offline.push(key.clone());
        }
    }

    for key in rejoined {
        info!(node = %key, "node rejoined after probe success");
    }

    for key in &newly_offline {
        warn!(node = %key, "node marked offline, failing bound workloads");
        let affected: Vec<String> = inner
            .desired
            .values()
            .filter(|d| &d.node_key() == key)
            .map(|d| d.workload_id.clone())
            .collect();
        for workload_id in affected {
            inner.failed.insert(workload_id.clone());
            if let Some(w) = inner.workloads.get_mut(&workload_id) {
                w.status = crate::scheduler::types::WorkloadStatus::Recovering;
            }
        }
    }

    // Any workload whose pending reset targets a node that just probed
    // healthy (Online, zero consecutive failures this tick) has its
    // retry_count cleared.
    let healthy_keys: std::collections::HashSet<String> = inner
        .nodes
        .values()
        .filter(|n| n.status == NodeStatus::Online && n.consecutive_failures == 0)
        .map(|n| n.key())
        .collect();

    for workload in inner.workloads.values_mut() {
        if let Some(target) = &workload.pending_retry_reset_node {
            if healthy_keys.contains(target) {
                workload.retry_count = 0;
                workload.pending_retry_reset_node = None;
            }
        }
    }
}

/// Pure state-machine step for one node, per the §4.4 transition table.
/// Returns (new_status, new_consecutive_failures, rejoin_event).
fn transition(
    current: NodeStatus,
    probe_ok: bool,
    consecutive_failures: u32,
    failure_threshold: u32,
) -> (NodeStatus, u32, bool) {
    match (current, probe_ok) {
        (NodeStatus::Unknown, true) => (NodeStatus::Online, 0, false),
        (NodeStatus::Unknown, false) => {
            let failures = consecutive_failures + 1;
            if failures >= failure_threshold {
                (NodeStatus::Offline, failures, false)
            } else {
                (NodeStatus::Degraded, failures, false)
            }
        }
        (NodeStatus::Online, true) => (NodeStatus::Online, 0, false),
        (NodeStatus::Online, false) => (NodeStatus::Degraded, 1, false),
        (NodeStatus::Degraded, true) => (NodeStatus::Online, 0, false),
        (NodeStatus::Degraded, false) => {
            let failures = consecutive_failures + 1;
            if failures >= failure_threshold {
                (NodeStatus::Offline, failures, false)
            } else {
                (NodeStatus::Degraded, failures, false)
            }
        }
        (NodeStatus::Offline, true) => (NodeStatus::Online, 0, true),
        (NodeStatus::Offline, false) => (NodeStatus::Offline, consecutive_failures + 1, false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_to_online_on_success() {
        assert_eq!(transition(NodeStatus::Unknown, true, 0, 2), (NodeStatus::Online, 0, false));
    }

    #[test]
    fn unknown_to_degraded_below_threshold() {
        assert_eq!(transition(NodeStatus::Unknown, false, 0, 2), (NodeStatus::Degraded, 1, false));
    }

    #[test]
    fn unknown_to_offline_at_threshold() {
        assert_eq!(transition(NodeStatus::Unknown, false, 1, 2), (NodeStatus::Offline, 2, false));
    }

    #[test]
    fn online_degrades_on_first_failure() {
        assert_eq!(transition(NodeStatus::Online, false, 0, 2), (NodeStatus::Degraded, 1, false));
    }

    #[test]
    fn degraded_recovers_to_online() {
        assert_eq!(transition(NodeStatus::Degraded, true, 1, 2), (NodeStatus::Online, 0, false));
    }

    #[test]
    fn degraded_to_offline_at_threshold() {
        assert_eq!(transition(NodeStatus::Degraded, false, 1, 2), (NodeStatus::Offline, 2, false));
    }

    #[test]
    fn offline_rejoins_on_success_and_raises_event() {
        assert_eq!(transition(NodeStatus::Offline, true, 5, 2), (NodeStatus::Online, 0, true));
    }

    #[test]
    fn offline_stays_offline_on_continued_failure() {
        assert_eq!(transition(NodeStatus::Offline, false, 5, 2), (NodeStatus::Offline, 6, false));
    }
}
