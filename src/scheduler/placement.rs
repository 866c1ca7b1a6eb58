//! Placement policy: pure functions over a node slice, kept free of
//! locking concerns so they're trivial to unit test.

use crate::scheduler::types::{Node, NodeStatus};

/// Selects the lowest-CPU% node below `cpu_ceiling`, ties broken by
/// registration order. Tries Online-only candidates first; falls back to
/// Online-or-Degraded only if the first pass finds nothing (Degraded is a
/// placement fallback, never preferred over an Online node).
///
/// `exclude_key`, when set, drops that node from consideration unless
/// doing so would leave no candidate at all — in which case it is let
/// back in (a recovery attempt must prefer *any* healthy node over none).
pub fn select_node<'a>(
    nodes: &'a [Node],
    cpu_ceiling: f64,
    exclude_key: Option<&str>,
) -> Option<&'a Node> {
    let online = best_candidate(nodes, cpu_ceiling, exclude_key, &[NodeStatus::Online]);
    if online.is_some() {
        return online;
    }

    let fallback = best_candidate(
        nodes,
        cpu_ceiling,
        exclude_key,
        &[NodeStatus::Online, NodeStatus::Degraded],
    );
    if fallback.is_some() {
        return fallback;
    }

    // Excluding the last-bound node left nothing; let it compete after all.
    if exclude_key.is_some() {
        let online_unrestricted = best_candidate(nodes, cpu_ceiling, None, &[NodeStatus::Online]);
        if online_unrestricted.is_some() {
            return online_unrestricted;
        }
        return best_candidate(
            nodes,
            cpu_ceiling,
            None,
            &[NodeStatus::Online, NodeStatus::Degraded],
        );
    }

    None
}

fn best_candidate<'a>(
    nodes: &'a [Node],
    cpu_ceiling: f64,
    exclude_key: Option<&str>,
    eligible: &[NodeStatus],
) -> Option<&'a Node> {
    nodes
        .iter()
        .filter(|n| eligible.contains(&n.status))
        .filter(|n| n.cpu_percent < cpu_ceiling)
        .filter(|n| exclude_key != Some(n.key().as_str()))
        .min_by(|a, b| {
            a.cpu_percent
                .partial_cmp(&b.cpu_percent)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.registration_order.cmp(&b.registration_order))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(host: &str, status: NodeStatus, cpu: f64, order: u64) -> Node {
        Node {
            host: host.to_string(),
            port: 8080,
            status,
            cpu_percent: cpu,
            memory_percent: 0.0,
            consecutive_failures: 0,
            last_probe_unix: None,
            last_probe_rtt_ms: None,
            registration_order: order,
        }
    }

    #[test]
    fn picks_lowest_cpu_online_node() {
        let nodes = vec![
            node("a", NodeStatus::Online, 50.0, 0),
            node("b", NodeStatus::Online, 20.0, 1),
        ];
        let selected = select_node(&nodes, 80.0, None).unwrap();
        assert_eq!(selected.host, "b");
    }

    #[test]
    fn ties_broken_by_registration_order() {
        let nodes = vec![
            node("a", NodeStatus::Online, 20.0, 1),
            node("b", NodeStatus::Online, 20.0, 0),
        ];
        let selected = select_node(&nodes, 80.0, None).unwrap();
        assert_eq!(selected.host, "b");
    }

    #[test]
    fn excludes_nodes_at_or_above_ceiling() {
        let nodes = vec![node("a", NodeStatus::Online, 80.0, 0)];
        assert!(select_node(&nodes, 80.0, None).is_none());
    }

    #[test]
    fn falls_back_to_degraded_when_no_online_candidate() {
        let nodes = vec![node("a", NodeStatus::Degraded, 10.0, 0)];
        let selected = select_node(&nodes, 80.0, None).unwrap();
        assert_eq!(selected.host, "a");
    }

    #[test]
    fn never_prefers_degraded_over_online() {
        let nodes = vec![
            node("a", NodeStatus::Degraded, 5.0, 0),
            node("b", NodeStatus::Online, 70.0, 1),
        ];
        let selected = select_node(&nodes, 80.0, None).unwrap();
        assert_eq!(selected.host, "b");
    }

    #[test]
    fn excludes_last_bound_node_unless_only_candidate() {
        let nodes = vec![
            node("a", NodeStatus::Online, 10.0, 0),
            node("b", NodeStatus::Online, 50.0, 1),
        ];
        let selected = select_node(&nodes, 80.0, Some("a:8080")).unwrap();
        assert_eq!(selected.host, "b");
    }

    #[test]
    fn readmits_excluded_node_when_it_is_the_only_candidate() {
        let nodes = vec![node("a", NodeStatus::Online, 10.0, 0)];
        let selected = select_node(&nodes, 80.0, Some("a:8080")).unwrap();
        assert_eq!(selected.host, "a");
    }

    #[test]
    fn no_candidate_when_registry_empty() {
        let nodes: Vec<Node> = Vec::new();
        assert!(select_node(&nodes, 80.0, None).is_none());
    }
}
