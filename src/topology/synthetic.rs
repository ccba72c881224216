use std::collections::BTreeMap;

use crate::util::stable_unit;

use super::parse::{EdgeRecord, NodeRecord, Snapshot};

const TENANT_NAMES: [&str; 12] = [
    "core", "billing", "identity", "catalog", "payments", "search", "shipping", "analytics",
    "support", "media", "ledger", "notify",
];
const SERVICE_NAMES: [&str; 6] = ["gateway", "api", "worker", "store", "cache", "events"];
const ROUTES: [&str; 6] = ["list", "get", "create", "update", "sync", "health"];

/// Deterministic demo topology with `tenants` tenants.
///
/// The first tenant acts as a hub: every other tenant sends part of its
/// traffic there, so it ends up as the central tenant of the layout.
pub fn synthetic_snapshot(tenants: usize, seed: u64) -> Snapshot {
    let roll = |key: String| stable_unit(&format!("{seed}:{key}"));

    let mut nodes = Vec::new();
    let mut by_tenant: Vec<Vec<String>> = Vec::with_capacity(tenants);

    for tenant_index in 0..tenants {
        let tenant = tenant_name(tenant_index);
        let service_count = 1 + (roll(format!("services:{tenant}")) * 5.0) as usize;
        let mut tenant_endpoints = Vec::new();

        for service in SERVICE_NAMES.iter().take(service_count) {
            let endpoint_count = 1 + (roll(format!("endpoints:{tenant}:{service}")) * 4.0) as usize;
            for route in ROUTES.iter().take(endpoint_count) {
                let id = format!("{tenant}.{service}.{route}");
                nodes.push(NodeRecord {
                    id: id.clone(),
                    label: format!("/{service}/{route}"),
                    service: (*service).to_owned(),
                    tenant: tenant.clone(),
                });
                tenant_endpoints.push(id);
            }
        }
        by_tenant.push(tenant_endpoints);
    }

    let mut edges = Vec::new();
    for (tenant_index, endpoints) in by_tenant.iter().enumerate() {
        for (endpoint_index, source) in endpoints.iter().enumerate() {
            if let Some(target) = endpoints.get(endpoint_index + 1) {
                edges.push(make_edge(&roll, source, target, edges.len()));
            }

            let hub_roll = roll(format!("hub:{source}"));
            if tenant_index > 0 && hub_roll < 0.35 {
                let hub = &by_tenant[0];
                let target = &hub[(hub_roll * 1000.0) as usize % hub.len()];
                edges.push(make_edge(&roll, source, target, edges.len()));
            }

            let peer_roll = roll(format!("peer:{source}"));
            if tenants > 2 && peer_roll < 0.12 {
                let peer_index = 1 + (tenant_index + 1) % (tenants - 1);
                let peer = &by_tenant[peer_index];
                if peer_index != tenant_index && !peer.is_empty() {
                    let target = &peer[(peer_roll * 1000.0) as usize % peer.len()];
                    edges.push(make_edge(&roll, source, target, edges.len()));
                }
            }
        }
    }

    Snapshot { nodes, edges }
}

fn tenant_name(index: usize) -> String {
    let base = TENANT_NAMES[index % TENANT_NAMES.len()];
    match index / TENANT_NAMES.len() {
        0 => base.to_owned(),
        round => format!("{base}-{round}"),
    }
}

fn make_edge(roll: &impl Fn(String) -> f64, source: &str, target: &str, index: usize) -> EdgeRecord {
    let volume = 1 + (roll(format!("volume:{source}:{target}")) * 40.0) as u64;
    let errors = (volume as f64 * roll(format!("errors:{source}:{target}")) * 0.2) as u64;

    let mut status_counts = BTreeMap::from([("200".to_owned(), volume - errors)]);
    if errors > 0 {
        status_counts.insert("500".to_owned(), errors);
    }

    EdgeRecord {
        id: format!("edge-{index}"),
        source: source.to_owned(),
        target: target.to_owned(),
        connection_count: volume,
        status_counts,
        trace_id: Some(format!("trace-{}", index % 7)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::Topology;

    #[test]
    fn synthetic_snapshot_is_deterministic() {
        assert_eq!(synthetic_snapshot(5, 7), synthetic_snapshot(5, 7));
    }

    #[test]
    fn synthetic_edges_always_resolve() {
        let snapshot = synthetic_snapshot(14, 3);
        let topology = Topology::from_snapshot(&snapshot);

        assert_eq!(topology.dropped_connections(), 0);
        assert_eq!(topology.tenants().len(), 14);
        assert!(topology.tenants().contains(&"core-1"));
    }

    #[test]
    fn empty_request_gives_empty_snapshot() {
        let snapshot = synthetic_snapshot(0, 1);
        assert!(snapshot.nodes.is_empty());
        assert!(snapshot.edges.is_empty());
    }
}
