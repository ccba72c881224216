use std::collections::{BTreeMap, HashMap, HashSet};

use super::parse::Snapshot;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoint {
    pub id: String,
    pub label: String,
    pub service: String,
    pub tenant: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Connection {
    pub id: String,
    pub source_id: String,
    pub target_id: String,
    pub connection_count: u64,
    pub status_counts: BTreeMap<String, u64>,
    pub trace_id: Option<String>,
}

impl Connection {
    pub fn error_ratio(&self) -> f64 {
        error_ratio(&self.status_counts)
    }
}

/// Share of requests answered with a status code of 400 or above.
pub fn error_ratio(status_counts: &BTreeMap<String, u64>) -> f64 {
    let total = status_counts.values().sum::<u64>();
    if total == 0 {
        return 0.0;
    }

    let errors = status_counts
        .iter()
        .filter(|(code, _)| code.parse::<u16>().is_ok_and(|code| code >= 400))
        .map(|(_, count)| *count)
        .sum::<u64>();
    errors as f64 / total as f64
}

/// Resolved topology: every connection refers to known endpoints.
#[derive(Clone, Debug, Default)]
pub struct Topology {
    endpoints: Vec<Endpoint>,
    index_by_id: HashMap<String, usize>,
    connections: Vec<Connection>,
    dropped_connections: usize,
    duplicate_endpoints: usize,
}

impl Topology {
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        let mut endpoints = Vec::with_capacity(snapshot.nodes.len());
        let mut index_by_id = HashMap::with_capacity(snapshot.nodes.len());
        let mut duplicate_endpoints = 0usize;

        for node in &snapshot.nodes {
            if index_by_id.contains_key(&node.id) {
                duplicate_endpoints += 1;
                continue;
            }

            index_by_id.insert(node.id.clone(), endpoints.len());
            endpoints.push(Endpoint {
                id: node.id.clone(),
                label: node.label.clone(),
                service: node.service.clone(),
                tenant: node.tenant.clone(),
            });
        }

        let mut connections = Vec::with_capacity(snapshot.edges.len());
        let mut seen_ids = HashSet::with_capacity(snapshot.edges.len());
        let mut dropped_connections = 0usize;

        for edge in &snapshot.edges {
            if !index_by_id.contains_key(&edge.source)
                || !index_by_id.contains_key(&edge.target)
                || !seen_ids.insert(edge.id.as_str())
            {
                dropped_connections += 1;
                continue;
            }

            connections.push(Connection {
                id: edge.id.clone(),
                source_id: edge.source.clone(),
                target_id: edge.target.clone(),
                connection_count: edge.connection_count,
                status_counts: edge.status_counts.clone(),
                trace_id: edge.trace_id.clone(),
            });
        }

        if dropped_connections > 0 || duplicate_endpoints > 0 {
            tracing::debug!(
                dropped_connections,
                duplicate_endpoints,
                "discarded unresolvable snapshot entries"
            );
        }

        Self {
            endpoints,
            index_by_id,
            connections,
            dropped_connections,
            duplicate_endpoints,
        }
    }

    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn endpoint(&self, id: &str) -> Option<&Endpoint> {
        self.index_by_id
            .get(id)
            .and_then(|&index| self.endpoints.get(index))
    }

    /// Edges skipped because an endpoint reference did not resolve or the
    /// edge id was already taken.
    pub fn dropped_connections(&self) -> usize {
        self.dropped_connections
    }

    pub fn duplicate_endpoints(&self) -> usize {
        self.duplicate_endpoints
    }

    pub fn tenants(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.endpoints
            .iter()
            .filter(|endpoint| seen.insert(endpoint.tenant.as_str()))
            .map(|endpoint| endpoint.tenant.as_str())
            .collect()
    }

    /// Tenant → sorted service name → endpoints in input order.
    pub fn services_by_tenant(&self) -> BTreeMap<&str, BTreeMap<&str, Vec<&Endpoint>>> {
        let mut grouped: BTreeMap<&str, BTreeMap<&str, Vec<&Endpoint>>> = BTreeMap::new();
        for endpoint in &self.endpoints {
            grouped
                .entry(endpoint.tenant.as_str())
                .or_default()
                .entry(endpoint.service.as_str())
                .or_default()
                .push(endpoint);
        }
        grouped
    }

    pub fn service_count(&self) -> usize {
        self.endpoints
            .iter()
            .map(|endpoint| (endpoint.tenant.as_str(), endpoint.service.as_str()))
            .collect::<HashSet<_>>()
            .len()
    }

    /// Source and target tenant of a connection when they differ.
    pub fn cross_tenant_pair(&self, connection: &Connection) -> Option<(&str, &str)> {
        let source = self.endpoint(&connection.source_id)?;
        let target = self.endpoint(&connection.target_id)?;
        (source.tenant != target.tenant).then_some((source.tenant.as_str(), target.tenant.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::super::parse::{EdgeRecord, NodeRecord};
    use super::*;

    fn node(id: &str, service: &str, tenant: &str) -> NodeRecord {
        NodeRecord {
            id: id.to_owned(),
            label: format!("/{id}"),
            service: service.to_owned(),
            tenant: tenant.to_owned(),
        }
    }

    fn edge(id: &str, source: &str, target: &str) -> EdgeRecord {
        EdgeRecord {
            id: id.to_owned(),
            source: source.to_owned(),
            target: target.to_owned(),
            connection_count: 1,
            status_counts: BTreeMap::new(),
            trace_id: None,
        }
    }

    fn sample() -> Snapshot {
        Snapshot {
            nodes: vec![
                node("a1", "api", "beta"),
                node("a2", "db", "beta"),
                node("b1", "web", "alpha"),
                node("a1", "dup", "gamma"),
            ],
            edges: vec![
                edge("e1", "a1", "a2"),
                edge("e2", "b1", "a1"),
                edge("e3", "b1", "missing"),
                edge("e1", "a2", "a1"),
            ],
        }
    }

    #[test]
    fn drops_dangling_and_duplicate_entries() {
        let topology = Topology::from_snapshot(&sample());

        assert_eq!(topology.endpoints().len(), 3);
        assert_eq!(topology.duplicate_endpoints(), 1);
        assert_eq!(topology.connections().len(), 2);
        assert_eq!(topology.dropped_connections(), 2);
        assert_eq!(topology.endpoint("a1").map(|e| e.service.as_str()), Some("api"));
    }

    #[test]
    fn tenants_keep_first_appearance_order() {
        let topology = Topology::from_snapshot(&sample());
        assert_eq!(topology.tenants(), vec!["beta", "alpha"]);
        assert_eq!(topology.service_count(), 3);
    }

    #[test]
    fn cross_tenant_pairs_are_directional() {
        let topology = Topology::from_snapshot(&sample());
        let connections = topology.connections();

        assert_eq!(topology.cross_tenant_pair(&connections[0]), None);
        assert_eq!(topology.cross_tenant_pair(&connections[1]), Some(("alpha", "beta")));
    }

    #[test]
    fn error_ratio_counts_client_and_server_errors() {
        let mut connection = Topology::from_snapshot(&sample()).connections()[0].clone();
        connection.status_counts =
            BTreeMap::from([("200".to_owned(), 6), ("404".to_owned(), 1), ("503".to_owned(), 1)]);
        assert!((connection.error_ratio() - 0.25).abs() < 1e-12);

        connection.status_counts.clear();
        assert_eq!(connection.error_ratio(), 0.0);
    }
}
