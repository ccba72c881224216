//! Greedy proximity clustering of tenants.
//!
//! Starting from the busiest tenant, unassigned tenants are attached one at a
//! time to whichever existing cluster they talk to the most. Tenants with no
//! traffic to any cluster open a new one.

use std::collections::{BTreeMap, HashMap};

use crate::topology::Topology;

/// Per-tenant traffic totals and symmetric inter-tenant connection counts.
#[derive(Clone, Debug, Default)]
pub struct TenantTraffic {
    totals: HashMap<String, u64>,
    between: HashMap<(String, String), u64>,
}

impl TenantTraffic {
    pub fn from_topology(topology: &Topology) -> Self {
        let mut traffic = Self::default();
        for tenant in topology.tenants() {
            traffic.totals.entry(tenant.to_owned()).or_insert(0);
        }

        for connection in topology.connections() {
            let (Some(source), Some(target)) = (
                topology.endpoint(&connection.source_id),
                topology.endpoint(&connection.target_id),
            ) else {
                continue;
            };

            let count = connection.connection_count;
            *traffic.totals.entry(source.tenant.clone()).or_insert(0) += count;
            if source.tenant != target.tenant {
                *traffic.totals.entry(target.tenant.clone()).or_insert(0) += count;
                traffic.add_between(&source.tenant, &target.tenant, count);
            }
        }

        traffic
    }

    pub fn add_between(&mut self, a: &str, b: &str, count: u64) {
        *self.between.entry(Self::pair_key(a, b)).or_insert(0) += count;
    }

    pub fn set_total(&mut self, tenant: &str, total: u64) {
        self.totals.insert(tenant.to_owned(), total);
    }

    pub fn total(&self, tenant: &str) -> u64 {
        self.totals.get(tenant).copied().unwrap_or(0)
    }

    pub fn between(&self, a: &str, b: &str) -> u64 {
        self.between.get(&Self::pair_key(a, b)).copied().unwrap_or(0)
    }

    fn pair_key(a: &str, b: &str) -> (String, String) {
        if a <= b {
            (a.to_owned(), b.to_owned())
        } else {
            (b.to_owned(), a.to_owned())
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TenantClusters {
    /// Clusters in creation order; each sorted by descending tenant total.
    pub clusters: Vec<Vec<String>>,
    /// Tenant with the largest total traffic, seeded into the first cluster.
    pub central: Option<String>,
}

impl TenantClusters {
    pub fn ordered_tenants(&self) -> impl Iterator<Item = &str> {
        self.clusters.iter().flatten().map(String::as_str)
    }

    pub fn membership(&self) -> BTreeMap<&str, usize> {
        self.clusters
            .iter()
            .enumerate()
            .flat_map(|(index, members)| members.iter().map(move |tenant| (tenant.as_str(), index)))
            .collect()
    }
}

/// Partitions `tenants` into proximity clusters.
///
/// Ties are broken by input order: the first tenant with the maximum total is
/// central, and among equally strong candidates the earliest unassigned
/// tenant and earliest cluster win.
pub fn cluster_tenants(tenants: &[&str], traffic: &TenantTraffic) -> TenantClusters {
    let mut unique = Vec::with_capacity(tenants.len());
    for tenant in tenants {
        if !unique.contains(tenant) {
            unique.push(*tenant);
        }
    }

    let Some(central) = unique
        .iter()
        .copied()
        .reduce(|best, tenant| if traffic.total(tenant) > traffic.total(best) { tenant } else { best })
    else {
        return TenantClusters::default();
    };

    let mut clusters: Vec<Vec<&str>> = vec![vec![central]];
    let mut unassigned = unique
        .iter()
        .copied()
        .filter(|tenant| *tenant != central)
        .collect::<Vec<_>>();

    while !unassigned.is_empty() {
        let mut best: Option<(usize, usize, u64)> = None;
        for (candidate_index, tenant) in unassigned.iter().enumerate() {
            for (cluster_index, members) in clusters.iter().enumerate() {
                let strength = members
                    .iter()
                    .map(|member| traffic.between(tenant, member))
                    .sum::<u64>();
                if strength > 0 && best.is_none_or(|(_, _, current)| strength > current) {
                    best = Some((candidate_index, cluster_index, strength));
                }
            }
        }

        match best {
            Some((candidate_index, cluster_index, _)) => {
                let tenant = unassigned.remove(candidate_index);
                clusters[cluster_index].push(tenant);
            }
            None => {
                let tenant = unassigned.remove(0);
                clusters.push(vec![tenant]);
            }
        }
    }

    let clusters = clusters
        .into_iter()
        .map(|mut members| {
            members.sort_by(|a, b| traffic.total(b).cmp(&traffic.total(a)));
            members.into_iter().map(str::to_owned).collect()
        })
        .collect();

    TenantClusters {
        clusters,
        central: Some(central.to_owned()),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    use super::*;

    fn traffic(totals: &[(&str, u64)], between: &[(&str, &str, u64)]) -> TenantTraffic {
        let mut traffic = TenantTraffic::default();
        for (tenant, total) in totals {
            traffic.set_total(tenant, *total);
        }
        for (a, b, count) in between {
            traffic.add_between(a, b, *count);
        }
        traffic
    }

    #[test]
    fn empty_input_gives_no_clusters() {
        assert_eq!(cluster_tenants(&[], &TenantTraffic::default()), TenantClusters::default());
    }

    #[test]
    fn busiest_tenant_seeds_first_cluster() {
        let traffic = traffic(
            &[("a", 5), ("b", 50), ("c", 7)],
            &[("a", "b", 5), ("b", "c", 7)],
        );
        let result = cluster_tenants(&["a", "b", "c"], &traffic);

        assert_eq!(result.central.as_deref(), Some("b"));
        assert_eq!(result.clusters, vec![vec!["b", "c", "a"]]);
    }

    #[test]
    fn central_ties_resolve_to_input_order() {
        let traffic = traffic(&[("x", 10), ("y", 10)], &[]);
        let result = cluster_tenants(&["y", "x"], &traffic);
        assert_eq!(result.central.as_deref(), Some("y"));
    }

    #[test]
    fn disconnected_tenants_open_new_clusters() {
        let traffic = traffic(
            &[("hub", 30), ("near", 10), ("island", 8), ("islander", 8)],
            &[("hub", "near", 10), ("island", "islander", 8)],
        );
        let result = cluster_tenants(&["hub", "near", "island", "islander"], &traffic);

        assert_eq!(
            result.clusters,
            vec![vec!["hub", "near"], vec!["island", "islander"]]
        );
        assert_eq!(result.membership().get("islander"), Some(&1));
    }

    #[test]
    fn strongest_link_wins_across_clusters() {
        let traffic = traffic(
            &[("hub", 100), ("lonely", 1), ("friend", 60), ("joiner", 40)],
            &[("hub", "friend", 3), ("lonely", "joiner", 1), ("friend", "joiner", 20)],
        );
        let result = cluster_tenants(&["hub", "lonely", "friend", "joiner"], &traffic);

        assert_eq!(result.clusters, vec![vec!["hub", "friend", "joiner", "lonely"]]);
    }

    #[test]
    fn traffic_from_topology_counts_both_sides() {
        use crate::topology::{EdgeRecord, NodeRecord, Snapshot};

        let node = |id: &str, tenant: &str| NodeRecord {
            id: id.to_owned(),
            label: id.to_owned(),
            service: "svc".to_owned(),
            tenant: tenant.to_owned(),
        };
        let edge = |id: &str, source: &str, target: &str, count: u64| EdgeRecord {
            id: id.to_owned(),
            source: source.to_owned(),
            target: target.to_owned(),
            connection_count: count,
            status_counts: BTreeMap::new(),
            trace_id: None,
        };
        let snapshot = Snapshot {
            nodes: vec![node("a", "t1"), node("b", "t1"), node("c", "t2")],
            edges: vec![edge("1", "a", "b", 4), edge("2", "a", "c", 3), edge("3", "c", "b", 2)],
        };
        let traffic = TenantTraffic::from_topology(&Topology::from_snapshot(&snapshot));

        assert_eq!(traffic.total("t1"), 9);
        assert_eq!(traffic.total("t2"), 5);
        assert_eq!(traffic.between("t1", "t2"), 5);
        assert_eq!(traffic.between("t2", "t1"), 5);
    }

    proptest! {
        #[test]
        fn clusters_partition_the_tenant_set(
            count in 0usize..24,
            totals in prop::collection::vec(0u64..50, 24),
            links in prop::collection::vec((0usize..24, 0usize..24, 0u64..20), 0..60),
        ) {
            let names = (0..count).map(|index| format!("t{index}")).collect::<Vec<_>>();
            let mut traffic = TenantTraffic::default();
            for (name, total) in names.iter().zip(&totals) {
                traffic.set_total(name, *total);
            }
            for (a, b, weight) in links {
                if a < count && b < count && a != b {
                    traffic.add_between(&names[a], &names[b], weight);
                }
            }

            let refs = names.iter().map(String::as_str).collect::<Vec<_>>();
            let result = cluster_tenants(&refs, &traffic);

            let flattened = result.ordered_tenants().collect::<Vec<_>>();
            let unique = flattened.iter().copied().collect::<HashSet<_>>();
            prop_assert_eq!(flattened.len(), count);
            prop_assert_eq!(unique, refs.iter().copied().collect::<HashSet<_>>());
            prop_assert!(result.clusters.len() <= count);

            if let Some(central) = &result.central {
                let holders = result
                    .clusters
                    .iter()
                    .filter(|members| members.contains(central))
                    .count();
                prop_assert_eq!(holders, 1);
            }
        }
    }
}
