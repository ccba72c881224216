use std::collections::BTreeSet;

use crate::topology::Topology;

use super::build::Scene;
use super::key::LogicalKey;

/// Keys of the primitives taking part in `selected_trace`.
///
/// Covers the endpoints of every connection tagged with the trace, their
/// service labels and tenants, the arrows of intra-tenant hops, and the
/// magistral segments and branches carrying cross-tenant hops. Only keys
/// present in `scene` are returned. No selection gives an empty set.
pub fn relevant_keys(
    selected_trace: Option<&str>,
    topology: &Topology,
    scene: &Scene,
) -> BTreeSet<LogicalKey> {
    let Some(trace) = selected_trace else {
        return BTreeSet::new();
    };

    let mut keys = BTreeSet::new();
    let mut tenant_pairs = BTreeSet::new();

    for connection in topology
        .connections()
        .iter()
        .filter(|connection| connection.trace_id.as_deref() == Some(trace))
    {
        let (Some(source), Some(target)) = (
            topology.endpoint(&connection.source_id),
            topology.endpoint(&connection.target_id),
        ) else {
            continue;
        };

        for endpoint in [source, target] {
            keys.insert(LogicalKey::Endpoint(endpoint.id.clone()));
            keys.insert(LogicalKey::ServiceLabel {
                tenant: endpoint.tenant.clone(),
                service: endpoint.service.clone(),
            });
            keys.insert(LogicalKey::TenantSphere(endpoint.tenant.clone()));
            keys.insert(LogicalKey::TenantLabel(endpoint.tenant.clone()));
        }

        if source.tenant == target.tenant {
            keys.insert(LogicalKey::Arrow(connection.id.clone()));
            continue;
        }

        tenant_pairs.insert((source.tenant.as_str(), target.tenant.as_str()));
        keys.insert(LogicalKey::Branch {
            tenant: source.tenant.clone(),
            other: target.tenant.clone(),
            endpoint: source.id.clone(),
        });
        keys.insert(LogicalKey::Branch {
            tenant: target.tenant.clone(),
            other: source.tenant.clone(),
            endpoint: target.id.clone(),
        });
    }

    keys.extend(
        scene
            .keys()
            .filter(|key| match key {
                LogicalKey::MagistralSegment { source, target, .. } => {
                    tenant_pairs.contains(&(source.as_str(), target.as_str()))
                }
                _ => false,
            })
            .cloned(),
    );

    keys.retain(|key| scene.contains(key));
    keys
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::layout::Layout;
    use crate::magistral;
    use crate::scene::PrimitiveKind;
    use crate::settings::Settings;
    use crate::topology::{EdgeRecord, NodeRecord, Snapshot};

    fn fixture() -> (Topology, Scene) {
        let node = |id: &str, tenant: &str| NodeRecord {
            id: id.to_owned(),
            label: id.to_owned(),
            service: "svc".to_owned(),
            tenant: tenant.to_owned(),
        };
        let edge = |id: &str, source: &str, target: &str, trace: Option<&str>| EdgeRecord {
            id: id.to_owned(),
            source: source.to_owned(),
            target: target.to_owned(),
            connection_count: 1,
            status_counts: BTreeMap::new(),
            trace_id: trace.map(str::to_owned),
        };
        let snapshot = Snapshot {
            nodes: vec![node("a", "t1"), node("b", "t1"), node("c", "t2"), node("d", "t3")],
            edges: vec![
                edge("ab", "a", "b", Some("trace-1")),
                edge("bc", "b", "c", Some("trace-1")),
                edge("cd", "c", "d", Some("trace-2")),
            ],
        };

        let settings = Settings::default();
        let topology = Topology::from_snapshot(&snapshot);
        let layout = Layout::compute(&topology, &settings);
        let routed = magistral::build(&topology, &layout);
        let branches = magistral::branches(&routed, &topology, &layout);
        let scene = Scene::build(&topology, &layout, &routed, &branches, &settings);
        (topology, scene)
    }

    #[test]
    fn no_selection_highlights_nothing() {
        let (topology, scene) = fixture();
        assert!(relevant_keys(None, &topology, &scene).is_empty());
        assert!(relevant_keys(Some("missing"), &topology, &scene).is_empty());
    }

    #[test]
    fn trace_covers_its_hops_only() {
        let (topology, scene) = fixture();
        let keys = relevant_keys(Some("trace-1"), &topology, &scene);

        assert!(keys.contains(&LogicalKey::Arrow("ab".to_owned())));
        assert!(keys.contains(&LogicalKey::Endpoint("c".to_owned())));
        assert!(keys.contains(&LogicalKey::TenantSphere("t2".to_owned())));
        assert!(!keys.contains(&LogicalKey::Endpoint("d".to_owned())));
        assert!(!keys.contains(&LogicalKey::TenantSphere("t3".to_owned())));

        let magistrals = keys
            .iter()
            .filter(|key| key.kind() == PrimitiveKind::MagistralSegment)
            .collect::<Vec<_>>();
        assert!(!magistrals.is_empty());
        assert!(magistrals.iter().all(|key| matches!(
            key,
            LogicalKey::MagistralSegment { source, target, .. } if source == "t1" && target == "t2"
        )));
        assert!(keys.contains(&LogicalKey::Branch {
            tenant: "t2".to_owned(),
            other: "t1".to_owned(),
            endpoint: "c".to_owned(),
        }));
        assert!(keys.iter().all(|key| scene.contains(key)));
    }

    #[test]
    fn branches_off_the_trace_stay_dimmed() {
        let (topology, scene) = fixture();
        let keys = relevant_keys(Some("trace-1"), &topology, &scene);

        let idle = LogicalKey::Branch {
            tenant: "t1".to_owned(),
            other: "t2".to_owned(),
            endpoint: "a".to_owned(),
        };
        assert!(scene.contains(&idle));
        assert!(!keys.contains(&idle));
        assert!(keys.contains(&LogicalKey::Branch {
            tenant: "t1".to_owned(),
            other: "t2".to_owned(),
            endpoint: "b".to_owned(),
        }));
    }
}
