//! Cross-tenant highways.
//!
//! Every connection between endpoints of two different tenants is folded into
//! one [`Magistral`] per ordered tenant pair. Each magistral is routed from
//! sphere surface to sphere surface around the other tenants, smoothed,
//! and split into visible and hidden runs so the stub inside a tenant sphere
//! is not drawn. Endpoints then attach to the magistral through branches.

use std::collections::BTreeMap;

use glam::DVec3;
use serde::Serialize;

use crate::geometry::{sample_curve, sphere_surface_point};
use crate::layout::{Layout, TenantPlacement};
use crate::routing::{Obstacle, find_path};
use crate::topology::Topology;

pub const MAGISTRAL_RADIUS: f64 = 4.0;
pub const MAGISTRAL_CLEARANCE: f64 = 15.0;
/// Obstacles centered this close to either end tenant are ignored.
pub const OWN_TENANT_EXCLUSION: f64 = 50.0;
pub const BIDIRECTIONAL_OFFSET: f64 = 15.0;
pub const CURVE_SAMPLES: usize = 100;
/// Relative sphere margin inside which curve samples count as stub.
pub const STUB_MARGIN: f64 = 0.1;

const NEAR_VERTICAL: f64 = 0.99;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Magistral {
    pub source_tenant: String,
    pub target_tenant: String,
    pub connection_count: u64,
    pub status_codes: BTreeMap<String, u64>,
    pub connection_ids: Vec<String>,
}

/// Folds cross-tenant connections by ordered `(source, target)` tenant pair.
pub fn aggregate(topology: &Topology) -> BTreeMap<(String, String), Magistral> {
    let mut magistrals: BTreeMap<(String, String), Magistral> = BTreeMap::new();

    for connection in topology.connections() {
        let Some((source, target)) = topology.cross_tenant_pair(connection) else {
            continue;
        };

        let magistral = magistrals
            .entry((source.to_owned(), target.to_owned()))
            .or_insert_with(|| Magistral {
                source_tenant: source.to_owned(),
                target_tenant: target.to_owned(),
                ..Magistral::default()
            });

        magistral.connection_count += connection.connection_count;
        for (code, count) in &connection.status_counts {
            *magistral.status_codes.entry(code.clone()).or_insert(0) += count;
        }
        magistral.connection_ids.push(connection.id.clone());
    }

    magistrals
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CurveSegment {
    pub points: Vec<DVec3>,
    pub visible: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MagistralRoute {
    /// Start of the route on the source tenant sphere.
    pub source_point: DVec3,
    /// End of the route on the target tenant sphere.
    pub target_point: DVec3,
    /// Control points from the pathfinder, offset for bidirectional pairs.
    pub path: Vec<DVec3>,
    /// Smoothed samples of `path`.
    pub curve: Vec<DVec3>,
    pub segments: Vec<CurveSegment>,
}

impl MagistralRoute {
    pub fn visible_segments(&self) -> impl Iterator<Item = &CurveSegment> {
        self.segments.iter().filter(|segment| segment.visible)
    }
}

/// Offset applied to the `source → target` magistral.
///
/// Zero unless the reverse magistral exists. Otherwise the lexicographically
/// smaller tenant is treated as the canonical source, the perpendicular is
/// taken from the canonical direction, and the canonical magistral moves
/// `+BIDIRECTIONAL_OFFSET` along it while the reverse one moves the opposite
/// way.
pub fn separation_offset(
    source_tenant: &str,
    target_tenant: &str,
    source_center: DVec3,
    target_center: DVec3,
    bidirectional: bool,
) -> DVec3 {
    if !bidirectional {
        return DVec3::ZERO;
    }

    let canonical = source_tenant <= target_tenant;
    let direction = if canonical {
        target_center - source_center
    } else {
        source_center - target_center
    };
    let Some(direction) = direction.try_normalize() else {
        return DVec3::ZERO;
    };

    let axis = if direction.dot(DVec3::Y).abs() > NEAR_VERTICAL {
        DVec3::Z
    } else {
        DVec3::Y
    };
    let perpendicular = direction.cross(axis).normalize_or_zero();
    let sign = if canonical { 1.0 } else { -1.0 };
    perpendicular * BIDIRECTIONAL_OFFSET * sign
}

/// Routes one magistral between two tenant spheres.
///
/// `obstacles` should already exclude both end tenants. The offset shifts
/// every control point; the two ends are then projected back onto their
/// spheres so the route still starts and stops on the surface.
pub fn route(
    source: &TenantPlacement,
    target: &TenantPlacement,
    obstacles: &[Obstacle],
    offset: DVec3,
) -> MagistralRoute {
    let start = sphere_surface_point(source.center, target.center, source.sphere_radius);
    let end = sphere_surface_point(target.center, source.center, target.sphere_radius);

    let mut path = find_path(start, end, obstacles, MAGISTRAL_CLEARANCE);
    if offset != DVec3::ZERO {
        for point in &mut path {
            *point += offset;
        }
        let last = path.len() - 1;
        path[0] = sphere_surface_point(source.center, path[0], source.sphere_radius);
        path[last] = sphere_surface_point(target.center, path[last], target.sphere_radius);
    }

    let curve = sample_curve(&path, CURVE_SAMPLES);
    let segments = segment_curve(&curve, source, target);

    MagistralRoute {
        source_point: path[0],
        target_point: path[path.len() - 1],
        path,
        curve,
        segments,
    }
}

fn near(point: DVec3, placement: &TenantPlacement) -> bool {
    point.distance(placement.center) <= placement.sphere_radius * (1.0 + STUB_MARGIN)
}

/// Splits sampled points into the fewest runs of equal visibility.
///
/// A sample pair is hidden when both samples sit near the same end tenant.
/// Neighbouring runs share their boundary sample.
pub fn segment_curve(
    curve: &[DVec3],
    source: &TenantPlacement,
    target: &TenantPlacement,
) -> Vec<CurveSegment> {
    let mut segments: Vec<CurveSegment> = Vec::new();

    for pair in curve.windows(2) {
        let hidden = (near(pair[0], source) && near(pair[1], source))
            || (near(pair[0], target) && near(pair[1], target));
        let visible = !hidden;

        match segments.last_mut() {
            Some(segment) if segment.visible == visible => segment.points.push(pair[1]),
            _ => segments.push(CurveSegment {
                points: vec![pair[0], pair[1]],
                visible,
            }),
        }
    }

    segments
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RoutedMagistral {
    pub magistral: Magistral,
    pub route: MagistralRoute,
}

pub fn build(topology: &Topology, layout: &Layout) -> Vec<RoutedMagistral> {
    let magistrals = aggregate(topology);

    let routed = magistrals
        .iter()
        .filter_map(|((source_name, target_name), magistral)| {
            let source = layout.tenant(source_name)?;
            let target = layout.tenant(target_name)?;

            let bidirectional =
                magistrals.contains_key(&(target_name.clone(), source_name.clone()));
            let offset = separation_offset(
                source_name,
                target_name,
                source.center,
                target.center,
                bidirectional,
            );
            let obstacles =
                layout.obstacles_excluding(&[source.center, target.center], OWN_TENANT_EXCLUSION);

            Some(RoutedMagistral {
                magistral: magistral.clone(),
                route: route(source, target, &obstacles, offset),
            })
        })
        .collect::<Vec<_>>();

    tracing::debug!(magistrals = routed.len(), "routed magistrals");
    routed
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum FlowDirection {
    Outbound,
    Inbound,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Branch {
    pub tenant: String,
    pub other_tenant: String,
    pub endpoint_id: String,
    pub from: DVec3,
    pub to: DVec3,
    pub direction: FlowDirection,
}

/// Branches from endpoints to the magistrals touching their tenant.
///
/// For each tenant and each tenant it exchanges traffic with, the candidates
/// are the tenant-side ends of the outbound and inbound magistral. The one
/// closest in total to all of the tenant's endpoints is shared by every
/// endpoint of the tenant. Ties keep the outbound end.
pub fn branches(routed: &[RoutedMagistral], topology: &Topology, layout: &Layout) -> Vec<Branch> {
    let mut by_pair: BTreeMap<(&str, &str), Vec<(DVec3, FlowDirection)>> = BTreeMap::new();
    for entry in routed {
        let magistral = &entry.magistral;
        by_pair
            .entry((magistral.source_tenant.as_str(), magistral.target_tenant.as_str()))
            .or_default()
            .push((entry.route.source_point, FlowDirection::Outbound));
        by_pair
            .entry((magistral.target_tenant.as_str(), magistral.source_tenant.as_str()))
            .or_default()
            .push((entry.route.target_point, FlowDirection::Inbound));
    }

    let mut tenant_positions: BTreeMap<&str, Vec<(&str, DVec3)>> = BTreeMap::new();
    for endpoint in topology.endpoints() {
        if let Some(position) = layout.endpoint_position(&endpoint.id) {
            tenant_positions
                .entry(endpoint.tenant.as_str())
                .or_default()
                .push((endpoint.id.as_str(), position));
        }
    }

    let mut branches = Vec::new();
    for ((tenant, other), mut candidates) in by_pair {
        let endpoints = tenant_positions.get(tenant).map_or(&[][..], Vec::as_slice);
        candidates.sort_by_key(|(_, direction)| *direction != FlowDirection::Outbound);

        let total = |point: DVec3| endpoints.iter().map(|(_, p)| p.distance(point)).sum::<f64>();
        let Some((anchor, direction)) = candidates
            .into_iter()
            .reduce(|best, candidate| if total(candidate.0) < total(best.0) { candidate } else { best })
        else {
            continue;
        };

        for (endpoint_id, from) in endpoints {
            branches.push(Branch {
                tenant: tenant.to_owned(),
                other_tenant: other.to_owned(),
                endpoint_id: (*endpoint_id).to_owned(),
                from: *from,
                to: anchor,
                direction,
            });
        }
    }

    branches
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    use super::*;
    use crate::settings::Settings;
    use crate::topology::{EdgeRecord, NodeRecord, Snapshot};

    fn placement(center: DVec3, radius: f64) -> TenantPlacement {
        TenantPlacement {
            center,
            sphere_radius: radius,
            service_count: 1,
        }
    }

    fn node(id: &str, tenant: &str) -> NodeRecord {
        NodeRecord {
            id: id.to_owned(),
            label: id.to_owned(),
            service: "svc".to_owned(),
            tenant: tenant.to_owned(),
        }
    }

    fn edge(id: &str, source: &str, target: &str, count: u64, codes: &[(&str, u64)]) -> EdgeRecord {
        EdgeRecord {
            id: id.to_owned(),
            source: source.to_owned(),
            target: target.to_owned(),
            connection_count: count,
            status_counts: codes
                .iter()
                .map(|(code, count)| ((*code).to_owned(), *count))
                .collect(),
            trace_id: None,
        }
    }

    #[test]
    fn aggregate_folds_cross_tenant_edges_only() {
        let snapshot = Snapshot {
            nodes: vec![node("a1", "a"), node("a2", "a"), node("b1", "b")],
            edges: vec![
                edge("1", "a1", "b1", 3, &[("200", 3)]),
                edge("2", "a2", "b1", 2, &[("200", 1), ("500", 1)]),
                edge("3", "a1", "a2", 9, &[]),
                edge("4", "b1", "a1", 1, &[]),
            ],
        };
        let magistrals = aggregate(&Topology::from_snapshot(&snapshot));

        assert_eq!(magistrals.len(), 2);
        let forward = &magistrals[&("a".to_owned(), "b".to_owned())];
        assert_eq!(forward.connection_count, 5);
        assert_eq!(forward.status_codes["200"], 4);
        assert_eq!(forward.status_codes["500"], 1);
        assert_eq!(forward.connection_ids, vec!["1", "2"]);
        assert_eq!(magistrals[&("b".to_owned(), "a".to_owned())].connection_count, 1);
    }

    #[test]
    fn two_tenant_route_touches_both_spheres() {
        let a = placement(DVec3::ZERO, 100.0);
        let b = placement(DVec3::new(400.0, 0.0, 0.0), 100.0);
        let route = route(&a, &b, &[], DVec3::ZERO);

        assert_eq!(route.source_point, DVec3::new(100.0, 0.0, 0.0));
        assert_eq!(route.target_point, DVec3::new(300.0, 0.0, 0.0));
        assert_eq!(route.path.len(), 2);
        assert_eq!(route.curve.len(), CURVE_SAMPLES);
    }

    #[test]
    fn stubs_inside_the_spheres_are_hidden() {
        let a = placement(DVec3::ZERO, 100.0);
        let b = placement(DVec3::new(400.0, 0.0, 0.0), 100.0);
        let route = route(&a, &b, &[], DVec3::ZERO);

        let visibility = route.segments.iter().map(|s| s.visible).collect::<Vec<_>>();
        assert_eq!(visibility, vec![false, true, false]);

        let sampled = route.segments.iter().map(|s| s.points.len() - 1).sum::<usize>();
        assert_eq!(sampled, CURVE_SAMPLES - 1);
        for pair in route.segments.windows(2) {
            assert_eq!(pair[0].points.last(), pair[1].points.first());
        }
    }

    #[test]
    fn bidirectional_offsets_are_opposite_and_order_independent() {
        let a = DVec3::ZERO;
        let b = DVec3::new(400.0, 0.0, 0.0);

        let forward = separation_offset("alpha", "beta", a, b, true);
        let backward = separation_offset("beta", "alpha", b, a, true);

        assert!((forward.length() - BIDIRECTIONAL_OFFSET).abs() < 1e-9);
        assert_eq!(forward, -backward);
        assert_eq!(forward.dot(b - a), 0.0);
        assert_eq!(separation_offset("alpha", "beta", a, b, false), DVec3::ZERO);
    }

    #[test]
    fn vertical_pairs_use_the_forward_axis() {
        let offset = separation_offset("a", "b", DVec3::ZERO, DVec3::new(0.0, 500.0, 0.0), true);
        assert!((offset.length() - BIDIRECTIONAL_OFFSET).abs() < 1e-9);
        assert!(offset.y.abs() < 1e-9);
    }

    #[test]
    fn offset_routes_stay_on_the_spheres_and_apart() {
        let a = placement(DVec3::ZERO, 100.0);
        let b = placement(DVec3::new(400.0, 0.0, 0.0), 100.0);

        let forward = route(&a, &b, &[], separation_offset("a", "b", a.center, b.center, true));
        let backward = route(&b, &a, &[], separation_offset("b", "a", b.center, a.center, true));

        assert!((forward.source_point.distance(a.center) - 100.0).abs() < 1e-9);
        assert!((backward.target_point.distance(a.center) - 100.0).abs() < 1e-9);
        let midpoint_gap = forward.curve[CURVE_SAMPLES / 2].distance(backward.curve[CURVE_SAMPLES / 2]);
        assert!(midpoint_gap > BIDIRECTIONAL_OFFSET);
    }

    fn three_tenant_layout() -> Layout {
        let mut layout = Layout::default();
        for (tenant, center, radius) in [
            ("a", DVec3::ZERO, 100.0),
            ("b", DVec3::new(1000.0, 0.0, 0.0), 100.0),
            ("c", DVec3::new(500.0, 0.0, 0.0), 120.0),
        ] {
            layout
                .spatial
                .tenants
                .insert(tenant.to_owned(), placement(center, radius));
            layout.obstacles.push(Obstacle::new(center, radius));
        }
        layout
    }

    #[test]
    fn build_routes_around_a_third_tenant() {
        let snapshot = Snapshot {
            nodes: vec![node("a1", "a"), node("b1", "b"), node("c1", "c")],
            edges: vec![edge("1", "a1", "b1", 1, &[])],
        };
        let topology = Topology::from_snapshot(&snapshot);
        let layout = three_tenant_layout();

        let routed = build(&topology, &layout);
        assert_eq!(routed.len(), 1);

        let path = &routed[0].route.path;
        assert_eq!(path.len(), 3);
        assert!(path[1].distance(DVec3::new(500.0, 0.0, 0.0)) > 120.0);
        assert!((routed[0].route.source_point.distance(DVec3::ZERO) - 100.0).abs() < 1e-6);
    }

    #[test]
    fn route_is_direct_without_a_blocker() {
        let snapshot = Snapshot {
            nodes: vec![node("a1", "a"), node("b1", "b")],
            edges: vec![edge("1", "a1", "b1", 1, &[])],
        };
        let topology = Topology::from_snapshot(&snapshot);
        let mut layout = three_tenant_layout();
        layout.obstacles.retain(|obstacle| obstacle.radius < 120.0);

        let routed = build(&topology, &layout);
        assert_eq!(routed[0].route.path.len(), 2);
    }

    #[test]
    fn every_endpoint_of_a_touched_tenant_gets_a_branch() {
        let snapshot = Snapshot {
            nodes: vec![node("a1", "a"), node("a2", "a"), node("b1", "b")],
            edges: vec![edge("1", "a1", "b1", 1, &[])],
        };
        let topology = Topology::from_snapshot(&snapshot);
        let layout = Layout::compute(&topology, &Settings::default());
        let branches = branches(&build(&topology, &layout), &topology, &layout);

        let in_a = branches
            .iter()
            .filter(|branch| branch.tenant == "a")
            .map(|branch| branch.endpoint_id.as_str())
            .collect::<Vec<_>>();
        assert_eq!(in_a, vec!["a1", "a2"]);
        assert!(
            branches
                .iter()
                .filter(|branch| branch.tenant == "a")
                .all(|branch| branch.direction == FlowDirection::Outbound)
        );

        let in_b = branches.iter().filter(|branch| branch.tenant == "b").count();
        assert_eq!(in_b, 1);
    }

    #[test]
    fn branches_share_the_cheapest_anchor() {
        let snapshot = Snapshot {
            nodes: vec![node("a1", "a"), node("a2", "a"), node("b1", "b")],
            edges: vec![
                edge("1", "a1", "b1", 1, &[]),
                edge("2", "b1", "a2", 1, &[]),
            ],
        };
        let topology = Topology::from_snapshot(&snapshot);
        let layout = Layout::compute(&topology, &Settings::default());
        let routed = build(&topology, &layout);
        let branches = branches(&routed, &topology, &layout);

        let in_a = branches.iter().filter(|b| b.tenant == "a").collect::<Vec<_>>();
        assert_eq!(in_a.len(), 2);
        assert_eq!(in_a[0].to, in_a[1].to);

        let in_b = branches.iter().filter(|b| b.tenant == "b").collect::<Vec<_>>();
        assert_eq!(in_b.len(), 1);
        assert_eq!(in_b[0].endpoint_id, "b1");
    }

    proptest! {
        #[test]
        fn route_ends_lie_on_their_spheres(
            ax in -2000.0..2000.0f64, ay in -500.0..500.0f64, az in -2000.0..2000.0f64,
            bx in -2000.0..2000.0f64, by in -500.0..500.0f64, bz in -2000.0..2000.0f64,
            ra in 50.0..300.0f64, rb in 50.0..300.0f64,
            bidirectional in any::<bool>(),
        ) {
            let a = placement(DVec3::new(ax, ay, az), ra);
            let b = placement(DVec3::new(bx, by, bz), rb);
            prop_assume!(a.center.distance(b.center) > ra + rb + 1.0);

            let offset = separation_offset("a", "b", a.center, b.center, bidirectional);
            let routed = route(&a, &b, &[], offset);

            prop_assert!((routed.source_point.distance(a.center) - ra).abs() < 1e-6);
            prop_assert!((routed.target_point.distance(b.center) - rb).abs() < 1e-6);
        }
    }
}
