//! Tenant clustering and 3D placement.

mod cluster;
mod spatial;

use glam::DVec3;

pub use cluster::{TenantClusters, TenantTraffic, cluster_tenants};
pub use spatial::{
    SEGMENT_HEIGHT, SpatialLayout, TenantPlacement, endpoint_offset_y, place, service_offsets,
    spiral_center, tenant_sphere_radius,
};

use crate::routing::Obstacle;
use crate::settings::Settings;
use crate::topology::Topology;

/// Everything derived from one layout pass.
#[derive(Clone, Debug, Default)]
pub struct Layout {
    pub clusters: TenantClusters,
    pub spatial: SpatialLayout,
    pub obstacles: Vec<Obstacle>,
}

impl Layout {
    pub fn compute(topology: &Topology, settings: &Settings) -> Self {
        let traffic = TenantTraffic::from_topology(topology);
        let clusters = cluster_tenants(&topology.tenants(), &traffic);
        let spatial = place(&clusters, &topology.services_by_tenant(), settings);

        let obstacles = clusters
            .ordered_tenants()
            .filter_map(|tenant| spatial.tenants.get(tenant))
            .map(|placement| Obstacle::new(placement.center, placement.sphere_radius))
            .collect();

        tracing::debug!(
            tenants = spatial.tenants.len(),
            clusters = clusters.clusters.len(),
            endpoints = spatial.endpoints.len(),
            "computed layout"
        );

        Self {
            clusters,
            spatial,
            obstacles,
        }
    }

    pub fn endpoint_position(&self, id: &str) -> Option<DVec3> {
        self.spatial.endpoints.get(id).copied()
    }

    pub fn tenant(&self, tenant: &str) -> Option<&TenantPlacement> {
        self.spatial.tenants.get(tenant)
    }

    /// Obstacles except those centered within `exclusion` of any of `centers`.
    pub fn obstacles_excluding(&self, centers: &[DVec3], exclusion: f64) -> Vec<Obstacle> {
        self.obstacles
            .iter()
            .filter(|obstacle| {
                centers
                    .iter()
                    .all(|center| obstacle.position.distance(*center) > exclusion)
            })
            .copied()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn layout_with(obstacles: &[(f64, f64)]) -> Layout {
        Layout {
            obstacles: obstacles
                .iter()
                .map(|(x, radius)| Obstacle::new(DVec3::new(*x, 0.0, 0.0), *radius))
                .collect(),
            ..Layout::default()
        }
    }

    #[test]
    fn both_end_tenants_are_excluded() {
        let layout = layout_with(&[(0.0, 100.0), (500.0, 120.0), (1000.0, 100.0)]);

        let kept = layout.obstacles_excluding(&[DVec3::ZERO, DVec3::new(1000.0, 0.0, 0.0)], 50.0);
        assert_eq!(kept, vec![Obstacle::new(DVec3::new(500.0, 0.0, 0.0), 120.0)]);
    }

    #[test]
    fn exclusion_radius_is_strict() {
        let layout = layout_with(&[(49.0, 10.0), (50.0, 10.0), (51.0, 10.0)]);

        let kept = layout
            .obstacles_excluding(&[DVec3::ZERO], 50.0)
            .iter()
            .map(|obstacle| obstacle.position.x)
            .collect::<Vec<_>>();
        assert_eq!(kept, vec![51.0]);
    }

    #[test]
    fn computed_layout_has_one_obstacle_per_tenant() {
        let snapshot = crate::topology::synthetic_snapshot(5, 3);
        let topology = Topology::from_snapshot(&snapshot);
        let layout = Layout::compute(&topology, &Settings::default());

        assert_eq!(layout.obstacles.len(), topology.tenants().len());
        for (tenant, placement) in &layout.spatial.tenants {
            assert!(
                layout
                    .obstacles
                    .iter()
                    .any(|obstacle| obstacle.position == placement.center),
                "{tenant} has no obstacle"
            );
        }
    }
}
