use std::collections::{BTreeMap, HashMap};
use std::f64::consts::TAU;

use glam::DVec3;

use crate::settings::Settings;
use crate::topology::Endpoint;

use super::cluster::TenantClusters;

/// Vertical distance between stacked endpoint segments of one service.
pub const SEGMENT_HEIGHT: f64 = 60.0;

const SPIRAL_TURNS: f64 = 2.5;

#[derive(Clone, Debug, PartialEq)]
pub struct TenantPlacement {
    pub center: DVec3,
    pub sphere_radius: f64,
    pub service_count: usize,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SpatialLayout {
    pub tenants: BTreeMap<String, TenantPlacement>,
    /// Keyed by `(tenant, service)`.
    pub services: BTreeMap<(String, String), DVec3>,
    pub endpoints: HashMap<String, DVec3>,
}

pub fn tenant_sphere_radius(node_spacing: f64, service_count: usize) -> f64 {
    (node_spacing * 1.2).max(node_spacing * 0.8 + service_count as f64 * 15.0)
}

/// Center of the `index`-th of `count` non-central tenants on a flattened
/// spiral around the origin, alternating above and below the central plane.
pub fn spiral_center(index: usize, count: usize, settings: &Settings) -> DVec3 {
    let progress = index as f64 / count.saturating_sub(1).max(1) as f64;
    let angle = progress * SPIRAL_TURNS * TAU;
    let radius_variation = 0.7 + 0.3 * (angle * 2.0).sin();
    let radius = settings.cluster_spacing * 0.8 * radius_variation;

    let levels_from_center = index.div_ceil(2) as f64;
    let side = if index % 2 == 1 { 1.0 } else { -1.0 };

    DVec3::new(
        angle.cos() * radius,
        side * levels_from_center * settings.cluster_spacing_y,
        angle.sin() * radius,
    )
}

/// Offsets of `count` services around their tenant center in the XZ plane.
pub fn service_offsets(count: usize, node_spacing: f64) -> Vec<DVec3> {
    match count {
        0 => Vec::new(),
        1 => vec![DVec3::ZERO],
        2..=4 => {
            let rows = count.div_ceil(2);
            (0..count)
                .map(|index| {
                    let column = (index % 2) as f64 - 0.5;
                    let row = (index / 2) as f64 - (rows as f64 - 1.0) / 2.0;
                    DVec3::new(column * node_spacing, 0.0, row * node_spacing)
                })
                .collect()
        }
        _ => {
            let radius = node_spacing * 0.8;
            (0..count)
                .map(|index| {
                    let angle = index as f64 / count as f64 * TAU;
                    DVec3::new(angle.cos() * radius, 0.0, angle.sin() * radius)
                })
                .collect()
        }
    }
}

pub fn endpoint_offset_y(index: usize, count: usize) -> f64 {
    (index as f64 - (count as f64 - 1.0) / 2.0) * SEGMENT_HEIGHT
}

/// Assigns positions to tenants, services and endpoints.
///
/// Pure and deterministic: identical inputs give bit-identical output.
pub fn place(
    clusters: &TenantClusters,
    services: &BTreeMap<&str, BTreeMap<&str, Vec<&Endpoint>>>,
    settings: &Settings,
) -> SpatialLayout {
    let central = clusters.central.as_deref();
    let satellites = clusters
        .ordered_tenants()
        .filter(|tenant| Some(*tenant) != central)
        .collect::<Vec<_>>();

    let mut centers = Vec::with_capacity(satellites.len() + 1);
    if let Some(central) = central {
        centers.push((central, DVec3::ZERO));
    }
    for (index, tenant) in satellites.iter().enumerate() {
        centers.push((*tenant, spiral_center(index, satellites.len(), settings)));
    }

    let mut layout = SpatialLayout::default();
    for (tenant, center) in centers {
        let tenant_services = services.get(tenant);
        let service_count = tenant_services.map_or(0, BTreeMap::len);

        layout.tenants.insert(
            tenant.to_owned(),
            TenantPlacement {
                center,
                sphere_radius: tenant_sphere_radius(settings.node_spacing, service_count),
                service_count,
            },
        );

        let Some(tenant_services) = tenant_services else {
            continue;
        };

        let offsets = service_offsets(service_count, settings.node_spacing);
        for ((service, endpoints), offset) in tenant_services.iter().zip(offsets) {
            let service_position = center + offset;
            layout
                .services
                .insert((tenant.to_owned(), (*service).to_owned()), service_position);

            for (index, endpoint) in endpoints.iter().enumerate() {
                let y = service_position.y + endpoint_offset_y(index, endpoints.len());
                layout.endpoints.insert(
                    endpoint.id.clone(),
                    DVec3::new(service_position.x, y, service_position.z),
                );
            }
        }
    }

    layout
}
