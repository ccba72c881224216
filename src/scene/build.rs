//! Turns one layout pass into the keyed set of drawables.

use std::collections::BTreeMap;

use glam::DVec3;

use crate::layout::{Layout, SEGMENT_HEIGHT};
use crate::magistral::{Branch, FlowDirection, MAGISTRAL_RADIUS, RoutedMagistral};
use crate::routing::find_path;
use crate::settings::Settings;
use crate::topology::{Topology, error_ratio};
use crate::util::stable_unit;

use super::key::{LogicalKey, PrimitiveKind};
use super::primitive::{Primitive, Rgba, Shape};

const ARROW_CLEARANCE: f64 = 5.0;
const LABEL_LIFT: f64 = 24.0;
const TENANT_SPHERE_ALPHA: f32 = 0.25;

const HEALTHY: Rgba = Rgba::new(0.35, 0.78, 0.55, 1.0);
const FAILING: Rgba = Rgba::new(0.92, 0.28, 0.26, 1.0);
const MAGISTRAL: Rgba = Rgba::new(0.45, 0.72, 0.95, 1.0);
const OUTBOUND: Rgba = Rgba::new(0.38, 0.62, 1.0, 0.9);
const INBOUND: Rgba = Rgba::new(1.0, 0.66, 0.3, 0.9);
const LABEL: Rgba = Rgba::new(0.92, 0.94, 0.97, 1.0);

pub fn tenant_color(tenant: &str) -> Rgba {
    Rgba::from_hue(stable_unit(tenant), 0.55, 0.9)
}

/// Green through red by the share of failing status codes.
pub fn health_color(error_ratio: f64) -> Rgba {
    HEALTHY.lerp(FAILING, error_ratio as f32)
}

/// All primitives implied by one snapshot, keyed by logical identity.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Scene {
    primitives: BTreeMap<LogicalKey, Primitive>,
}

impl Scene {
    pub fn build(
        topology: &Topology,
        layout: &Layout,
        magistrals: &[RoutedMagistral],
        branches: &[Branch],
        settings: &Settings,
    ) -> Self {
        let mut scene = Self::default();
        scene.add_tenants(layout, settings);
        scene.add_endpoints(topology, layout, settings);
        scene.add_magistrals(magistrals, settings);
        scene.add_branches(branches, settings);
        scene.add_arrows(topology, layout, settings);
        scene
    }

    fn insert(&mut self, key: LogicalKey, shape: Shape, color: Rgba, visible: bool) {
        let primitive = Primitive {
            key: key.clone(),
            shape,
            color,
            visible,
        };
        self.primitives.insert(key, primitive);
    }

    fn add_tenants(&mut self, layout: &Layout, settings: &Settings) {
        for (tenant, placement) in &layout.spatial.tenants {
            let color = tenant_color(tenant).scaled(settings.brightness);
            self.insert(
                LogicalKey::TenantSphere(tenant.clone()),
                Shape::Sphere {
                    center: placement.center,
                    radius: placement.sphere_radius,
                },
                color.with_alpha(TENANT_SPHERE_ALPHA),
                true,
            );
            self.insert(
                LogicalKey::TenantLabel(tenant.clone()),
                Shape::Label {
                    position: placement.center + DVec3::Y * (placement.sphere_radius + LABEL_LIFT),
                    text: tenant.clone(),
                },
                LABEL.scaled(settings.brightness),
                settings.show_labels,
            );
        }
    }

    fn add_endpoints(&mut self, topology: &Topology, layout: &Layout, settings: &Settings) {
        let segment_radius = settings.node_spacing * 0.12;

        for endpoint in topology.endpoints() {
            let Some(center) = layout.endpoint_position(&endpoint.id) else {
                continue;
            };
            self.insert(
                LogicalKey::Endpoint(endpoint.id.clone()),
                Shape::Segment {
                    center,
                    height: SEGMENT_HEIGHT * 0.85,
                    radius: segment_radius,
                },
                tenant_color(&endpoint.tenant).scaled(settings.brightness),
                true,
            );
        }

        for (tenant, services) in topology.services_by_tenant() {
            for (service, endpoints) in services {
                let key = (tenant.to_owned(), service.to_owned());
                let Some(position) = layout.spatial.services.get(&key) else {
                    continue;
                };
                let top = endpoints.len() as f64 * SEGMENT_HEIGHT / 2.0 + LABEL_LIFT;
                self.insert(
                    LogicalKey::ServiceLabel {
                        tenant: key.0,
                        service: key.1,
                    },
                    Shape::Label {
                        position: *position + DVec3::Y * top,
                        text: service.to_owned(),
                    },
                    LABEL.scaled(settings.brightness),
                    settings.show_labels,
                );
            }
        }
    }

    fn add_magistrals(&mut self, magistrals: &[RoutedMagistral], settings: &Settings) {
        for routed in magistrals {
            let magistral = &routed.magistral;
            let ratio = error_ratio(&magistral.status_codes);
            let color = MAGISTRAL.lerp(FAILING, ratio as f32).scaled(settings.brightness);

            for (index, segment) in routed.route.segments.iter().enumerate() {
                self.insert(
                    LogicalKey::MagistralSegment {
                        source: magistral.source_tenant.clone(),
                        target: magistral.target_tenant.clone(),
                        index,
                    },
                    Shape::Tube {
                        points: segment.points.clone(),
                        radius: MAGISTRAL_RADIUS,
                    },
                    color,
                    segment.visible,
                );
            }
        }
    }

    fn add_branches(&mut self, branches: &[Branch], settings: &Settings) {
        for branch in branches {
            let color = match branch.direction {
                FlowDirection::Outbound => OUTBOUND,
                FlowDirection::Inbound => INBOUND,
            };
            self.insert(
                LogicalKey::Branch {
                    tenant: branch.tenant.clone(),
                    other: branch.other_tenant.clone(),
                    endpoint: branch.endpoint_id.clone(),
                },
                Shape::Line {
                    from: branch.from,
                    to: branch.to,
                },
                color.scaled(settings.brightness),
                true,
            );
        }
    }

    /// Intra-tenant edges, each routed around every other tenant.
    fn add_arrows(&mut self, topology: &Topology, layout: &Layout, settings: &Settings) {
        for connection in topology.connections() {
            let (Some(source), Some(target)) = (
                topology.endpoint(&connection.source_id),
                topology.endpoint(&connection.target_id),
            ) else {
                continue;
            };
            if source.tenant != target.tenant {
                continue;
            }
            let (Some(start), Some(end), Some(own)) = (
                layout.endpoint_position(&source.id),
                layout.endpoint_position(&target.id),
                layout.tenant(&source.tenant),
            ) else {
                continue;
            };

            let obstacles = layout.obstacles_excluding(&[own.center], 0.0);
            let points = find_path(start, end, &obstacles, ARROW_CLEARANCE);
            self.insert(
                LogicalKey::Arrow(connection.id.clone()),
                Shape::Arrow { points },
                health_color(connection.error_ratio()).scaled(settings.brightness),
                settings.show_arrows,
            );
        }
    }

    pub fn get(&self, key: &LogicalKey) -> Option<&Primitive> {
        self.primitives.get(key)
    }

    pub fn contains(&self, key: &LogicalKey) -> bool {
        self.primitives.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&LogicalKey, &Primitive)> {
        self.primitives.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &LogicalKey> {
        self.primitives.keys()
    }

    pub fn len(&self) -> usize {
        self.primitives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }

    pub fn count_by_kind(&self) -> BTreeMap<PrimitiveKind, usize> {
        let mut counts = PrimitiveKind::ALL
            .into_iter()
            .map(|kind| (kind, 0))
            .collect::<BTreeMap<_, _>>();
        for key in self.primitives.keys() {
            *counts.entry(key.kind()).or_insert(0) += 1;
        }
        counts
    }
}
