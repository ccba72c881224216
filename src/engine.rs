//! Update and frame passes over the scene cache.
//!
//! An update pass turns a snapshot and settings into a scene delta. It is
//! split so the expensive part can run off the owning thread:
//! [`Engine::begin_pass`] hands out a ticket, [`prepare_pass`] computes
//! everything without touching the engine, and [`Engine::apply`] commits the
//! result unless a newer pass has begun in the meantime.
//!
//! The frame pass only reads: it derives the LOD level and flow indicator
//! positions from the committed scene and the current camera.

use std::collections::{BTreeMap, BTreeSet};

use glam::DVec3;
use serde::Serialize;
use thiserror::Error;

use crate::geometry::point_along;
use crate::layout::Layout;
use crate::lod::{LodEvaluation, LodThresholds, diagram_diagonal};
use crate::magistral::{self, Branch, RoutedMagistral};
use crate::scene::{
    LogicalKey, PreviousState, Primitive, PrimitiveKind, Scene, SceneCache, SceneDelta,
    reconcile, relevant_keys,
};
use crate::settings::Settings;
use crate::topology::{Snapshot, Topology};
use crate::util::stable_unit;

/// Full trips along a path per second for flow indicators.
const FLOW_SPEED: f64 = 0.35;

/// Initial camera distance as a share of the diagram diagonal.
pub const DEFAULT_VIEW_FACTOR: f64 = 0.6;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("update pass {pass} is stale; pass {latest} has already begun")]
    StalePass { pass: u64, latest: u64 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct PassTicket(u64);

impl PassTicket {
    pub fn id(self) -> u64 {
        self.0
    }
}

/// Everything derived from one snapshot, ready to be committed.
#[derive(Clone, Debug)]
pub struct PreparedPass {
    ticket: PassTicket,
    settings: Settings,
    topology: Topology,
    layout: Layout,
    magistrals: Vec<RoutedMagistral>,
    branches: Vec<Branch>,
    scene: Scene,
}

impl PreparedPass {
    pub fn ticket(&self) -> PassTicket {
        self.ticket
    }
}

/// Runs clustering, layout, routing and scene building for one pass.
///
/// Invalid settings fields fall back to their defaults.
pub fn prepare_pass(ticket: PassTicket, snapshot: &Snapshot, settings: &Settings) -> PreparedPass {
    let settings = settings.sanitized();
    let topology = Topology::from_snapshot(snapshot);
    let layout = Layout::compute(&topology, &settings);
    let magistrals = magistral::build(&topology, &layout);
    let branches = magistral::branches(&magistrals, &topology, &layout);
    let scene = Scene::build(&topology, &layout, &magistrals, &branches, &settings);

    PreparedPass {
        ticket,
        settings,
        topology,
        layout,
        magistrals,
        branches,
        scene,
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraFeed {
    pub distance_to_nearest_relevant_object: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FlowIndicator {
    pub key: LogicalKey,
    pub position: DVec3,
    /// Fraction of the path already travelled, in `[0, 1)`.
    pub progress: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FrameState {
    pub lod: LodEvaluation,
    pub flows: Vec<FlowIndicator>,
}

impl FrameState {
    pub fn shows(&self, primitive: &Primitive) -> bool {
        primitive.visible && self.lod.level.shows(primitive.kind())
    }
}

#[derive(Clone, Debug, Default)]
struct Committed {
    topology: Topology,
    layout: Layout,
    magistrals: Vec<RoutedMagistral>,
    branches: Vec<Branch>,
    scene: Scene,
    diagonal: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PassSummary {
    pub generation: u64,
    pub endpoints: usize,
    pub connections: usize,
    pub dropped_connections: usize,
    pub duplicate_endpoints: usize,
    pub tenants: usize,
    pub clusters: usize,
    pub services: usize,
    pub magistrals: usize,
    pub branches: usize,
    pub diagram_diagonal: f64,
    pub primitives: BTreeMap<String, usize>,
}

#[derive(Debug, Default)]
pub struct Engine {
    cache: SceneCache,
    previous: Option<PreviousState>,
    latest_pass: u64,
    committed: Committed,
    thresholds: LodThresholds,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_thresholds(thresholds: LodThresholds) -> Self {
        Self {
            thresholds,
            ..Self::default()
        }
    }

    /// Starts a new pass, making every earlier unapplied pass stale.
    pub fn begin_pass(&mut self) -> PassTicket {
        self.latest_pass += 1;
        PassTicket(self.latest_pass)
    }

    pub fn apply(&mut self, prepared: PreparedPass) -> Result<SceneDelta, EngineError> {
        let pass = prepared.ticket.id();
        if pass != self.latest_pass {
            tracing::debug!(pass, latest = self.latest_pass, "discarding stale update pass");
            return Err(EngineError::StalePass {
                pass,
                latest: self.latest_pass,
            });
        }

        Ok(self.commit(prepared))
    }

    /// Begins, prepares and applies a pass on the calling thread.
    pub fn update(&mut self, snapshot: &Snapshot, settings: &Settings) -> SceneDelta {
        let ticket = self.begin_pass();
        let prepared = prepare_pass(ticket, snapshot, settings);
        self.commit(prepared)
    }

    fn commit(&mut self, prepared: PreparedPass) -> SceneDelta {
        let PreparedPass {
            ticket,
            settings,
            topology,
            layout,
            magistrals,
            branches,
            scene,
        } = prepared;

        let delta = reconcile(self.previous.as_ref(), &scene, &settings, &mut self.cache);
        if delta.invalidated {
            tracing::info!(generation = delta.generation, "spacing changed, rebuilt scene cache");
        }
        tracing::info!(
            pass = ticket.id(),
            generation = delta.generation,
            added = delta.to_add.len(),
            updated = delta.to_update.len(),
            removed = delta.to_remove.len(),
            kept = delta.to_keep.len(),
            dropped_connections = topology.dropped_connections(),
            "applied update pass"
        );

        let diagonal = diagram_diagonal(layout.spatial.endpoints.values());
        self.previous = Some(PreviousState { settings });
        self.committed = Committed {
            topology,
            layout,
            magistrals,
            branches,
            scene,
            diagonal,
        };
        delta
    }

    /// LOD and flow indicators for one frame. Never mutates the cache.
    pub fn frame(&self, camera: CameraFeed, elapsed_seconds: f64) -> FrameState {
        let lod = self.thresholds.evaluate(
            camera.distance_to_nearest_relevant_object,
            self.committed.diagonal,
            self.committed.topology.service_count(),
        );

        let flows = self
            .cache
            .entries()
            .map(|entry| entry.metadata().primitive())
            .filter(|primitive| {
                primitive.visible
                    && lod.level.shows(primitive.kind())
                    && matches!(
                        primitive.kind(),
                        PrimitiveKind::Arrow | PrimitiveKind::MagistralSegment
                    )
            })
            .filter_map(|primitive| {
                let path = primitive.shape.path()?;
                let phase = stable_unit(&primitive.key.to_string());
                let progress = (phase + elapsed_seconds * FLOW_SPEED).rem_euclid(1.0);
                Some(FlowIndicator {
                    key: primitive.key.clone(),
                    position: point_along(path, progress)?,
                    progress,
                })
            })
            .collect();

        FrameState { lod, flows }
    }

    pub fn relevant_keys(&self, selected_trace: Option<&str>) -> BTreeSet<LogicalKey> {
        relevant_keys(selected_trace, &self.committed.topology, &self.committed.scene)
    }

    pub fn cache(&self) -> &SceneCache {
        &self.cache
    }

    pub fn scene(&self) -> &Scene {
        &self.committed.scene
    }

    pub fn topology(&self) -> &Topology {
        &self.committed.topology
    }

    pub fn layout(&self) -> &Layout {
        &self.committed.layout
    }

    pub fn magistrals(&self) -> &[RoutedMagistral] {
        &self.committed.magistrals
    }

    pub fn diagram_diagonal(&self) -> f64 {
        self.committed.diagonal
    }

    pub fn default_camera(&self) -> CameraFeed {
        let diagonal = self.committed.diagonal.max(self.thresholds.minimum_diagonal);
        CameraFeed {
            distance_to_nearest_relevant_object: diagonal * DEFAULT_VIEW_FACTOR,
        }
    }

    pub fn settings(&self) -> Option<&Settings> {
        self.previous.as_ref().map(|previous| &previous.settings)
    }

    pub fn summary(&self) -> PassSummary {
        let committed = &self.committed;
        PassSummary {
            generation: self.cache.generation(),
            endpoints: committed.topology.endpoints().len(),
            connections: committed.topology.connections().len(),
            dropped_connections: committed.topology.dropped_connections(),
            duplicate_endpoints: committed.topology.duplicate_endpoints(),
            tenants: committed.layout.spatial.tenants.len(),
            clusters: committed.layout.clusters.clusters.len(),
            services: committed.topology.service_count(),
            magistrals: committed.magistrals.len(),
            branches: committed.branches.len(),
            diagram_diagonal: committed.diagonal,
            primitives: committed
                .scene
                .count_by_kind()
                .into_iter()
                .map(|(kind, count)| (kind.label().to_owned(), count))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lod::LodLevel;
    use crate::topology::{EdgeRecord, NodeRecord, synthetic_snapshot};

    fn small_snapshot() -> Snapshot {
        let node = |id: &str, tenant: &str| NodeRecord {
            id: id.to_owned(),
            label: id.to_owned(),
            service: "svc".to_owned(),
            tenant: tenant.to_owned(),
        };
        let edge = |id: &str, source: &str, target: &str| EdgeRecord {
            id: id.to_owned(),
            source: source.to_owned(),
            target: target.to_owned(),
            connection_count: 2,
            status_counts: BTreeMap::from([("200".to_owned(), 2)]),
            trace_id: None,
        };
        Snapshot {
            nodes: vec![node("a1", "t1"), node("a2", "t1"), node("b1", "t2")],
            edges: vec![edge("local", "a1", "a2"), edge("remote", "a1", "b1")],
        }
    }

    #[test]
    fn stale_passes_are_rejected() {
        let snapshot = synthetic_snapshot(3, 1);
        let settings = Settings::default();
        let mut engine = Engine::new();

        let older = engine.begin_pass();
        let newer = engine.begin_pass();
        let stale = prepare_pass(older, &snapshot, &settings);
        let fresh = prepare_pass(newer, &snapshot, &settings);

        assert_eq!(
            engine.apply(stale),
            Err(EngineError::StalePass { pass: 1, latest: 2 })
        );
        assert!(engine.cache().is_empty());

        let delta = engine.apply(fresh).expect("latest pass applies");
        assert_eq!(delta.to_add.len(), engine.cache().len());
    }

    #[test]
    fn applied_pass_cannot_be_replayed_after_a_newer_one() {
        let snapshot = synthetic_snapshot(2, 4);
        let settings = Settings::default();
        let mut engine = Engine::new();

        let first = engine.begin_pass();
        let prepared = prepare_pass(first, &snapshot, &settings);
        engine.update(&snapshot, &settings);

        assert!(matches!(
            engine.apply(prepared),
            Err(EngineError::StalePass { pass: 1, .. })
        ));
    }

    #[test]
    fn invalid_settings_are_sanitized() {
        let mut engine = Engine::new();
        let settings = Settings {
            node_spacing: -1.0,
            ..Settings::default()
        };
        engine.update(&synthetic_snapshot(2, 0), &settings);

        assert_eq!(
            engine.settings().map(|settings| settings.node_spacing),
            Some(Settings::default().node_spacing)
        );
    }

    #[test]
    fn frame_reads_without_mutating() {
        let mut engine = Engine::new();
        engine.update(&small_snapshot(), &Settings::default());
        let generation = engine.cache().generation();

        let camera = CameraFeed {
            distance_to_nearest_relevant_object: 0.0,
        };
        let first = engine.frame(camera, 0.0);
        let later = engine.frame(camera, 0.5);

        assert_eq!(first.lod.level, LodLevel::High);
        assert_eq!(engine.cache().generation(), generation);
        assert_eq!(first.flows.len(), later.flows.len());
        assert!(!first.flows.is_empty());
        for flow in first.flows.iter().chain(&later.flows) {
            assert!((0.0..1.0).contains(&flow.progress));
        }
    }

    #[test]
    fn far_camera_hides_detail_flows() {
        let mut engine = Engine::new();
        engine.update(&small_snapshot(), &Settings::default());

        let frame = engine.frame(
            CameraFeed {
                distance_to_nearest_relevant_object: engine.diagram_diagonal() * 10.0,
            },
            1.0,
        );

        assert_eq!(frame.lod.level, LodLevel::Low);
        assert!(!frame.flows.is_empty());
        assert!(
            frame
                .flows
                .iter()
                .all(|flow| flow.key.kind() == PrimitiveKind::MagistralSegment)
        );
    }

    #[test]
    fn summary_counts_primitives() {
        let mut engine = Engine::new();
        engine.update(&synthetic_snapshot(3, 9), &Settings::default());
        let summary = engine.summary();

        assert_eq!(summary.generation, 1);
        assert_eq!(summary.tenants, 3);
        assert_eq!(summary.primitives["tenant-sphere"], 3);
        assert_eq!(summary.primitives["endpoint"], summary.endpoints);
    }

    #[test]
    fn default_camera_shows_full_detail_on_small_graphs() {
        let mut engine = Engine::new();
        engine.update(&small_snapshot(), &Settings::default());

        let frame = engine.frame(engine.default_camera(), 0.0);
        assert_eq!(frame.lod.level, LodLevel::High);
    }
}
