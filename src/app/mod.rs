use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use anyhow::Result;
use eframe::egui::{self, Context, Vec2};

use tenant_atlas::engine::{Engine, PreparedPass, prepare_pass};
use tenant_atlas::scene::SceneDelta;
use tenant_atlas::settings::Settings;
use tenant_atlas::topology::{Snapshot, load_snapshot, synthetic_snapshot};

mod graph;
mod render_utils;
mod ui;

use ui::FrameRate;

/// Where the preview window gets its topology from.
#[derive(Clone, Debug)]
pub enum SnapshotSource {
    File(PathBuf),
    Synthetic { tenants: usize, seed: u64 },
}

impl SnapshotSource {
    pub fn load(&self) -> Result<Snapshot> {
        match self {
            Self::File(path) => load_snapshot(path),
            Self::Synthetic { tenants, seed } => Ok(synthetic_snapshot(*tenants, *seed)),
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::File(path) => path.display().to_string(),
            Self::Synthetic { tenants, seed } => format!("synthetic ({tenants} tenants, seed {seed})"),
        }
    }
}

pub struct AtlasApp {
    source: SnapshotSource,
    settings: Settings,
    state: AppState,
    reload_rx: Option<Receiver<Result<Snapshot, String>>>,
}

enum AppState {
    Loading {
        rx: Receiver<Result<Snapshot, String>>,
    },
    Ready(Box<ViewModel>),
    Error(String),
}

/// Yaw/pitch orbit around the origin with an orthographic projection.
#[derive(Clone, Copy, Debug)]
struct OrbitCamera {
    yaw: f64,
    pitch: f64,
    /// World extent shown across the canvas height; also the LOD distance.
    distance: f64,
    pan: Vec2,
}

#[derive(Clone, Copy, Debug, Default)]
struct DeltaStats {
    generation: u64,
    added: usize,
    updated: usize,
    removed: usize,
    kept: usize,
    invalidated: bool,
}

impl From<&SceneDelta> for DeltaStats {
    fn from(delta: &SceneDelta) -> Self {
        Self {
            generation: delta.generation,
            added: delta.to_add.len(),
            updated: delta.to_update.len(),
            removed: delta.to_remove.len(),
            kept: delta.to_keep.len(),
            invalidated: delta.invalidated,
        }
    }
}

struct ViewModel {
    snapshot: Snapshot,
    engine: Engine,
    settings: Settings,
    pending_pass: Option<Receiver<PreparedPass>>,
    camera: OrbitCamera,
    search: String,
    selected_trace: Option<String>,
    trace_ids: Vec<String>,
    last_delta: DeltaStats,
    show_fps_bar: bool,
    frame_rate: FrameRate,
    drawn_primitive_count: usize,
}

impl AtlasApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, source: SnapshotSource, settings: Settings) -> Self {
        let state = Self::start_load(source.clone());
        Self {
            source,
            settings,
            state,
            reload_rx: None,
        }
    }

    fn spawn_load(source: SnapshotSource) -> Receiver<Result<Snapshot, String>> {
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let result = source.load().map_err(|error| format!("{error:#}"));
            let _ = tx.send(result);
        });

        rx
    }

    fn start_load(source: SnapshotSource) -> AppState {
        AppState::Loading {
            rx: Self::spawn_load(source),
        }
    }

    fn ready(snapshot: Snapshot, settings: &Settings) -> AppState {
        AppState::Ready(Box::new(ViewModel::new(snapshot, settings.clone())))
    }
}

impl eframe::App for AtlasApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        let mut transition = None;

        match &mut self.state {
            AppState::Loading { rx } => {
                if let Ok(result) = rx.try_recv() {
                    transition = Some(match result {
                        Ok(snapshot) => Self::ready(snapshot, &self.settings),
                        Err(error) => AppState::Error(error),
                    });
                }

                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(120.0);
                        ui.heading("Loading topology snapshot...");
                        ui.add_space(8.0);
                        ui.spinner();
                    });
                });
                ctx.request_repaint();
            }
            AppState::Error(error) => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.heading("Failed to load topology snapshot");
                    ui.add_space(6.0);
                    ui.label(error.as_str());
                    ui.add_space(10.0);
                    if ui.button("Retry").clicked() {
                        transition = Some(Self::start_load(self.source.clone()));
                    }
                });
            }
            AppState::Ready(model) => {
                let mut reload_requested = false;
                let is_reloading = self.reload_rx.is_some();
                let source = self.source.describe();
                model.show(ctx, &source, &mut reload_requested, is_reloading);
                self.settings = model.settings.clone();

                if reload_requested {
                    self.reload_rx = Some(Self::spawn_load(self.source.clone()));
                }

                if let Some(rx) = self.reload_rx.take() {
                    match rx.try_recv() {
                        Ok(Ok(snapshot)) => model.replace_snapshot(snapshot),
                        Ok(Err(error)) => transition = Some(AppState::Error(error)),
                        Err(TryRecvError::Empty) => {
                            self.reload_rx = Some(rx);
                            ctx.request_repaint();
                        }
                        Err(TryRecvError::Disconnected) => {
                            transition =
                                Some(AppState::Error("Background load worker disconnected".to_owned()));
                        }
                    }
                }
            }
        }

        if let Some(next_state) = transition {
            self.reload_rx = None;
            self.state = next_state;
        }
    }
}

impl ViewModel {
    /// Prepares a pass on a worker thread. Beginning a new pass makes any
    /// earlier one stale, so only the latest request reaches the cache.
    fn request_pass(&mut self) {
        let ticket = self.engine.begin_pass();
        let snapshot = self.snapshot.clone();
        let settings = self.settings.clone();
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let _ = tx.send(prepare_pass(ticket, &snapshot, &settings));
        });

        self.pending_pass = Some(rx);
    }

    fn poll_pass(&mut self, ctx: &Context) {
        let Some(rx) = self.pending_pass.take() else {
            return;
        };

        match rx.try_recv() {
            Ok(prepared) => match self.engine.apply(prepared) {
                Ok(delta) => {
                    self.last_delta = DeltaStats::from(&delta);
                    self.refresh_trace_ids();
                }
                Err(error) => tracing::debug!(%error, "skipped update pass"),
            },
            Err(TryRecvError::Empty) => {
                self.pending_pass = Some(rx);
                ctx.request_repaint();
            }
            Err(TryRecvError::Disconnected) => {
                tracing::warn!("update pass worker disconnected");
            }
        }
    }

    fn replace_snapshot(&mut self, snapshot: Snapshot) {
        self.snapshot = snapshot;
        self.request_pass();
    }

    fn refresh_trace_ids(&mut self) {
        self.trace_ids = self
            .engine
            .topology()
            .connections()
            .iter()
            .filter_map(|connection| connection.trace_id.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        if let Some(selected) = &self.selected_trace
            && !self.trace_ids.contains(selected)
        {
            self.selected_trace = None;
        }
    }
}
