use eframe::egui::{self, Align, Context, Layout, Vec2};

use tenant_atlas::engine::Engine;
use tenant_atlas::settings::Settings;
use tenant_atlas::topology::Snapshot;
use tenant_atlas::util::format_count;

use super::super::{DeltaStats, OrbitCamera, ViewModel};
use super::fps::FrameRate;

impl ViewModel {
    pub(in crate::app) fn new(snapshot: Snapshot, settings: Settings) -> Self {
        let mut engine = Engine::new();
        let delta = engine.update(&snapshot, &settings);
        let camera = OrbitCamera {
            yaw: 0.6,
            pitch: 0.45,
            distance: engine.default_camera().distance_to_nearest_relevant_object,
            pan: Vec2::ZERO,
        };

        let mut model = Self {
            snapshot,
            engine,
            settings,
            pending_pass: None,
            camera,
            search: String::new(),
            selected_trace: None,
            trace_ids: Vec::new(),
            last_delta: DeltaStats::from(&delta),
            show_fps_bar: true,
            frame_rate: FrameRate::default(),
            drawn_primitive_count: 0,
        };
        model.refresh_trace_ids();
        model
    }

    pub(in crate::app) fn show(
        &mut self,
        ctx: &Context,
        source: &str,
        reload_requested: &mut bool,
        is_loading: bool,
    ) {
        self.update_fps_counter(ctx);
        self.poll_pass(ctx);

        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("tenant-atlas");
                    ui.separator();
                    let topology = self.engine.topology();
                    ui.label(format!("source: {source}"));
                    ui.label(format!("endpoints: {}", format_count(topology.endpoints().len() as u64)));
                    ui.label(format!(
                        "connections: {}",
                        format_count(topology.connections().len() as u64)
                    ));
                    if topology.dropped_connections() > 0 {
                        ui.label(format!("dropped: {}", topology.dropped_connections()))
                            .on_hover_text("Edges whose endpoints did not resolve.");
                    }
                    let reload_button =
                        ui.add_enabled(!is_loading, egui::Button::new("Reload snapshot"));
                    if reload_button.clicked() {
                        *reload_requested = true;
                    }
                    if ui.button("Reset view").clicked() {
                        self.camera.distance =
                            self.engine.default_camera().distance_to_nearest_relevant_object;
                        self.camera.pan = Vec2::ZERO;
                    }
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        if let Some(drawn_text) = self.drawn_primitives_text() {
                            ui.label(drawn_text);
                        }
                        if let Some(fps_text) = self.fps_display_text() {
                            ui.label(fps_text);
                        }
                    });
                });
            });

        egui::SidePanel::left("controls")
            .resizable(true)
            .default_width(330.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| self.draw_controls(ui));
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            if is_loading {
                ui.vertical_centered(|ui| {
                    ui.add_space(120.0);
                    ui.heading("Reloading topology snapshot...");
                    ui.add_space(8.0);
                    ui.spinner();
                });
            } else {
                self.draw_scene(ui);
            }
        });
    }
}
