use eframe::egui::{self, Align, Key, Layout, Response, Ui};
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;

use tenant_atlas::lod::LodLevel;
use tenant_atlas::util::format_count;

use super::super::ViewModel;

const SLIDER_KEY_BASE_RATE: f64 = 10.0;
const SLIDER_KEY_ACCEL_PER_SEC: f64 = 9.0;
const SLIDER_KEY_ACCEL_MAX: f64 = 40.0;
const TRACE_LIST_LIMIT: usize = 200;

#[derive(Clone, Copy, Default)]
struct SliderKeyHoldState {
    positive_secs: f64,
    negative_secs: f64,
}

fn slider_key_accel_multiplier(hold_secs: f64) -> f64 {
    let ramp = hold_secs * SLIDER_KEY_ACCEL_PER_SEC;
    (1.0 + ramp + ramp * ramp * 0.15).min(SLIDER_KEY_ACCEL_MAX)
}

fn default_slider_key_step(min: f64, max: f64) -> f64 {
    ((max - min) / 200.0).max(0.0005)
}

/// Holding an arrow key on a focused slider moves it faster the longer it is held.
fn apply_slider_arrow_acceleration(
    ui: &Ui,
    response: &Response,
    value: &mut f64,
    min: f64,
    max: f64,
    step: f64,
) -> bool {
    let state_id = response.id.with("arrow_key_hold_state");
    let mut hold_state = ui.ctx().data(|data| {
        data.get_temp::<SliderKeyHoldState>(state_id)
            .unwrap_or_default()
    });

    if !response.has_focus() {
        ui.ctx()
            .data_mut(|data| data.insert_temp(state_id, SliderKeyHoldState::default()));
        return false;
    }

    let (delta_time, increase_down, decrease_down) = ui.input(|input| {
        (
            f64::from(input.stable_dt.min(0.1)),
            input.key_down(Key::ArrowRight) || input.key_down(Key::ArrowUp),
            input.key_down(Key::ArrowLeft) || input.key_down(Key::ArrowDown),
        )
    });

    hold_state.positive_secs = if increase_down {
        hold_state.positive_secs + delta_time
    } else {
        0.0
    };
    hold_state.negative_secs = if decrease_down {
        hold_state.negative_secs + delta_time
    } else {
        0.0
    };
    ui.ctx()
        .data_mut(|data| data.insert_temp(state_id, hold_state));

    let direction = f64::from(i8::from(increase_down) - i8::from(decrease_down));
    if direction == 0.0 {
        return false;
    }

    let hold_secs = if direction > 0.0 {
        hold_state.positive_secs
    } else {
        hold_state.negative_secs
    };
    let speed = SLIDER_KEY_BASE_RATE * slider_key_accel_multiplier(hold_secs);

    let old_value = *value;
    *value = (*value + direction * step * speed * delta_time).clamp(min, max);
    ui.ctx().request_repaint();
    (*value - old_value).abs() > f64::EPSILON
}

fn spacing_slider(ui: &mut Ui, value: &mut f64, min: f64, max: f64, text: &str, hover: &str) -> bool {
    let slider = ui
        .add(
            egui::Slider::new(value, min..=max)
                .text(text)
                .clamping(egui::SliderClamping::Always),
        )
        .on_hover_text(hover);
    if slider.hovered() {
        slider.request_focus();
    }

    let mut changed = slider.drag_stopped() || (slider.changed() && !slider.dragged());
    changed |= apply_slider_arrow_acceleration(
        ui,
        &slider,
        value,
        min,
        max,
        default_slider_key_step(min, max),
    );
    changed
}

fn lod_hint(level: LodLevel) -> &'static str {
    match level {
        LodLevel::High => "All primitives, full tube detail.",
        LodLevel::Medium => "All primitives, reduced tube detail.",
        LodLevel::Low => "Tenant spheres, labels and magistrals only.",
    }
}

impl ViewModel {
    pub(in crate::app) fn draw_controls(&mut self, ui: &mut Ui) {
        let mut changed = false;

        ui.heading("Layout");
        changed |= spacing_slider(
            ui,
            &mut self.settings.node_spacing,
            40.0,
            400.0,
            "Node spacing",
            "Distance between endpoints of one service.",
        );
        changed |= spacing_slider(
            ui,
            &mut self.settings.cluster_spacing,
            200.0,
            3000.0,
            "Cluster spacing",
            "Horizontal distance between tenant clusters.",
        );
        changed |= spacing_slider(
            ui,
            &mut self.settings.cluster_spacing_y,
            20.0,
            1000.0,
            "Cluster spacing Y",
            "Vertical offset between stacked tenant clusters.",
        );

        ui.separator();
        ui.heading("Appearance");
        let mut brightness = f64::from(self.settings.brightness);
        if spacing_slider(
            ui,
            &mut brightness,
            0.2,
            2.0,
            "Brightness",
            "Scales every primitive color.",
        ) {
            self.settings.brightness = brightness as f32;
            changed = true;
        } else if (brightness as f32 - self.settings.brightness).abs() > f32::EPSILON {
            // Mid-drag: show the value, commit on release.
            self.settings.brightness = brightness as f32;
        }
        changed |= ui
            .checkbox(&mut self.settings.show_labels, "Show labels")
            .changed();
        changed |= ui
            .checkbox(&mut self.settings.show_arrows, "Show arrows")
            .on_hover_text("Endpoint-to-endpoint arrows inside each tenant.")
            .changed();

        if changed {
            self.request_pass();
        }

        ui.separator();
        self.draw_trace_search(ui);

        ui.separator();
        self.draw_stats(ui);

        ui.checkbox(&mut self.show_fps_bar, "Show FPS in top bar");
    }

    fn draw_trace_search(&mut self, ui: &mut Ui) {
        ui.heading("Trace");
        ui.horizontal(|ui| {
            ui.add(egui::TextEdit::singleline(&mut self.search).hint_text("Search trace ids"));
            if ui
                .add_enabled(self.selected_trace.is_some(), egui::Button::new("Clear"))
                .clicked()
            {
                self.selected_trace = None;
            }
        });

        if let Some(selected) = &self.selected_trace {
            let relevant = self.engine.relevant_keys(Some(selected.as_str())).len();
            ui.label(format!("{relevant} primitives on this trace"));
        }

        if self.trace_ids.is_empty() {
            ui.weak("No connections carry a trace id.");
            return;
        }

        let query = self.search.trim();
        let matcher = SkimMatcherV2::default();
        let mut matches = self
            .trace_ids
            .iter()
            .filter_map(|trace| {
                if query.is_empty() {
                    return Some((0, trace));
                }
                matcher.fuzzy_match(trace, query).map(|score| (score, trace))
            })
            .collect::<Vec<_>>();
        matches.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(b.1)));

        let mut clicked = None;
        egui::ScrollArea::vertical()
            .id_salt("trace_list")
            .max_height(180.0)
            .auto_shrink([false, true])
            .show(ui, |ui| {
                for (_, trace) in matches.iter().take(TRACE_LIST_LIMIT) {
                    let is_selected = self.selected_trace.as_deref() == Some(trace.as_str());
                    if ui.selectable_label(is_selected, trace.as_str()).clicked() {
                        clicked = Some((*trace).clone());
                    }
                }
            });
        if matches.len() > TRACE_LIST_LIMIT {
            ui.weak(format!("{} more not shown", matches.len() - TRACE_LIST_LIMIT));
        }

        if let Some(trace) = clicked {
            self.selected_trace = if self.selected_trace.as_ref() == Some(&trace) {
                None
            } else {
                Some(trace)
            };
        }
    }

    fn draw_stats(&self, ui: &mut Ui) {
        let frame = self.engine.frame(self.camera_feed(), 0.0);
        let summary = self.engine.summary();

        ui.heading("Scene");
        let row = |ui: &mut Ui, name: &str, value: String| {
            ui.horizontal(|ui| {
                ui.label(name);
                ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                    ui.monospace(value);
                });
            });
        };

        ui.horizontal(|ui| {
            ui.label("LOD");
            ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                ui.monospace(frame.lod.level.label())
                    .on_hover_text(lod_hint(frame.lod.level));
            });
        });
        row(ui, "Relative distance", format!("{:.3}", frame.lod.relative_distance));
        row(ui, "Services", format_count(frame.lod.service_count as u64));
        row(ui, "Tenants", format_count(summary.tenants as u64));
        row(ui, "Magistrals", format_count(summary.magistrals as u64));
        row(ui, "Branches", format_count(summary.branches as u64));
        row(ui, "Cached entries", format_count(self.engine.cache().len() as u64));
        if summary.dropped_connections > 0 {
            row(ui, "Dropped edges", format_count(summary.dropped_connections as u64));
        }
        if summary.duplicate_endpoints > 0 {
            row(ui, "Duplicate ids", format_count(summary.duplicate_endpoints as u64));
        }

        let delta = self.last_delta;
        ui.collapsing(format!("Last pass (generation {})", delta.generation), |ui| {
            row(ui, "Added", delta.added.to_string());
            row(ui, "Updated", delta.updated.to_string());
            row(ui, "Removed", delta.removed.to_string());
            row(ui, "Kept", delta.kept.to_string());
            if delta.invalidated {
                ui.weak("Spacing changed; cache was rebuilt.");
            }
        });
        if let Some(stats) = self.frame_rate.stats() {
            ui.collapsing("Frame rate", |ui| {
                row(ui, "Current", format!("{:.0}", stats.current));
                row(ui, "Average", format!("{:.1}", stats.average));
                row(ui, "Low / high", format!("{:.0} / {:.0}", stats.low, stats.high));
                row(ui, "Frame time", format!("{:.1} ms", stats.frame_ms()));
            });
        }
        if self.pending_pass.is_some() {
            ui.horizontal(|ui| {
                ui.spinner();
                ui.label("Updating scene...");
            });
        }
    }
}
