use eframe::egui::{self, Pos2, Rect, Ui};

use tenant_atlas::engine::CameraFeed;

use super::super::render_utils::circle_visible;
use super::super::ViewModel;

const ORBIT_SPEED: f64 = 0.008;
const PITCH_LIMIT: f64 = 1.45;
const MIN_CAMERA_DISTANCE: f64 = 20.0;

/// Screen-space pick target for one endpoint.
pub(in crate::app) struct PickTarget {
    pub(in crate::app) endpoint_id: String,
    pub(in crate::app) position: Pos2,
    pub(in crate::app) radius: f32,
}

impl ViewModel {
    pub(in crate::app) fn camera_feed(&self) -> CameraFeed {
        CameraFeed {
            distance_to_nearest_relevant_object: self.camera.distance,
        }
    }

    fn max_camera_distance(&self) -> f64 {
        (self.engine.diagram_diagonal() * 4.0).max(MIN_CAMERA_DISTANCE * 10.0)
    }

    pub(in crate::app) fn handle_scene_zoom(&mut self, ui: &Ui, response: &egui::Response) {
        if !response.hovered() {
            return;
        }

        let scroll = ui.input(|input| input.raw_scroll_delta.y);
        if scroll.abs() <= f32::EPSILON {
            return;
        }

        let zoom_factor = (1.0 - f64::from(scroll) * 0.0018).clamp(0.85, 1.15);
        self.camera.distance =
            (self.camera.distance * zoom_factor).clamp(MIN_CAMERA_DISTANCE, self.max_camera_distance());
    }

    pub(in crate::app) fn handle_scene_drag(&mut self, response: &egui::Response) {
        if response.dragged_by(egui::PointerButton::Secondary)
            || response.dragged_by(egui::PointerButton::Middle)
        {
            self.camera.pan += response.drag_delta();
        } else if response.dragged_by(egui::PointerButton::Primary) {
            let delta = response.drag_delta();
            self.camera.yaw += f64::from(delta.x) * ORBIT_SPEED;
            self.camera.pitch =
                (self.camera.pitch + f64::from(delta.y) * ORBIT_SPEED).clamp(-PITCH_LIMIT, PITCH_LIMIT);
        }
    }

    pub(in crate::app) fn hovered_endpoint<'a>(
        &self,
        ui: &Ui,
        rect: Rect,
        targets: &'a [PickTarget],
    ) -> Option<&'a PickTarget> {
        let pointer = ui.input(|input| input.pointer.hover_pos())?;
        if !rect.contains(pointer) {
            return None;
        }

        targets
            .iter()
            .filter(|target| circle_visible(rect, target.position, target.radius))
            .filter_map(|target| {
                let distance = target.position.distance(pointer);
                (distance <= target.radius).then_some((target, distance))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(target, _)| target)
    }
}
