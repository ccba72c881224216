use eframe::egui::{Color32, Painter, Pos2, Rect, Stroke, Vec2, lerp};
use glam::DVec3;

use tenant_atlas::scene::Rgba;

use super::OrbitCamera;

const BACKGROUND: Color32 = Color32::from_rgb(19, 23, 29);
const GRID_COLOR: Color32 = Color32::from_rgba_premultiplied(24, 28, 32, 70);
const GRID_HALF_LINES: i32 = 12;

pub(super) fn blend_color(base: Color32, overlay: Color32, amount: f32) -> Color32 {
    let amount = amount.clamp(0.0, 1.0);
    let (base, overlay) = (base.to_array(), overlay.to_array());
    let [r, g, b, a] = std::array::from_fn(|channel| {
        lerp(f32::from(base[channel])..=f32::from(overlay[channel]), amount).round() as u8
    });
    Color32::from_rgba_premultiplied(r, g, b, a)
}

/// Darkens toward black; alpha never drops below 45%.
pub(super) fn dim_color(color: Color32, factor: f32) -> Color32 {
    let factor = factor.clamp(0.0, 1.0);
    let alpha_factor = lerp(0.45..=1.0, factor);
    let [r, g, b, a] = color.to_srgba_unmultiplied();
    let scale = |channel: u8, by: f32| (f32::from(channel) * by) as u8;
    Color32::from_rgba_unmultiplied(
        scale(r, factor),
        scale(g, factor),
        scale(b, factor),
        scale(a, alpha_factor),
    )
}

/// Power-of-ten spacing for the floor grid at a given camera distance.
fn grid_step(camera_distance: f64) -> f64 {
    10_f64.powf((camera_distance.max(1.0) / 4.0).log10().floor())
}

/// Fills the viewport and draws a floor grid through the focus point.
pub(super) fn draw_background(
    painter: &Painter,
    rect: Rect,
    projection: &Projection,
    camera_distance: f64,
) {
    painter.rect_filled(rect, 0.0, BACKGROUND);

    let step = grid_step(camera_distance);
    let focus = projection.focus;
    let origin = DVec3::new(
        (focus.x / step).round() * step,
        focus.y,
        (focus.z / step).round() * step,
    );
    let reach = step * f64::from(GRID_HALF_LINES);
    let stroke = Stroke::new(1.0, GRID_COLOR);

    for line in -GRID_HALF_LINES..=GRID_HALF_LINES {
        let offset = f64::from(line) * step;
        let lines = [
            (DVec3::new(offset, 0.0, -reach), DVec3::new(offset, 0.0, reach)),
            (DVec3::new(-reach, 0.0, offset), DVec3::new(reach, 0.0, offset)),
        ];
        for (from, to) in lines {
            let start = projection.to_screen(origin + from);
            let end = projection.to_screen(origin + to);
            if edge_visible(rect, start, end, 0.0) {
                painter.line_segment([start, end], stroke);
            }
        }
    }
}

pub(super) fn circle_visible(rect: Rect, position: Pos2, radius: f32) -> bool {
    rect.expand(radius).contains(position)
}

pub(super) fn edge_visible(rect: Rect, start: Pos2, end: Pos2, padding: f32) -> bool {
    if !Rect::from_two_pos(start, end).expand(padding).intersects(rect) {
        return false;
    }
    if rect.contains(start) || rect.contains(end) {
        return true;
    }

    let corners = [
        rect.left_top(),
        rect.right_top(),
        rect.right_bottom(),
        rect.left_bottom(),
    ];
    (0..corners.len())
        .any(|i| segments_intersect(start, end, corners[i], corners[(i + 1) % corners.len()]))
}

fn segments_intersect(a1: Pos2, a2: Pos2, b1: Pos2, b2: Pos2) -> bool {
    let side = |from: Pos2, to: Pos2, point: Pos2| {
        let (edge, offset) = (to - from, point - from);
        edge.x * offset.y - edge.y * offset.x
    };

    Rect::from_two_pos(a1, a2).intersects(Rect::from_two_pos(b1, b2))
        && side(a1, a2, b1) * side(a1, a2, b2) <= 0.0
        && side(b1, b2, a1) * side(b1, b2, a2) <= 0.0
}

pub(super) fn to_color32(color: Rgba) -> Color32 {
    let [r, g, b, a] = color.to_rgba8();
    Color32::from_rgba_unmultiplied(r, g, b, a)
}

/// Orthographic view of the diagram: yaw about the vertical axis, then pitch.
#[derive(Clone, Copy, Debug)]
pub(super) struct Projection {
    origin: Pos2,
    focus: DVec3,
    yaw_sin: f64,
    yaw_cos: f64,
    pitch_sin: f64,
    pitch_cos: f64,
    scale: f64,
}

impl Projection {
    pub(super) fn new(rect: Rect, camera: &OrbitCamera, focus: DVec3) -> Self {
        let (yaw_sin, yaw_cos) = camera.yaw.sin_cos();
        let (pitch_sin, pitch_cos) = camera.pitch.sin_cos();
        Self {
            origin: rect.center() + camera.pan,
            focus,
            yaw_sin,
            yaw_cos,
            pitch_sin,
            pitch_cos,
            scale: f64::from(rect.height().max(1.0)) / camera.distance.max(1.0),
        }
    }

    /// Screen position and depth; larger depth is further from the viewer.
    pub(super) fn project(&self, world: DVec3) -> (Pos2, f32) {
        let p = world - self.focus;
        let x = p.x * self.yaw_cos - p.z * self.yaw_sin;
        let z = p.x * self.yaw_sin + p.z * self.yaw_cos;
        let y = p.y * self.pitch_cos - z * self.pitch_sin;
        let depth = p.y * self.pitch_sin + z * self.pitch_cos;

        let screen = self.origin + Vec2::new((x * self.scale) as f32, (-y * self.scale) as f32);
        (screen, depth as f32)
    }

    pub(super) fn to_screen(&self, world: DVec3) -> Pos2 {
        self.project(world).0
    }

    /// World length expressed in points.
    pub(super) fn length(&self, world: f64) -> f32 {
        (world * self.scale) as f32
    }
}
