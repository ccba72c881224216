use std::collections::BTreeSet;

use eframe::egui::{
    Align2, Color32, FontId, Painter, Pos2, Rect, Sense, Shape as EguiShape, Stroke, Ui, vec2,
};
use glam::DVec3;

use tenant_atlas::lod::LodLevel;
use tenant_atlas::scene::{LogicalKey, Primitive, PrimitiveKind, Shape};
use tenant_atlas::util::short_label;

use super::super::render_utils::{
    Projection, blend_color, circle_visible, dim_color, draw_background, edge_visible, to_color32,
};
use super::super::ViewModel;
use super::interaction::PickTarget;

const DRAW_ORDER: [PrimitiveKind; 7] = [
    PrimitiveKind::TenantSphere,
    PrimitiveKind::MagistralSegment,
    PrimitiveKind::Branch,
    PrimitiveKind::Arrow,
    PrimitiveKind::Endpoint,
    PrimitiveKind::ServiceLabel,
    PrimitiveKind::TenantLabel,
];

const HOVER_COLOR: Color32 = Color32::from_rgb(255, 164, 101);
const TRACE_COLOR: Color32 = Color32::from_rgb(247, 194, 111);

struct DrawContext<'a> {
    painter: &'a Painter,
    rect: Rect,
    projection: Projection,
    level: LodLevel,
    relevant: &'a BTreeSet<LogicalKey>,
    hovered: Option<&'a str>,
}

impl DrawContext<'_> {
    fn color_for(&self, primitive: &Primitive) -> Color32 {
        let base = to_color32(primitive.color);
        if let (Some(hovered), LogicalKey::Endpoint(id)) = (self.hovered, &primitive.key)
            && hovered == id
        {
            return HOVER_COLOR;
        }
        if self.relevant.is_empty() {
            base
        } else if self.relevant.contains(&primitive.key) {
            blend_color(base, TRACE_COLOR, 0.35)
        } else {
            dim_color(base, 0.3)
        }
    }

    /// Every `stride`-th point, always ending on the last one.
    fn screen_path(&self, points: &[DVec3]) -> Vec<Pos2> {
        let stride = (32 / self.level.radial_segments().max(1)) as usize;
        let mut path = points
            .iter()
            .step_by(stride.max(1))
            .map(|point| self.projection.to_screen(*point))
            .collect::<Vec<_>>();
        if let Some(last) = points.last()
            && (points.len() - 1) % stride.max(1) != 0
        {
            path.push(self.projection.to_screen(*last));
        }
        path
    }

    fn polyline(&self, path: &[Pos2], stroke: Stroke) {
        for pair in path.windows(2) {
            if edge_visible(self.rect, pair[0], pair[1], stroke.width) {
                self.painter.line_segment([pair[0], pair[1]], stroke);
            }
        }
    }

    fn arrow_head(&self, path: &[Pos2], color: Color32) {
        let [.., from, tip] = path else {
            return;
        };
        let direction = (*tip - *from).normalized();
        if !direction.is_finite() || !circle_visible(self.rect, *tip, 8.0) {
            return;
        }
        let normal = vec2(-direction.y, direction.x);
        let base = *tip - direction * 8.0;
        self.painter.add(EguiShape::convex_polygon(
            vec![*tip, base + normal * 4.0, base - normal * 4.0],
            color,
            Stroke::NONE,
        ));
    }

    fn draw(&self, primitive: &Primitive) {
        let color = self.color_for(primitive);
        match &primitive.shape {
            Shape::Sphere { center, radius } => {
                let position = self.projection.to_screen(*center);
                let radius = self.projection.length(*radius).max(2.0);
                if !circle_visible(self.rect, position, radius) {
                    return;
                }
                let alpha = self.level.tenant_sphere_opacity();
                let fill = color.gamma_multiply(alpha);
                self.painter.circle_filled(position, radius, fill);
                self.painter
                    .circle_stroke(position, radius, Stroke::new(1.0, color.gamma_multiply(0.5)));
            }
            Shape::Tube { points, radius } => {
                let width = (self.projection.length(*radius) * 2.0).clamp(1.0, 8.0);
                self.polyline(&self.screen_path(points), Stroke::new(width, color));
            }
            Shape::Line { from, to } => {
                let start = self.projection.to_screen(*from);
                let end = self.projection.to_screen(*to);
                if edge_visible(self.rect, start, end, 1.0) {
                    self.painter.line_segment([start, end], Stroke::new(1.2, color));
                }
            }
            Shape::Arrow { points } => {
                let path = self.screen_path(points);
                self.polyline(&path, Stroke::new(1.4, color));
                self.arrow_head(&path, color);
            }
            Shape::Segment {
                center,
                height,
                radius,
            } => {
                let half = DVec3::Y * (*height * 0.5);
                let bottom = self.projection.to_screen(*center - half);
                let top = self.projection.to_screen(*center + half);
                let width = (self.projection.length(*radius) * 2.0).clamp(2.0, 30.0);
                if edge_visible(self.rect, bottom, top, width) {
                    self.painter.line_segment([bottom, top], Stroke::new(width, color));
                }
            }
            Shape::Label { position, text } => {
                let position = self.projection.to_screen(*position);
                if !self.rect.contains(position) {
                    return;
                }
                let size = if primitive.kind() == PrimitiveKind::TenantLabel {
                    15.0
                } else {
                    12.0
                };
                self.painter.text(
                    position,
                    Align2::CENTER_BOTTOM,
                    text,
                    FontId::proportional(size),
                    color,
                );
            }
        }
    }
}

fn diagram_focus<'a>(primitives: impl Iterator<Item = &'a Primitive>) -> DVec3 {
    let mut bounds: Option<(DVec3, DVec3)> = None;
    for primitive in primitives.filter(|primitive| primitive.kind() == PrimitiveKind::TenantSphere) {
        let anchor = primitive.shape.anchor();
        bounds = Some(match bounds {
            Some((min, max)) => (min.min(anchor), max.max(anchor)),
            None => (anchor, anchor),
        });
    }
    bounds.map_or(DVec3::ZERO, |(min, max)| (min + max) * 0.5)
}

impl ViewModel {
    pub(in crate::app) fn draw_scene(&mut self, ui: &mut Ui) {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        let painter = ui.painter_at(rect);

        self.handle_scene_zoom(ui, &response);
        self.handle_scene_drag(&response);

        let focus = diagram_focus(
            self.engine
                .cache()
                .entries()
                .map(|entry| entry.metadata().primitive()),
        );
        let projection = Projection::new(rect, &self.camera, focus);
        draw_background(&painter, rect, &projection, self.camera.distance);

        if self.engine.cache().is_empty() {
            self.drawn_primitive_count = 0;
            painter.text(
                rect.center(),
                Align2::CENTER_CENTER,
                "No endpoints in this snapshot.",
                FontId::proportional(14.0),
                Color32::from_gray(200),
            );
            return;
        }

        let elapsed = ui.input(|input| input.time);
        let frame = self.engine.frame(self.camera_feed(), elapsed);
        let primitives = self
            .engine
            .cache()
            .entries()
            .map(|entry| entry.metadata().primitive())
            .filter(|primitive| frame.shows(primitive))
            .collect::<Vec<_>>();

        let targets = primitives
            .iter()
            .filter_map(|primitive| match (&primitive.key, &primitive.shape) {
                (LogicalKey::Endpoint(id), Shape::Segment { center, height, radius }) => {
                    Some(PickTarget {
                        endpoint_id: id.clone(),
                        position: projection.to_screen(*center),
                        radius: projection
                            .length((*radius).max(*height * 0.5))
                            .max(4.0),
                    })
                }
                _ => None,
            })
            .collect::<Vec<_>>();
        let hovered = self
            .hovered_endpoint(ui, rect, &targets)
            .map(|target| target.endpoint_id.clone());

        let relevant = self.engine.relevant_keys(self.selected_trace.as_deref());
        let draw = DrawContext {
            painter: &painter,
            rect,
            projection,
            level: frame.lod.level,
            relevant: &relevant,
            hovered: hovered.as_deref(),
        };

        for kind in DRAW_ORDER {
            let mut batch = primitives
                .iter()
                .filter(|primitive| primitive.kind() == kind)
                .map(|primitive| (projection.project(primitive.shape.anchor()).1, *primitive))
                .collect::<Vec<_>>();
            if kind == PrimitiveKind::TenantSphere {
                batch.sort_by(|a, b| b.0.total_cmp(&a.0));
            }
            for (_, primitive) in batch {
                draw.draw(primitive);
            }
        }
        self.drawn_primitive_count = primitives.len();

        for flow in &frame.flows {
            if !relevant.is_empty() && !relevant.contains(&flow.key) {
                continue;
            }
            let position = projection.to_screen(flow.position);
            if circle_visible(rect, position, 3.0) {
                painter.circle_filled(position, 3.0, Color32::from_rgba_unmultiplied(240, 240, 240, 210));
            }
        }
        if !frame.flows.is_empty() || response.dragged() {
            ui.ctx().request_repaint();
        }

        if let Some(id) = &hovered
            && let Some(endpoint) = self.engine.topology().endpoint(id)
        {
            let panel_text = format!(
                "{}  |  {}  |  {}",
                short_label(&endpoint.label),
                endpoint.service,
                endpoint.tenant
            );
            painter.text(
                rect.left_top() + vec2(10.0, 10.0),
                Align2::LEFT_TOP,
                panel_text,
                FontId::proportional(13.0),
                Color32::from_gray(240),
            );
        }

        painter.text(
            rect.left_bottom() + vec2(10.0, -10.0),
            Align2::LEFT_BOTTOM,
            format!(
                "LOD {}  |  distance {:.0}",
                frame.lod.level.label(),
                self.camera.distance
            ),
            FontId::proportional(12.0),
            Color32::from_gray(170),
        );
    }
}
