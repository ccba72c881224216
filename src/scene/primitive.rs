use glam::DVec3;
use serde::Serialize;

use super::key::{LogicalKey, PrimitiveKind};

/// Linear RGBA color with components in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Rgba {
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// HSV color from a hue in `[0, 1)`.
    pub fn from_hue(hue: f64, saturation: f32, value: f32) -> Self {
        let h = (hue.rem_euclid(1.0) * 6.0) as f32;
        let sector = h.floor();
        let f = h - sector;
        let p = value * (1.0 - saturation);
        let q = value * (1.0 - saturation * f);
        let t = value * (1.0 - saturation * (1.0 - f));

        let (r, g, b) = match sector as u8 {
            0 => (value, t, p),
            1 => (q, value, p),
            2 => (p, value, t),
            3 => (p, q, value),
            4 => (t, p, value),
            _ => (value, p, q),
        };
        Self::new(r, g, b, 1.0)
    }

    pub fn lerp(self, other: Self, amount: f32) -> Self {
        let amount = amount.clamp(0.0, 1.0);
        let mix = |a: f32, b: f32| a * (1.0 - amount) + b * amount;
        Self::new(
            mix(self.r, other.r),
            mix(self.g, other.g),
            mix(self.b, other.b),
            mix(self.a, other.a),
        )
    }

    pub fn scaled(self, brightness: f32) -> Self {
        let scale = |channel: f32| (channel * brightness).clamp(0.0, 1.0);
        Self::new(scale(self.r), scale(self.g), scale(self.b), self.a)
    }

    pub fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }

    pub fn to_rgba8(self) -> [u8; 4] {
        let byte = |channel: f32| (channel.clamp(0.0, 1.0) * 255.0).round() as u8;
        [byte(self.r), byte(self.g), byte(self.b), byte(self.a)]
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Shape {
    /// Vertical cylinder slice centered on `center`.
    Segment {
        center: DVec3,
        height: f64,
        radius: f64,
    },
    Label {
        position: DVec3,
        text: String,
    },
    Sphere {
        center: DVec3,
        radius: f64,
    },
    Tube {
        points: Vec<DVec3>,
        radius: f64,
    },
    Line {
        from: DVec3,
        to: DVec3,
    },
    /// Polyline with a head at the last point.
    Arrow {
        points: Vec<DVec3>,
    },
}

impl Shape {
    pub fn anchor(&self) -> DVec3 {
        match self {
            Self::Segment { center, .. } | Self::Sphere { center, .. } => *center,
            Self::Label { position, .. } => *position,
            Self::Line { from, to } => from.lerp(*to, 0.5),
            Self::Tube { points, .. } | Self::Arrow { points } => {
                points.get(points.len() / 2).copied().unwrap_or(DVec3::ZERO)
            }
        }
    }

    pub fn path(&self) -> Option<&[DVec3]> {
        match self {
            Self::Tube { points, .. } | Self::Arrow { points } => Some(points.as_slice()),
            Self::Segment { .. } | Self::Label { .. } | Self::Sphere { .. } | Self::Line { .. } => {
                None
            }
        }
    }
}

/// Everything the renderer needs to materialize one cached object.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Primitive {
    pub key: LogicalKey,
    pub shape: Shape,
    pub color: Rgba,
    /// Static visibility from settings and stub hiding. The frame's LOD
    /// level may still hide a visible primitive.
    pub visible: bool,
}

impl Primitive {
    pub fn kind(&self) -> PrimitiveKind {
        self.key.kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hues_cover_the_primary_colors() {
        assert_eq!(Rgba::from_hue(0.0, 1.0, 1.0), Rgba::new(1.0, 0.0, 0.0, 1.0));
        assert_eq!(Rgba::from_hue(1.0 / 3.0, 1.0, 1.0).to_rgba8(), [0, 255, 0, 255]);
        assert_eq!(Rgba::from_hue(2.0 / 3.0, 1.0, 1.0).to_rgba8(), [0, 0, 255, 255]);
    }

    #[test]
    fn brightness_clamps_and_keeps_alpha() {
        let color = Rgba::new(0.6, 0.2, 0.0, 0.5).scaled(2.0);
        assert_eq!(color, Rgba::new(1.0, 0.4, 0.0, 0.5));
    }

    #[test]
    fn path_shapes_expose_their_points() {
        let tube = Shape::Tube {
            points: vec![DVec3::ZERO, DVec3::X, DVec3::new(2.0, 0.0, 0.0)],
            radius: 1.0,
        };
        assert_eq!(tube.path().map(<[DVec3]>::len), Some(3));
        assert_eq!(tube.anchor(), DVec3::X);

        let line = Shape::Line {
            from: DVec3::ZERO,
            to: DVec3::new(0.0, 4.0, 0.0),
        };
        assert_eq!(line.path(), None);
        assert_eq!(line.anchor(), DVec3::new(0.0, 2.0, 0.0));
    }
}
