//! Level of detail selection from camera distance and graph size.
//!
//! The camera distance is first made relative to the diagram size, then
//! normalized into a practical zoom range and compared against two fixed
//! fractions of that range. Large graphs are always drawn coarse.

use glam::DVec3;
use serde::Serialize;

use crate::scene::PrimitiveKind;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum LodLevel {
    High,
    Medium,
    Low,
}

impl LodLevel {
    pub fn label(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    pub fn radial_segments(self) -> u32 {
        match self {
            Self::High => 32,
            Self::Medium => 8,
            Self::Low => 4,
        }
    }

    pub fn tenant_sphere_opacity(self) -> f32 {
        match self {
            Self::High | Self::Medium => 0.06,
            Self::Low => 0.85,
        }
    }

    /// Whether primitives of `kind` are drawn at this level.
    pub fn shows(self, kind: PrimitiveKind) -> bool {
        match kind {
            PrimitiveKind::TenantSphere
            | PrimitiveKind::TenantLabel
            | PrimitiveKind::MagistralSegment => true,
            PrimitiveKind::Endpoint
            | PrimitiveKind::ServiceLabel
            | PrimitiveKind::Branch
            | PrimitiveKind::Arrow => self != Self::Low,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct LodThresholds {
    pub min_practical_distance: f64,
    pub max_practical_distance: f64,
    /// Fraction of the normalized range up to which detail stays high.
    pub medium_fraction: f64,
    /// Fraction of the normalized range up to which detail stays medium.
    pub low_fraction: f64,
    /// Service count above which the level is forced to `Low`.
    pub service_override: usize,
    pub minimum_diagonal: f64,
}

impl Default for LodThresholds {
    fn default() -> Self {
        Self {
            min_practical_distance: 0.15,
            max_practical_distance: 2.65,
            medium_fraction: 0.20,
            low_fraction: 0.40,
            service_override: 100,
            minimum_diagonal: 100.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct LodEvaluation {
    pub level: LodLevel,
    pub relative_distance: f64,
    pub normalized_distance: f64,
    pub service_count: usize,
}

impl LodThresholds {
    pub fn evaluate(
        &self,
        camera_distance: f64,
        diagram_diagonal: f64,
        service_count: usize,
    ) -> LodEvaluation {
        let diagonal = if diagram_diagonal.is_finite() {
            diagram_diagonal.max(self.minimum_diagonal)
        } else {
            self.minimum_diagonal
        };
        let relative_distance = if camera_distance.is_finite() {
            camera_distance.max(0.0) / diagonal
        } else {
            f64::MAX
        };

        let span = (self.max_practical_distance - self.min_practical_distance).max(f64::EPSILON);
        let normalized_distance =
            ((relative_distance - self.min_practical_distance) / span).clamp(0.0, 1.0);

        let level = if service_count > self.service_override {
            LodLevel::Low
        } else if normalized_distance <= self.medium_fraction {
            LodLevel::High
        } else if normalized_distance <= self.low_fraction {
            LodLevel::Medium
        } else {
            LodLevel::Low
        };

        LodEvaluation {
            level,
            relative_distance,
            normalized_distance,
            service_count,
        }
    }
}

/// LOD with default thresholds.
pub fn evaluate(camera_distance: f64, diagram_diagonal: f64, service_count: usize) -> LodLevel {
    LodThresholds::default()
        .evaluate(camera_distance, diagram_diagonal, service_count)
        .level
}

/// Diagonal of the bounding box of `positions`; zero when empty.
pub fn diagram_diagonal<'a>(positions: impl IntoIterator<Item = &'a DVec3>) -> f64 {
    let mut min = DVec3::splat(f64::INFINITY);
    let mut max = DVec3::splat(f64::NEG_INFINITY);
    let mut any = false;

    for position in positions {
        min = min.min(*position);
        max = max.max(*position);
        any = true;
    }

    if any { min.distance(max) } else { 0.0 }
}
