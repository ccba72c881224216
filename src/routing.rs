//! Obstacle-avoiding paths between two points.
//!
//! Obstacles are tenant bounding spheres. A path that passes too close to an
//! obstacle is bent around it with one horizontal waypoint per blocking
//! obstacle; both turning directions are tried and the shorter polyline wins.

use glam::DVec3;
use serde::Serialize;

use crate::geometry::{horizontal_perpendicular, polyline_length, segment_projection};

/// Extra distance added to `radius + clearance` when testing for blockage.
pub const BLOCKING_MARGIN: f64 = 10.0;
/// Distance beyond the obstacle radius at which detour waypoints are placed.
pub const DETOUR_OFFSET: f64 = 150.0;

/// Obstacles whose closest point sits in the first or last tenth of the path
/// belong to the path's own endpoints and never block it.
const BLOCKING_WINDOW_MIN: f64 = 0.1;
const BLOCKING_WINDOW_MAX: f64 = 0.9;

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Obstacle {
    pub position: DVec3,
    pub radius: f64,
}

impl Obstacle {
    pub fn new(position: DVec3, radius: f64) -> Self {
        Self { position, radius }
    }

    fn blocks(&self, start: DVec3, end: DVec3, clearance: f64) -> bool {
        let (distance, t) = segment_projection(self.position, start, end);
        distance < self.radius + clearance + BLOCKING_MARGIN
            && t > BLOCKING_WINDOW_MIN
            && t < BLOCKING_WINDOW_MAX
    }
}

pub fn blocking_obstacles<'a>(
    start: DVec3,
    end: DVec3,
    obstacles: &'a [Obstacle],
    clearance: f64,
) -> Vec<&'a Obstacle> {
    if start.distance_squared(end) <= f64::EPSILON {
        return Vec::new();
    }

    obstacles
        .iter()
        .filter(|obstacle| obstacle.blocks(start, end, clearance))
        .collect()
}

/// Polyline from `start` to `end` that steers around blocking obstacles.
///
/// Never fails: with no blocking obstacle the direct two-point path is
/// returned, otherwise the shorter of the left and right detours (left on a
/// tie).
pub fn find_path(start: DVec3, end: DVec3, obstacles: &[Obstacle], clearance: f64) -> Vec<DVec3> {
    let blocking = blocking_obstacles(start, end, obstacles, clearance);
    if blocking.is_empty() {
        return vec![start, end];
    }

    let left = detour(start, end, &blocking, true);
    let right = detour(start, end, &blocking, false);
    if polyline_length(&right) < polyline_length(&left) {
        right
    } else {
        left
    }
}

fn detour(start: DVec3, end: DVec3, blocking: &[&Obstacle], left: bool) -> Vec<DVec3> {
    let perpendicular = horizontal_perpendicular(end - start, left);

    let mut points = Vec::with_capacity(blocking.len() + 2);
    points.push(start);
    points.extend(
        blocking
            .iter()
            .map(|obstacle| obstacle.position + perpendicular * (obstacle.radius + DETOUR_OFFSET)),
    );
    points.push(end);
    points
}
