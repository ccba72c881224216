//! Small vector helpers shared by routing, layout and magistral code.
//!
//! All world coordinates are `f64` with Y as the vertical axis; the
//! "horizontal plane" is XZ.

use glam::{DVec2, DVec3};

/// Determinant magnitude below which two lines are treated as parallel.
pub const PARALLEL_EPSILON: f64 = 1e-10;

const DEGENERATE_LENGTH_SQ: f64 = 1e-12;

/// Distance from `p` to the closest point of segment `a..b` together with the
/// clamped projection fraction of that closest point along the segment.
pub fn segment_projection(p: DVec3, a: DVec3, b: DVec3) -> (f64, f64) {
    let ab = b - a;
    let length_sq = ab.length_squared();
    if length_sq <= DEGENERATE_LENGTH_SQ {
        return (p.distance(a), 0.0);
    }

    let t = ((p - a).dot(ab) / length_sq).clamp(0.0, 1.0);
    let closest = a + ab * t;
    (p.distance(closest), t)
}

pub fn distance_point_to_segment(p: DVec3, a: DVec3, b: DVec3) -> f64 {
    segment_projection(p, a, b).0
}

/// Intersection of segments `p1..p2` and `p3..p4` projected onto the XZ plane.
///
/// The result is `(x, z)`. Parallel or coincident segments, and lines whose
/// crossing lies outside either segment, yield `None`.
pub fn line_intersection_2d(p1: DVec3, p2: DVec3, p3: DVec3, p4: DVec3) -> Option<DVec2> {
    fn cross(a: DVec2, b: DVec2) -> f64 {
        (a.x * b.y) - (a.y * b.x)
    }

    let a = flat(p1);
    let d1 = flat(p2) - a;
    let c = flat(p3);
    let d2 = flat(p4) - c;

    let det = cross(d1, d2);
    if det.abs() < PARALLEL_EPSILON {
        return None;
    }

    let offset = c - a;
    let t = cross(offset, d2) / det;
    let u = cross(offset, d1) / det;
    if !(0.0..=1.0).contains(&t) || !(0.0..=1.0).contains(&u) {
        return None;
    }

    Some(a + d1 * t)
}

fn flat(point: DVec3) -> DVec2 {
    DVec2::new(point.x, point.z)
}

/// Point on the sphere around `center` that faces `other_center`.
///
/// Coincident centers fall back to the +X direction so the result still lies
/// on the sphere surface.
pub fn sphere_surface_point(center: DVec3, other_center: DVec3, radius: f64) -> DVec3 {
    let direction = (other_center - center).try_normalize().unwrap_or(DVec3::X);
    center + direction * radius
}

pub fn polyline_length(points: &[DVec3]) -> f64 {
    points
        .windows(2)
        .map(|pair| pair[0].distance(pair[1]))
        .sum()
}

/// Unit vector in the XZ plane perpendicular to `direction`, turned left
/// (counter-clockwise seen from +Y) or right.
pub fn horizontal_perpendicular(direction: DVec3, left: bool) -> DVec3 {
    let flat = DVec3::new(-direction.z, 0.0, direction.x);
    let perpendicular = flat.try_normalize().unwrap_or(DVec3::Z);
    if left { perpendicular } else { -perpendicular }
}

/// Point at `fraction` of the arc length along a polyline.
pub fn point_along(points: &[DVec3], fraction: f64) -> Option<DVec3> {
    let first = *points.first()?;
    let total = polyline_length(points);
    if total <= 0.0 {
        return Some(first);
    }

    let mut remaining = total * fraction.clamp(0.0, 1.0);
    for pair in points.windows(2) {
        let length = pair[0].distance(pair[1]);
        if remaining <= length {
            if length <= 0.0 {
                return Some(pair[0]);
            }
            return Some(pair[0].lerp(pair[1], remaining / length));
        }
        remaining -= length;
    }

    points.last().copied()
}

/// Uniform Catmull-Rom curve through `points`, sampled at `samples` points
/// spread evenly over the control segments. The first and last samples are
/// exactly the first and last control points.
pub fn sample_curve(points: &[DVec3], samples: usize) -> Vec<DVec3> {
    let samples = samples.max(2);
    match points {
        [] => return Vec::new(),
        [single] => return vec![*single; samples],
        _ => {}
    }

    let segments = points.len() - 1;
    let last = points.len() - 1;
    let mut result = Vec::with_capacity(samples);

    for index in 0..samples {
        let u = (index as f64 / (samples - 1) as f64) * segments as f64;
        let segment = (u.floor() as usize).min(segments - 1);
        let t = u - segment as f64;

        let p0 = points[segment.saturating_sub(1)];
        let p1 = points[segment];
        let p2 = points[segment + 1];
        let p3 = points[(segment + 2).min(last)];
        result.push(catmull_rom(p0, p1, p2, p3, t));
    }

    result[0] = points[0];
    result[samples - 1] = points[last];
    result
}

fn catmull_rom(p0: DVec3, p1: DVec3, p2: DVec3, p3: DVec3, t: f64) -> DVec3 {
    let t2 = t * t;
    let t3 = t2 * t;
    0.5 * ((2.0 * p1)
        + (p2 - p0) * t
        + (2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3) * t2
        + (3.0 * p1 - p0 - 3.0 * p2 + p3) * t3)
}
