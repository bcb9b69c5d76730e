//! Pipe geometry for renderers
//!
//! Points live in a unit tile: `(0, 0)` is the top-left corner, `(1, 1)` the
//! bottom-right. Each exit is anchored at the midpoint of its edge.

use glam::Vec2;

use crate::sim::{Direction, Exits};

/// Edge midpoint for an exit; `None` is the tile center
pub fn direction_anchor(dir: Direction) -> Vec2 {
    match dir {
        Direction::Up => Vec2::new(0.5, 0.0),
        Direction::Down => Vec2::new(0.5, 1.0),
        Direction::Left => Vec2::new(0.0, 0.5),
        Direction::Right => Vec2::new(1.0, 0.5),
        Direction::None => Vec2::splat(0.5),
    }
}

/// Quadratic bezier at `t` with control point `p1`
#[inline]
pub fn bezier_point(t: f32, p0: Vec2, p1: Vec2, p2: Vec2) -> Vec2 {
    let u = 1.0 - t;
    u * u * p0 + 2.0 * u * t * p1 + t * t * p2
}

#[inline]
pub fn lerp_point(p0: Vec2, p1: Vec2, t: f32) -> Vec2 {
    p0.lerp(p1, t)
}

/// `n` evenly spaced samples of the curve `p0 -> p2` bent through `ctrl`
fn sample_bezier(p0: Vec2, ctrl: Vec2, p2: Vec2, n: usize) -> Vec<Vec2> {
    (0..n)
        .map(|k| {
            let t = if n == 1 { 0.0 } else { k as f32 / (n - 1) as f32 };
            bezier_point(t, p0, ctrl, p2)
        })
        .collect()
}

/// Sample each span through the center and stitch them, dropping the
/// duplicated joint between consecutive spans
fn join_spans(spans: &[(Vec2, Vec2)], segments: usize) -> Vec<Vec2> {
    let center = direction_anchor(Direction::None);
    let per = (segments / spans.len()).max(1);
    let mut points: Vec<Vec2> = Vec::with_capacity(segments);
    for (idx, &(from, to)) in spans.iter().enumerate() {
        let count = if idx + 1 == spans.len() {
            segments.saturating_sub(points.len())
        } else {
            per
        };
        let mut sampled = sample_bezier(from, center, to, count);
        if !points.is_empty() && !sampled.is_empty() {
            sampled.remove(0);
        }
        points.extend(sampled);
    }
    points
}

/// Polyline tracing a piece's pipe with roughly `segments` points.
///
/// - one arm: edge to center
/// - two arms: a single curve, its control point pulled from the chord
///   midpoint toward the center by `curvature` (0 = straight chord)
/// - three arms (T): arm, center, arm, center, arm
/// - four arms (cross): up, right, down, left through the center
pub fn pipe_points(segments: usize, exits: Exits, curvature: f32) -> Vec<Vec2> {
    if segments < 2 {
        return Vec::new();
    }
    let center = direction_anchor(Direction::None);
    let anchors: Vec<Vec2> = exits.iter().map(direction_anchor).collect();

    match anchors.as_slice() {
        [] => Vec::new(),
        [only] => sample_bezier(*only, center, center, segments),
        [a, b] => {
            let ctrl = lerp_point(lerp_point(*a, *b, 0.5), center, curvature);
            sample_bezier(*a, ctrl, *b, segments)
        }
        [a, b, c] => join_spans(&[(*a, center), (center, *b), (*b, center), (center, *c)], segments),
        _ => {
            let [up, right, down, left] = [
                Direction::Up,
                Direction::Right,
                Direction::Down,
                Direction::Left,
            ]
            .map(direction_anchor);
            join_spans(
                &[
                    (up, center),
                    (center, right),
                    (right, center),
                    (center, down),
                    (down, center),
                    (center, left),
                ],
                segments,
            )
        }
    }
}
