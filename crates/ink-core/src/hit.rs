//! Hit testing: point / rectangle / eraser stroke → object lookup.
//!
//! Reverse-walks the top-level stack (front-to-back) against world-space
//! bounds. Groups are hit as a whole.

use crate::id::ObjectId;
use crate::model::EraserStroke;
use crate::scene::SceneGraph;
use kurbo::{Point, Rect};

/// Find the topmost object at canvas position (px, py).
/// Returns `None` if nothing is hit (background).
pub fn hit_test(scene: &SceneGraph, px: f64, py: f64) -> Option<ObjectId> {
    hit_test_where(scene, px, py, |_| true)
}

/// Like [`hit_test`] but only considers objects accepted by `filter`.
pub fn hit_test_where(
    scene: &SceneGraph,
    px: f64,
    py: f64,
    filter: impl Fn(ObjectId) -> bool,
) -> Option<ObjectId> {
    let p = Point::new(px, py);
    scene
        .object_ids()
        .iter()
        .rev()
        .copied()
        .filter(|id| filter(*id))
        .find(|id| scene.world_bounds(*id).is_some_and(|b| contains(b, p)))
}

/// All top-level objects whose bounds intersect `rect`, bottom first.
/// Used for marquee (box) selection.
pub fn hit_test_rect(scene: &SceneGraph, rect: Rect) -> Vec<ObjectId> {
    scene
        .object_ids()
        .iter()
        .copied()
        .filter(|id| {
            scene
                .world_bounds(*id)
                .is_some_and(|b| intersects(b, rect))
        })
        .collect()
}

/// Top-level objects touched by an eraser stroke given in canvas space.
pub fn hit_test_stroke(scene: &SceneGraph, stroke: &EraserStroke) -> Vec<ObjectId> {
    let half = stroke.width / 2.0;
    scene
        .object_ids()
        .iter()
        .copied()
        .filter(|id| {
            let Some(b) = scene.world_bounds(*id) else {
                return false;
            };
            let b = b.inflate(half, half);
            stroke
                .points
                .iter()
                .any(|&(x, y)| contains(b, Point::new(x, y)))
        })
        .collect()
}

/// Inclusive containment; zero-width lines stay hittable on their edge.
fn contains(b: Rect, p: Point) -> bool {
    p.x >= b.x0 && p.x <= b.x1 && p.y >= b.y0 && p.y <= b.y1
}

fn intersects(a: Rect, b: Rect) -> bool {
    a.x0 <= b.x1 && a.x1 >= b.x0 && a.y0 <= b.y1 && a.y1 >= b.y0
}
