//! Placement ↔ matrix conversions.
//!
//! Matrices use the `[a, b, c, d, e, f]` convention of `kurbo::Affine`:
//! `x' = a·x + c·y + e`, `y' = b·x + d·y + f`. An object's matrix maps its
//! local frame (origin at its top-left corner) into its parent's frame.

use crate::model::Placement;
use kurbo::{Affine, Point};

const EPSILON: f64 = 1e-9;

/// Matrix of a placement: translate · rotate · scale (with flips).
pub fn placement_matrix(p: &Placement) -> Affine {
    let sx = if p.flip_x { -p.scale_x } else { p.scale_x };
    let sy = if p.flip_y { -p.scale_y } else { p.scale_y };
    Affine::translate((p.left, p.top))
        * Affine::rotate(p.angle.to_radians())
        * Affine::scale_non_uniform(sx, sy)
}

/// Result of a QR decomposition of an affine matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decomposed {
    /// Degrees.
    pub angle: f64,
    pub scale_x: f64,
    pub scale_y: f64,
    /// Degrees.
    pub skew_x: f64,
    pub translate_x: f64,
    pub translate_y: f64,
}

/// Decompose a matrix into rotation, scale, skew and translation.
pub fn qr_decompose(m: Affine) -> Decomposed {
    let [a, b, c, d, e, f] = m.as_coeffs();
    let denom = a * a + b * b;
    let scale_x = denom.sqrt();
    let scale_y = if scale_x > EPSILON {
        (a * d - c * b) / scale_x
    } else {
        0.0
    };
    let skew_x = if denom > EPSILON {
        (a * c + b * d).atan2(denom).to_degrees()
    } else {
        0.0
    };
    Decomposed {
        angle: b.atan2(a).to_degrees(),
        scale_x,
        scale_y,
        skew_x,
        translate_x: e,
        translate_y: f,
    }
}

/// Absolute total scaling of a world matrix. A degenerate axis reports 1.
pub fn total_scaling(m: Affine) -> (f64, f64) {
    let d = qr_decompose(m);
    let nonzero = |v: f64| if v.abs() > EPSILON { v.abs() } else { 1.0 };
    (nonzero(d.scale_x), nonzero(d.scale_y))
}

/// Placement that reproduces `world` for an object with no parent, in the
/// unflipped frame: flips are folded away and scales are absolute.
pub fn standalone_placement(world: Affine) -> Placement {
    let d = qr_decompose(world);
    let (scale_x, scale_y) = total_scaling(world);
    Placement {
        left: d.translate_x,
        top: d.translate_y,
        angle: d.angle,
        scale_x,
        scale_y,
        flip_x: false,
        flip_y: false,
    }
}

/// Express `placement` (relative to a parent with matrix `parent`) in the
/// canvas frame.
pub fn bake_into(placement: &Placement, parent: Affine) -> Placement {
    if is_translation(parent) {
        let t = parent.translation();
        return Placement {
            left: placement.left + t.x,
            top: placement.top + t.y,
            ..*placement
        };
    }
    standalone_placement(parent * placement_matrix(placement))
}

/// Scale a placement about the canvas origin, as a viewport zoom does.
pub fn scale_placement(p: &mut Placement, fx: f64, fy: f64) {
    p.scale_x *= fx;
    p.scale_y *= fy;
    p.left *= fx;
    p.top *= fy;
}

/// Whether the matrix only translates.
pub fn is_translation(m: Affine) -> bool {
    let [a, b, c, d, _, _] = m.as_coeffs();
    (a - 1.0).abs() < EPSILON && b.abs() < EPSILON && c.abs() < EPSILON && (d - 1.0).abs() < EPSILON
}

/// Euclidean distance between two points.
pub fn linear_distance(p1: Point, p2: Point) -> f64 {
    let xs = p2.x - p1.x;
    let ys = p2.y - p1.y;
    (xs * xs + ys * ys).sqrt()
}
