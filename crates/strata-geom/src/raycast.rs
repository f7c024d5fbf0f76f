//! Exact voxel traversal (Amanatides-Woo DDA).

use crate::{BlockPos, Face, Vec3};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayHit {
    /// The solid cell that was hit.
    pub block: BlockPos,
    /// The last empty cell visited before the hit; equals `block` when the
    /// ray starts inside a solid cell.
    pub prev: BlockPos,
    /// Face of `block` the ray entered through. `None` for a hit on the
    /// starting cell.
    pub face: Option<Face>,
    /// Distance travelled along the ray to the entry boundary.
    pub distance: f32,
}

/// Upper bound on cells visited by one cast, whatever `max_dist` says.
pub const MAX_STEPS: usize = 1 << 16;

#[inline]
fn inv_or_max(v: f32) -> f32 {
    if v.abs() < 1e-8 { f32::MAX } else { 1.0 / v.abs() }
}

#[inline]
fn step_of(v: f32) -> i32 {
    if v > 0.0 {
        1
    } else if v < 0.0 {
        -1
    } else {
        0
    }
}

#[inline]
fn first_boundary(step: i32, frac: f32, inv: f32) -> f32 {
    match step {
        1 => (1.0 - frac) * inv,
        -1 => frac * inv,
        _ => f32::MAX,
    }
}

/// Walks grid cells from `origin` along `dir` and returns the first cell for
/// which `is_solid` holds, checking the starting cell first. Returns `None`
/// once the travelled distance exceeds `max_dist` or after [`MAX_STEPS`]
/// cells. Non-finite origins and distances never hit.
pub fn raycast<F>(origin: Vec3, dir: Vec3, max_dist: f32, mut is_solid: F) -> Option<RayHit>
where
    F: FnMut(BlockPos) -> bool,
{
    let len = dir.length();
    if !len.is_finite() || len < 1e-6 || !max_dist.is_finite() || max_dist < 0.0 {
        return None;
    }
    if !(origin.x.is_finite() && origin.y.is_finite() && origin.z.is_finite()) {
        return None;
    }
    let d = dir / len;

    let mut cell = origin.block();
    if is_solid(cell) {
        return Some(RayHit {
            block: cell,
            prev: cell,
            face: None,
            distance: 0.0,
        });
    }

    let (sx, sy, sz) = (step_of(d.x), step_of(d.y), step_of(d.z));
    let (ix, iy, iz) = (inv_or_max(d.x), inv_or_max(d.y), inv_or_max(d.z));
    let tdx = if sx == 0 { f32::MAX } else { ix };
    let tdy = if sy == 0 { f32::MAX } else { iy };
    let tdz = if sz == 0 { f32::MAX } else { iz };

    let mut tmx = first_boundary(sx, origin.x - origin.x.floor(), ix);
    let mut tmy = first_boundary(sy, origin.y - origin.y.floor(), iy);
    let mut tmz = first_boundary(sz, origin.z - origin.z.floor(), iz);

    // A unit step along the ray crosses at most three grid lines.
    let steps = ((max_dist as f64 + 1.0) * 3.0).min(MAX_STEPS as f64) as usize;
    for _ in 0..steps {
        let prev = cell;
        // Advance along the axis whose next grid line is closest.
        let (t, face) = if tmx < tmy && tmx < tmz {
            cell.x += sx;
            let t = tmx;
            tmx += tdx;
            (t, if sx > 0 { Face::NegX } else { Face::PosX })
        } else if tmy < tmz {
            cell.y += sy;
            let t = tmy;
            tmy += tdy;
            (t, if sy > 0 { Face::NegY } else { Face::PosY })
        } else {
            cell.z += sz;
            let t = tmz;
            tmz += tdz;
            (t, if sz > 0 { Face::NegZ } else { Face::PosZ })
        };
        if t > max_dist {
            return None;
        }
        if is_solid(cell) {
            return Some(RayHit {
                block: cell,
                prev,
                face: Some(face),
                distance: t,
            });
        }
    }
    None
}
