//! Sutherland-Hodgman clipping against the 6-plane homogeneous clip cube (§4.4).
//!
//! Clipping happens in clip space, before the perspective divide, because the divide is undefined
//! when `w <= 0`. The clip mask computed by `crate::vertex::compute_clip_mask` lets most triangles
//! (the common case: fully inside the frustum) skip this module entirely.

use vek::Vec4;

use crate::geometry::CLIP_CUBE_PLANES;
use crate::interpolate::WeightedSum;
use crate::vertex::VertexHolder;

/// A vertex carried through clipping: clip-space position plus its varyings.
#[derive(Clone)]
pub struct ClipVertex<VD> {
    pub clip_pos: Vec4<f32>,
    pub data: VD,
}

impl<VD: Clone> From<&VertexHolder<VD>> for ClipVertex<VD> {
    fn from(v: &VertexHolder<VD>) -> Self {
        Self { clip_pos: v.clip_pos, data: v.data.clone() }
    }
}

/// Clips a triangle against the planes any of its three vertices violate.
///
/// Returns `None` if the triangle is entirely discarded (some plane has all three vertices
/// outside it); otherwise returns the clipped polygon's vertices in winding order, ready for
/// fan triangulation by the caller. If `masks` are all zero the triangle passes through
/// unclipped.
pub fn clip_triangle<VD: Clone + WeightedSum>(
    vertices: [ClipVertex<VD>; 3],
    masks: [u8; 3],
) -> Option<Vec<ClipVertex<VD>>> {
    let combined = masks[0] | masks[1] | masks[2];
    if combined == 0 {
        return Some(vertices.into());
    }

    for i in 0..6 {
        let bit = 1u8 << i;
        if masks[0] & bit != 0 && masks[1] & bit != 0 && masks[2] & bit != 0 {
            // Every vertex is outside this plane: the whole triangle is discarded.
            return None;
        }
    }

    let mut polygon: Vec<ClipVertex<VD>> = vertices.into();

    for i in 0..6 {
        let bit = 1u8 << i;
        if combined & bit == 0 || polygon.is_empty() {
            continue;
        }
        let plane = CLIP_CUBE_PLANES[i];
        let n = polygon.len();
        let mut output = Vec::with_capacity(n + 1);
        for edge in 0..n {
            let a = &polygon[edge];
            let b = &polygon[(edge + 1) % n];
            let dist_a = plane.dot(a.clip_pos);
            let dist_b = plane.dot(b.clip_pos);
            let a_inside = dist_a >= 0.0;
            let b_inside = dist_b >= 0.0;

            if a_inside {
                output.push(a.clone());
            }
            if a_inside != b_inside {
                let t = dist_a / (dist_a - dist_b);
                let clip_pos = Vec4::weighted_sum2(a.clip_pos, b.clip_pos, 1.0 - t, t);
                let data = VD::weighted_sum2(a.data.clone(), b.data.clone(), 1.0 - t, t);
                output.push(ClipVertex { clip_pos, data });
            }
        }
        polygon = output;
    }

    if polygon.len() < 3 {
        None
    } else {
        Some(polygon)
    }
}

/// Fan-triangulates a clipped polygon from `polygon[0]`, yielding `polygon.len() - 2` triangles.
pub fn fan_triangulate<VD: Clone>(polygon: &[ClipVertex<VD>]) -> Vec<[ClipVertex<VD>; 3]> {
    if polygon.len() < 3 {
        return Vec::new();
    }
    (1..polygon.len() - 1)
        .map(|i| [polygon[0].clone(), polygon[i].clone(), polygon[i + 1].clone()])
        .collect()
}
