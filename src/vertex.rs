//! Vertex array storage and the vertex stage (§4.3).
//!
//! `VertexArray` plays the role of the original renderer's VAO: an indexed triangle list. The
//! vertex stage runs the pipeline's vertex shader once per vertex (the original's "for each
//! unique index" caching falls out for free here, since `VertexArray::vertices` already holds one
//! entry per unique vertex rather than one per index reference) and computes the 6-bit clip mask
//! the clipper (`crate::clip`) consumes.

use vek::Vec4;

use crate::error::{RasterError, RasterResult};
use crate::geometry::CLIP_CUBE_PLANES;
use crate::pipeline::Pipeline;

/// An indexed triangle list: one vertex payload per unique vertex, one `[u32; 3]` per triangle.
pub struct VertexArray<V> {
    vertices: Vec<V>,
    triangles: Vec<[u32; 3]>,
}

impl<V> VertexArray<V> {
    /// Builds a vertex array, rejecting any triangle whose index is out of range.
    pub fn new(vertices: Vec<V>, triangles: Vec<[u32; 3]>) -> RasterResult<Self> {
        let count = vertices.len() as u32;
        for tri in &triangles {
            for &idx in tri {
                if idx >= count {
                    return Err(RasterError::draw_contract_violation(format!(
                        "triangle references vertex index {idx}, but only {count} vertices were supplied"
                    )));
                }
            }
        }
        Ok(Self { vertices, triangles })
    }

    pub fn vertices(&self) -> &[V] {
        &self.vertices
    }

    pub fn triangles(&self) -> &[[u32; 3]] {
        &self.triangles
    }
}

/// The result of running the vertex shader on one vertex: clip-space position, the varyings
/// block, and the 6-bit clip mask used by the clipper to decide whether a triangle needs
/// clipping at all.
#[derive(Clone)]
pub struct VertexHolder<VD> {
    pub clip_pos: Vec4<f32>,
    pub data: VD,
    pub clip_mask: u8,
}

/// Tests `clip_pos` against the six planes of the canonical `|x|, |y|, |z| <= w` clip cube,
/// setting bit `i` of the mask (per `crate::geometry::FRUSTUM_CLIP_MASK_ARRAY`'s ordering) when
/// the vertex is on the outside of plane `i`.
pub fn compute_clip_mask(clip_pos: Vec4<f32>) -> u8 {
    let mut mask = 0u8;
    for (i, plane) in CLIP_CUBE_PLANES.iter().enumerate() {
        if plane.dot(clip_pos) < 0.0 {
            mask |= 1 << i;
        }
    }
    mask
}

/// Runs the vertex shader over every vertex in `vertex_array`, producing one [`VertexHolder`]
/// per vertex. The result is indexable by the same `u32` indices `VertexArray::triangles` uses,
/// giving the clipper/rasterizer a per-draw cache without needing to re-run the vertex shader per
/// triangle reference.
pub fn run_vertex_stage<P: Pipeline>(
    pipeline: &P,
    vertex_array: &VertexArray<P::Vertex>,
) -> Vec<VertexHolder<P::VertexData>> {
    vertex_array
        .vertices()
        .iter()
        .map(|v| {
            let (pos, data) = pipeline.vertex(v);
            let clip_pos = Vec4::from(pos);
            VertexHolder { clip_mask: compute_clip_mask(clip_pos), clip_pos, data }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_array_rejects_out_of_range_index() {
        let result = VertexArray::<()>::new(vec![(), (), ()], vec![[0, 1, 3]]);
        assert!(result.is_err());
    }

    #[test]
    fn vertex_array_accepts_in_range_indices() {
        let result = VertexArray::<()>::new(vec![(), (), ()], vec![[0, 1, 2]]);
        assert!(result.is_ok());
    }

    #[test]
    fn clip_mask_is_zero_for_origin_within_clip_cube() {
        assert_eq!(compute_clip_mask(Vec4::new(0.0, 0.0, 0.0, 1.0)), 0);
    }

    #[test]
    fn clip_mask_sets_bit_for_each_violated_plane() {
        // x = 2, w = 1: outside both +X and -X planes... actually only the -X-violating side.
        let mask = compute_clip_mask(Vec4::new(2.0, 0.0, 0.0, 1.0));
        assert_ne!(mask, 0);
    }
}
