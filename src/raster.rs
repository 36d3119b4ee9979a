//! The rasterizer core: clip → perspective divide → viewport transform → backface cull → quad
//! rasterization → early-Z → fragment shading → blend (§4.4-§4.7).
//!
//! The MSAA path is grounded directly on the original renderer's `PixelContext`/`SampleContext`
//! model (`RendererInternal.h`): four fixed sample offsets are tested for coverage and depth
//! independently, but the fragment shader runs once per covered pixel, using whichever covered
//! sample is closest to the pixel center (the "shading sample") for its interpolated varyings.
//! This is deliberately not the teacher's power-of-two supersample-and-box-filter scheme; see
//! `DESIGN.md`.

use crate::buffer::Target;
use crate::clip::{clip_triangle, fan_triangulate, ClipVertex};
use crate::interpolate::WeightedSum;
use crate::pipeline::{AaMode, CullMode, FrontFace, Pipeline};
use crate::stats::RenderStats;
use crate::vertex::{run_vertex_stage, VertexArray, VertexHolder};

/// The four fixed MSAA sample offsets within a pixel, grounded on `GetSampleLocation4X()`.
pub const MSAA4X_SAMPLE_OFFSETS: [(f32, f32); 4] =
    [(0.375, 0.875), (0.875, 0.625), (0.125, 0.375), (0.625, 0.125)];

/// A render target addressable per MSAA sample plane. [`crate::buffer::Target`] implementors are
/// single-sample by construction; [`SingleSampleTarget`] adapts any of them to this trait for
/// [`Pipeline::render`]'s simple two-target signature. [`crate::framebuffer::FrameBuffer`]
/// implements this directly over its four sample planes so true multisampling (distinct stored
/// color/depth per sample, resolved by box filter at `end_draw`) is available through the same
/// rasterizer core.
pub trait RasterTarget {
    type Texel: Clone;

    fn size(&self) -> [usize; 2];

    /// Number of independently addressable sample planes. `1` for non-MSAA targets.
    fn sample_count(&self) -> usize {
        1
    }

    /// # Safety
    /// The caller must have exclusive access (directly, or via a disjoint row range) to
    /// `(x, y, sample)`.
    unsafe fn read_exclusive_unchecked(&self, x: usize, y: usize, sample: usize) -> Self::Texel;

    /// # Safety
    /// The caller must have exclusive access (directly, or via a disjoint row range) to
    /// `(x, y, sample)`.
    unsafe fn write_exclusive_unchecked(&self, x: usize, y: usize, sample: usize, texel: Self::Texel);

    /// Called once per sample found inside a primitive, regardless of whether it passes the
    /// depth test. [`crate::framebuffer::FrameBuffer`]'s color target uses this to maintain its
    /// transient per-frame coverage buffer (§4.7); the default is a no-op.
    #[inline(always)]
    fn mark_covered(&self, _x: usize, _y: usize, _sample: usize) {}
}

/// Adapts a fixed slice of single-sample buffers (one per MSAA sample plane) to
/// [`RasterTarget`]. Used directly by [`crate::framebuffer::FrameBuffer`] for its depth planes.
pub struct MultiSampleTarget<'a, T> {
    planes: &'a [T],
}

impl<'a, T> MultiSampleTarget<'a, T> {
    pub fn new(planes: &'a [T]) -> Self {
        Self { planes }
    }
}

impl<'a, T: Target> RasterTarget for MultiSampleTarget<'a, T> {
    type Texel = T::Texel;

    #[inline(always)]
    fn size(&self) -> [usize; 2] {
        self.planes[0].size()
    }

    #[inline(always)]
    fn sample_count(&self) -> usize {
        self.planes.len()
    }

    #[inline(always)]
    unsafe fn read_exclusive_unchecked(&self, x: usize, y: usize, sample: usize) -> T::Texel {
        self.planes[sample].read_exclusive_unchecked(x, y)
    }

    #[inline(always)]
    unsafe fn write_exclusive_unchecked(&self, x: usize, y: usize, sample: usize, texel: T::Texel) {
        self.planes[sample].write_exclusive_unchecked(x, y, texel)
    }
}

/// Adapts a single-sample [`Target`] to [`RasterTarget`] by ignoring the sample index.
pub struct SingleSampleTarget<'a, T>(pub &'a T);

impl<'a, T: Target> RasterTarget for SingleSampleTarget<'a, T> {
    type Texel = T::Texel;

    #[inline(always)]
    fn size(&self) -> [usize; 2] {
        self.0.size()
    }

    #[inline(always)]
    fn sample_count(&self) -> usize {
        1
    }

    #[inline(always)]
    unsafe fn read_exclusive_unchecked(&self, x: usize, y: usize, _sample: usize) -> T::Texel {
        self.0.read_exclusive_unchecked(x, y)
    }

    #[inline(always)]
    unsafe fn write_exclusive_unchecked(&self, x: usize, y: usize, _sample: usize, texel: T::Texel) {
        self.0.write_exclusive_unchecked(x, y, texel)
    }
}

/// The viewport transform applied after the perspective divide: maps NDC `[-1, 1]` to the pixel
/// rectangle `[x, x + width) x [y, y + height)`, and clip-space depth to `[min_depth, max_depth]`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

impl Viewport {
    pub fn for_target_size(size: [usize; 2]) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: size[0] as f32,
            height: size[1] as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }
}

struct ScreenVertex<VD> {
    /// Screen-space (x, y), depth in `[min_depth, max_depth]`, and `1/w` for perspective
    /// correction.
    pos: [f32; 4],
    /// NDC-space z (`clip.z / clip.w`), kept separate from the viewport-mapped depth in `pos[2]`
    /// because [`crate::pipeline::CoordinateMode::z_clip_range`] is expressed in NDC, not in the
    /// viewport's depth range.
    ndc_z: f32,
    data: VD,
}

fn to_screen<VD: Clone>(v: &ClipVertex<VD>, viewport: &Viewport, y_flip: bool) -> ScreenVertex<VD> {
    let inv_w = 1.0 / v.clip_pos.w;
    let ndc_x = v.clip_pos.x * inv_w;
    let ndc_y = v.clip_pos.y * inv_w;
    let ndc_z = v.clip_pos.z * inv_w;

    let mut screen_y = viewport.y + (ndc_y * 0.5 + 0.5) * viewport.height;
    if y_flip {
        screen_y = viewport.y + viewport.height - (screen_y - viewport.y);
    }

    ScreenVertex {
        pos: [
            viewport.x + (ndc_x * 0.5 + 0.5) * viewport.width,
            screen_y,
            viewport.min_depth + (ndc_z * 0.5 + 0.5) * (viewport.max_depth - viewport.min_depth),
            inv_w,
        ],
        ndc_z,
        data: v.data.clone(),
    }
}

/// Signed area of the triangle `(a, b, c)` in screen space; its sign encodes winding.
fn signed_area(a: [f32; 2], b: [f32; 2], c: [f32; 2]) -> f32 {
    (b[0] - a[0]) * (c[1] - a[1]) - (b[1] - a[1]) * (c[0] - a[0])
}

/// Matches `signed_area`'s sign convention exactly (`edge_function(a, b, p) == signed_area(a, b,
/// p)`): this is what makes `w0 + w1 + w2 == 1` for every point, not just the triangle's interior,
/// and what lets the top-left bias below assume "inside" means `>= 0`.
fn edge_function(a: [f32; 2], b: [f32; 2], p: [f32; 2]) -> f32 {
    (b[0] - a[0]) * (p[1] - a[1]) - (b[1] - a[1]) * (p[0] - a[0])
}

/// Top-left fill rule: an edge "owns" points exactly on it only if it's a top or left edge.
fn top_left_bias(a: [f32; 2], b: [f32; 2]) -> f32 {
    let is_top = a[1] == b[1] && b[0] < a[0];
    let is_left = b[1] < a[1];
    if is_top || is_left {
        0.0
    } else {
        -f32::EPSILON.max(1e-6)
    }
}

/// Renders `vertex_array`'s triangles into `pixel`/`depth` using `pipeline`'s configuration.
/// This is what [`crate::pipeline::Pipeline::render`] delegates to, wrapping its plain `Target`
/// arguments in [`SingleSampleTarget`]; `crate::framebuffer` calls it directly against its own
/// multi-sample planes. `stats`, when present, is updated with per-draw counters (§3.1); passing
/// `None` costs nothing beyond the branch.
pub fn render_pipeline<P, PixelTarget, DepthTarget>(
    pipeline: &P,
    vertex_array: &VertexArray<P::Vertex>,
    pixel: &PixelTarget,
    depth: &DepthTarget,
    stats: Option<&RenderStats>,
) where
    P: Pipeline,
    PixelTarget: RasterTarget<Texel = P::Pixel>,
    DepthTarget: RasterTarget<Texel = f32>,
{
    let coordinate_mode = pipeline.coordinate_mode();
    let depth_mode = pipeline.depth_mode();
    let pixel_mode = pipeline.pixel_mode();
    let cull_mode = pipeline.cull_mode();
    let front_face = pipeline.front_face();
    let aa_mode = pipeline.aa_mode();

    let viewport = Viewport::for_target_size(pixel.size());
    let y_flip = matches!(coordinate_mode.y_axis_direction, crate::pipeline::YAxisDirection::Up);

    let n_samples = match aa_mode {
        AaMode::None => 1,
        AaMode::Msaa4x => pixel.sample_count().min(4).max(1),
    };

    let holders = run_vertex_stage(pipeline, vertex_array);

    for tri in vertex_array.triangles() {
        if let Some(stats) = stats {
            stats.inc_submitted();
        }

        let verts: [&VertexHolder<P::VertexData>; 3] =
            [&holders[tri[0] as usize], &holders[tri[1] as usize], &holders[tri[2] as usize]];

        if verts.iter().any(|v| v.clip_pos.w <= 0.0) {
            // Degenerate: behind the eye. The unit clip cube's +Z/-Z planes reject anything past
            // the configured depth range, so w <= 0 triangles are simply skipped rather than
            // clipped against a separate near plane.
            log::trace!("skipping triangle with non-positive w");
            continue;
        }

        let masks = [verts[0].clip_mask, verts[1].clip_mask, verts[2].clip_mask];
        let clip_verts: [ClipVertex<P::VertexData>; 3] =
            [verts[0].into(), verts[1].into(), verts[2].into()];

        if masks.iter().any(|&m| m != 0) {
            if let Some(stats) = stats {
                stats.inc_clipped();
            }
        }

        let Some(polygon) = clip_triangle(clip_verts, masks) else {
            continue;
        };

        for triangle in fan_triangulate(&polygon) {
            rasterize_triangle(
                pipeline,
                &triangle,
                &viewport,
                y_flip,
                &coordinate_mode,
                depth_mode,
                pixel_mode,
                cull_mode,
                front_face,
                n_samples,
                pixel,
                depth,
                stats,
            );
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn rasterize_triangle<P, PixelTarget, DepthTarget>(
    pipeline: &P,
    triangle: &[ClipVertex<P::VertexData>; 3],
    viewport: &Viewport,
    y_flip: bool,
    coordinate_mode: &crate::pipeline::CoordinateMode,
    depth_mode: crate::pipeline::DepthMode,
    pixel_mode: crate::pipeline::PixelMode,
    cull_mode: CullMode,
    front_face: FrontFace,
    n_samples: usize,
    pixel: &PixelTarget,
    depth: &DepthTarget,
    stats: Option<&RenderStats>,
) where
    P: Pipeline,
    PixelTarget: RasterTarget<Texel = P::Pixel>,
    DepthTarget: RasterTarget<Texel = f32>,
{
    let sv = [
        to_screen(&triangle[0], viewport, y_flip),
        to_screen(&triangle[1], viewport, y_flip),
        to_screen(&triangle[2], viewport, y_flip),
    ];
    let p0 = [sv[0].pos[0], sv[0].pos[1]];
    let p1 = [sv[1].pos[0], sv[1].pos[1]];
    let p2 = [sv[2].pos[0], sv[2].pos[1]];

    let area = signed_area(p0, p1, p2);
    if area == 0.0 {
        log::trace!("skipping zero-area triangle");
        return;
    }

    let is_ccw = area > 0.0;
    let front_is_ccw = matches!(front_face, FrontFace::Ccw);
    let is_front = is_ccw == front_is_ccw;
    match cull_mode {
        CullMode::None => {}
        CullMode::Front if is_front => {
            if let Some(stats) = stats {
                stats.inc_culled();
            }
            return;
        }
        CullMode::Back if !is_front => {
            if let Some(stats) = stats {
                stats.inc_culled();
            }
            return;
        }
        _ => {}
    }
    if let Some(stats) = stats {
        stats.inc_rasterized();
    }

    let [size_x, size_y] = pixel.size();
    let min_x = p0[0].min(p1[0]).min(p2[0]).floor().max(0.0) as i64;
    let min_y = p0[1].min(p1[1]).min(p2[1]).floor().max(0.0) as i64;
    let max_x = p0[0].max(p1[0]).max(p2[0]).ceil().min(size_x as f32) as i64;
    let max_y = p0[1].max(p1[1]).max(p2[1]).ceil().min(size_y as f32) as i64;
    if min_x >= max_x || min_y >= max_y {
        return;
    }
    // Align to the 2x2 quad grid the original rasterizer iterates over.
    let min_x = min_x & !1;
    let min_y = min_y & !1;

    let inv_area = 1.0 / area;
    let bias0 = top_left_bias(p1, p2);
    let bias1 = top_left_bias(p2, p0);
    let bias2 = top_left_bias(p0, p1);

    let samples: &[(f32, f32)] =
        if n_samples <= 1 { &[(0.5, 0.5)] } else { &MSAA4X_SAMPLE_OFFSETS };

    for qy in (min_y..max_y).step_by(2) {
        for qx in (min_x..max_x).step_by(2) {
            for (dx, dy) in [(0i64, 0i64), (1, 0), (0, 1), (1, 1)] {
                let x = qx + dx;
                let y = qy + dy;
                if x < 0 || y < 0 || x as usize >= size_x || y as usize >= size_y {
                    continue;
                }

                // Determine, for each of `samples`, whether it's inside the triangle and (if so)
                // its interpolated depth; varyings are computed for all four quad lanes
                // regardless of coverage so that derivative-style differencing between lanes
                // would remain well-defined, even though no `Pipeline::fragment` signature today
                // exposes dFdx/dFdy (see DESIGN.md).
                let mut covered = [false; 4];
                let mut sample_depth = [0.0f32; 4];
                let mut sample_ndc_z = [0.0f32; 4];
                let mut sample_bary = [(0.0f32, 0.0f32, 0.0f32); 4];

                for (i, (sx, sy)) in samples.iter().enumerate().take(samples.len().min(4)) {
                    let p = [x as f32 + sx, y as f32 + sy];
                    // The bias is applied after dividing by `inv_area`, not before: `inv_area`'s
                    // sign follows winding, and a bias folded into the un-scaled edge value would
                    // flip sign right along with it, un-biasing CW triangles instead of biasing
                    // them.
                    let w0 = edge_function(p1, p2, p) * inv_area + bias0;
                    let w1 = edge_function(p2, p0, p) * inv_area + bias1;
                    let w2 = edge_function(p0, p1, p) * inv_area + bias2;
                    let inside = w0 >= 0.0 && w1 >= 0.0 && w2 >= 0.0;
                    covered[i] = inside;
                    if inside {
                        sample_bary[i] = (w0, w1, w2);
                        sample_depth[i] = w0 * sv[0].pos[2] + w1 * sv[1].pos[2] + w2 * sv[2].pos[2];
                        sample_ndc_z[i] = w0 * sv[0].ndc_z + w1 * sv[1].ndc_z + w2 * sv[2].ndc_z;
                    }
                }

                if !covered.iter().take(samples.len()).any(|&c| c) {
                    continue;
                }
                let mut newly_covered = 0u64;
                for (sample, &inside) in covered.iter().enumerate().take(samples.len()) {
                    if inside {
                        pixel.mark_covered(x as usize, y as usize, sample);
                        newly_covered += 1;
                    }
                }
                if let Some(stats) = stats {
                    stats.add_samples_covered(newly_covered);
                }

                // The "shading sample": the pixel center when using 1 sample, else whichever
                // covered sample stands in for the center (there is no single dedicated center
                // sample in the 4x pattern), matching `InitShadingSample`'s fallback.
                let shading_sample = (0..samples.len()).find(|&i| covered[i]).unwrap_or(0);

                let (w0, w1, w2) = sample_bary[shading_sample];
                if !coordinate_mode.passes_z_clip(sample_ndc_z[shading_sample]) {
                    continue;
                }

                let inv_w_sum = w0 * sv[0].pos[3] + w1 * sv[1].pos[3] + w2 * sv[2].pos[3];
                let persp = [
                    w0 * sv[0].pos[3] / inv_w_sum,
                    w1 * sv[1].pos[3] / inv_w_sum,
                    w2 * sv[2].pos[3] / inv_w_sum,
                ];
                let vs_out = P::VertexData::weighted_sum3(
                    sv[0].data.clone(),
                    sv[1].data.clone(),
                    sv[2].data.clone(),
                    persp[0],
                    persp[1],
                    persp[2],
                );

                let mut fragment_cache: Option<P::Fragment> = None;

                for (sample, _) in samples.iter().enumerate() {
                    if !covered[sample] {
                        continue;
                    }
                    let z = sample_depth[sample];
                    let passes_depth = if let Some(cmp) = depth_mode.test {
                        let existing =
                            unsafe { depth.read_exclusive_unchecked(x as usize, y as usize, sample) };
                        cmp.passes(z, existing)
                    } else {
                        true
                    };
                    if !passes_depth {
                        continue;
                    }
                    if depth_mode.write {
                        unsafe { depth.write_exclusive_unchecked(x as usize, y as usize, sample, z) };
                    }
                    if pixel_mode.write {
                        let fragment = fragment_cache
                            .get_or_insert_with(|| {
                                if let Some(stats) = stats {
                                    stats.inc_fragments_shaded();
                                }
                                pipeline.fragment(vs_out.clone())
                            })
                            .clone();
                        let old =
                            unsafe { pixel.read_exclusive_unchecked(x as usize, y as usize, sample) };
                        let blended = pipeline.blend(old, fragment);
                        unsafe {
                            pixel.write_exclusive_unchecked(x as usize, y as usize, sample, blended)
                        };
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn msaa4x_offsets_are_within_the_unit_pixel() {
        for (x, y) in MSAA4X_SAMPLE_OFFSETS {
            assert!((0.0..1.0).contains(&x));
            assert!((0.0..1.0).contains(&y));
        }
    }

    #[test]
    fn signed_area_sign_encodes_winding() {
        let ccw = signed_area([0.0, 0.0], [1.0, 0.0], [0.0, 1.0]);
        let cw = signed_area([0.0, 0.0], [0.0, 1.0], [1.0, 0.0]);
        assert!(ccw > 0.0);
        assert!(cw < 0.0);
    }

    #[test]
    fn viewport_for_target_size_spans_whole_target() {
        let vp = Viewport::for_target_size([640, 480]);
        assert_eq!(vp.width, 640.0);
        assert_eq!(vp.height, 480.0);
        assert_eq!(vp.min_depth, 0.0);
        assert_eq!(vp.max_depth, 1.0);
    }

    #[test]
    fn edge_function_is_zero_on_the_edge() {
        assert_eq!(edge_function([0.0, 0.0], [1.0, 0.0], [0.5, 0.0]), 0.0);
    }

    #[test]
    fn edge_function_matches_signed_area_sign_convention() {
        let (a, b, p) = ([0.0, 0.0], [4.0, 0.0], [2.0, 4.0]);
        assert_eq!(edge_function(a, b, p), signed_area(a, b, p));
    }

    #[test]
    fn barycentric_weights_are_positive_and_sum_to_one_inside_a_triangle() {
        let (a, b, c) = ([0.0, 0.0], [4.0, 0.0], [2.0, 4.0]);
        let area = signed_area(a, b, c);
        assert!(area > 0.0);
        let inv_area = 1.0 / area;
        let p = [2.0, 4.0 / 3.0]; // the triangle's centroid
        let w0 = edge_function(b, c, p) * inv_area;
        let w1 = edge_function(c, a, p) * inv_area;
        let w2 = edge_function(a, b, p) * inv_area;
        assert!(w0 > 0.0 && w1 > 0.0 && w2 > 0.0);
        assert!((w0 + w1 + w2 - 1.0).abs() < 1e-5);
    }

    /// Two CCW triangles splitting a square along its diagonal must agree on exactly one owner
    /// for a point sitting exactly on the shared edge — never both, never neither.
    #[test]
    fn top_left_rule_gives_a_shared_edge_point_exactly_one_owner() {
        let inside = |p0: [f32; 2], p1: [f32; 2], p2: [f32; 2], p: [f32; 2]| {
            let area = signed_area(p0, p1, p2);
            let inv_area = 1.0 / area;
            let bias0 = top_left_bias(p1, p2);
            let bias1 = top_left_bias(p2, p0);
            let bias2 = top_left_bias(p0, p1);
            let w0 = edge_function(p1, p2, p) * inv_area + bias0;
            let w1 = edge_function(p2, p0, p) * inv_area + bias1;
            let w2 = edge_function(p0, p1, p) * inv_area + bias2;
            w0 >= 0.0 && w1 >= 0.0 && w2 >= 0.0
        };

        let lower_right = ([0.0, 0.0], [4.0, 0.0], [4.0, 4.0]);
        let upper_left = ([0.0, 0.0], [4.0, 4.0], [0.0, 4.0]);
        let on_shared_edge = [2.0, 2.0];

        let in_a = inside(lower_right.0, lower_right.1, lower_right.2, on_shared_edge);
        let in_b = inside(upper_left.0, upper_left.1, upper_left.2, on_shared_edge);
        assert_ne!(in_a, in_b, "shared-edge point must be claimed by exactly one triangle");

        // Same square, wound clockwise (negative area): the bias must still exclude a
        // non-top-left edge's boundary rather than flip sign with `inv_area` and include it.
        let lower_right_cw = ([0.0, 0.0], [4.0, 4.0], [4.0, 0.0]);
        let upper_left_cw = ([0.0, 0.0], [0.0, 4.0], [4.0, 4.0]);
        let in_a_cw = inside(lower_right_cw.0, lower_right_cw.1, lower_right_cw.2, on_shared_edge);
        let in_b_cw = inside(upper_left_cw.0, upper_left_cw.1, upper_left_cw.2, on_shared_edge);
        assert_ne!(in_a_cw, in_b_cw, "shared-edge point must be claimed by exactly one triangle");
    }
}
