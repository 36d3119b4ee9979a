//! The framebuffer and output merger (§4.7, ambient expansion).
//!
//! `FrameBuffer` bundles a color attachment and an optional depth attachment; when constructed
//! with `sample_count > 1` each attachment becomes four sample planes instead of one, and
//! `end_draw` resolves them into a separate display buffer by box filter. The non-MSAA case
//! (`sample_count == 1`) has exactly one "sample plane" per attachment, which doubles as the
//! display buffer directly — there is nothing to resolve.

use crate::buffer::Buffer;
use crate::error::{RasterError, RasterResult};
use crate::interpolate::WeightedSum;
use crate::pipeline::Pipeline;
use crate::raster::MultiSampleTarget;
use crate::stats::RenderStats;
use crate::vertex::VertexArray;

/// Which attachments `begin_draw` clears.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ClearMask {
    pub color: bool,
    pub depth: bool,
}

impl ClearMask {
    pub const NONE: Self = Self { color: false, depth: false };
    pub const COLOR: Self = Self { color: true, depth: false };
    pub const DEPTH: Self = Self { color: false, depth: true };
    pub const ALL: Self = Self { color: true, depth: true };
}

/// Bundles a (possibly multisampled) color and depth attachment plus the transient per-frame
/// coverage buffer used by the MSAA resolve.
pub struct FrameBuffer<Pixel> {
    width: usize,
    height: usize,
    color_planes: Vec<Buffer<Pixel>>,
    depth_planes: Vec<Buffer<f32>>,
    /// Only present when `color_planes.len() > 1`; the resolved image `end_draw` writes into and
    /// `read_pixels` reads from. When there's a single sample plane, it *is* the display buffer.
    display_color: Option<Buffer<Pixel>>,
    coverage: Buffer<u8>,
    stats: RenderStats,
}

impl<Pixel: Clone + Default + WeightedSum> FrameBuffer<Pixel> {
    /// `sample_count` is clamped to `1` or `4`; any value greater than 1 is treated as 4x MSAA,
    /// matching `AaMode`'s fixed sample pattern. `with_depth` allocates a depth attachment (one
    /// plane per sample) alongside the color attachment.
    pub fn new(width: usize, height: usize, sample_count: usize, with_depth: bool) -> RasterResult<Self> {
        let planes = if sample_count > 1 { 4 } else { 1 };

        let mut color_planes = Vec::with_capacity(planes);
        for _ in 0..planes {
            color_planes.push(Buffer::make_default(width, height)?);
        }

        let mut depth_planes = Vec::new();
        if with_depth {
            for _ in 0..planes {
                depth_planes.push(Buffer::make_default(width, height)?);
            }
        }

        let display_color =
            if planes > 1 { Some(Buffer::make_default(width, height)?) } else { None };

        Ok(Self {
            width,
            height,
            color_planes,
            depth_planes,
            display_color,
            coverage: Buffer::make_default(width, height)?,
            stats: RenderStats::new(),
        })
    }

    pub fn size(&self) -> [usize; 2] {
        [self.width, self.height]
    }

    pub fn sample_count(&self) -> usize {
        self.color_planes.len()
    }

    /// Per-draw counters (§3.1), reset each `begin_draw`.
    pub fn stats(&self) -> &RenderStats {
        &self.stats
    }

    /// Clears the requested attachments (and, when clearing color, resets the coverage buffer
    /// that gates the MSAA resolve and the per-draw stats counters).
    pub fn begin_draw(&mut self, clear_mask: ClearMask, clear_color: Pixel, clear_depth: f32) {
        if clear_mask.color {
            for plane in &mut self.color_planes {
                plane.set_all(clear_color.clone());
            }
            if let Some(display) = &mut self.display_color {
                display.set_all(clear_color.clone());
            }
            self.coverage.set_all(0);
        }
        if clear_mask.depth {
            for plane in &mut self.depth_planes {
                plane.set_all(clear_depth);
            }
        }
        self.stats.reset();
    }

    /// Rasterizes `vertex_array` with `pipeline` into this framebuffer's sample planes.
    pub fn draw<P>(&self, pipeline: &P, vertex_array: &VertexArray<P::Vertex>) -> RasterResult<()>
    where
        P: Pipeline<Pixel = Pixel>,
    {
        if pipeline.depth_mode().uses_depth() && self.depth_planes.is_empty() {
            return Err(RasterError::draw_contract_violation(
                "pipeline requires a depth test, but this frame buffer has no depth attachment",
            ));
        }

        let pixel_target = ColorSamplePlanes { planes: &self.color_planes, coverage: &self.coverage };

        if self.depth_planes.is_empty() {
            // Never touched by the rasterizer (depth_mode.uses_depth() is false here), so a
            // single dummy plane stands in regardless of the draw's actual bounding box.
            let dummy = Buffer::<f32>::make_default(1, 1)?;
            let depth_target = MultiSampleTarget::new(std::slice::from_ref(&dummy));
            crate::raster::render_pipeline(
                pipeline,
                vertex_array,
                &pixel_target,
                &depth_target,
                Some(&self.stats),
            );
        } else {
            let depth_target = MultiSampleTarget::new(&self.depth_planes);
            crate::raster::render_pipeline(
                pipeline,
                vertex_array,
                &pixel_target,
                &depth_target,
                Some(&self.stats),
            );
        }

        Ok(())
    }

    /// Box-filters the sample planes into the display buffer. A no-op when `sample_count() == 1`
    /// (the single plane already is the display buffer).
    pub fn end_draw(&mut self) {
        let Some(display) = self.display_color.as_mut() else { return };
        debug_assert_eq!(self.color_planes.len(), 4);

        for y in 0..self.height {
            for x in 0..self.width {
                if self.coverage.get(x, y).copied().unwrap_or(0) == 0 {
                    continue;
                }
                let s0 = self.color_planes[0].get(x, y).expect("in bounds").clone();
                let s1 = self.color_planes[1].get(x, y).expect("in bounds").clone();
                let s2 = self.color_planes[2].get(x, y).expect("in bounds").clone();
                let s3 = self.color_planes[3].get(x, y).expect("in bounds").clone();
                let avg01 = Pixel::weighted_sum2(s0, s1, 0.5, 0.5);
                let avg23 = Pixel::weighted_sum2(s2, s3, 0.5, 0.5);
                let resolved = Pixel::weighted_sum2(avg01, avg23, 0.5, 0.5);
                display.set(x, y, resolved);
            }
        }
    }

    /// Returns the resolved display buffer: `display_color` when multisampled, else the single
    /// sample plane. Blocks on nothing beyond what already happened synchronously in `draw`;
    /// in a single-threaded-by-default crate the draw has unconditionally finished by the time
    /// this is callable, and the `par` feature's tile workers are joined before `draw` returns.
    pub fn read_pixels(&self) -> &Buffer<Pixel> {
        self.display_color.as_ref().unwrap_or(&self.color_planes[0])
    }
}

struct ColorSamplePlanes<'a, Pixel> {
    planes: &'a [Buffer<Pixel>],
    coverage: &'a Buffer<u8>,
}

impl<'a, Pixel: Clone> crate::raster::RasterTarget for ColorSamplePlanes<'a, Pixel> {
    type Texel = Pixel;

    fn size(&self) -> [usize; 2] {
        self.planes[0].size()
    }

    fn sample_count(&self) -> usize {
        self.planes.len()
    }

    unsafe fn read_exclusive_unchecked(&self, x: usize, y: usize, sample: usize) -> Pixel {
        self.planes[sample].read_exclusive_unchecked(x, y)
    }

    unsafe fn write_exclusive_unchecked(&self, x: usize, y: usize, sample: usize, texel: Pixel) {
        self.planes[sample].write_exclusive_unchecked(x, y, texel)
    }

    fn mark_covered(&self, x: usize, y: usize, _sample: usize) {
        let current = unsafe { self.coverage.read_exclusive_unchecked(x, y) };
        unsafe { self.coverage.write_exclusive_unchecked(x, y, current.saturating_add(1)) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vek::Rgba;

    #[test]
    fn single_sample_frame_buffer_has_no_separate_display_buffer() {
        let fb = FrameBuffer::<Rgba<f32>>::new(4, 4, 1, true).unwrap();
        assert_eq!(fb.sample_count(), 1);
        assert!(fb.display_color.is_none());
    }

    #[test]
    fn msaa_frame_buffer_allocates_four_planes_and_a_display_buffer() {
        let fb = FrameBuffer::<Rgba<f32>>::new(4, 4, 4, true).unwrap();
        assert_eq!(fb.sample_count(), 4);
        assert!(fb.display_color.is_some());
        assert_eq!(fb.depth_planes.len(), 4);
    }

    #[test]
    fn begin_draw_clears_color_and_resets_coverage() {
        let mut fb = FrameBuffer::<Rgba<f32>>::new(2, 2, 1, false).unwrap();
        fb.begin_draw(ClearMask::COLOR, Rgba::new(1.0, 0.0, 0.0, 1.0), 1.0);
        assert_eq!(fb.read_pixels().get(0, 0).unwrap().r, 1.0);
        assert_eq!(*fb.coverage.get(0, 0).unwrap(), 0);
    }

    #[test]
    fn end_draw_without_msaa_is_a_no_op() {
        let mut fb = FrameBuffer::<Rgba<f32>>::new(2, 2, 1, false).unwrap();
        fb.begin_draw(ClearMask::COLOR, Rgba::new(0.0, 1.0, 0.0, 1.0), 1.0);
        fb.end_draw();
        assert_eq!(fb.read_pixels().get(0, 0).unwrap().g, 1.0);
    }

    #[test]
    fn begin_draw_resets_stats() {
        let mut fb = FrameBuffer::<Rgba<f32>>::new(2, 2, 1, false).unwrap();
        fb.stats.inc_submitted();
        fb.begin_draw(ClearMask::COLOR, Rgba::new(0.0, 0.0, 0.0, 1.0), 1.0);
        assert_eq!(fb.stats().primitives_submitted(), 0);
    }

    #[test]
    fn uncovered_pixel_resolves_to_the_cleared_display_color() {
        let mut fb = FrameBuffer::<Rgba<f32>>::new(2, 2, 4, false).unwrap();
        let clear = Rgba::new(0.2, 0.2, 0.2, 1.0);
        fb.begin_draw(ClearMask::COLOR, clear, 1.0);
        fb.end_draw();
        assert_eq!(*fb.read_pixels().get(0, 0).unwrap(), clear);
    }
}
