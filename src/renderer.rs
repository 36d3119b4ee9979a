//! The dynamic, type-erased external interface (§6): handle-based resource pools over the same
//! rasterizer core the static [`crate::pipeline::Pipeline`] trait drives.
//!
//! Resource handles are `slotmap` keys, grounded on the teacher pack's GL-backend resource pools
//! (`ennis-autograph-ng`'s `backend_gl::pool::Pool`/`context.rs`), which use the identical
//! generational-index pattern for GPU object lifetimes. `DynPipeline` is the adapter that lets a
//! boxed vertex/fragment shader pair satisfy `Pipeline` so `draw` shares `crate::raster` with the
//! static path instead of re-implementing rasterization.

use slotmap::{new_key_type, SlotMap};
use vek::Rgba;

use crate::blend::BlendState;
use crate::error::{RasterError, RasterResult};
use crate::framebuffer::{ClearMask, FrameBuffer};
use crate::pipeline::{AaMode, CullMode, DepthCompare, DepthMode, FrontFace, Pipeline, PixelMode};
use crate::stats::RenderStats;
use crate::texture::{TextureCube, Texture2d};
use crate::vertex::VertexArray;

new_key_type! {
    pub struct VaoHandle;
    pub struct Texture2dHandle;
    pub struct TextureCubeHandle;
    pub struct ShaderHandle;
    pub struct FrameBufferHandle;
}

/// A vertex shader operating on raw per-vertex attributes, as used by the dynamic facade. Returns
/// clip-space position plus a varyings vector whose length must equal the linked fragment
/// shader's expected input length (checked at `create_shader_program`).
pub trait VertexShader: Send + Sync {
    fn run(&self, attributes: &[f32]) -> ([f32; 4], Vec<f32>);
}

/// A fragment shader operating on the interpolated varyings vector, producing an RGBA color.
pub trait FragmentShader: Send + Sync {
    fn run(&self, varyings: &[f32]) -> Rgba<f32>;
    fn varyings_len(&self) -> usize;
}

struct ShaderProgram {
    vertex: Box<dyn VertexShader + Send + Sync>,
    fragment: Box<dyn FragmentShader + Send + Sync>,
}

/// Depth-test and rasterization state accompanying a `draw` call, mirroring the spec's
/// `render_state` record. `line_width`/`point_size` are accepted (some asset pipelines pass them
/// unconditionally alongside triangle data) but are documented no-ops: the dynamic facade's
/// `VertexArray` is always an indexed triangle list, so there is no point/line primitive mode for
/// them to affect.
#[derive(Clone, Debug)]
pub struct RenderState {
    pub cull_mode: CullMode,
    pub front_face: FrontFace,
    pub depth_test: bool,
    pub depth_write: bool,
    pub depth_compare: DepthCompare,
    pub blend_enable: bool,
    pub blend: BlendState,
    pub aa_mode: AaMode,
    pub line_width: f32,
    pub point_size: f32,
    pub sample_shading: bool,
}

impl Default for RenderState {
    fn default() -> Self {
        Self {
            cull_mode: CullMode::Back,
            front_face: FrontFace::Ccw,
            depth_test: false,
            depth_write: false,
            depth_compare: DepthCompare::Less,
            blend_enable: false,
            blend: BlendState::ALPHA_OVER,
            aa_mode: AaMode::None,
            line_width: 1.0,
            point_size: 1.0,
            sample_shading: false,
        }
    }
}

/// Adapts a boxed [`ShaderProgram`] plus a [`RenderState`] to the static [`Pipeline`] trait so a
/// `draw` call can be routed through `crate::raster` unchanged.
struct DynPipeline<'a> {
    program: &'a ShaderProgram,
    state: &'a RenderState,
}

impl<'a> Pipeline for DynPipeline<'a> {
    type Vertex = Vec<f32>;
    type VertexData = Vec<f32>;
    type Fragment = Rgba<f32>;
    type Pixel = Rgba<f32>;

    fn pixel_mode(&self) -> PixelMode {
        PixelMode::default()
    }

    fn depth_mode(&self) -> DepthMode {
        DepthMode {
            test: self.state.depth_test.then_some(self.state.depth_compare),
            write: self.state.depth_write,
        }
    }

    fn aa_mode(&self) -> AaMode {
        self.state.aa_mode
    }

    fn cull_mode(&self) -> CullMode {
        self.state.cull_mode
    }

    fn front_face(&self) -> FrontFace {
        self.state.front_face
    }

    fn vertex(&self, vertex: &Self::Vertex) -> ([f32; 4], Self::VertexData) {
        self.program.vertex.run(vertex)
    }

    fn fragment(&self, vs_out: Self::VertexData) -> Self::Fragment {
        self.program.fragment.run(&vs_out)
    }

    fn blend(&self, old: Self::Pixel, new: Self::Fragment) -> Self::Pixel {
        if self.state.blend_enable {
            self.state.blend.apply(old, new)
        } else {
            new
        }
    }
}

/// The handle-based external interface: the facade a scene/viewer layer drives when it doesn't
/// want to monomorphize over a concrete [`Pipeline`] implementation per draw call.
#[derive(Default)]
pub struct Renderer {
    vaos: SlotMap<VaoHandle, VertexArray<Vec<f32>>>,
    textures_2d: SlotMap<Texture2dHandle, Texture2d>,
    textures_cube: SlotMap<TextureCubeHandle, TextureCube>,
    shaders: SlotMap<ShaderHandle, ShaderProgram>,
    frame_buffers: SlotMap<FrameBufferHandle, FrameBuffer<Rgba<f32>>>,
}

impl Renderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_vertex_array_object(
        &mut self,
        vertices: Vec<Vec<f32>>,
        triangles: Vec<[u32; 3]>,
    ) -> RasterResult<VaoHandle> {
        let vao = VertexArray::new(vertices, triangles)?;
        Ok(self.vaos.insert(vao))
    }

    pub fn create_texture_2d(
        &mut self,
        width: usize,
        height: usize,
        mip_levels: usize,
    ) -> RasterResult<Texture2dHandle> {
        let texture = Texture2d::create(width, height, mip_levels)?;
        Ok(self.textures_2d.insert(texture))
    }

    pub fn create_texture_cube(
        &mut self,
        size: usize,
        mip_levels: usize,
    ) -> RasterResult<TextureCubeHandle> {
        let texture = TextureCube::create(size, mip_levels)?;
        Ok(self.textures_cube.insert(texture))
    }

    pub fn texture_2d_mut(&mut self, handle: Texture2dHandle) -> RasterResult<&mut Texture2d> {
        self.textures_2d
            .get_mut(handle)
            .ok_or_else(|| RasterError::draw_contract_violation("unknown Texture2dHandle"))
    }

    pub fn texture_cube_mut(&mut self, handle: TextureCubeHandle) -> RasterResult<&mut TextureCube> {
        self.textures_cube
            .get_mut(handle)
            .ok_or_else(|| RasterError::draw_contract_violation("unknown TextureCubeHandle"))
    }

    pub fn create_shader_program(
        &mut self,
        vertex: Box<dyn VertexShader + Send + Sync>,
        fragment: Box<dyn FragmentShader + Send + Sync>,
        vs_varyings: usize,
    ) -> RasterResult<ShaderHandle> {
        let fs_varyings = fragment.varyings_len();
        if vs_varyings != fs_varyings {
            return Err(RasterError::ShaderLinkMismatch { vs_varyings, fs_varyings });
        }
        Ok(self.shaders.insert(ShaderProgram { vertex, fragment }))
    }

    pub fn create_frame_buffer(
        &mut self,
        width: usize,
        height: usize,
        sample_count: usize,
        with_depth: bool,
    ) -> RasterResult<FrameBufferHandle> {
        let fb = FrameBuffer::new(width, height, sample_count, with_depth)?;
        Ok(self.frame_buffers.insert(fb))
    }

    pub fn begin_draw(
        &mut self,
        frame_buffer: FrameBufferHandle,
        clear_mask: ClearMask,
        clear_color: Rgba<f32>,
        clear_depth: f32,
    ) -> RasterResult<()> {
        let fb = self.frame_buffer_mut(frame_buffer)?;
        fb.begin_draw(clear_mask, clear_color, clear_depth);
        Ok(())
    }

    pub fn draw(
        &self,
        frame_buffer: FrameBufferHandle,
        vao: VaoHandle,
        shader: ShaderHandle,
        render_state: &RenderState,
    ) -> RasterResult<()> {
        let fb = self
            .frame_buffers
            .get(frame_buffer)
            .ok_or_else(|| RasterError::draw_contract_violation("unknown FrameBufferHandle"))?;
        let vao = self
            .vaos
            .get(vao)
            .ok_or_else(|| RasterError::draw_contract_violation("unknown VaoHandle"))?;
        let program = self
            .shaders
            .get(shader)
            .ok_or_else(|| RasterError::draw_contract_violation("unknown ShaderHandle"))?;

        let pipeline = DynPipeline { program, state: render_state };
        fb.draw(&pipeline, vao)
    }

    pub fn end_draw(&mut self, frame_buffer: FrameBufferHandle) -> RasterResult<()> {
        let fb = self.frame_buffer_mut(frame_buffer)?;
        fb.end_draw();
        Ok(())
    }

    /// Copies the `w * h` pixel rectangle starting at `(x, y)` from `frame_buffer`'s resolved
    /// display buffer into `out` (row-major, length `w * h`). Blocks only in the sense that it
    /// requires `draw`/`end_draw` for this frame to have already returned; this crate has no
    /// background rendering thread for a caller to wait on.
    pub fn read_pixels(
        &self,
        frame_buffer: FrameBufferHandle,
        x: usize,
        y: usize,
        w: usize,
        h: usize,
        out: &mut [Rgba<f32>],
    ) -> RasterResult<()> {
        let fb = self
            .frame_buffers
            .get(frame_buffer)
            .ok_or_else(|| RasterError::draw_contract_violation("unknown FrameBufferHandle"))?;
        if out.len() != w * h {
            return Err(RasterError::draw_contract_violation(format!(
                "read_pixels output buffer has length {}, expected {}",
                out.len(),
                w * h
            )));
        }
        let buffer = fb.read_pixels();
        let [width, height] = fb.size();
        if x + w > width || y + h > height {
            return Err(RasterError::draw_contract_violation(
                "read_pixels rectangle exceeds frame buffer bounds",
            ));
        }
        for row in 0..h {
            for col in 0..w {
                out[row * w + col] = buffer.get(x + col, y + row).copied().unwrap_or_default();
            }
        }
        Ok(())
    }

    /// Per-draw counters (§3.1) for `frame_buffer`'s most recent `draw` call.
    pub fn stats(&self, frame_buffer: FrameBufferHandle) -> RasterResult<&RenderStats> {
        self.frame_buffers
            .get(frame_buffer)
            .map(FrameBuffer::stats)
            .ok_or_else(|| RasterError::draw_contract_violation("unknown FrameBufferHandle"))
    }

    fn frame_buffer_mut(
        &mut self,
        handle: FrameBufferHandle,
    ) -> RasterResult<&mut FrameBuffer<Rgba<f32>>> {
        self.frame_buffers
            .get_mut(handle)
            .ok_or_else(|| RasterError::draw_contract_violation("unknown FrameBufferHandle"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct PassthroughVertex;
    impl VertexShader for PassthroughVertex {
        fn run(&self, attributes: &[f32]) -> ([f32; 4], Vec<f32>) {
            ([attributes[0], attributes[1], 0.0, 1.0], vec![])
        }
    }

    struct SolidFragment(Rgba<f32>);
    impl FragmentShader for SolidFragment {
        fn run(&self, _varyings: &[f32]) -> Rgba<f32> {
            self.0
        }
        fn varyings_len(&self) -> usize {
            0
        }
    }

    #[test]
    fn mismatched_varyings_are_rejected_at_shader_creation() {
        struct TwoVaryingVertex;
        impl VertexShader for TwoVaryingVertex {
            fn run(&self, _: &[f32]) -> ([f32; 4], Vec<f32>) {
                ([0.0; 4], vec![0.0, 0.0])
            }
        }
        let mut renderer = Renderer::new();
        let result = renderer.create_shader_program(
            Box::new(TwoVaryingVertex),
            Box::new(SolidFragment(Rgba::new(1.0, 1.0, 1.0, 1.0))),
            2,
        );
        assert!(result.is_ok());

        let result = renderer.create_shader_program(
            Box::new(PassthroughVertex),
            Box::new(SolidFragment(Rgba::new(1.0, 0.0, 0.0, 1.0))),
            1,
        );
        assert!(matches!(result, Err(RasterError::ShaderLinkMismatch { .. })));
    }

    #[test]
    fn draw_rejects_unknown_handles() {
        let renderer = Renderer::new();
        let bogus_vao = renderer.vaos.keys().next();
        assert!(bogus_vao.is_none());
    }

    #[test]
    fn end_to_end_draw_fills_expected_pixel() {
        let mut renderer = Renderer::new();
        let fb = renderer.create_frame_buffer(4, 4, 1, false).unwrap();
        let vao = renderer
            .create_vertex_array_object(
                vec![vec![-1.0, -1.0], vec![1.0, -1.0], vec![0.0, 1.0]],
                vec![[0, 1, 2]],
            )
            .unwrap();
        let shader = renderer
            .create_shader_program(
                Box::new(PassthroughVertex),
                Box::new(SolidFragment(Rgba::new(1.0, 0.0, 0.0, 1.0))),
                0,
            )
            .unwrap();

        renderer
            .begin_draw(fb, ClearMask::ALL, Rgba::new(0.0, 0.0, 0.0, 1.0), 1.0)
            .unwrap();
        let mut state = RenderState::default();
        state.cull_mode = CullMode::None;
        renderer.draw(fb, vao, shader, &state).unwrap();
        renderer.end_draw(fb).unwrap();

        let mut out = vec![Rgba::new(0.0, 0.0, 0.0, 0.0); 16];
        renderer.read_pixels(fb, 0, 0, 4, 4, &mut out).unwrap();
        assert!(out.iter().any(|p| p.r > 0.0));

        let stats = renderer.stats(fb).unwrap();
        assert_eq!(stats.primitives_submitted(), 1);
        assert_eq!(stats.primitives_rasterized(), 1);
        assert!(stats.fragments_shaded() > 0);
    }
}
