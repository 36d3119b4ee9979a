//! The programmable shader pipeline: the primary, static-dispatch entry point into the
//! rasterizer.
//!
//! `DepthMode`/`PixelMode`/`Handedness`/`YAxisDirection`/`CoordinateMode`/`AaMode` and the overall
//! shape of the `Pipeline` trait are carried over from the teacher crate essentially unchanged —
//! they already express exactly the state a draw call needs to configure. What's dropped is the
//! teacher's `Primitives: PrimitiveKind` associated type and its geometry-shader stage: this
//! renderer's `VertexArray` (§3) only ever describes indexed triangle lists, so the primitive
//! assembly and geometry-shader generality the teacher needed for point/line/triangle lists alike
//! collapses to a single fixed path. Rasterization itself — clipping, backface culling,
//! quad-based barycentric interpolation, early-Z, MSAA — lives in [`crate::raster`], grounded on
//! the original renderer's `PixelQuadContext` model rather than the teacher's power-of-two
//! downsample approximation (see `DESIGN.md`).

use core::ops::Range;

use vek::Rgba;

use crate::buffer::Target;
use crate::interpolate::WeightedSum;
use crate::vertex::VertexArray;

/// A depth-test comparison function. This is richer than `core::cmp::Ordering` because the
/// dynamic renderer facade's `render_state.depth_compare` (§6) needs `LessEqual`/`GreaterEqual`/
/// `NotEqual`/`Always`/`Never` as well, not just the three-way partial order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum DepthCompare {
    Never,
    Less,
    Equal,
    LessEqual,
    Greater,
    NotEqual,
    GreaterEqual,
    Always,
}

impl DepthCompare {
    #[inline(always)]
    pub(crate) fn passes(self, new: f32, existing: f32) -> bool {
        match self {
            DepthCompare::Never => false,
            DepthCompare::Less => new < existing,
            DepthCompare::Equal => new == existing,
            DepthCompare::LessEqual => new <= existing,
            DepthCompare::Greater => new > existing,
            DepthCompare::NotEqual => new != existing,
            DepthCompare::GreaterEqual => new >= existing,
            DepthCompare::Always => true,
        }
    }
}

/// Defines how a [`Pipeline`] will interact with the depth target.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub struct DepthMode {
    pub test: Option<DepthCompare>,
    pub write: bool,
}

impl DepthMode {
    pub const NONE: Self = Self { test: None, write: false };
    pub const LESS_WRITE: Self = Self { test: Some(DepthCompare::Less), write: true };
    pub const GREATER_WRITE: Self = Self { test: Some(DepthCompare::Greater), write: true };
    pub const LESS_PASS: Self = Self { test: Some(DepthCompare::Less), write: false };
    pub const GREATER_PASS: Self = Self { test: Some(DepthCompare::Greater), write: false };

    pub fn uses_depth(&self) -> bool {
        self.test.is_some() || self.write
    }
}

/// Defines how a [`Pipeline`] will interact with the pixel target.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub struct PixelMode {
    pub write: bool,
}

impl PixelMode {
    pub const WRITE: Self = Self { write: true };
    pub const PASS: Self = Self { write: false };
}

impl Default for PixelMode {
    fn default() -> Self {
        Self::WRITE
    }
}

/// The handedness of the coordinate space used by a pipeline.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Handedness {
    Left,
    Right,
}

/// The direction represented by +y in screen space.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum YAxisDirection {
    Down,
    Up,
}

/// The configuration of the coordinate system used by a pipeline.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub struct CoordinateMode {
    pub handedness: Handedness,
    pub y_axis_direction: YAxisDirection,
    pub z_clip_range: Option<Range<f32>>,
}

impl CoordinateMode {
    pub const OPENGL: Self = Self {
        handedness: Handedness::Right,
        y_axis_direction: YAxisDirection::Up,
        z_clip_range: Some(-1.0..1.0),
    };
    pub const VULKAN: Self = Self {
        handedness: Handedness::Left,
        y_axis_direction: YAxisDirection::Down,
        z_clip_range: Some(0.0..1.0),
    };
    pub const METAL: Self = Self {
        handedness: Handedness::Right,
        y_axis_direction: YAxisDirection::Down,
        z_clip_range: Some(0.0..1.0),
    };
    pub const DIRECTX: Self = Self {
        handedness: Handedness::Left,
        y_axis_direction: YAxisDirection::Up,
        z_clip_range: Some(0.0..1.0),
    };

    pub fn without_z_clip(self) -> Self {
        Self { z_clip_range: None, ..self }
    }

    pub(crate) fn passes_z_clip(&self, z: f32) -> bool {
        self.z_clip_range.as_ref().map_or(true, |clip| clip.start <= z && z <= clip.end)
    }
}

impl Default for CoordinateMode {
    fn default() -> Self {
        Self::VULKAN
    }
}

/// The anti-aliasing mode used by a pipeline. Unlike the teacher's `Msaa { level }` (a
/// power-of-two supersample-then-box-filter scheme), `Msaa4x` here means exactly the fixed
/// 4-sample pattern the rasterizer implements (§4.5): one coverage bit per sample, resolved by
/// box filter at `end_draw`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum AaMode {
    None,
    Msaa4x,
}

/// Which winding is considered front-facing.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum FrontFace {
    Ccw,
    Cw,
}

/// Which triangle winding(s) are discarded before rasterization.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CullMode {
    None,
    Front,
    Back,
}

/// Represents the high-level structure of a rendering pipeline. Uniform data is conventionally
/// stored as state within the implementing type.
pub trait Pipeline: Sized + Send + Sync {
    type Vertex;
    type VertexData: Clone + WeightedSum + Send + Sync;
    type Fragment: Clone + WeightedSum;
    type Pixel: Clone;

    #[inline]
    fn pixel_mode(&self) -> PixelMode {
        PixelMode::default()
    }

    #[inline]
    fn depth_mode(&self) -> DepthMode {
        DepthMode::NONE
    }

    #[inline]
    fn coordinate_mode(&self) -> CoordinateMode {
        CoordinateMode::default()
    }

    #[inline]
    fn aa_mode(&self) -> AaMode {
        AaMode::None
    }

    #[inline]
    fn cull_mode(&self) -> CullMode {
        CullMode::Back
    }

    #[inline]
    fn front_face(&self) -> FrontFace {
        FrontFace::Ccw
    }

    /// Transforms a [`Pipeline::Vertex`] into clip-space homogeneous coordinates plus a
    /// [`Pipeline::VertexData`] varyings block to be interpolated and passed to the fragment
    /// shader. Executed once per unique vertex index referenced by the draw (§4.3).
    fn vertex(&self, vertex: &Self::Vertex) -> ([f32; 4], Self::VertexData);

    /// Transforms interpolated varyings into a fragment. Executed for every covered sample.
    fn fragment(&self, vs_out: Self::VertexData) -> Self::Fragment;

    /// Blends a new fragment with the pixel target's existing contents. The default simply
    /// replaces; override (or use [`crate::blend::blend_rgba`] when `Pixel = Fragment =
    /// Rgba<f32>`) to implement alpha blending.
    fn blend(&self, old: Self::Pixel, new: Self::Fragment) -> Self::Pixel;

    /// Renders `vertex_array`'s indexed triangles into `pixel`/`depth`.
    ///
    /// **Do not override this method.**
    fn render<P, D>(&self, vertex_array: &VertexArray<Self::Vertex>, pixel: &mut P, depth: &mut D)
    where
        P: Target<Texel = Self::Pixel> + Send + Sync,
        D: Target<Texel = f32> + Send + Sync,
    {
        crate::raster::render_pipeline(
            self,
            vertex_array,
            &crate::raster::SingleSampleTarget(&*pixel),
            &crate::raster::SingleSampleTarget(&*depth),
            None,
        )
    }
}

/// Convenience default for pipelines whose pixel and fragment types are both RGBA: alpha-blends
/// `new` over `old` using the fragment's own alpha (source-over), the same default the original
/// renderer's output merger uses for `BLEND_SRC_ALPHA, BLEND_ONE_MINUS_SRC_ALPHA`.
pub fn blend_src_alpha_over(old: Rgba<f32>, new: Rgba<f32>) -> Rgba<f32> {
    let a = new.a;
    Rgba::new(
        new.r * a + old.r * (1.0 - a),
        new.g * a + old.g * (1.0 - a),
        new.b * a + old.b * (1.0 - a),
        a + old.a * (1.0 - a),
    )
}
