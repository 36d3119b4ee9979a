//! Fixed-function RGBA blending for the output merger (§4.5, §6).
//!
//! [`Pipeline::blend`] is the fully-programmable path (arbitrary `Pixel`/`Fragment` types, an
//! arbitrary combining function); this module supplements it with the fixed-function
//! factor/equation model the dynamic renderer facade's `render_state.blend_*` fields describe,
//! for pipelines that want the conventional `(src, dst, equation)` triple instead of hand-rolling
//! `blend_src_alpha_over`-style functions.

use vek::Rgba;

/// Multiplicative blend factors applied to the source or destination color before combining.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum BlendFactor {
    Zero,
    One,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstAlpha,
    OneMinusDstAlpha,
}

impl BlendFactor {
    fn apply(self, color: Rgba<f32>, src_alpha: f32, dst_alpha: f32) -> Rgba<f32> {
        match self {
            BlendFactor::Zero => Rgba::new(0.0, 0.0, 0.0, 0.0),
            BlendFactor::One => color,
            BlendFactor::SrcAlpha => color * src_alpha,
            BlendFactor::OneMinusSrcAlpha => color * (1.0 - src_alpha),
            BlendFactor::DstAlpha => color * dst_alpha,
            BlendFactor::OneMinusDstAlpha => color * (1.0 - dst_alpha),
        }
    }
}

/// How the factored source and destination colors are combined.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum BlendEquation {
    Add,
    Subtract,
    ReverseSubtract,
    Min,
    Max,
}

impl BlendEquation {
    fn combine(self, src: Rgba<f32>, dst: Rgba<f32>) -> Rgba<f32> {
        match self {
            BlendEquation::Add => src + dst,
            BlendEquation::Subtract => src - dst,
            BlendEquation::ReverseSubtract => dst - src,
            BlendEquation::Min => Rgba::new(
                src.r.min(dst.r),
                src.g.min(dst.g),
                src.b.min(dst.b),
                src.a.min(dst.a),
            ),
            BlendEquation::Max => Rgba::new(
                src.r.max(dst.r),
                src.g.max(dst.g),
                src.b.max(dst.b),
                src.a.max(dst.a),
            ),
        }
    }
}

/// A fixed-function blend state, mirroring the dynamic renderer facade's
/// `render_state.blend_src`/`blend_dst`/`blend_equation` triple.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct BlendState {
    pub src_factor: BlendFactor,
    pub dst_factor: BlendFactor,
    pub equation: BlendEquation,
}

impl BlendState {
    /// The conventional "source over" alpha blend: `src*srcAlpha + dst*(1-srcAlpha)`.
    pub const ALPHA_OVER: Self = Self {
        src_factor: BlendFactor::SrcAlpha,
        dst_factor: BlendFactor::OneMinusSrcAlpha,
        equation: BlendEquation::Add,
    };

    /// Replaces the destination outright: `dst_factor` is ignored.
    pub const REPLACE: Self =
        Self { src_factor: BlendFactor::One, dst_factor: BlendFactor::Zero, equation: BlendEquation::Add };

    pub fn apply(&self, dst: Rgba<f32>, src: Rgba<f32>) -> Rgba<f32> {
        let factored_src = self.src_factor.apply(src, src.a, dst.a);
        let factored_dst = self.dst_factor.apply(dst, src.a, dst.a);
        self.equation.combine(factored_src, factored_dst)
    }
}
