//! A CPU software rasterizer core: clip-space transform, Sutherland-Hodgman clipping,
//! barycentric rasterization and a programmable shader pipeline, plus a handle-based dynamic
//! facade over the same rasterizer for callers that don't want to monomorphize per draw call.
//!
//! The static path is [`Pipeline`] + [`VertexArray`] + [`Pipeline::render`]; the dynamic path is
//! [`renderer::Renderer`]. Both bottom out in [`raster::render_pipeline`].

pub mod blend;
pub mod buffer;
pub mod clip;
pub mod error;
pub mod framebuffer;
pub mod geometry;
pub mod interpolate;
pub mod math;
pub mod pipeline;
pub mod raster;
pub mod renderer;
pub mod stats;
pub mod texture;
pub mod vertex;

pub use buffer::{Buffer, BufferLayout, Target};
pub use error::{RasterError, RasterResult};
pub use interpolate::WeightedSum;
pub use pipeline::{
    AaMode, CoordinateMode, CullMode, DepthCompare, DepthMode, FrontFace, Handedness, Pipeline,
    PixelMode, YAxisDirection,
};
pub use renderer::Renderer;
pub use stats::RenderStats;
pub use texture::{FilterMode, Texture2d, TextureCube, WrapMode};
pub use vertex::VertexArray;
