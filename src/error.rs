//! The error taxonomy returned at API boundaries.
//!
//! Numeric edge cases encountered deep inside the rasterizer's inner loop (NaN barycentrics,
//! triangles with near-zero screen area, `w <= 0`) are *not* represented here: they're well-formed
//! pipeline outcomes, handled by clamping or skipping the offending sample and logging at
//! `trace`/`warn`, never by constructing a [`RasterError`]. Only failures at a draw call's
//! boundary — before any fragment has been produced — propagate as `Err`.

use thiserror::Error;

/// Errors that can be returned from the crate's resource-creation and draw-call boundary.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RasterError {
    /// A buffer, texture or framebuffer was asked to be created with a zero dimension, or a mip
    /// level / cube face index outside the valid range.
    #[error("invalid dimensions: {reason}")]
    InvalidDimensions { reason: String },

    /// The aligned allocator failed to satisfy a buffer allocation request.
    #[error("allocation of {requested_bytes} bytes (align {alignment}) failed")]
    AllocationFailure {
        requested_bytes: usize,
        alignment: usize,
    },

    /// The fragment shader's varying input size does not match the vertex shader's varying
    /// output size.
    #[error("shader link mismatch: vertex shader emits {vs_varyings} varyings, fragment shader expects {fs_varyings}")]
    ShaderLinkMismatch {
        vs_varyings: usize,
        fs_varyings: usize,
    },

    /// A draw call referenced vertex data or samplers inconsistently with its own contract.
    #[error("draw contract violation: {reason}")]
    DrawContractViolation { reason: String },
}

pub type RasterResult<T> = Result<T, RasterError>;

impl RasterError {
    pub(crate) fn invalid_dimensions(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        log::error!("{reason}");
        Self::InvalidDimensions { reason }
    }

    pub(crate) fn draw_contract_violation(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        log::error!("{reason}");
        Self::DrawContractViolation { reason }
    }
}
