//! Mip-chained 2D and cube textures over [`Buffer<Rgba<f32>>`], with nearest/bilinear filtering
//! and four wrap modes.
//!
//! Grounded on the teacher's `sampler/{mod,nearest,linear}.rs`: `WrapMode` plays the role of the
//! teacher's `Clamped`/`Tiled`/`Mirrored` sampler wrappers, but as a runtime enum rather than a
//! compile-time wrapper type, since §6's `create_texture_2d` chooses the wrap mode at resource
//! creation time, not at the call site of every `sample_2d`. `ClampToBorder` has no teacher
//! counterpart — it's carried over from the original renderer's wrap-mode enum.

use vek::{Rgba, Vec3};

use crate::buffer::Buffer;
use crate::error::{RasterError, RasterResult};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum WrapMode {
    Repeat,
    MirroredRepeat,
    ClampToEdge,
    ClampToBorder,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FilterMode {
    Nearest,
    Linear,
}

/// Faces of a [`TextureCube`], in the standard `+X, -X, +Y, -Y, +Z, -Z` order.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(usize)]
pub enum CubeFace {
    PositiveX = 0,
    NegativeX = 1,
    PositiveY = 2,
    NegativeY = 3,
    PositiveZ = 4,
    NegativeZ = 5,
}

pub const CUBE_FACE_COUNT: usize = 6;

fn max_mip_levels(w: usize, h: usize) -> usize {
    (w.max(h) as f32).log2().floor() as usize + 1
}

/// A 2D texture: a chain of progressively halved mip levels, each an RGBA buffer.
pub struct Texture2d {
    levels: Vec<Buffer<Rgba<f32>>>,
    wrap: WrapMode,
    filter: FilterMode,
    border: Rgba<f32>,
}

impl Texture2d {
    /// Allocates a texture with `mip_levels` levels (clamped to the maximum the base size
    /// supports), defaulting every texel to transparent black.
    pub fn create(width: usize, height: usize, mip_levels: usize) -> RasterResult<Self> {
        if width == 0 || height == 0 {
            return Err(RasterError::invalid_dimensions(format!(
                "texture dimensions must be non-zero, got {width}x{height}"
            )));
        }
        let max_levels = max_mip_levels(width, height);
        let levels_wanted = mip_levels.clamp(1, max_levels);
        let mut levels = Vec::with_capacity(levels_wanted);
        let (mut w, mut h) = (width, height);
        for _ in 0..levels_wanted {
            levels.push(Buffer::make_default(w, h)?);
            w = (w / 2).max(1);
            h = (h / 2).max(1);
        }
        Ok(Self {
            levels,
            wrap: WrapMode::Repeat,
            filter: FilterMode::Linear,
            border: Rgba::zero(),
        })
    }

    pub fn set_wrap(&mut self, wrap: WrapMode) {
        self.wrap = wrap;
    }

    pub fn set_filter(&mut self, filter: FilterMode) {
        self.filter = filter;
    }

    pub fn set_border_color(&mut self, border: Rgba<f32>) {
        self.border = border;
    }

    pub fn mip_levels(&self) -> usize {
        self.levels.len()
    }

    pub fn max_level(&self) -> f32 {
        (self.levels.len() - 1) as f32
    }

    /// Uploads texel data into `level`, per §6's `InvalidDimensions` contract for out-of-range
    /// mip levels.
    pub fn upload_level(&mut self, level: usize, data: &[Rgba<f32>]) -> RasterResult<()> {
        let buf = self.levels.get_mut(level).ok_or_else(|| {
            RasterError::invalid_dimensions(format!(
                "mip level {level} out of range (texture has {} levels)",
                self.levels.len()
            ))
        })?;
        buf.load_raw(data)
    }

    fn wrap_coord(&self, u: f32) -> (f32, bool) {
        match self.wrap {
            WrapMode::Repeat => (u.rem_euclid(1.0), false),
            WrapMode::MirroredRepeat => {
                let t = u.rem_euclid(2.0);
                let t = if t >= 1.0 { 2.0 - t } else { t };
                (t, false)
            }
            WrapMode::ClampToEdge => (u.clamp(0.0, 1.0), false),
            WrapMode::ClampToBorder => {
                if !(0.0..=1.0).contains(&u) {
                    (0.0, true)
                } else {
                    (u, false)
                }
            }
        }
    }

    fn sample_level_nearest(&self, level: usize, u: f32, v: f32) -> Rgba<f32> {
        let buf = &self.levels[level];
        let (w, h) = (buf.width(), buf.height());
        let (u, border_u) = self.wrap_coord(u);
        let (v, border_v) = self.wrap_coord(v);
        if border_u || border_v {
            return self.border;
        }
        let edge_u = if self.wrap == WrapMode::ClampToEdge { u.clamp(0.5 / w as f32, 1.0 - 0.5 / w as f32) } else { u };
        let edge_v = if self.wrap == WrapMode::ClampToEdge { v.clamp(0.5 / h as f32, 1.0 - 0.5 / h as f32) } else { v };
        let x = ((edge_u * w as f32) as usize).min(w - 1);
        let y = ((edge_v * h as f32) as usize).min(h - 1);
        *buf.get(x, y).unwrap()
    }

    fn sample_level_linear(&self, level: usize, u: f32, v: f32) -> Rgba<f32> {
        let buf = &self.levels[level];
        let (w, h) = (buf.width(), buf.height());
        let (u, border_u) = self.wrap_coord(u);
        let (v, border_v) = self.wrap_coord(v);
        if border_u || border_v {
            return self.border;
        }
        let tex_x = u * w as f32 - 0.5;
        let tex_y = v * h as f32 - 0.5;
        let x0 = tex_x.floor();
        let y0 = tex_y.floor();
        let fx = tex_x - x0;
        let fy = tex_y - y0;

        let wrap_index = |coord: f32, size: usize| -> usize {
            let size_f = size as f32;
            match self.wrap {
                WrapMode::Repeat => (coord.rem_euclid(size_f)) as usize,
                WrapMode::MirroredRepeat => {
                    let period = 2.0 * size_f;
                    let t = coord.rem_euclid(period);
                    (if t >= size_f { period - t - 1.0 } else { t }).clamp(0.0, size_f - 1.0) as usize
                }
                WrapMode::ClampToEdge | WrapMode::ClampToBorder => coord.clamp(0.0, size_f - 1.0) as usize,
            }
        };

        let x0i = wrap_index(x0, w);
        let x1i = wrap_index(x0 + 1.0, w);
        let y0i = wrap_index(y0, h);
        let y1i = wrap_index(y0 + 1.0, h);

        let t00 = *buf.get(x0i, y0i).unwrap();
        let t10 = *buf.get(x1i, y0i).unwrap();
        let t01 = *buf.get(x0i, y1i).unwrap();
        let t11 = *buf.get(x1i, y1i).unwrap();

        let top = t00 * (1.0 - fx) + t10 * fx;
        let bottom = t01 * (1.0 - fx) + t11 * fx;
        top * (1.0 - fy) + bottom * fy
    }

    fn sample_level(&self, level: usize, u: f32, v: f32) -> Rgba<f32> {
        match self.filter {
            FilterMode::Nearest => self.sample_level_nearest(level, u, v),
            FilterMode::Linear => self.sample_level_linear(level, u, v),
        }
    }

    /// Samples at normalized `uv` and level-of-detail `lod`, per §4.2.
    pub fn sample_2d(&self, uv: [f32; 2], lod: f32) -> Rgba<f32> {
        let max_level = self.max_level();
        let l = lod.clamp(0.0, max_level);
        let lo = l.floor() as usize;
        let hi = l.ceil() as usize;
        let frac = l - lo as f32;
        if lo == hi || frac <= f32::EPSILON {
            self.sample_level(lo, uv[0], uv[1])
        } else {
            let a = self.sample_level(lo, uv[0], uv[1]);
            let b = self.sample_level(hi, uv[0], uv[1]);
            a * (1.0 - frac) + b * frac
        }
    }
}

/// Six independent [`Texture2d`] mip chains, one per cube face.
pub struct TextureCube {
    faces: [Texture2d; CUBE_FACE_COUNT],
}

impl TextureCube {
    pub fn create(size: usize, mip_levels: usize) -> RasterResult<Self> {
        let mut faces = Vec::with_capacity(CUBE_FACE_COUNT);
        for _ in 0..CUBE_FACE_COUNT {
            faces.push(Texture2d::create(size, size, mip_levels)?);
        }
        Ok(Self {
            faces: faces.try_into().unwrap_or_else(|_| unreachable!()),
        })
    }

    pub fn face_mut(&mut self, face: CubeFace) -> &mut Texture2d {
        &mut self.faces[face as usize]
    }

    pub fn face(&self, face: CubeFace) -> &Texture2d {
        &self.faces[face as usize]
    }

    /// Selects a face by the largest `|component|` of `dir` and maps to that face's `(s, t)`
    /// per the standard cube-map face table, then delegates to 2D sampling.
    pub fn sample_cube(&self, dir: Vec3<f32>, lod: f32) -> Rgba<f32> {
        let (ax, ay, az) = (dir.x.abs(), dir.y.abs(), dir.z.abs());
        let (face, s, t, ma) = if ax >= ay && ax >= az {
            if dir.x > 0.0 {
                (CubeFace::PositiveX, -dir.z, -dir.y, ax)
            } else {
                (CubeFace::NegativeX, dir.z, -dir.y, ax)
            }
        } else if ay >= ax && ay >= az {
            if dir.y > 0.0 {
                (CubeFace::PositiveY, dir.x, dir.z, ay)
            } else {
                (CubeFace::NegativeY, dir.x, -dir.z, ay)
            }
        } else if dir.z > 0.0 {
            (CubeFace::PositiveZ, dir.x, -dir.y, az)
        } else {
            (CubeFace::NegativeZ, -dir.x, -dir.y, az)
        };
        let u = (s / ma + 1.0) * 0.5;
        let v = (t / ma + 1.0) * 0.5;
        self.face(face).sample_2d([u, v], lod)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_allocates_requested_mip_chain_clamped_to_max() {
        let tex = Texture2d::create(4, 4, 99).unwrap();
        assert_eq!(tex.mip_levels(), max_mip_levels(4, 4));
    }

    #[test]
    fn zero_dimension_texture_is_rejected() {
        assert!(Texture2d::create(0, 4, 1).is_err());
    }

    #[test]
    fn nearest_sample_picks_uploaded_texel() {
        let mut tex = Texture2d::create(2, 2, 1).unwrap();
        tex.set_filter(FilterMode::Nearest);
        tex.upload_level(
            0,
            &[
                Rgba::new(1.0, 0.0, 0.0, 1.0),
                Rgba::new(0.0, 1.0, 0.0, 1.0),
                Rgba::new(0.0, 0.0, 1.0, 1.0),
                Rgba::new(1.0, 1.0, 1.0, 1.0),
            ],
        )
        .unwrap();
        let sample = tex.sample_2d([0.1, 0.1], 0.0);
        assert_eq!(sample, Rgba::new(1.0, 0.0, 0.0, 1.0));
    }

    #[test]
    fn clamp_to_border_returns_border_color_outside_unit_range() {
        let mut tex = Texture2d::create(2, 2, 1).unwrap();
        tex.set_wrap(WrapMode::ClampToBorder);
        tex.set_border_color(Rgba::new(0.0, 0.0, 0.0, 0.0));
        tex.upload_level(0, &[Rgba::one(); 4]).unwrap();
        assert_eq!(tex.sample_2d([1.5, 0.5], 0.0), Rgba::new(0.0, 0.0, 0.0, 0.0));
    }

    #[test]
    fn lod_blends_between_adjacent_mip_levels() {
        let mut tex = Texture2d::create(4, 4, 3).unwrap();
        tex.upload_level(0, &[Rgba::new(1.0, 1.0, 1.0, 1.0); 16]).unwrap();
        tex.upload_level(1, &[Rgba::new(0.0, 0.0, 0.0, 0.0); 4]).unwrap();
        let sample = tex.sample_2d([0.5, 0.5], 0.5);
        assert!((sample.r - 0.5).abs() < 1e-4);
    }

    #[test]
    fn cube_sample_picks_positive_x_face_for_dominant_positive_x_direction() {
        let mut cube = TextureCube::create(2, 1).unwrap();
        cube.face_mut(CubeFace::PositiveX)
            .upload_level(0, &[Rgba::new(1.0, 0.0, 0.0, 1.0); 4])
            .unwrap();
        let sample = cube.sample_cube(Vec3::new(1.0, 0.0, 0.0), 0.0);
        assert_eq!(sample, Rgba::new(1.0, 0.0, 0.0, 1.0));
    }
}
