//! Weighted-sum interpolation of per-vertex data.
//!
//! Every type that flows from the vertex shader to the fragment shader — varyings, screen-space
//! depth, even the final blended pixel — is combined by a weighted sum of 2 or 3 values. The
//! clipper's edge intersections are `weighted_sum2` (`t` and `1 - t`); barycentric interpolation
//! across a triangle is `weighted_sum3` (`alpha, beta, gamma`). Implementing this once per leaf
//! type and composing it structurally (tuples, arrays) means the rasterizer never needs to know
//! what a varying actually contains.

pub trait WeightedSum {
    /// Linearly combine two values: `a * fa + b * fb`.
    fn weighted_sum2(a: Self, b: Self, fa: f32, fb: f32) -> Self;

    /// Linearly combine three values: `a * fa + b * fb + c * fc`.
    fn weighted_sum3(a: Self, b: Self, c: Self, fa: f32, fb: f32, fc: f32) -> Self;
}

macro_rules! impl_weighted_sum_for {
    ($t:ty) => {
        impl WeightedSum for $t {
            #[inline(always)]
            fn weighted_sum2(a: Self, b: Self, fa: f32, fb: f32) -> Self {
                a * fa + b * fb
            }
            #[inline(always)]
            fn weighted_sum3(a: Self, b: Self, c: Self, fa: f32, fb: f32, fc: f32) -> Self {
                a * fa + b * fb + c * fc
            }
        }
    };
}

impl_weighted_sum_for!(f32);
impl_weighted_sum_for!(vek::Vec2<f32>);
impl_weighted_sum_for!(vek::Vec3<f32>);
impl_weighted_sum_for!(vek::Vec4<f32>);
impl_weighted_sum_for!(vek::Rgb<f32>);
impl_weighted_sum_for!(vek::Rgba<f32>);

impl WeightedSum for () {
    #[inline(always)]
    fn weighted_sum2(_: Self, _: Self, _: f32, _: f32) -> Self {}
    #[inline(always)]
    fn weighted_sum3(_: Self, _: Self, _: Self, _: f32, _: f32, _: f32) -> Self {}
}

impl<T: WeightedSum, U: WeightedSum> WeightedSum for (T, U) {
    #[inline(always)]
    fn weighted_sum2(a: Self, b: Self, fa: f32, fb: f32) -> Self {
        (T::weighted_sum2(a.0, b.0, fa, fb), U::weighted_sum2(a.1, b.1, fa, fb))
    }
    #[inline(always)]
    fn weighted_sum3(a: Self, b: Self, c: Self, fa: f32, fb: f32, fc: f32) -> Self {
        (
            T::weighted_sum3(a.0, b.0, c.0, fa, fb, fc),
            U::weighted_sum3(a.1, b.1, c.1, fa, fb, fc),
        )
    }
}

impl<T: WeightedSum, U: WeightedSum, V: WeightedSum> WeightedSum for (T, U, V) {
    #[inline(always)]
    fn weighted_sum2(a: Self, b: Self, fa: f32, fb: f32) -> Self {
        (
            T::weighted_sum2(a.0, b.0, fa, fb),
            U::weighted_sum2(a.1, b.1, fa, fb),
            V::weighted_sum2(a.2, b.2, fa, fb),
        )
    }
    #[inline(always)]
    fn weighted_sum3(a: Self, b: Self, c: Self, fa: f32, fb: f32, fc: f32) -> Self {
        (
            T::weighted_sum3(a.0, b.0, c.0, fa, fb, fc),
            U::weighted_sum3(a.1, b.1, c.1, fa, fb, fc),
            V::weighted_sum3(a.2, b.2, c.2, fa, fb, fc),
        )
    }
}

impl<T: WeightedSum, U: WeightedSum, V: WeightedSum, W: WeightedSum> WeightedSum for (T, U, V, W) {
    #[inline(always)]
    fn weighted_sum2(a: Self, b: Self, fa: f32, fb: f32) -> Self {
        (
            T::weighted_sum2(a.0, b.0, fa, fb),
            U::weighted_sum2(a.1, b.1, fa, fb),
            V::weighted_sum2(a.2, b.2, fa, fb),
            W::weighted_sum2(a.3, b.3, fa, fb),
        )
    }
    #[inline(always)]
    fn weighted_sum3(a: Self, b: Self, c: Self, fa: f32, fb: f32, fc: f32) -> Self {
        (
            T::weighted_sum3(a.0, b.0, c.0, fa, fb, fc),
            U::weighted_sum3(a.1, b.1, c.1, fa, fb, fc),
            V::weighted_sum3(a.2, b.2, c.2, fa, fb, fc),
            W::weighted_sum3(a.3, b.3, c.3, fa, fb, fc),
        )
    }
}

impl<T: WeightedSum + Copy, const N: usize> WeightedSum for [T; N] {
    #[inline(always)]
    fn weighted_sum2(a: Self, b: Self, fa: f32, fb: f32) -> Self {
        let mut out = a;
        (0..N).for_each(|i| out[i] = T::weighted_sum2(a[i], b[i], fa, fb));
        out
    }
    #[inline(always)]
    fn weighted_sum3(a: Self, b: Self, c: Self, fa: f32, fb: f32, fc: f32) -> Self {
        let mut out = a;
        (0..N).for_each(|i| out[i] = T::weighted_sum3(a[i], b[i], c[i], fa, fb, fc));
        out
    }
}

/// Dynamically-sized varyings, used by the type-erased [`crate::renderer`] facade. Mismatched
/// lengths only happen transiently while building a draw (vertex/fragment shader varying counts
/// are reconciled by `create_shader_program` before any draw runs), so truncating to the
/// shorter length here is a defensive no-panic fallback, not a modeled case.
impl WeightedSum for Vec<f32> {
    fn weighted_sum2(a: Self, b: Self, fa: f32, fb: f32) -> Self {
        let len = a.len().min(b.len());
        (0..len).map(|i| a[i] * fa + b[i] * fb).collect()
    }
    fn weighted_sum3(a: Self, b: Self, c: Self, fa: f32, fb: f32, fc: f32) -> Self {
        let len = a.len().min(b.len()).min(c.len());
        (0..len).map(|i| a[i] * fa + b[i] * fb + c[i] * fc).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_weighted_sum() {
        assert_eq!(f32::weighted_sum2(2.0, 4.0, 0.25, 0.75), 3.5);
        assert_eq!(f32::weighted_sum3(1.0, 2.0, 3.0, 1.0, 0.0, 0.0), 1.0);
    }

    #[test]
    fn tuple_weighted_sum_is_componentwise() {
        let a = (1.0f32, 2.0f32);
        let b = (3.0f32, 4.0f32);
        assert_eq!(<(f32, f32)>::weighted_sum2(a, b, 0.5, 0.5), (2.0, 3.0));
    }

    #[test]
    fn vec_weighted_sum_truncates_to_shorter() {
        let a = vec![1.0, 1.0, 1.0];
        let b = vec![3.0, 3.0];
        assert_eq!(Vec::<f32>::weighted_sum2(a, b, 0.5, 0.5), vec![2.0, 2.0]);
    }
}
