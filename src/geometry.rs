//! Bounding volumes and plane/frustum classification, used by the clipper and by any
//! coarse-grained culling a caller wants to do before submitting a draw.
//!
//! Grounded directly on the original renderer's `Geometry.h`/`Geometry.cpp`: the corner
//! enumeration order, the `Plane::intersects` overload resolution (point -> segment -> triangle,
//! each built from the previous), and the six-plane `FrustumClipMask` bit layout are all carried
//! over unchanged, just expressed as `vek::Vec3<f32>` instead of `glm::vec3`.

use vek::{Mat4, Vec3, Vec4};

use crate::math::{abs_equal, less_than};

/// An axis-aligned bounding box.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BoundingBox {
    pub min: Vec3<f32>,
    pub max: Vec3<f32>,
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self { min: Vec3::zero(), max: Vec3::zero() }
    }
}

impl BoundingBox {
    pub fn new(min: Vec3<f32>, max: Vec3<f32>) -> Self {
        Self { min, max }
    }

    /// The 8 corners, in the same winding the original renderer documents: indices 0-3 are the
    /// max-z face (near), 4-7 the min-z face (far).
    pub fn corners(&self) -> [Vec3<f32>; 8] {
        [
            Vec3::new(self.min.x, self.max.y, self.max.z),
            Vec3::new(self.min.x, self.min.y, self.max.z),
            Vec3::new(self.max.x, self.min.y, self.max.z),
            Vec3::new(self.max.x, self.max.y, self.max.z),
            Vec3::new(self.max.x, self.max.y, self.min.z),
            Vec3::new(self.max.x, self.min.y, self.min.z),
            Vec3::new(self.min.x, self.min.y, self.min.z),
            Vec3::new(self.min.x, self.max.y, self.min.z),
        ]
    }

    /// Transforms all 8 corners by `matrix` and rebuilds an AABB around the result.
    pub fn transform(&self, matrix: Mat4<f32>) -> BoundingBox {
        let corners = self.corners();
        let first = (matrix * Vec4::from_point(corners[0])).xyz();
        let mut min = first;
        let mut max = first;
        for &corner in &corners[1..] {
            let p = (matrix * Vec4::from_point(corner)).xyz();
            min = Vec3::partial_min(min, p);
            max = Vec3::partial_max(max, p);
        }
        BoundingBox { min, max }
    }

    /// Axis-aligned overlap test (touching boxes count as intersecting).
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        let overlaps = |a_min: f32, a_max: f32, b_min: f32, b_max: f32| {
            (a_min >= b_min && a_min <= b_max) || (b_min >= a_min && b_min <= a_max)
        };
        overlaps(self.min.x, self.max.x, other.min.x, other.max.x)
            && overlaps(self.min.y, self.max.y, other.min.y, other.max.y)
            && overlaps(self.min.z, self.max.z, other.min.z, other.max.z)
    }

    /// Grows this box in place to also cover `other`.
    pub fn merge(&mut self, other: &BoundingBox) {
        self.min = Vec3::partial_min(self.min, other.min);
        self.max = Vec3::partial_max(self.max, other.max);
    }
}

/// Classification of an object's position relative to a plane.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PlaneIntersects {
    /// Straddles the plane.
    Cross,
    /// Lies exactly on the plane (within epsilon).
    Tangent,
    /// Entirely on the normal side.
    Front,
    /// Entirely on the opposite side.
    Back,
}

/// A plane in Hessian normal form, `dot(normal, p) + d == 0`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Plane {
    normal: Vec3<f32>,
    d: f32,
}

impl Plane {
    /// Builds a plane through `point` with the given (not necessarily unit) normal.
    pub fn from_normal_point(normal: Vec3<f32>, point: Vec3<f32>) -> Self {
        let normal = normal.normalized();
        let d = -normal.dot(point);
        Self { normal, d }
    }

    /// Builds a plane from a homogeneous `(a, b, c, d)` coefficient vector; does not normalize,
    /// matching the original's raw `FrustumClipPlane` constants which are already unit planes.
    pub fn from_coefficients(coeffs: Vec4<f32>) -> Self {
        Self { normal: coeffs.xyz(), d: coeffs.w }
    }

    #[inline]
    pub fn normal(&self) -> Vec3<f32> {
        self.normal
    }

    /// Signed distance from `point` to this plane.
    #[inline]
    pub fn distance(&self, point: Vec3<f32>) -> f32 {
        self.normal.dot(point) + self.d
    }

    pub fn intersects_point(&self, p: Vec3<f32>) -> PlaneIntersects {
        let d = self.distance(p);
        if abs_equal(d, 0.0) {
            PlaneIntersects::Tangent
        } else if d > 0.0 {
            PlaneIntersects::Front
        } else {
            PlaneIntersects::Back
        }
    }

    pub fn intersects_segment(&self, p0: Vec3<f32>, p1: Vec3<f32>) -> PlaneIntersects {
        let a = self.intersects_point(p0);
        let b = self.intersects_point(p1);
        if a == b {
            return a;
        }
        if a == PlaneIntersects::Tangent || b == PlaneIntersects::Tangent {
            return PlaneIntersects::Tangent;
        }
        PlaneIntersects::Cross
    }

    pub fn intersects_triangle(&self, p0: Vec3<f32>, p1: Vec3<f32>, p2: Vec3<f32>) -> PlaneIntersects {
        let a = self.intersects_segment(p0, p1);
        let b = self.intersects_segment(p0, p2);
        let c = self.intersects_segment(p1, p2);
        if a == b && a == c {
            return a;
        }
        if a == PlaneIntersects::Cross || b == PlaneIntersects::Cross || c == PlaneIntersects::Cross {
            return PlaneIntersects::Cross;
        }
        PlaneIntersects::Tangent
    }

    pub fn intersects_box(&self, bbox: &BoundingBox) -> PlaneIntersects {
        let center = (bbox.min + bbox.max) * 0.5;
        let extent = (bbox.max - bbox.min) * 0.5;
        let d = self.distance(center);
        let r = (extent.x * self.normal.x).abs() + (extent.y * self.normal.y).abs() + (extent.z * self.normal.z).abs();
        if abs_equal(d, r) {
            PlaneIntersects::Tangent
        } else if less_than(d.abs(), r) {
            PlaneIntersects::Cross
        } else if d > 0.0 {
            PlaneIntersects::Front
        } else {
            PlaneIntersects::Back
        }
    }
}

/// Per-plane bit flags reported by the clipper's 6-plane clip-mask classification (§4.4).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum FrustumClipMask {
    PositiveX = 1 << 0,
    NegativeX = 1 << 1,
    PositiveY = 1 << 2,
    NegativeY = 1 << 3,
    PositiveZ = 1 << 4,
    NegativeZ = 1 << 5,
}

pub const FRUSTUM_CLIP_MASK_ARRAY: [u8; 6] = [
    FrustumClipMask::PositiveX as u8,
    FrustumClipMask::NegativeX as u8,
    FrustumClipMask::PositiveY as u8,
    FrustumClipMask::NegativeY as u8,
    FrustumClipMask::PositiveZ as u8,
    FrustumClipMask::NegativeZ as u8,
];

/// The six homogeneous clip planes of the canonical `|x|, |y|, |z| <= w` clip cube, in the same
/// order as [`FRUSTUM_CLIP_MASK_ARRAY`]: +X, -X, +Y, -Y, +Z, -Z.
pub const CLIP_CUBE_PLANES: [Vec4<f32>; 6] = [
    Vec4::new(-1.0, 0.0, 0.0, 1.0),
    Vec4::new(1.0, 0.0, 0.0, 1.0),
    Vec4::new(0.0, -1.0, 0.0, 1.0),
    Vec4::new(0.0, 1.0, 0.0, 1.0),
    Vec4::new(0.0, 0.0, -1.0, 1.0),
    Vec4::new(0.0, 0.0, 1.0, 1.0),
];

/// A view frustum: 6 planes plus the cached corners/bbox derived from them, used for
/// coarse object-vs-frustum culling ahead of the per-triangle clipper.
#[derive(Clone, Debug)]
pub struct Frustum {
    /// `[near, far, top, bottom, left, right]`.
    pub planes: [Plane; 6],
    /// `[nearTL, nearTR, nearBL, nearBR, farTL, farTR, farBL, farBR]`.
    pub corners: [Vec3<f32>; 8],
    pub bbox: BoundingBox,
}

impl Frustum {
    /// Builds a frustum from 8 corners (already in the order documented above) plus the 6 plane
    /// normals/points, and derives the enclosing bbox.
    pub fn from_corners_and_planes(corners: [Vec3<f32>; 8], planes: [Plane; 6]) -> Self {
        let mut bbox = BoundingBox::new(corners[0], corners[0]);
        for &c in &corners[1..] {
            bbox.merge(&BoundingBox::new(c, c));
        }
        Self { planes, corners, bbox }
    }

    fn all_planes_not_back(&self, mut classify: impl FnMut(&Plane) -> PlaneIntersects) -> bool {
        self.planes.iter().all(|p| classify(p) != PlaneIntersects::Back)
    }

    pub fn intersects_point(&self, p: Vec3<f32>) -> bool {
        self.all_planes_not_back(|plane| plane.intersects_point(p))
    }

    pub fn intersects_segment(&self, p0: Vec3<f32>, p1: Vec3<f32>) -> bool {
        self.all_planes_not_back(|plane| plane.intersects_segment(p0, p1))
    }

    pub fn intersects_triangle(&self, p0: Vec3<f32>, p1: Vec3<f32>, p2: Vec3<f32>) -> bool {
        self.all_planes_not_back(|plane| plane.intersects_triangle(p0, p1, p2))
    }

    pub fn intersects_box(&self, bbox: &BoundingBox) -> bool {
        if !self.planes.iter().all(|plane| plane.intersects_box(bbox) != PlaneIntersects::Back) {
            return false;
        }
        self.bbox.intersects(bbox)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bbox_corners_match_documented_order() {
        let bbox = BoundingBox::new(Vec3::new(-1.0, -1.0, -1.0), Vec3::new(1.0, 1.0, 1.0));
        let corners = bbox.corners();
        assert_eq!(corners[0], Vec3::new(-1.0, 1.0, 1.0));
        assert_eq!(corners[6], Vec3::new(-1.0, -1.0, -1.0));
    }

    #[test]
    fn bbox_merge_grows_to_cover_both() {
        let mut a = BoundingBox::new(Vec3::new(0.0, 0.0, 0.0), Vec3::new(1.0, 1.0, 1.0));
        let b = BoundingBox::new(Vec3::new(-1.0, -1.0, -1.0), Vec3::new(0.5, 0.5, 0.5));
        a.merge(&b);
        assert_eq!(a.min, Vec3::new(-1.0, -1.0, -1.0));
        assert_eq!(a.max, Vec3::new(1.0, 1.0, 1.0));
    }

    #[test]
    fn bbox_intersects_is_symmetric_and_detects_disjoint() {
        let a = BoundingBox::new(Vec3::new(0.0, 0.0, 0.0), Vec3::new(1.0, 1.0, 1.0));
        let b = BoundingBox::new(Vec3::new(0.5, 0.5, 0.5), Vec3::new(2.0, 2.0, 2.0));
        let c = BoundingBox::new(Vec3::new(5.0, 5.0, 5.0), Vec3::new(6.0, 6.0, 6.0));
        assert!(a.intersects(&b));
        assert!(b.intersects(&a));
        assert!(!a.intersects(&c));
    }

    #[test]
    fn plane_classifies_point_front_and_back() {
        let plane = Plane::from_normal_point(Vec3::new(0.0, 0.0, 1.0), Vec3::zero());
        assert_eq!(plane.intersects_point(Vec3::new(0.0, 0.0, 1.0)), PlaneIntersects::Front);
        assert_eq!(plane.intersects_point(Vec3::new(0.0, 0.0, -1.0)), PlaneIntersects::Back);
        assert_eq!(plane.intersects_point(Vec3::zero()), PlaneIntersects::Tangent);
    }

    #[test]
    fn plane_classifies_straddling_segment_as_cross() {
        let plane = Plane::from_normal_point(Vec3::new(0.0, 0.0, 1.0), Vec3::zero());
        let result = plane.intersects_segment(Vec3::new(0.0, 0.0, -1.0), Vec3::new(0.0, 0.0, 1.0));
        assert_eq!(result, PlaneIntersects::Cross);
    }

    #[test]
    fn plane_classifies_triangle_entirely_in_front() {
        let plane = Plane::from_normal_point(Vec3::new(0.0, 0.0, 1.0), Vec3::zero());
        let result = plane.intersects_triangle(
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(1.0, 0.0, 1.0),
            Vec3::new(0.0, 1.0, 1.0),
        );
        assert_eq!(result, PlaneIntersects::Front);
    }

    fn axis_frustum() -> Frustum {
        // Unit cube frustum for classification tests; not meant to model a real perspective
        // frustum's corner geometry.
        let planes = [
            Plane::from_normal_point(Vec3::new(0.0, 0.0, -1.0), Vec3::new(0.0, 0.0, -1.0)),
            Plane::from_normal_point(Vec3::new(0.0, 0.0, 1.0), Vec3::new(0.0, 0.0, 1.0)),
            Plane::from_normal_point(Vec3::new(0.0, -1.0, 0.0), Vec3::new(0.0, 1.0, 0.0)),
            Plane::from_normal_point(Vec3::new(0.0, 1.0, 0.0), Vec3::new(0.0, -1.0, 0.0)),
            Plane::from_normal_point(Vec3::new(-1.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0)),
            Plane::from_normal_point(Vec3::new(1.0, 0.0, 0.0), Vec3::new(-1.0, 0.0, 0.0)),
        ];
        let corners = BoundingBox::new(Vec3::new(-1.0, -1.0, -1.0), Vec3::new(1.0, 1.0, 1.0)).corners();
        Frustum::from_corners_and_planes(corners, planes)
    }

    #[test]
    fn frustum_contains_interior_point_and_rejects_exterior() {
        let frustum = axis_frustum();
        assert!(frustum.intersects_point(Vec3::zero()));
        assert!(!frustum.intersects_point(Vec3::new(10.0, 0.0, 0.0)));
    }

    #[test]
    fn clip_cube_planes_are_in_frustum_clip_mask_order() {
        assert_eq!(CLIP_CUBE_PLANES.len(), FRUSTUM_CLIP_MASK_ARRAY.len());
        assert_eq!(FRUSTUM_CLIP_MASK_ARRAY[0], FrustumClipMask::PositiveX as u8);
        assert_eq!(FRUSTUM_CLIP_MASK_ARRAY[5], FrustumClipMask::NegativeZ as u8);
    }
}
