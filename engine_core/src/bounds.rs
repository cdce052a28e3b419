//! Axis-aligned bounding boxes

use glam::{Mat4, Vec3};

/// Axis-aligned box stored as center and half-size
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub center: Vec3,
    pub extents: Vec3,
}

impl Aabb {
    pub fn new(center: Vec3, size: Vec3) -> Self {
        Self {
            center,
            extents: size.abs() * 0.5,
        }
    }

    /// Unit cube around `center`; stands in for objects with no geometry
    pub fn unit(center: Vec3) -> Self {
        Self::new(center, Vec3::ONE)
    }

    pub fn from_min_max(min: Vec3, max: Vec3) -> Self {
        let lo = min.min(max);
        let hi = min.max(max);
        Self {
            center: (lo + hi) * 0.5,
            extents: (hi - lo) * 0.5,
        }
    }

    /// Smallest box containing every point, `None` for an empty set
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let (min, max) = iter.fold((first, first), |(lo, hi), p| (lo.min(p), hi.max(p)));
        Some(Self::from_min_max(min, max))
    }

    pub fn min(&self) -> Vec3 {
        self.center - self.extents
    }

    pub fn max(&self) -> Vec3 {
        self.center + self.extents
    }

    pub fn size(&self) -> Vec3 {
        self.extents * 2.0
    }

    /// Radius of the sphere through the box corners
    pub fn bounding_sphere_radius(&self) -> f32 {
        self.extents.length()
    }

    pub fn contains_point(&self, point: Vec3) -> bool {
        let lo = self.min();
        let hi = self.max();
        point.cmpge(lo).all() && point.cmple(hi).all()
    }

    pub fn encapsulate(&mut self, other: &Aabb) {
        *self = Self::from_min_max(self.min().min(other.min()), self.max().max(other.max()));
    }

    pub fn corners(&self) -> [Vec3; 8] {
        let lo = self.min();
        let hi = self.max();
        [
            Vec3::new(lo.x, lo.y, lo.z),
            Vec3::new(hi.x, lo.y, lo.z),
            Vec3::new(lo.x, hi.y, lo.z),
            Vec3::new(hi.x, hi.y, lo.z),
            Vec3::new(lo.x, lo.y, hi.z),
            Vec3::new(hi.x, lo.y, hi.z),
            Vec3::new(lo.x, hi.y, hi.z),
            Vec3::new(hi.x, hi.y, hi.z),
        ]
    }

    /// World-space box enclosing this box after `matrix` is applied
    pub fn transformed(&self, matrix: &Mat4) -> Self {
        let corners = self.corners().map(|c| matrix.transform_point3(c));
        // Eight corners always exist, so the fold below never sees an empty set.
        let (min, max) = corners
            .iter()
            .fold((corners[0], corners[0]), |(lo, hi), &p| (lo.min(p), hi.max(p)));
        Self::from_min_max(min, max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use glam::Quat;

    #[test]
    fn encapsulate_merges_disjoint_boxes() {
        let mut a = Aabb::from_min_max(Vec3::ZERO, Vec3::ONE);
        let b = Aabb::from_min_max(Vec3::new(2.0, -1.0, 0.0), Vec3::new(3.0, 0.0, 1.0));
        a.encapsulate(&b);
        assert_eq!(a.min(), Vec3::new(0.0, -1.0, 0.0));
        assert_eq!(a.max(), Vec3::new(3.0, 1.0, 1.0));
    }

    #[test]
    fn unit_box_radius() {
        let b = Aabb::unit(Vec3::new(4.0, 0.0, 0.0));
        assert_eq!(b.size(), Vec3::ONE);
        assert_relative_eq!(b.bounding_sphere_radius(), 0.75f32.sqrt());
    }

    #[test]
    fn from_points_empty_is_none() {
        assert!(Aabb::from_points(std::iter::empty()).is_none());
    }

    #[test]
    fn transformed_box_covers_rotated_corners() {
        let b = Aabb::from_min_max(Vec3::splat(-1.0), Vec3::splat(1.0));
        let m = Mat4::from_rotation_translation(
            Quat::from_rotation_y(std::f32::consts::FRAC_PI_4),
            Vec3::new(0.0, 2.0, 0.0),
        );
        let t = b.transformed(&m);
        assert_relative_eq!(t.center.y, 2.0, epsilon = 1e-5);
        assert_relative_eq!(t.extents.x, 2.0f32.sqrt(), epsilon = 1e-5);
        for corner in b.corners() {
            let p = m.transform_point3(corner);
            assert!(t.contains_point(t.center + (p - t.center) * 0.999));
        }
    }
}
