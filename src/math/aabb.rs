//! Axis-aligned bounding box

use crate::core::error::Error;
use crate::core::types::{Result, Vec3};

/// Axis-aligned bounding box defined by min and max corners
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Create AABB from min and max corners
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Smallest AABB enclosing all points. Empty input yields a
    /// zero-size box at the origin.
    pub fn from_points(points: &[Vec3]) -> Self {
        if points.is_empty() {
            return Self::default();
        }
        let mut min = Vec3::INFINITY;
        let mut max = Vec3::NEG_INFINITY;
        for p in points {
            min = min.min(*p);
            max = max.max(*p);
        }
        Self { min, max }
    }

    /// Get center point
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Get size (max - min)
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Longest axis extent
    pub fn max_extent(&self) -> f32 {
        let s = self.size();
        s.x.max(s.y).max(s.z)
    }

    /// Check if point is inside AABB
    pub fn contains_point(&self, p: Vec3) -> bool {
        p.x >= self.min.x && p.x <= self.max.x &&
        p.y >= self.min.y && p.y <= self.max.y &&
        p.z >= self.min.z && p.z <= self.max.z
    }

    /// Expand AABB to include point
    pub fn expand(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    /// Reject non-finite or inverted bounds.
    ///
    /// Zero-size axes are fine; they produce a degenerate (empty) grid
    /// downstream rather than an error.
    pub fn validate(&self) -> Result<()> {
        if !self.min.is_finite() || !self.max.is_finite() {
            return Err(Error::InvalidArgument(format!(
                "non-finite bounds: min={:?} max={:?}",
                self.min, self.max
            )));
        }
        if self.max.cmplt(self.min).any() {
            return Err(Error::InvalidArgument(format!(
                "inverted bounds: min={:?} max={:?}",
                self.min, self.max
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_and_accessors() {
        let aabb = Aabb::new(Vec3::ZERO, Vec3::ONE);
        assert_eq!(aabb.center(), Vec3::splat(0.5));
        assert_eq!(aabb.size(), Vec3::ONE);
        assert_eq!(aabb.max_extent(), 1.0);
    }

    #[test]
    fn test_from_points() {
        let aabb = Aabb::from_points(&[
            Vec3::new(-1.0, 0.0, 2.0),
            Vec3::new(3.0, -2.0, 0.5),
        ]);
        assert_eq!(aabb.min, Vec3::new(-1.0, -2.0, 0.5));
        assert_eq!(aabb.max, Vec3::new(3.0, 0.0, 2.0));

        assert_eq!(Aabb::from_points(&[]), Aabb::default());
    }

    #[test]
    fn test_contains_point() {
        let aabb = Aabb::new(Vec3::ZERO, Vec3::ONE);
        assert!(aabb.contains_point(Vec3::splat(0.5)));
        assert!(!aabb.contains_point(Vec3::splat(2.0)));
    }

    #[test]
    fn test_validate() {
        assert!(Aabb::new(Vec3::ZERO, Vec3::ONE).validate().is_ok());
        // Zero-size axis is allowed.
        assert!(Aabb::new(Vec3::ZERO, Vec3::new(1.0, 0.0, 1.0)).validate().is_ok());
        assert!(Aabb::new(Vec3::ONE, Vec3::ZERO).validate().is_err());
        assert!(Aabb::new(Vec3::splat(f32::NAN), Vec3::ONE).validate().is_err());
        assert!(Aabb::new(Vec3::ZERO, Vec3::splat(f32::INFINITY)).validate().is_err());
    }
}
