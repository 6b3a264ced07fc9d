//! Math utilities and types
//!
//! Provides the vector and bounding-volume types shared by the culling
//! bookkeeping and the visibility engines it feeds.

pub use nalgebra::Vector3;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// Sphere used as the bounding volume of a culling target
///
/// Visibility engines only ever see targets through these spheres, so the
/// sphere is the whole of a target's geometry as far as culling is concerned.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSphere {
    /// Centre of the sphere in world space
    pub position: Vec3,

    /// Radius of the sphere
    pub radius: f32,
}

impl BoundingSphere {
    /// Create a new bounding sphere
    pub fn new(position: Vec3, radius: f32) -> Self {
        Self { position, radius }
    }

    /// Distance from a point to the sphere centre
    pub fn distance_to_center(&self, point: &Vec3) -> f32 {
        (self.position - point).magnitude()
    }

    /// Distance from a point to the nearest point on the sphere surface
    ///
    /// Negative when the point lies inside the sphere.
    pub fn distance_to_surface(&self, point: &Vec3) -> f32 {
        self.distance_to_center(point) - self.radius
    }
}

impl Default for BoundingSphere {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            radius: 0.0,
        }
    }
}

/// Math utility functions
pub mod utils {
    /// Smallest power of two greater than or equal to `value`, floored at `minimum`
    ///
    /// Returns `None` when the power of two does not fit in a `usize`.
    pub fn next_power_of_two_at_least(value: usize, minimum: usize) -> Option<usize> {
        value.checked_next_power_of_two().map(|size| size.max(minimum))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_sphere_distances() {
        let sphere = BoundingSphere::new(Vec3::new(3.0, 4.0, 0.0), 2.0);
        let origin = Vec3::zeros();

        assert_relative_eq!(sphere.distance_to_center(&origin), 5.0);
        assert_relative_eq!(sphere.distance_to_surface(&origin), 3.0);
    }

    #[test]
    fn test_point_inside_sphere_has_negative_surface_distance() {
        let sphere = BoundingSphere::new(Vec3::zeros(), 4.0);
        assert!(sphere.distance_to_surface(&Vec3::new(1.0, 0.0, 0.0)) < 0.0);
    }

    #[test]
    fn test_next_power_of_two_floor() {
        assert_eq!(utils::next_power_of_two_at_least(0, 16), Some(16));
        assert_eq!(utils::next_power_of_two_at_least(3, 8), Some(8));
        assert_eq!(utils::next_power_of_two_at_least(17, 16), Some(32));
        assert_eq!(utils::next_power_of_two_at_least(64, 8), Some(64));
        assert_eq!(utils::next_power_of_two_at_least(usize::MAX, 8), None);
    }
}
