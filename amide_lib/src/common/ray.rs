use nalgebra::{Point3, Vector3};

/// Ray cast through a classified volume.
/// Main usecase is getting intersections with volumes
/// ([`BoundBox::intersect`](super::BoundBox::intersect)),
/// then iterating over the intersected line segment in steps.
pub struct Ray {
    pub origin: Point3<f32>,
    pub direction: Vector3<f32>,
}

impl Ray {
    /// Construct new ray using `origin` and `direction`.
    /// `direction` must be unit vector.
    pub fn new(origin: Point3<f32>, direction: Vector3<f32>) -> Ray {
        Ray { origin, direction }
    }

    /// Returns point `t` units far from ray origin in ray direction
    pub fn point_from_t(&self, t: f32) -> Point3<f32> {
        self.origin + t * self.direction
    }

    /// Ray parameter of the point on the ray closest to `point`
    pub fn t_of(&self, point: &Point3<f32>) -> f32 {
        (point - self.origin).dot(&self.direction)
    }
}
