use nalgebra::{point, Matrix3, Point3, Rotation3, Unit, Vector3};

use crate::error::{EngineError, Result};

/// Allowed deviation of `axesᵀ·axes` from identity
pub const ORTHONORMAL_TOLERANCE: f64 = 1e-6;

/// One of the three coordinate axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    pub fn unit(self) -> Unit<Vector3<f64>> {
        match self {
            Axis::X => Vector3::x_axis(),
            Axis::Y => Vector3::y_axis(),
            Axis::Z => Vector3::z_axis(),
        }
    }
}

/// Rotation matrix of `theta` radians around `axis`.
pub fn axis_rotation(axis: Axis, theta: f64) -> Matrix3<f64> {
    *Rotation3::from_axis_angle(&axis.unit(), theta).matrix()
}

/// Gram-Schmidt on the columns of `m`.
///
/// Keeps the direction of the first column, the handedness of the input is preserved.
pub fn orthonormalize(m: &Matrix3<f64>) -> Matrix3<f64> {
    let c0 = m.column(0).normalize();

    let c1 = m.column(1).into_owned();
    let c1 = (c1 - c0 * c0.dot(&c1)).normalize();

    let c2 = m.column(2).into_owned();
    let c2 = (c2 - c0 * c0.dot(&c2) - c1 * c1.dot(&c2)).normalize();

    Matrix3::from_columns(&[c0, c1, c2])
}

pub fn is_orthonormal(m: &Matrix3<f64>) -> bool {
    let gram = m.transpose() * m;
    let dif = gram - Matrix3::identity();
    m.iter().all(|v| v.is_finite()) && dif.iter().all(|v| v.abs() < ORTHONORMAL_TOLERANCE)
}

/// Coordinate frame placed in the shared base space.
///
/// `offset` is the frame origin in base coordinates, the columns of `axes`
/// are the frame's x, y and z directions in base coordinates.
/// Axes are always orthonormal, every operation returns a re-orthonormalized copy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    offset: Point3<f64>,
    axes: Matrix3<f64>,
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform {
    pub fn identity() -> Transform {
        Transform {
            offset: point![0.0, 0.0, 0.0],
            axes: Matrix3::identity(),
        }
    }

    /// Axis aligned frame placed at `offset`
    pub fn from_offset(offset: Point3<f64>) -> Transform {
        Transform {
            offset,
            axes: Matrix3::identity(),
        }
    }

    /// Validated constructor, fails on axes that are not orthonormal.
    pub fn new(offset: Point3<f64>, axes: Matrix3<f64>) -> Result<Transform> {
        if !offset.coords.iter().all(|v| v.is_finite()) {
            return Err(EngineError::InvalidGeometry(format!(
                "offset {offset:?} is not finite"
            )));
        }
        if !is_orthonormal(&axes) {
            return Err(EngineError::InvalidGeometry(format!(
                "axes {axes:?} are not orthonormal"
            )));
        }
        Ok(Transform { offset, axes })
    }

    pub fn offset(&self) -> Point3<f64> {
        self.offset
    }

    pub fn axes(&self) -> &Matrix3<f64> {
        &self.axes
    }

    pub fn axis(&self, axis: Axis) -> Vector3<f64> {
        self.axes.column(axis.index()).into_owned()
    }

    /// Frame local point to base space
    pub fn to_base(&self, local: &Point3<f64>) -> Point3<f64> {
        self.offset + self.axes * local.coords
    }

    /// Base space point to frame local coordinates
    pub fn to_local(&self, base: &Point3<f64>) -> Point3<f64> {
        Point3::from(self.axes.transpose() * (base - self.offset))
    }

    pub fn vector_to_base(&self, local: &Vector3<f64>) -> Vector3<f64> {
        self.axes * local
    }

    pub fn vector_to_local(&self, base: &Vector3<f64>) -> Vector3<f64> {
        self.axes.transpose() * base
    }

    /// Rotate the frame by `theta` radians around its own `axis`, origin stays in place.
    pub fn rotated(&self, axis: Axis, theta: f64) -> Transform {
        let direction = Unit::new_normalize(self.axis(axis));
        let rotation = Rotation3::from_axis_angle(&direction, theta);
        Transform {
            offset: self.offset,
            axes: orthonormalize(&(rotation.matrix() * self.axes)),
        }
    }

    /// Rotate the frame by `theta` radians around base space `vector` passing through `center`.
    pub fn rotated_about(
        &self,
        vector: &Vector3<f64>,
        theta: f64,
        center: &Point3<f64>,
    ) -> Transform {
        let direction = Unit::new_normalize(*vector);
        let rotation = Rotation3::from_axis_angle(&direction, theta);
        let offset = center + rotation * (self.offset - center);
        Transform {
            offset,
            axes: orthonormalize(&(rotation.matrix() * self.axes)),
        }
    }

    /// Move frame origin by base space `delta`
    pub fn shifted(&self, delta: &Vector3<f64>) -> Transform {
        Transform {
            offset: self.offset + delta,
            axes: self.axes,
        }
    }

    /// Mirror the frame along `axis`
    pub fn inverted(&self, axis: Axis) -> Transform {
        let mut axes = self.axes;
        let mut column = axes.column_mut(axis.index());
        column *= -1.0;
        Transform {
            offset: self.offset,
            axes,
        }
    }

    pub fn orthonormalized(&self) -> Transform {
        Transform {
            offset: self.offset,
            axes: orthonormalize(&self.axes),
        }
    }

    /// Affine map taking points local to `self` into points local to `other`.
    pub fn local_to_other(&self, other: &Transform) -> AffineMap {
        debug_assert!(is_orthonormal(&self.axes) && is_orthonormal(&other.axes));
        let other_t = other.axes.transpose();
        AffineMap {
            linear: other_t * self.axes,
            translation: other_t * (self.offset - other.offset),
        }
    }
}

/// `p ↦ linear·p + translation`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineMap {
    pub linear: Matrix3<f64>,
    pub translation: Vector3<f64>,
}

impl AffineMap {
    pub fn apply(&self, p: &Point3<f64>) -> Point3<f64> {
        Point3::from(self.linear * p.coords + self.translation)
    }

    /// Scale input coordinates first, `p ↦ self(scale ⊙ p)`.
    /// Used to feed voxel indices directly instead of millimeters.
    pub fn prescaled(&self, scale: &Vector3<f64>) -> AffineMap {
        AffineMap {
            linear: self.linear * Matrix3::from_diagonal(scale),
            translation: self.translation,
        }
    }
}

#[cfg(test)]
mod test {
    use std::f64::consts::FRAC_PI_2;

    use approx::assert_relative_eq;
    use nalgebra::vector;

    use super::*;

    #[test]
    fn identity_roundtrip() {
        let t = Transform::from_offset(point![1.0, 2.0, 3.0]);
        let p = point![4.0, 5.0, 6.0];
        assert_eq!(t.to_local(&p), point![3.0, 3.0, 3.0]);
        assert_eq!(t.to_base(&t.to_local(&p)), p);
    }

    #[test]
    fn rejects_skewed_axes() {
        let axes = Matrix3::new(1.0, 0.5, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0);
        assert!(matches!(
            Transform::new(point![0.0, 0.0, 0.0], axes),
            Err(EngineError::InvalidGeometry(_))
        ));
    }

    #[test]
    fn rotation_quarter_turn() {
        let t = Transform::identity().rotated(Axis::Z, FRAC_PI_2);
        let x = t.axis(Axis::X);
        assert_relative_eq!(x, vector![0.0, 1.0, 0.0], epsilon = 1e-12);
        assert!(is_orthonormal(t.axes()));
    }

    #[test]
    fn rotation_back_and_forth() {
        let t = Transform::from_offset(point![3.0, -1.0, 2.0]);
        let back = t.rotated(Axis::Y, 0.7).rotated(Axis::Y, -0.7);
        assert_relative_eq!(back.axes(), t.axes(), epsilon = 1e-12);
        assert_relative_eq!(back.offset(), t.offset(), epsilon = 1e-12);
    }

    #[test]
    fn rotated_about_center() {
        let t = Transform::from_offset(point![2.0, 0.0, 0.0]);
        let r = t.rotated_about(&vector![0.0, 0.0, 1.0], FRAC_PI_2, &point![1.0, 0.0, 0.0]);
        assert_relative_eq!(r.offset(), point![1.0, 1.0, 0.0], epsilon = 1e-12);
    }

    #[test]
    fn inverted_axis() {
        let t = Transform::identity().inverted(Axis::Y);
        assert_eq!(t.to_local(&point![1.0, 2.0, 3.0]), point![1.0, -2.0, 3.0]);
        assert!(is_orthonormal(t.axes()));
    }

    #[test]
    fn orthonormalize_drifted() {
        let drifted = Matrix3::new(1.0, 1e-4, 0.0, 0.0, 1.0, 2e-4, 0.0, 0.0, 1.0 + 1e-4);
        assert!(!is_orthonormal(&drifted));
        assert!(is_orthonormal(&orthonormalize(&drifted)));
    }

    #[test]
    fn map_between_frames() {
        let a = Transform::from_offset(point![10.0, 0.0, 0.0]);
        let b = Transform::identity().rotated(Axis::Z, FRAC_PI_2);
        let map = a.local_to_other(&b);
        let p = point![1.0, 0.0, 0.0];
        let expected = b.to_local(&a.to_base(&p));
        assert_relative_eq!(map.apply(&p), expected, epsilon = 1e-12);

        let scaled = map.prescaled(&vector![2.0, 2.0, 2.0]);
        assert_relative_eq!(
            scaled.apply(&point![0.5, 0.0, 0.0]),
            expected,
            epsilon = 1e-12
        );
    }
}
