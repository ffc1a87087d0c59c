use nalgebra::{Point3, Vector3};

use super::VoxelMask;

/// Membership test in ROI local coordinates.
///
/// The voxel walk of the analysis is written once against this trait,
/// shapes only differ in their implementation of `contains`.
pub trait ShapePredicate: Sync {
    fn contains(&self, p: &Point3<f64>) -> bool;
}

impl<F> ShapePredicate for F
where
    F: Fn(&Point3<f64>) -> bool + Sync,
{
    fn contains(&self, p: &Point3<f64>) -> bool {
        self(p)
    }
}

/// Box spans `[0, corner)` on every axis
pub fn point_in_box(p: &Point3<f64>, corner: &Vector3<f64>) -> bool {
    (0..3).all(|i| p[i] >= 0.0 && p[i] < corner[i])
}

/// `Σ ((p − center) / radius)² ≤ 1`, boundary inclusive
pub fn point_in_ellipsoid(p: &Point3<f64>, center: &Point3<f64>, radius: &Vector3<f64>) -> bool {
    let d = (p - center).component_div(radius);
    d.norm_squared() <= 1.0
}

/// Ellipse test on the xy projection and `|p.z − center.z| ≤ height / 2`
pub fn point_in_elliptic_cylinder(
    p: &Point3<f64>,
    center: &Point3<f64>,
    height: f64,
    radius: &Vector3<f64>,
) -> bool {
    let dx = (p.x - center.x) / radius.x;
    let dy = (p.y - center.y) / radius.y;
    dx * dx + dy * dy <= 1.0 && (p.z - center.z).abs() <= 0.5 * height
}

/// Looks up the mask voxel holding `p`
pub fn isocontour_contains(p: &Point3<f64>, mask: &VoxelMask, voxel_size: &Vector3<f64>) -> bool {
    let voxel = p.coords.component_div(voxel_size).map(|v| v.floor());
    if !voxel.iter().all(|v| v.is_finite()) {
        return false;
    }
    mask.contains_index(&Point3::from(voxel.map(|v| v as isize)))
}

/// Predicate of one concrete ROI, borrowed from [`Roi::predicate`](super::Roi::predicate).
#[derive(Debug, Clone, Copy)]
pub enum RoiPredicate<'a> {
    Box {
        corner: Vector3<f64>,
    },
    Ellipsoid {
        center: Point3<f64>,
        radius: Vector3<f64>,
    },
    Cylinder {
        center: Point3<f64>,
        height: f64,
        radius: Vector3<f64>,
    },
    Mask {
        mask: &'a VoxelMask,
        voxel_size: Vector3<f64>,
    },
}

impl ShapePredicate for RoiPredicate<'_> {
    fn contains(&self, p: &Point3<f64>) -> bool {
        match self {
            RoiPredicate::Box { corner } => point_in_box(p, corner),
            RoiPredicate::Ellipsoid { center, radius } => point_in_ellipsoid(p, center, radius),
            RoiPredicate::Cylinder {
                center,
                height,
                radius,
            } => point_in_elliptic_cylinder(p, center, *height, radius),
            RoiPredicate::Mask { mask, voxel_size } => isocontour_contains(p, mask, voxel_size),
        }
    }
}

#[cfg(test)]
mod test {
    use nalgebra::{point, vector};

    use super::*;

    #[test]
    fn box_half_open() {
        let corner = vector![2.0, 3.0, 4.0];
        assert!(point_in_box(&point![0.0, 0.0, 0.0], &corner));
        assert!(point_in_box(&point![1.99, 2.99, 3.99], &corner));
        assert!(!point_in_box(&point![2.0, 1.0, 1.0], &corner));
        assert!(!point_in_box(&point![1.0, -0.001, 1.0], &corner));
    }

    #[test]
    fn ellipsoid_boundary() {
        let center = point![1.0, 1.0, 1.0];
        let radius = vector![1.0, 2.0, 0.5];
        assert!(point_in_ellipsoid(&point![1.0, 3.0, 1.0], &center, &radius));
        assert!(point_in_ellipsoid(&point![1.0, 1.0, 1.5], &center, &radius));
        assert!(!point_in_ellipsoid(&point![1.0, 1.0, 1.5001], &center, &radius));
        assert!(!point_in_ellipsoid(&point![1.8, 2.8, 1.0], &center, &radius));
    }

    #[test]
    fn cylinder() {
        let center = point![1.0, 1.0, 2.0];
        let radius = vector![1.0, 1.0, 2.0];
        assert!(point_in_elliptic_cylinder(&point![1.0, 1.0, 0.0], &center, 4.0, &radius));
        assert!(point_in_elliptic_cylinder(&point![1.7, 1.7, 3.9], &center, 4.0, &radius));
        assert!(!point_in_elliptic_cylinder(&point![1.8, 1.8, 2.0], &center, 4.0, &radius));
        assert!(!point_in_elliptic_cylinder(&point![1.0, 1.0, 4.1], &center, 4.0, &radius));
    }

    #[test]
    fn mask_lookup() {
        let voxel_size = vector![2.0, 2.0, 2.0];
        let mask = VoxelMask::from_fn(vector![2, 2, 1], voxel_size, |x, y, _| x == y).unwrap();
        assert!(isocontour_contains(&point![0.5, 0.5, 0.5], &mask, &voxel_size));
        assert!(isocontour_contains(&point![3.9, 2.1, 1.9], &mask, &voxel_size));
        assert!(!isocontour_contains(&point![2.5, 0.5, 0.5], &mask, &voxel_size));
        assert!(!isocontour_contains(&point![0.5, 0.5, 2.0], &mask, &voxel_size));
        assert!(!isocontour_contains(&point![-0.5, 0.5, 0.5], &mask, &voxel_size));
    }

    #[test]
    fn closures_are_predicates() {
        let half_space = |p: &Point3<f64>| p.x > 0.0;
        assert!(half_space.contains(&point![1.0, 0.0, 0.0]));
        assert!(!ShapePredicate::contains(&half_space, &point![-1.0, 0.0, 0.0]));
    }
}
