use std::f64::consts::PI;

use nalgebra::{point, Point3, Vector3};

use crate::{
    common::{box_corners, Axis, Transform},
    error::{EngineError, Result},
};

use super::{predicate::RoiPredicate, ShapePredicate, VoxelMask};

/// Kind of ROI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoiShape {
    Box,
    Cylinder,
    Ellipsoid,
    Isocontour2D,
    Isocontour3D,
    Freehand2D,
    Freehand3D,
}

impl RoiShape {
    /// Membership is given by a voxel mask instead of a closed form
    pub fn is_masked(self) -> bool {
        matches!(
            self,
            RoiShape::Isocontour2D
                | RoiShape::Isocontour3D
                | RoiShape::Freehand2D
                | RoiShape::Freehand3D
        )
    }

    /// Mask is one voxel thick
    pub fn is_planar(self) -> bool {
        matches!(self, RoiShape::Isocontour2D | RoiShape::Freehand2D)
    }
}

/// Region of interest geometry.
///
/// The ROI lives in its own frame (`transform`), spanning `[0, corner]` in local
/// millimeters. Ellipsoids and cylinders are inscribed into that box, masked shapes
/// cover it with their voxel mask.
#[derive(Debug, Clone)]
pub struct Roi {
    name: String,
    shape: RoiShape,
    transform: Transform,
    corner: Vector3<f64>,
    mask: Option<VoxelMask>,
}

impl Roi {
    fn geometric(shape: RoiShape, transform: Transform, corner: Vector3<f64>) -> Result<Roi> {
        if !corner.iter().all(|&c| c.is_finite() && c >= 0.0) {
            return Err(EngineError::InvalidGeometry(format!(
                "ROI corner {corner:?} must be finite and non negative"
            )));
        }
        Ok(Roi {
            name: "roi".into(),
            shape,
            transform,
            corner,
            mask: None,
        })
    }

    fn masked(shape: RoiShape, transform: Transform, mask: VoxelMask) -> Result<Roi> {
        if shape.is_planar() && mask.size().z != 1 {
            return Err(EngineError::InvalidGeometry(format!(
                "{shape:?} mask must be one voxel thick, got {}",
                mask.size().z
            )));
        }
        Ok(Roi {
            name: "roi".into(),
            shape,
            transform,
            corner: mask.extent(),
            mask: Some(mask),
        })
    }

    pub fn new_box(transform: Transform, corner: Vector3<f64>) -> Result<Roi> {
        Roi::geometric(RoiShape::Box, transform, corner)
    }

    pub fn new_cylinder(transform: Transform, corner: Vector3<f64>) -> Result<Roi> {
        Roi::geometric(RoiShape::Cylinder, transform, corner)
    }

    pub fn new_ellipsoid(transform: Transform, corner: Vector3<f64>) -> Result<Roi> {
        Roi::geometric(RoiShape::Ellipsoid, transform, corner)
    }

    pub fn new_isocontour_2d(transform: Transform, mask: VoxelMask) -> Result<Roi> {
        Roi::masked(RoiShape::Isocontour2D, transform, mask)
    }

    pub fn new_isocontour_3d(transform: Transform, mask: VoxelMask) -> Result<Roi> {
        Roi::masked(RoiShape::Isocontour3D, transform, mask)
    }

    pub fn new_freehand_2d(transform: Transform, mask: VoxelMask) -> Result<Roi> {
        Roi::masked(RoiShape::Freehand2D, transform, mask)
    }

    pub fn new_freehand_3d(transform: Transform, mask: VoxelMask) -> Result<Roi> {
        Roi::masked(RoiShape::Freehand3D, transform, mask)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Roi {
        self.name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shape(&self) -> RoiShape {
        self.shape
    }

    /// Far corner of the ROI box in local millimeters
    pub fn corner(&self) -> Vector3<f64> {
        self.corner
    }

    /// ROI local to base space
    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn mask(&self) -> Option<&VoxelMask> {
        self.mask.as_ref()
    }

    pub fn mask_voxel_size(&self) -> Option<Vector3<f64>> {
        self.mask.as_ref().map(VoxelMask::voxel_size)
    }

    /// Mask lookup by mask voxel index, always false for geometric shapes
    pub fn mask_contains(&self, voxel: &Point3<isize>) -> bool {
        self.mask
            .as_ref()
            .map(|m| m.contains_index(voxel))
            .unwrap_or(false)
    }

    /// Nothing has been drawn yet, the ROI has no volume
    pub fn is_undrawn(&self) -> bool {
        match &self.mask {
            Some(mask) => mask.count() == 0,
            None => self.corner.iter().any(|&c| c <= 0.0),
        }
    }

    /// Center of the ROI box in base space
    pub fn center(&self) -> Point3<f64> {
        self.transform.to_base(&Point3::from(0.5 * self.corner))
    }

    /// Corners of the ROI box in base space
    pub fn base_corners(&self) -> [Point3<f64>; 8] {
        box_corners(point![0.0, 0.0, 0.0], Point3::from(self.corner))
            .map(|c| self.transform.to_base(&c))
    }

    pub fn predicate(&self) -> RoiPredicate<'_> {
        let center = Point3::from(0.5 * self.corner);
        let radius = 0.5 * self.corner;
        match (self.shape, &self.mask) {
            (RoiShape::Box, _) => RoiPredicate::Box {
                corner: self.corner,
            },
            (RoiShape::Ellipsoid, _) => RoiPredicate::Ellipsoid { center, radius },
            (RoiShape::Cylinder, _) => RoiPredicate::Cylinder {
                center,
                height: self.corner.z,
                radius,
            },
            (_, Some(mask)) => RoiPredicate::Mask {
                mask,
                voxel_size: mask.voxel_size(),
            },
            // masked shapes are only built with a mask
            (shape, None) => unreachable!("{shape:?} ROI without mask"),
        }
    }

    /// Point given in ROI local millimeters
    pub fn contains_local(&self, p: &Point3<f64>) -> bool {
        self.predicate().contains(p)
    }

    /// Point given in base space
    pub fn contains_base(&self, p: &Point3<f64>) -> bool {
        self.contains_local(&self.transform.to_local(p))
    }

    /// Volume in cubic millimeters
    pub fn volume_mm3(&self) -> f64 {
        let c = self.corner;
        match self.shape {
            RoiShape::Box => c.x * c.y * c.z,
            RoiShape::Cylinder => PI * 0.25 * c.x * c.y * c.z,
            RoiShape::Ellipsoid => PI / 6.0 * c.x * c.y * c.z,
            _ => {
                let mask_voxel = self.mask_voxel_size().map(|v| v.product()).unwrap_or(0.0);
                self.mask.as_ref().map(VoxelMask::count).unwrap_or(0) as f64 * mask_voxel
            }
        }
    }

    /// Rotate around the ROI center by `theta` radians around base `axis`
    pub fn rotated(&self, axis: Axis, theta: f64) -> Roi {
        let mut roi = self.clone();
        roi.transform = self
            .transform
            .rotated_about(&axis.unit(), theta, &self.center());
        roi
    }

    pub fn shifted(&self, delta: &Vector3<f64>) -> Roi {
        let mut roi = self.clone();
        roi.transform = self.transform.shifted(delta);
        roi
    }
}

impl ShapePredicate for Roi {
    /// `p` in ROI local millimeters
    fn contains(&self, p: &Point3<f64>) -> bool {
        self.contains_local(p)
    }
}

#[cfg(test)]
mod test {
    use std::f64::consts::FRAC_PI_2;

    use approx::assert_relative_eq;
    use nalgebra::vector;

    use super::*;

    #[test]
    fn box_in_base_space() {
        let transform = Transform::from_offset(point![10.0, 0.0, 0.0]);
        let roi = Roi::new_box(transform, vector![2.0, 2.0, 2.0]).unwrap();
        assert!(roi.contains_base(&point![11.0, 1.0, 1.0]));
        assert!(!roi.contains_base(&point![1.0, 1.0, 1.0]));
        assert_eq!(roi.center(), point![11.0, 1.0, 1.0]);
        assert_eq!(roi.volume_mm3(), 8.0);
    }

    #[test]
    fn rotated_box_keeps_center() {
        let roi = Roi::new_box(Transform::identity(), vector![4.0, 2.0, 2.0]).unwrap();
        let rotated = roi.rotated(Axis::Z, FRAC_PI_2);
        assert_relative_eq!(rotated.center(), roi.center(), epsilon = 1e-12);
        // long side now along y
        assert!(rotated.contains_base(&point![2.0, 2.9, 1.0]));
        assert!(!rotated.contains_base(&point![3.5, 1.0, 1.0]));
    }

    #[test]
    fn ellipsoid_and_cylinder_inscribed() {
        let ell = Roi::new_ellipsoid(Transform::identity(), vector![2.0, 2.0, 2.0]).unwrap();
        assert!(ell.contains_local(&point![1.0, 1.0, 2.0]));
        assert!(!ell.contains_local(&point![0.1, 0.1, 0.1]));

        let cyl = Roi::new_cylinder(Transform::identity(), vector![2.0, 2.0, 2.0]).unwrap();
        assert!(cyl.contains_local(&point![1.0, 1.0, 0.0]));
        assert!(!cyl.contains_local(&point![0.1, 0.1, 1.0]));
        assert_relative_eq!(cyl.volume_mm3(), 2.0 * PI);
    }

    #[test]
    fn planar_mask_must_be_thin() {
        let thick = VoxelMask::new(vector![2, 2, 2], vector![1.0, 1.0, 1.0]).unwrap();
        assert!(Roi::new_isocontour_2d(Transform::identity(), thick.clone()).is_err());
        assert!(Roi::new_isocontour_3d(Transform::identity(), thick).is_ok());
    }

    #[test]
    fn undrawn() {
        let empty_box = Roi::new_box(Transform::identity(), vector![0.0, 1.0, 1.0]).unwrap();
        assert!(empty_box.is_undrawn());

        let mask = VoxelMask::new(vector![2, 2, 1], vector![1.0, 1.0, 1.0]).unwrap();
        let roi = Roi::new_freehand_2d(Transform::identity(), mask).unwrap();
        assert!(roi.is_undrawn());
        assert_eq!(roi.corner(), vector![2.0, 2.0, 1.0]);
    }

    #[test]
    fn mask_volume() {
        let mask =
            VoxelMask::from_fn(vector![2, 2, 2], vector![0.5, 0.5, 2.0], |x, _, _| x == 0).unwrap();
        let roi = Roi::new_freehand_3d(Transform::identity(), mask).unwrap();
        assert_eq!(roi.volume_mm3(), 4.0 * 0.5);
        assert!(roi.mask_contains(&point![0, 1, 1]));
        assert!(!roi.mask_contains(&point![1, 1, 1]));
    }

    #[test]
    fn negative_corner_rejected() {
        assert!(Roi::new_box(Transform::identity(), vector![1.0, -1.0, 1.0]).is_err());
    }
}
