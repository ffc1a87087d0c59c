use nalgebra::{Point3, Vector3};

use crate::error::{EngineError, Result};

/// Boolean voxel grid in ROI local space, backing isocontour and freehand ROIs.
///
/// Mask voxel `(i, j, k)` covers `[i, i+1) ⊙ voxel_size` in ROI local millimeters.
#[derive(Clone, PartialEq)]
pub struct VoxelMask {
    size: Vector3<usize>,
    voxel_size: Vector3<f64>,
    data: Vec<bool>,
}

impl std::fmt::Debug for VoxelMask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoxelMask")
            .field("size", &self.size)
            .field("voxel_size", &self.voxel_size)
            .field("set voxels", &self.count())
            .finish()
    }
}

impl VoxelMask {
    /// All voxels unset
    pub fn new(size: Vector3<usize>, voxel_size: Vector3<f64>) -> Result<VoxelMask> {
        if !voxel_size.iter().all(|&v| v.is_finite() && v > 0.0) {
            return Err(EngineError::InvalidGeometry(format!(
                "Mask voxel size {voxel_size:?} must be positive"
            )));
        }
        let len = size.x * size.y * size.z;
        Ok(VoxelMask {
            size,
            voxel_size,
            data: vec![false; len],
        })
    }

    pub fn from_fn<F>(
        size: Vector3<usize>,
        voxel_size: Vector3<f64>,
        mut f: F,
    ) -> Result<VoxelMask>
    where
        F: FnMut(usize, usize, usize) -> bool,
    {
        let mut mask = VoxelMask::new(size, voxel_size)?;
        for x in 0..size.x {
            for y in 0..size.y {
                for z in 0..size.z {
                    if f(x, y, z) {
                        mask.set(x, y, z, true);
                    }
                }
            }
        }
        Ok(mask)
    }

    fn get_3d_index(&self, x: usize, y: usize, z: usize) -> usize {
        z + y * self.size.z + x * self.size.y * self.size.z
    }

    pub fn size(&self) -> Vector3<usize> {
        self.size
    }

    pub fn voxel_size(&self) -> Vector3<f64> {
        self.voxel_size
    }

    /// Millimeters covered by the mask grid
    pub fn extent(&self) -> Vector3<f64> {
        self.size.map(|v| v as f64).component_mul(&self.voxel_size)
    }

    /// Set voxel, writes outside of the grid are ignored
    pub fn set(&mut self, x: usize, y: usize, z: usize, value: bool) {
        if x < self.size.x && y < self.size.y && z < self.size.z {
            let index = self.get_3d_index(x, y, z);
            self.data[index] = value;
        }
    }

    pub fn get(&self, x: usize, y: usize, z: usize) -> bool {
        if x < self.size.x && y < self.size.y && z < self.size.z {
            self.data[self.get_3d_index(x, y, z)]
        } else {
            false
        }
    }

    /// Signed lookup, anything outside of the grid is unset
    pub fn contains_index(&self, voxel: &Point3<isize>) -> bool {
        if voxel.iter().any(|&v| v < 0) {
            return false;
        }
        self.get(voxel.x as usize, voxel.y as usize, voxel.z as usize)
    }

    /// Number of set voxels
    pub fn count(&self) -> usize {
        self.data.iter().filter(|&&v| v).count()
    }
}

#[cfg(test)]
mod test {
    use nalgebra::{point, vector};

    use super::*;

    #[test]
    fn set_and_get() {
        let mut mask = VoxelMask::new(vector![3, 2, 1], vector![1.0, 1.0, 2.0]).unwrap();
        assert_eq!(mask.count(), 0);
        mask.set(2, 1, 0, true);
        mask.set(5, 5, 5, true); // ignored
        assert!(mask.get(2, 1, 0));
        assert!(!mask.get(1, 1, 0));
        assert_eq!(mask.count(), 1);
        assert_eq!(mask.extent(), vector![3.0, 2.0, 2.0]);
    }

    #[test]
    fn signed_lookup() {
        let mask =
            VoxelMask::from_fn(vector![2, 2, 2], vector![1.0, 1.0, 1.0], |_, _, _| true).unwrap();
        assert!(mask.contains_index(&point![1, 1, 1]));
        assert!(!mask.contains_index(&point![-1, 0, 0]));
        assert!(!mask.contains_index(&point![0, 2, 0]));
    }

    #[test]
    fn bad_voxel_size() {
        assert!(VoxelMask::new(vector![1, 1, 1], vector![1.0, 0.0, 1.0]).is_err());
    }
}
