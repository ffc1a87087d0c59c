//! Module with helper functions
//! Saves repetition in unit tests

use nalgebra::{vector, Point3, Vector3};

use crate::{common::Transform, roi::Roi, volumetric::LinearDataset};

/// Every voxel holds `value`, unit voxels
pub fn uniform_dataset(size: Vector3<usize>, value: f32) -> LinearDataset {
    LinearDataset::from_fn(size, vector![1.0, 1.0, 1.0], |_, _, _| value).unwrap()
}

/// Voxel `(x, y, z)` holds `x + y + z`, unit voxels
pub fn index_sum_dataset(size: Vector3<usize>) -> LinearDataset {
    LinearDataset::from_fn(size, vector![1.0, 1.0, 1.0], |x, y, z| (x + y + z) as f32).unwrap()
}

/// Zero everywhere except `hot`, unit voxels
pub fn hot_voxel_dataset(size: Vector3<usize>, hot: Point3<usize>, value: f32) -> LinearDataset {
    LinearDataset::from_fn(size, vector![1.0, 1.0, 1.0], |x, y, z| {
        if (x, y, z) == (hot.x, hot.y, hot.z) {
            value
        } else {
            0.0
        }
    })
    .unwrap()
}

/// Axis aligned box ROI spanning `[offset, offset + corner)` in base space
pub fn box_roi(offset: Point3<f64>, corner: Vector3<f64>) -> Roi {
    Roi::new_box(Transform::from_offset(offset), corner).unwrap()
}
