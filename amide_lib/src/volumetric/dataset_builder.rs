use nalgebra::Vector3;

use crate::{common::Transform, error::Result};

/// Everything needed to assemble a dataset.
/// Missing optional parts fall back to defaults when building.
#[derive(Default, Debug, Clone)]
pub struct DatasetMetadata {
    pub name: Option<String>,
    /// Voxel count along x, y, z
    pub size: Option<Vector3<usize>>,
    /// Defaults to 1
    pub frames: Option<usize>,
    /// Defaults to 1
    pub gates: Option<usize>,
    /// Millimeters, defaults to 1mm cubes
    pub voxel_size: Option<Vector3<f64>>,
    /// Defaults to identity
    pub transform: Option<Transform>,
    /// `(start, duration)` per frame, seconds
    pub frame_timing: Option<Vec<(f64, f64)>>,
    /// Gate major, then frame, then x, y, z with z changing fastest
    pub data: Option<Vec<f32>>,
}

pub trait BuildDataset
where
    Self: Sized,
{
    fn build(metadata: DatasetMetadata) -> Result<Self>;
}
