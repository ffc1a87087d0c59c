use nalgebra::{vector, Point3, Vector3};

use crate::{
    common::Transform,
    error::{EngineError, Result},
};

use super::{
    dataset_builder::{BuildDataset, DatasetMetadata},
    Dataset, Dimensions,
};

/// In-memory dataset, all frames and gates stored in one linear buffer.
pub struct LinearDataset {
    name: String,
    dims: Dimensions,
    voxel_size: Vector3<f64>,
    transform: Transform,
    // (start, duration) of every frame
    frame_timing: Vec<(f64, f64)>,
    data: Vec<f32>,
}

impl std::fmt::Debug for LinearDataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinearDataset")
            .field("name", &self.name)
            .field("dims", &self.dims)
            .field("voxel_size", &self.voxel_size)
            .field("transform", &self.transform)
            .field("data len ", &self.data.len())
            .finish()
    }
}

impl LinearDataset {
    /// Single frame dataset filled by `f(x, y, z)`, axis aligned at base origin.
    pub fn from_fn<F>(
        size: Vector3<usize>,
        voxel_size: Vector3<f64>,
        mut f: F,
    ) -> Result<LinearDataset>
    where
        F: FnMut(usize, usize, usize) -> f32,
    {
        let mut data = Vec::with_capacity(size.x * size.y * size.z);
        for x in 0..size.x {
            for y in 0..size.y {
                for z in 0..size.z {
                    data.push(f(x, y, z));
                }
            }
        }

        let metadata = DatasetMetadata {
            size: Some(size),
            voxel_size: Some(voxel_size),
            data: Some(data),
            ..Default::default()
        };
        LinearDataset::build(metadata)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> LinearDataset {
        self.name = name.into();
        self
    }

    pub fn with_transform(mut self, transform: Transform) -> LinearDataset {
        self.transform = transform;
        self
    }

    fn get_3d_index(&self, x: usize, y: usize, z: usize) -> usize {
        z + y * self.dims.z + x * self.dims.y * self.dims.z
    }

    fn get_frame_offset(&self, frame: usize, gate: usize) -> usize {
        (gate * self.dims.frames + frame) * self.dims.voxels_per_frame()
    }

    /// Raw buffer of one frame and gate
    pub fn frame_data(&self, frame: usize, gate: usize) -> Option<&[f32]> {
        if frame >= self.dims.frames || gate >= self.dims.gates {
            return None;
        }
        let offset = self.get_frame_offset(frame, gate);
        self.data.get(offset..offset + self.dims.voxels_per_frame())
    }
}

impl Dataset for LinearDataset {
    fn dimensions(&self) -> Dimensions {
        self.dims
    }

    fn voxel_size(&self) -> Vector3<f64> {
        self.voxel_size
    }

    fn transform(&self) -> &Transform {
        &self.transform
    }

    fn scalar_at(&self, voxel: Point3<usize>, frame: usize, gate: usize) -> Option<f32> {
        if !self.dims.contains(&voxel) || frame >= self.dims.frames || gate >= self.dims.gates {
            return None;
        }
        let index =
            self.get_frame_offset(frame, gate) + self.get_3d_index(voxel.x, voxel.y, voxel.z);
        self.data.get(index).copied()
    }

    fn frame_start_time(&self, frame: usize) -> f64 {
        self.frame_timing
            .get(frame)
            .map(|t| t.0)
            .unwrap_or(f64::NAN)
    }

    fn frame_duration(&self, frame: usize) -> f64 {
        self.frame_timing
            .get(frame)
            .map(|t| t.1)
            .unwrap_or(f64::NAN)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl BuildDataset for LinearDataset {
    fn build(metadata: DatasetMetadata) -> Result<LinearDataset> {
        let size = metadata
            .size
            .ok_or_else(|| EngineError::InvalidArgument("No size".into()))?;
        let data = metadata
            .data
            .ok_or_else(|| EngineError::InvalidArgument("No voxel data passed".into()))?;
        let frames = metadata.frames.unwrap_or(1);
        let gates = metadata.gates.unwrap_or(1);
        let voxel_size = metadata.voxel_size.unwrap_or_else(|| vector![1.0, 1.0, 1.0]);
        let transform = metadata.transform.unwrap_or_else(Transform::identity);

        let dims = Dimensions::new(size.x, size.y, size.z, frames, gates);

        if dims.total() == 0 {
            return Err(EngineError::InvalidArgument(format!(
                "Empty dimensions {dims:?}"
            )));
        }

        if data.len() != dims.total() {
            return Err(EngineError::InvalidArgument(format!(
                "Expected {} values, got {}",
                dims.total(),
                data.len()
            )));
        }

        if !voxel_size.iter().all(|&v| v.is_finite() && v > 0.0) {
            return Err(EngineError::InvalidGeometry(format!(
                "Voxel size {voxel_size:?} must be positive"
            )));
        }

        // default: back to back frames, one second each
        let frame_timing = metadata
            .frame_timing
            .unwrap_or_else(|| (0..frames).map(|f| (f as f64, 1.0)).collect());

        if frame_timing.len() != frames {
            return Err(EngineError::InvalidArgument(format!(
                "Timing given for {} frames, dataset has {frames}",
                frame_timing.len()
            )));
        }

        log::debug!("New linear dataset, dims {dims:?} voxel size {voxel_size:?}");

        Ok(LinearDataset {
            name: metadata.name.unwrap_or_else(|| "dataset".into()),
            dims,
            voxel_size,
            transform,
            frame_timing,
            data,
        })
    }
}

#[cfg(test)]
mod test {
    use nalgebra::point;

    use super::*;
    use crate::{common::TimeInterval, volumetric::Interpolation};

    fn ramp_dataset() -> LinearDataset {
        LinearDataset::from_fn(vector![4, 3, 2], vector![1.0, 1.0, 1.0], |x, y, z| {
            (100 * x + 10 * y + z) as f32
        })
        .unwrap()
    }

    fn two_frame_dataset() -> LinearDataset {
        let size = vector![2, 2, 2];
        let mut data = vec![1.0; 8];
        data.extend(vec![3.0; 8]);
        let meta = DatasetMetadata {
            size: Some(size),
            frames: Some(2),
            frame_timing: Some(vec![(0.0, 10.0), (10.0, 30.0)]),
            data: Some(data),
            ..Default::default()
        };
        LinearDataset::build(meta).unwrap()
    }

    #[test]
    fn indexing() {
        let ds = ramp_dataset();
        assert_eq!(ds.scalar_at(point![3, 2, 1], 0, 0), Some(321.0));
        assert_eq!(ds.scalar_at(point![0, 1, 0], 0, 0), Some(10.0));
        assert_eq!(ds.scalar_at(point![4, 0, 0], 0, 0), None);
        assert_eq!(ds.scalar_at(point![0, 0, 0], 1, 0), None);
    }

    #[test]
    fn wrong_data_length() {
        let meta = DatasetMetadata {
            size: Some(vector![2, 2, 2]),
            data: Some(vec![0.0; 7]),
            ..Default::default()
        };
        assert!(matches!(
            LinearDataset::build(meta),
            Err(EngineError::InvalidArgument(_))
        ));
    }

    #[test]
    fn frames_and_timing() {
        let ds = two_frame_dataset();
        assert_eq!(ds.scalar_at(point![1, 1, 1], 1, 0), Some(3.0));
        assert_eq!(ds.frame_midpoint(1), 25.0);
        assert_eq!(ds.frame_duration(0), 10.0);
        assert_eq!(ds.frame_data(1, 0).unwrap().len(), 8);
    }

    #[test]
    fn interval_weights() {
        let ds = two_frame_dataset();

        let frames = ds.frames_in_interval(TimeInterval::new(5.0, 10.0));
        assert_eq!(frames, vec![(0, 0.5), (1, 0.5)]);

        // time weighted mix of both frames
        let v = ds
            .sample_interval(&point![0.5, 0.5, 0.5], &frames, Interpolation::NearestNeighbor)
            .unwrap();
        assert_eq!(v, 2.0);

        // no overlap, closest frame
        let frames = ds.frames_in_interval(TimeInterval::new(100.0, 1.0));
        assert_eq!(frames, vec![(1, 1.0)]);
    }

    #[test]
    fn trilinear_between_centers() {
        let ds = ramp_dataset();
        // halfway between voxel centers x=1 and x=2
        let v = ds
            .sample(&point![2.0, 0.5, 0.5], 0, 0, Interpolation::Trilinear)
            .unwrap();
        assert!((v - 150.0).abs() < 1e-4);

        let nn = ds
            .sample(&point![2.0, 0.5, 0.5], 0, 0, Interpolation::NearestNeighbor)
            .unwrap();
        assert_eq!(nn, 200.0);

        assert!(ds
            .sample(&point![-0.1, 0.5, 0.5], 0, 0, Interpolation::Trilinear)
            .is_none());
    }

    #[test]
    fn range_of_values() {
        let ds = ramp_dataset();
        let range = ds.value_range(0, 0);
        assert_eq!(range.low, 0.0);
        assert_eq!(range.high, 321.0);
    }

    #[test]
    fn corners_follow_transform() {
        let ds = ramp_dataset().with_transform(Transform::from_offset(point![10.0, 0.0, 0.0]));
        let corners = ds.base_corners();
        assert_eq!(corners[0], point![10.0, 0.0, 0.0]);
        assert_eq!(corners[6], point![14.0, 3.0, 2.0]);
    }
}
