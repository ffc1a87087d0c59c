use std::sync::Arc;

pub use amide_lib::{
    common::{Axis, TimeInterval, Transform},
    render::{RenderOptions, RenderSource, RenderingContextList},
    roi::Roi,
    volumetric::{Dataset, Interpolation, LinearDataset},
};
pub use nalgebra::{point, vector, Vector3};

pub const SIDE: usize = 96;
pub const MAX_DIM: usize = 128;

pub const IMAGE_WIDTH: usize = 256;
pub const IMAGE_HEIGHT: usize = 256;

/// Sphere of radius `SIDE / 3`, brightest in its center
pub fn phantom() -> LinearDataset {
    let center = Vector3::repeat(SIDE as f32 / 2.0);
    let radius = SIDE as f32 / 3.0;
    LinearDataset::from_fn(vector![SIDE, SIDE, SIDE], vector![1.0, 1.0, 1.0], |x, y, z| {
        let d = vector![x as f32, y as f32, z as f32] - center;
        (radius - d.norm()).max(0.0)
    })
    .unwrap()
}

pub fn ellipsoid_roi() -> Roi {
    let transform = Transform::from_offset(point![20.0, 24.0, 18.0]);
    Roi::new_ellipsoid(transform, vector![50.0, 40.0, 56.0])
        .unwrap()
        .rotated(Axis::Z, 0.3)
}

pub fn context_list(threads: usize) -> RenderingContextList {
    let dataset: Arc<dyn Dataset> = Arc::new(phantom());
    let options = RenderOptions::builder()
        .max_dim(MAX_DIM)
        .threads(threads)
        .build_unchecked();
    RenderingContextList::new(
        vec![
            RenderSource::Dataset(dataset),
            RenderSource::Roi(Arc::new(ellipsoid_roi())),
        ],
        &Transform::identity(),
        TimeInterval::new(0.0, 1.0),
        Interpolation::Trilinear,
        options,
        None,
    )
    .unwrap()
}
