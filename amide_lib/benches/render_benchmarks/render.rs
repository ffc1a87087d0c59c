use std::sync::Arc;

use amide_lib::render::{classify, ClassifyParams, Quality};
use criterion::Criterion;

use crate::common::*;

fn render_with(c: &mut Criterion, name: &str, threads: usize, quality: Quality) {
    let mut list = context_list(threads);
    list.set_quality(quality);

    c.bench_function(name, move |b| {
        b.iter(|| {
            list.set_rotation(Axis::Y, 0.1);
            list.render(IMAGE_WIDTH, IMAGE_HEIGHT, 1, 0.0, 0, None).unwrap()
        });
    });
}

pub fn render_single_thread(c: &mut Criterion) {
    render_with(c, "render 1 thread", 1, Quality::Highest);
}

pub fn render_multi_thread(c: &mut Criterion) {
    render_with(c, "render 8 threads", 8, Quality::Highest);
}

pub fn render_fastest(c: &mut Criterion) {
    render_with(c, "render fastest", 8, Quality::Fastest);
}

pub fn render_stereo(c: &mut Criterion) {
    let mut list = context_list(8);

    c.bench_function("render stereo", move |b| {
        b.iter(|| list.render(0, IMAGE_HEIGHT, 2, 5.0, IMAGE_WIDTH, None).unwrap());
    });
}

pub fn classify_dataset(c: &mut Criterion) {
    let source = RenderSource::Dataset(Arc::new(phantom()));
    let params = ClassifyParams {
        render_frame: Transform::identity(),
        far_corner: Vector3::repeat(SIDE as f64),
        min_voxel_size: 1.0,
        max_dim: MAX_DIM,
        interval: TimeInterval::new(0.0, 1.0),
        interpolation: Interpolation::Trilinear,
    };

    c.bench_function("classify", |b| {
        b.iter(|| classify(&source, &params, 8, None).unwrap());
    });
}
