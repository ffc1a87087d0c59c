use criterion::{criterion_group, criterion_main, Criterion};
use render_benchmarks::{analysis::*, render::*};

mod common;
mod render_benchmarks;

criterion_group! {
    name = rendering;
    config = Criterion::default().significance_level(0.1).sample_size(10);
    targets = render_single_thread, render_multi_thread, render_fastest, render_stereo
}

criterion_group! {
    name = classification;
    config = Criterion::default().significance_level(0.1).sample_size(10);
    targets = classify_dataset
}

criterion_group! {
    name = analysis;
    config = Criterion::default().significance_level(0.1).sample_size(10);
    targets = analyze_single_thread, analyze_multi_thread, analyze_welford
}

criterion_main!(rendering, classification, analysis);
