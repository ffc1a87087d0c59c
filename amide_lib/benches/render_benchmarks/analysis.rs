use amide_lib::analysis::{analyze_frame_with, AnalysisOptions, VarianceMethod};
use criterion::Criterion;

use crate::common::*;

fn analyze_with(c: &mut Criterion, name: &str, options: AnalysisOptions) {
    let dataset = phantom();
    let roi = ellipsoid_roi();

    c.bench_function(name, |b| {
        b.iter(|| analyze_frame_with(&roi, &dataset, 0, 0, &options, None).unwrap());
    });
}

pub fn analyze_single_thread(c: &mut Criterion) {
    analyze_with(c, "analyze 1 thread", AnalysisOptions::single_thread());
}

pub fn analyze_multi_thread(c: &mut Criterion) {
    let options = AnalysisOptions::single_thread().with_threads(8);
    analyze_with(c, "analyze 8 threads", options);
}

pub fn analyze_welford(c: &mut Criterion) {
    let options = AnalysisOptions::default().with_variance(VarianceMethod::Welford);
    analyze_with(c, "analyze welford", options);
}
