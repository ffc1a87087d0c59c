use std::sync::{atomic::AtomicBool, Arc};

use crate::{
    common::check_cancel,
    error::{EngineError, Result},
    roi::Roi,
    volumetric::Dataset,
};

use super::{AnalysisFrameResult, AnalysisOptions, VarianceMethod, VoxelWeights};

/// Weighted online mean and variance (West's extension of Welford's update).
#[derive(Debug, Clone, Copy, Default)]
pub struct WeightedWelford {
    count: f64,
    mean: f64,
    m2: f64,
}

impl WeightedWelford {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, value: f64, weight: f64) {
        if weight <= 0.0 {
            return;
        }
        self.count += weight;
        let delta = value - self.mean;
        self.mean += delta * weight / self.count;
        self.m2 += weight * delta * (value - self.mean);
    }

    pub fn count(&self) -> f64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count > 0.0 {
            self.mean
        } else {
            f64::NAN
        }
    }

    /// N−1 corrected, zero below two voxels worth of weight
    pub fn variance(&self) -> f64 {
        if self.count < 2.0 {
            0.0
        } else {
            self.m2 / (self.count - 1.0)
        }
    }
}

/// Variance of weighted `(value, weight)` samples in one online pass.
pub fn welford_variance<I>(samples: I) -> f64
where
    I: IntoIterator<Item = (f64, f64)>,
{
    let mut acc = WeightedWelford::new();
    samples.into_iter().for_each(|(v, w)| acc.push(v, w));
    acc.variance()
}

/// Variance of weighted `(value, weight)` samples, corrected two pass form.
pub fn two_pass_variance(samples: &[(f64, f64)]) -> f64 {
    let (total, count) = samples
        .iter()
        .fold((0.0, 0.0), |(t, c), &(v, w)| (t + v * w, c + w));
    if count < 2.0 {
        return 0.0;
    }
    let mean = total / count;
    let (correction, var) = samples.iter().fold((0.0, 0.0), |(corr, var), &(v, w)| {
        let d = v - mean;
        (corr + d * w, var + d * d * w)
    });
    (var - correction * correction / count) / (count - 1.0)
}

/// Statistics of one ROI over one frame, default options.
pub fn analyze_frame(
    roi: &Roi,
    dataset: &dyn Dataset,
    frame: usize,
) -> Result<Arc<AnalysisFrameResult>> {
    analyze_frame_with(roi, dataset, frame, 0, &AnalysisOptions::default(), None)
}

/// Statistics of one ROI over one gate of one frame.
pub fn analyze_gate(
    roi: &Roi,
    dataset: &dyn Dataset,
    frame: usize,
    gate: usize,
) -> Result<Arc<AnalysisFrameResult>> {
    analyze_frame_with(roi, dataset, frame, gate, &AnalysisOptions::default(), None)
}

pub fn analyze_frame_with(
    roi: &Roi,
    dataset: &dyn Dataset,
    frame: usize,
    gate: usize,
    options: &AnalysisOptions,
    cancel: Option<&AtomicBool>,
) -> Result<Arc<AnalysisFrameResult>> {
    check_frame(dataset, frame, gate)?;
    let weights = VoxelWeights::for_roi(roi, dataset, options, cancel)?;
    let result = frame_statistics(weights.as_ref(), dataset, frame, gate, options.variance);
    Ok(Arc::new(result))
}

/// Every frame of `gate` in order. Voxel weights depend only on geometry,
/// so they are computed once and shared by all frames.
pub fn analyze_frames(
    roi: &Roi,
    dataset: &dyn Dataset,
    gate: usize,
    options: &AnalysisOptions,
    cancel: Option<&AtomicBool>,
) -> Result<Vec<Arc<AnalysisFrameResult>>> {
    let frames = dataset.dimensions().frames;
    check_frame(dataset, 0, gate)?;

    let weights = VoxelWeights::for_roi(roi, dataset, options, cancel)?;
    (0..frames)
        .map(|frame| {
            check_cancel(cancel)?;
            let result = frame_statistics(weights.as_ref(), dataset, frame, gate, options.variance);
            Ok(Arc::new(result))
        })
        .collect()
}

/// Every frame of every gate, gate major
pub fn analyze_all_frames(
    roi: &Roi,
    dataset: &dyn Dataset,
) -> Result<Vec<Arc<AnalysisFrameResult>>> {
    let options = AnalysisOptions::default();
    let mut results = Vec::new();
    for gate in 0..dataset.dimensions().gates {
        results.extend(analyze_frames(roi, dataset, gate, &options, None)?);
    }
    Ok(results)
}

fn check_frame(dataset: &dyn Dataset, frame: usize, gate: usize) -> Result<()> {
    let dims = dataset.dimensions();
    if frame >= dims.frames || gate >= dims.gates {
        return Err(EngineError::InvalidArgument(format!(
            "Frame {frame} gate {gate} out of range, dataset has {} frames and {} gates",
            dims.frames, dims.gates
        )));
    }
    Ok(())
}

fn frame_statistics(
    weights: Option<&VoxelWeights>,
    dataset: &dyn Dataset,
    frame: usize,
    gate: usize,
    method: VarianceMethod,
) -> AnalysisFrameResult {
    let duration = dataset.frame_duration(frame);
    let midpoint = dataset.frame_midpoint(frame);
    let empty = AnalysisFrameResult::empty(frame, gate, duration, midpoint);

    let weights = match weights {
        Some(w) => w,
        None => return empty,
    };

    // non finite voxels are skipped by every statistic alike
    let samples = || {
        weights.iter().filter_map(move |(voxel, w)| {
            dataset
                .scalar_at(voxel, frame, gate)
                .map(|v| (v as f64, w))
                .filter(|(v, _)| v.is_finite())
        })
    };

    let mut total = 0.0;
    let mut count = 0.0;
    let mut voxels = 0;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for (v, w) in samples() {
        total += v * w;
        count += w;
        voxels += 1;
        // partial voxels still report their full value
        min = min.min(v);
        max = max.max(v);
    }

    if count <= 0.0 {
        log::debug!("No voxel of frame {frame} inside the ROI");
        return empty;
    }

    let mean = total / count;
    let variance = match method {
        VarianceMethod::TwoPass => {
            let (correction, var) = samples().fold((0.0, 0.0), |(corr, var), (v, w)| {
                let d = v - mean;
                (corr + d * w, var + d * d * w)
            });
            if count < 2.0 {
                0.0
            } else {
                (var - correction * correction / count) / (count - 1.0)
            }
        }
        VarianceMethod::Welford => welford_variance(samples()),
    };

    AnalysisFrameResult {
        frame,
        gate,
        voxel_count: count,
        voxels,
        total,
        mean,
        variance,
        min,
        max,
        duration,
        time_midpoint: midpoint,
    }
}

#[cfg(test)]
mod test {
    use approx::assert_relative_eq;
    use nalgebra::{point, vector};

    use super::*;
    use crate::{
        common::Transform,
        test_helpers::{box_roi, index_sum_dataset, uniform_dataset},
    };

    #[test]
    fn welford_matches_two_pass() {
        let samples = [(1.0, 1.0), (4.0, 0.5), (2.5, 1.0), (7.0, 0.25), (3.0, 1.0)];
        assert_relative_eq!(
            welford_variance(samples.iter().copied()),
            two_pass_variance(&samples),
            max_relative = 1e-12
        );
    }

    #[test]
    fn small_weight_has_zero_variance() {
        assert_eq!(welford_variance([(1.0, 0.5), (5.0, 0.5)]), 0.0);
        assert_eq!(two_pass_variance(&[(1.0, 0.5), (5.0, 0.5)]), 0.0);
    }

    #[test]
    fn uniform_block() {
        let ds = uniform_dataset(vector![6, 6, 6], 2.5);
        let roi = box_roi(point![1.0, 1.0, 1.0], vector![3.0, 3.0, 3.0]);
        let res = analyze_frame(&roi, &ds, 0).unwrap();
        assert_relative_eq!(res.voxel_count, 27.0, epsilon = 1e-9);
        assert_relative_eq!(res.mean, 2.5);
        assert_relative_eq!(res.variance, 0.0, epsilon = 1e-9);
        assert_eq!(res.min, 2.5);
        assert_eq!(res.max, 2.5);
        assert_eq!(res.voxels, 27);
    }

    #[test]
    fn welford_option_agrees() {
        let ds = index_sum_dataset(vector![5, 5, 5]);
        let transform = Transform::from_offset(point![0.3, 0.7, 0.2]);
        let roi = Roi::new_ellipsoid(transform, vector![4.0, 3.5, 4.2]).unwrap();
        let two_pass =
            analyze_frame_with(&roi, &ds, 0, 0, &AnalysisOptions::single_thread(), None).unwrap();
        let welford = analyze_frame_with(
            &roi,
            &ds,
            0,
            0,
            &AnalysisOptions::single_thread().with_variance(VarianceMethod::Welford),
            None,
        )
        .unwrap();
        assert_relative_eq!(two_pass.variance, welford.variance, max_relative = 1e-9);
        assert_eq!(two_pass.voxel_count, welford.voxel_count);
    }

    #[test]
    fn frame_out_of_range() {
        let ds = uniform_dataset(vector![2, 2, 2], 1.0);
        let roi = box_roi(point![0.0, 0.0, 0.0], vector![1.0, 1.0, 1.0]);
        assert!(matches!(
            analyze_frame(&roi, &ds, 3),
            Err(EngineError::InvalidArgument(_))
        ));
        assert!(matches!(
            analyze_gate(&roi, &ds, 0, 1),
            Err(EngineError::InvalidArgument(_))
        ));
    }

    #[test]
    fn undrawn_roi_is_empty() {
        let ds = uniform_dataset(vector![2, 2, 2], 1.0);
        let roi = box_roi(point![0.0, 0.0, 0.0], vector![0.0, 1.0, 1.0]);
        let res = analyze_frame(&roi, &ds, 0).unwrap();
        assert!(res.is_empty());
        assert!(res.mean.is_nan());
    }
}
