/// Statistics of one dataset frame (and gate) inside one ROI.
///
/// Voxels partially covered by the ROI contribute their covered fraction,
/// so `voxel_count` is fractional. An ROI missing the dataset yields
/// `voxel_count == 0` with `NaN` mean, variance, min and max.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisFrameResult {
    pub frame: usize,
    pub gate: usize,
    /// Sum of voxel weights
    pub voxel_count: f64,
    /// Number of voxels with a nonzero weight
    pub voxels: usize,
    /// Weighted sum of values
    pub total: f64,
    pub mean: f64,
    /// N−1 corrected
    pub variance: f64,
    pub min: f64,
    pub max: f64,
    /// Frame duration, seconds
    pub duration: f64,
    /// `(frame_start + frame_end) / 2`, seconds
    pub time_midpoint: f64,
}

impl AnalysisFrameResult {
    /// Result for an ROI that does not overlap the dataset
    pub fn empty(frame: usize, gate: usize, duration: f64, time_midpoint: f64) -> Self {
        AnalysisFrameResult {
            frame,
            gate,
            voxel_count: 0.0,
            voxels: 0,
            total: 0.0,
            mean: f64::NAN,
            variance: f64::NAN,
            min: f64::NAN,
            max: f64::NAN,
            duration,
            time_midpoint,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.voxel_count == 0.0
    }

    pub fn std_dev(&self) -> f64 {
        self.variance.sqrt()
    }

    /// Standard error of the mean
    pub fn std_err(&self) -> f64 {
        (self.variance / self.voxel_count).sqrt()
    }
}
