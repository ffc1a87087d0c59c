use crate::common::default_threads;

/// Sub-voxel grid side used for voxels crossing the ROI boundary.
/// Odd, so the voxel center is one of the samples. Volume error of a boundary
/// voxel stays below `1 / ANALYSIS_GRANULARITY`.
pub const ANALYSIS_GRANULARITY: usize = 9;

/// How the N−1 corrected variance is accumulated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VarianceMethod {
    /// Mean first, then corrected sum of squares over the same voxels
    #[default]
    TwoPass,
    /// Single pass, weighted Welford update
    Welford,
}

#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    /// Worker threads for the voxel walk
    pub threads: usize,
    /// Sub-voxel grid side
    pub granularity: usize,
    pub variance: VarianceMethod,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        AnalysisOptions {
            threads: default_threads(),
            granularity: ANALYSIS_GRANULARITY,
            variance: VarianceMethod::TwoPass,
        }
    }
}

impl AnalysisOptions {
    pub fn single_thread() -> Self {
        AnalysisOptions {
            threads: 1,
            ..Default::default()
        }
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    pub fn with_granularity(mut self, granularity: usize) -> Self {
        self.granularity = granularity.max(1);
        self
    }

    pub fn with_variance(mut self, variance: VarianceMethod) -> Self {
        self.variance = variance;
        self
    }
}
